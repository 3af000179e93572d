use serde::{Deserialize, Serialize};
use std::time::Duration;

use draftloop_critic::{CritiqueHistoryItem, Decision};

use crate::{Route, WorkflowState};

/// The final outcome of a generate/critique/revise run
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Evaluator returned PASS
    Passed {
        rounds: u32,
        quality_score: f64,
        draft: String,
        history: Vec<CritiqueHistoryItem>,
        total_duration_secs: f64,
    },
    /// Revision budget spent without a PASS
    BudgetExhausted {
        rounds: u32,
        max_revisions: u32,
        quality_score: f64,
        draft: String,
        history: Vec<CritiqueHistoryItem>,
        total_duration_secs: f64,
    },
    /// A capability call or critique validation failed. No draft is
    /// reported as final.
    Failed {
        rounds: u32,
        error: String,
        history: Vec<CritiqueHistoryItem>,
        total_duration_secs: f64,
    },
}

impl RunOutcome {
    pub fn passed(state: WorkflowState, duration: Duration) -> Self {
        Self::Passed {
            rounds: state.revision_count,
            quality_score: state.quality_score,
            draft: state.draft_content.clone(),
            history: state.into_history(),
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn budget_exhausted(state: WorkflowState, max_revisions: u32, duration: Duration) -> Self {
        Self::BudgetExhausted {
            rounds: state.revision_count,
            max_revisions,
            quality_score: state.quality_score,
            draft: state.draft_content.clone(),
            history: state.into_history(),
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn failed(state: WorkflowState, error: String, duration: Duration) -> Self {
        let rounds = u32::try_from(state.critique_history().len()).unwrap_or(u32::MAX);
        Self::Failed {
            rounds,
            error,
            history: state.into_history(),
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    /// Evaluation rounds that completed
    pub fn rounds(&self) -> u32 {
        match self {
            Self::Passed { rounds, .. } => *rounds,
            Self::BudgetExhausted { rounds, .. } => *rounds,
            Self::Failed { rounds, .. } => *rounds,
        }
    }

    pub fn history(&self) -> &[CritiqueHistoryItem] {
        match self {
            Self::Passed { history, .. } => history,
            Self::BudgetExhausted { history, .. } => history,
            Self::Failed { history, .. } => history,
        }
    }

    /// Final draft, absent for failed runs
    pub fn draft(&self) -> Option<&str> {
        match self {
            Self::Passed { draft, .. } | Self::BudgetExhausted { draft, .. } => Some(draft),
            Self::Failed { .. } => None,
        }
    }

    /// Decision of the last completed round
    pub fn decision(&self) -> Option<Decision> {
        match self {
            Self::Passed { .. } => Some(Decision::Pass),
            Self::BudgetExhausted { .. } => Some(Decision::Revise),
            Self::Failed { .. } => None,
        }
    }

    pub fn quality_score(&self) -> Option<f64> {
        match self {
            Self::Passed { quality_score, .. } | Self::BudgetExhausted { quality_score, .. } => {
                Some(*quality_score)
            }
            Self::Failed { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Passed { .. })
    }

    pub fn reason(&self) -> &str {
        match self {
            Self::Passed { .. } => Route::Passed.reason(),
            Self::BudgetExhausted { .. } => Route::BudgetExhausted.reason(),
            Self::Failed { error, .. } => error,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Passed { .. } => 0,
            Self::BudgetExhausted { .. } => 1,
            Self::Failed { .. } => 2,
        }
    }
}
