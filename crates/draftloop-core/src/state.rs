use serde::{Deserialize, Serialize};

use draftloop_critic::{CritiqueEntry, CritiqueHistoryItem, Decision};

use crate::LoopError;

/// State threaded through every step of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    user_prompt: String,
    /// Current best draft
    pub draft_content: String,
    critique_history: Vec<CritiqueHistoryItem>,
    /// Outcome of the latest evaluation
    pub decision: Decision,
    /// Evaluation rounds completed so far
    pub revision_count: u32,
    /// Score of the latest evaluation only
    pub quality_score: f64,
}

impl WorkflowState {
    pub fn new(user_prompt: impl Into<String>) -> Self {
        Self {
            user_prompt: user_prompt.into(),
            draft_content: String::new(),
            critique_history: Vec::new(),
            decision: Decision::Revise,
            revision_count: 1,
            quality_score: 0.0,
        }
    }

    pub fn user_prompt(&self) -> &str {
        &self.user_prompt
    }

    pub fn critique_history(&self) -> &[CritiqueHistoryItem] {
        &self.critique_history
    }

    /// Append one critique round. History is never truncated or reordered.
    pub fn record_critique(&mut self, entry: CritiqueEntry) {
        self.decision = entry.decision;
        self.quality_score = entry.quality_score;
        self.critique_history.push(CritiqueHistoryItem::Structured(entry));
    }

    pub fn into_history(self) -> Vec<CritiqueHistoryItem> {
        self.critique_history
    }
}

/// Hard cap on evaluation rounds. Always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionBudget(u32);

impl RevisionBudget {
    pub fn new(max_revisions: i64) -> Result<Self, LoopError> {
        if max_revisions <= 0 {
            return Err(LoopError::Config(format!(
                "MAX_REVISIONS must be a positive integer, got {}",
                max_revisions
            )));
        }
        u32::try_from(max_revisions).map(Self).map_err(|_| {
            LoopError::Config(format!("MAX_REVISIONS is too large: {}", max_revisions))
        })
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    pub fn is_exhausted(&self, revision_count: u32) -> bool {
        revision_count >= self.0
    }
}

impl std::str::FromStr for RevisionBudget {
    type Err = LoopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(LoopError::Config("MAX_REVISIONS is not set".to_string()));
        }
        let value: i64 = trimmed.parse().map_err(|_| {
            LoopError::Config(format!("MAX_REVISIONS must be an integer, got '{}'", trimmed))
        })?;
        Self::new(value)
    }
}
