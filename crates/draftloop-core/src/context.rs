use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::{RevisionBudget, WorkflowState};

/// Lifecycle of one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    Finished,
}

/// Everything one run owns. Built per prompt, consumed by the loop runner,
/// never shared between runs.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: Uuid,
    pub state: WorkflowState,
    pub budget: RevisionBudget,
    pub status: RunStatus,
    /// Informational step markers (not critiques)
    pub notes: Vec<String>,
    pub started_at: DateTime<Utc>,
    started: Instant,
}

impl RunContext {
    pub fn new(user_prompt: impl Into<String>, budget: RevisionBudget) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            state: WorkflowState::new(user_prompt),
            budget,
            status: RunStatus::Idle,
            notes: Vec::new(),
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    pub fn push_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    pub fn total_duration(&self) -> Duration {
        self.started.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_context_is_idle() {
        let ctx = RunContext::new("topic", RevisionBudget::new(2).unwrap());
        assert_eq!(ctx.status, RunStatus::Idle);
        assert_eq!(ctx.budget.get(), 2);
        assert!(ctx.notes.is_empty());
        assert_eq!(ctx.state.revision_count, 1);
    }

    #[test]
    fn test_contexts_are_isolated() {
        let a = RunContext::new("a", RevisionBudget::new(1).unwrap());
        let b = RunContext::new("b", RevisionBudget::new(1).unwrap());
        assert_ne!(a.run_id, b.run_id);
    }
}
