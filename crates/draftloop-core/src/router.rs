use crate::{RevisionBudget, WorkflowState};

/// Score at which a draft is reported as meeting the target. Reporting only:
/// routing never looks at it.
pub const TARGET_SCORE: f64 = 85.0;

/// Where the loop goes after an evaluate + count pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Evaluator returned PASS
    Passed,
    /// Still REVISE and the round budget is spent
    BudgetExhausted,
    /// Run the reviser, then evaluate again
    Revise,
}

impl Route {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Route::Revise)
    }

    /// Reason string shown for terminal routes
    pub fn reason(&self) -> &'static str {
        match self {
            Route::Passed => "passed quality check",
            Route::BudgetExhausted => "forced stop: revision budget exhausted",
            Route::Revise => "needs revision",
        }
    }
}

/// Decide the next step. PASS wins over the budget check; the quality score
/// is not consulted.
pub fn route(state: &WorkflowState, budget: RevisionBudget) -> Route {
    if state.decision.is_pass() {
        Route::Passed
    } else if budget.is_exhausted(state.revision_count) {
        Route::BudgetExhausted
    } else {
        Route::Revise
    }
}
