mod context;
mod error;
mod loop_runner;
mod outcome;
mod router;
mod state;
mod steps;

pub use context::{RunContext, RunStatus};
pub use error::LoopError;
pub use loop_runner::{LoopRunner, Phase};
pub use outcome::RunOutcome;
pub use router::{route, Route, TARGET_SCORE};
pub use state::{RevisionBudget, WorkflowState};
pub use steps::{count_revisions, next_round, DraftGenerator, DraftReviser, DRAFT_CREATED_NOTE};
