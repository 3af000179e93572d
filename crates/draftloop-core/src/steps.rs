use draftloop_agent::TextCompletion;
use draftloop_critic::{latest_feedback, CritiquePrompts, Decision, DEFAULT_TONE};
use tracing::debug;

use crate::{LoopError, RunContext, WorkflowState};

/// Marker recorded when the first draft exists
pub const DRAFT_CREATED_NOTE: &str = "Initial draft generated.";

/// Writes the first draft from the user prompt
pub struct DraftGenerator<'a> {
    capability: &'a dyn TextCompletion,
    tone: String,
}

impl<'a> DraftGenerator<'a> {
    pub fn new(capability: &'a dyn TextCompletion) -> Self {
        Self {
            capability,
            tone: DEFAULT_TONE.to_string(),
        }
    }

    pub fn with_tone(mut self, tone: impl Into<String>) -> Self {
        self.tone = tone.into();
        self
    }

    pub fn tone(&self) -> &str {
        &self.tone
    }

    /// One completion call; resets the round bookkeeping for a fresh draft
    pub async fn generate(&self, ctx: &mut RunContext) -> Result<(), LoopError> {
        let prompt = ctx.state.user_prompt();
        if prompt.trim().is_empty() {
            return Err(LoopError::EmptyPrompt);
        }

        let pair = CritiquePrompts::build_generation_prompt(prompt, &self.tone);
        debug!(capability = self.capability.name(), tone = %self.tone, "Generating draft");

        let draft = self
            .capability
            .complete(&pair.system_role, &pair.instructions)
            .await?;

        ctx.state.draft_content = draft;
        ctx.state.revision_count = 1;
        ctx.state.decision = Decision::Revise;
        ctx.state.quality_score = 0.0;
        ctx.push_note(DRAFT_CREATED_NOTE);
        Ok(())
    }
}

/// Rewrites the draft against the latest critique's feedback
pub struct DraftReviser<'a> {
    capability: &'a dyn TextCompletion,
}

impl<'a> DraftReviser<'a> {
    pub fn new(capability: &'a dyn TextCompletion) -> Self {
        Self { capability }
    }

    /// One completion call. Leaves `revision_count` alone; an empty feedback
    /// list still produces a revision. Returns the number of feedback points
    /// addressed.
    pub async fn revise(&self, state: &mut WorkflowState) -> Result<usize, LoopError> {
        let feedback = latest_feedback(state.critique_history());
        let pair = CritiquePrompts::build_revision_prompt(&state.draft_content, &feedback);

        debug!(
            capability = self.capability.name(),
            feedback_points = feedback.len(),
            "Revising draft"
        );

        state.draft_content = self
            .capability
            .complete(&pair.system_role, &pair.instructions)
            .await?;
        Ok(feedback.len())
    }
}

/// Sync the round counter with the history length
pub fn count_revisions(state: &mut WorkflowState) -> u32 {
    let rounds = u32::try_from(state.critique_history().len()).unwrap_or(u32::MAX);
    state.revision_count = rounds;
    rounds
}

/// Round number of the critique about to be recorded
pub fn next_round(state: &WorkflowState) -> u32 {
    u32::try_from(state.critique_history().len())
        .unwrap_or(u32::MAX)
        .saturating_add(1)
}
