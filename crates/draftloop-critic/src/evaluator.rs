use draftloop_agent::{CapabilityError, StructuredCompletion};
use tracing::{debug, info};

use crate::{CritiqueEntry, CritiquePrompts, CritiqueVerdict, MalformedCritique};

/// Evaluator that scores a draft through the structured-completion capability
pub struct DraftEvaluator<'a> {
    capability: &'a dyn StructuredCompletion,
}

impl<'a> DraftEvaluator<'a> {
    pub fn new(capability: &'a dyn StructuredCompletion) -> Self {
        Self { capability }
    }

    /// Critique `draft` as round `revision_count`.
    ///
    /// Makes exactly one capability call. The result is validated, never
    /// repaired: a bad decision or an out-of-range score is an error.
    pub async fn evaluate(
        &self,
        draft: &str,
        revision_count: u32,
    ) -> Result<CritiqueEntry, EvaluationError> {
        if draft.trim().is_empty() {
            return Err(EvaluationError::EmptyDraft);
        }

        let prompt = CritiquePrompts::build_evaluation_prompt(draft, revision_count);
        let schema = CritiquePrompts::critique_schema();

        debug!(
            capability = self.capability.name(),
            draft_len = draft.len(),
            revision_count,
            "Running draft evaluation"
        );

        let value = self
            .capability
            .complete_structured(&prompt.system_role, &prompt.instructions, &schema)
            .await?;

        let entry = CritiqueVerdict::from_value(value)?.validate(revision_count)?;

        info!(
            revision_count,
            decision = %entry.decision,
            quality_score = entry.quality_score,
            "Evaluation completed"
        );

        Ok(entry)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("Cannot evaluate an empty draft")]
    EmptyDraft,

    #[error("Evaluation capability failed: {0}")]
    Capability(#[from] CapabilityError),

    #[error("Malformed critique: {0}")]
    Malformed(#[from] MalformedCritique),
}
