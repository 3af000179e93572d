use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoopError {
    #[error("Capability error: {0}")]
    Capability(#[from] draftloop_agent::CapabilityError),

    #[error("Critique evaluation error: {0}")]
    Evaluation(#[from] draftloop_critic::EvaluationError),

    #[error("Prompt must not be empty")]
    EmptyPrompt,

    #[error("Configuration error: {0}")]
    Config(String),
}
