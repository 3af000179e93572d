mod decision;
pub mod evaluator;
pub mod history;
mod prompts;

pub use decision::{
    CritiqueEntry, CritiqueVerdict, Decision, MalformedCritique, MAX_QUALITY_SCORE,
    MIN_QUALITY_SCORE,
};
pub use evaluator::{DraftEvaluator, EvaluationError};
pub use history::{
    latest_feedback, latest_structured, parse_entry, parse_text, parse_value, CritiqueHistoryItem,
    CritiqueMap, RAW_KEY,
};
pub use prompts::{CritiquePrompts, PromptPair, DEFAULT_TONE};
