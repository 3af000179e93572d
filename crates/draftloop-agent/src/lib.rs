mod gemini;
mod tavily;
mod traits;

pub use gemini::{GeminiClient, DEFAULT_GEMINI_MODEL};
pub use tavily::{TavilySearch, DEFAULT_MAX_RESULTS};
pub use traits::{
    CapabilityError, CompletionConfig, ResponseSchema, SearchProvider, SearchResult,
    StructuredCompletion, TextCompletion,
};
