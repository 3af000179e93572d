use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while calling an external capability
#[derive(Error, Debug)]
pub enum CapabilityError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Service returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Quota exceeded: {0}")]
    Quota(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Capability configuration error: {0}")]
    Config(String),
}

impl CapabilityError {
    /// Map a reqwest failure, keeping timeouts distinguishable
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            CapabilityError::Timeout(timeout)
        } else {
            CapabilityError::Transport(err.to_string())
        }
    }
}

/// Configuration for completion calls
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// Model identifier understood by the backend
    pub model: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Sampling temperature (None = backend default)
    pub temperature: Option<f32>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: crate::DEFAULT_GEMINI_MODEL.to_string(),
            timeout: Duration::from_secs(120),
            temperature: None,
        }
    }
}

impl CompletionConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// JSON schema a structured completion must conform to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseSchema {
    /// Short name used in logs
    pub name: String,
    /// OpenAPI-style object schema
    pub schema: serde_json::Value,
}

impl ResponseSchema {
    pub fn new(name: impl Into<String>, schema: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }

    /// Names listed under `required`
    pub fn required_fields(&self) -> Vec<&str> {
        self.schema
            .get("required")
            .and_then(|r| r.as_array())
            .map(|fields| fields.iter().filter_map(|f| f.as_str()).collect())
            .unwrap_or_default()
    }
}

/// One hit from a web search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Free-text completion, used by the generator and the reviser
#[async_trait]
pub trait TextCompletion: Send + Sync {
    /// Human-readable backend name
    fn name(&self) -> &str;

    /// Complete `instructions` under the given system role
    async fn complete(&self, system_role: &str, instructions: &str)
        -> Result<String, CapabilityError>;
}

/// Schema-constrained completion, used by the evaluator.
///
/// Implementations must guarantee that every field listed as required in
/// the schema is present and typed in the returned object.
#[async_trait]
pub trait StructuredCompletion: Send + Sync {
    /// Human-readable backend name
    fn name(&self) -> &str;

    async fn complete_structured(
        &self,
        system_role: &str,
        instructions: &str,
        schema: &ResponseSchema,
    ) -> Result<serde_json::Value, CapabilityError>;
}

/// Optional contextual web search
#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, CapabilityError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required_fields() {
        let schema = ResponseSchema::new(
            "critique",
            json!({"type": "object", "required": ["decision", "quality_score"]}),
        );
        assert_eq!(schema.required_fields(), vec!["decision", "quality_score"]);
    }

    #[test]
    fn test_required_fields_missing() {
        let schema = ResponseSchema::new("empty", json!({"type": "object"}));
        assert!(schema.required_fields().is_empty());
    }

    #[test]
    fn test_completion_config_builder() {
        let config = CompletionConfig::new("gemini-2.0-flash")
            .with_timeout(Duration::from_secs(5))
            .with_temperature(0.3);
        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.temperature, Some(0.3));
    }
}
