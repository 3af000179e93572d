use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{CapabilityError, CompletionConfig, ResponseSchema, StructuredCompletion, TextCompletion};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini `generateContent` client.
///
/// Serves both the free-text and the schema-constrained completion
/// capabilities. Each trait call is exactly one HTTP request; nothing is
/// retried here.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    config: CompletionConfig,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, config: CompletionConfig) -> Result<Self, CapabilityError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(CapabilityError::Config("Gemini API key is empty".into()));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CapabilityError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url: GEMINI_BASE_URL.to_string(),
            config,
        })
    }

    /// Point the client at a different endpoint (proxies, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn build_request(
        &self,
        system_role: &str,
        instructions: &str,
        schema: Option<&ResponseSchema>,
    ) -> GeminiRequest {
        let generation_config = GeminiGenerationConfig {
            temperature: self.config.temperature,
            response_mime_type: schema.map(|_| "application/json".to_string()),
            response_schema: schema.map(|s| s.schema.clone()),
        };

        GeminiRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: system_role.to_string(),
                }],
            },
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: instructions.to_string(),
                }],
            }],
            generation_config,
        }
    }

    async fn generate(&self, request: &GeminiRequest) -> Result<String, CapabilityError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, self.config.model
        );

        debug!(
            model = %self.config.model,
            structured = request.generation_config.response_schema.is_some(),
            "Sending request to Gemini API"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| CapabilityError::from_reqwest(e, self.config.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(CapabilityError::Quota(body));
            }
            return Err(CapabilityError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            CapabilityError::InvalidResponse(format!("Failed to parse Gemini response: {}", e))
        })?;

        let candidate = gemini_response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| CapabilityError::InvalidResponse("Gemini returned no candidates".into()))?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(CapabilityError::InvalidResponse(format!(
                "Gemini returned empty content (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }

        debug!(response_len = text.len(), "Received Gemini response");
        Ok(text)
    }
}

#[async_trait]
impl TextCompletion for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, system_role: &str, instructions: &str) -> Result<String, CapabilityError> {
        let request = self.build_request(system_role, instructions, None);
        self.generate(&request).await
    }
}

#[async_trait]
impl StructuredCompletion for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete_structured(
        &self,
        system_role: &str,
        instructions: &str,
        schema: &ResponseSchema,
    ) -> Result<serde_json::Value, CapabilityError> {
        let request = self.build_request(system_role, instructions, Some(schema));
        let text = self.generate(&request).await?;

        let value: serde_json::Value = serde_json::from_str(text.trim()).map_err(|e| {
            CapabilityError::InvalidResponse(format!("{} response is not JSON: {}", schema.name, e))
        })?;

        let object = value.as_object().ok_or_else(|| {
            CapabilityError::InvalidResponse(format!("{} response is not an object", schema.name))
        })?;
        if let Some(missing) = schema
            .required_fields()
            .into_iter()
            .find(|field| !object.contains_key(*field))
        {
            return Err(CapabilityError::InvalidResponse(format!(
                "{} response is missing required field '{}'",
                schema.name, missing
            )));
        }

        Ok(value)
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}
