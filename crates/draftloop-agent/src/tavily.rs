use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::{CapabilityError, SearchProvider, SearchResult};

pub const DEFAULT_MAX_RESULTS: usize = 5;
const TAVILY_BASE_URL: &str = "https://api.tavily.com";
const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Tavily web search client
pub struct TavilySearch {
    client: Client,
    api_key: String,
    base_url: String,
    max_results: usize,
}

impl TavilySearch {
    pub fn new(api_key: impl Into<String>) -> Result<Self, CapabilityError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(CapabilityError::Config("Tavily API key is empty".into()));
        }

        let client = Client::builder()
            .timeout(SEARCH_TIMEOUT)
            .build()
            .map_err(|e| CapabilityError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url: TAVILY_BASE_URL.to_string(),
            max_results: DEFAULT_MAX_RESULTS,
        })
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl SearchProvider for TavilySearch {
    fn name(&self) -> &str {
        "tavily"
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, CapabilityError> {
        debug!(query, max_results = self.max_results, "Running Tavily search");

        let request = TavilyRequest {
            query,
            max_results: self.max_results,
        };

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| CapabilityError::from_reqwest(e, SEARCH_TIMEOUT))?;

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

        let parsed: TavilyResponse = response.json().await.map_err(|e| {
            CapabilityError::InvalidResponse(format!("Failed to parse Tavily response: {}", e))
        })?;

        Ok(parsed
            .results
            .into_iter()
            .map(|hit| SearchResult {
                title: hit.title.unwrap_or_else(|| "No Title".to_string()),
                url: hit.url.unwrap_or_else(|| "#".to_string()),
                snippet: hit
                    .content
                    .unwrap_or_else(|| "No description available.".to_string()),
            })
            .collect())
    }
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyHit>,
}

#[derive(Debug, Deserialize)]
struct TavilyHit {
    title: Option<String>,
    url: Option<String>,
    content: Option<String>,
}
