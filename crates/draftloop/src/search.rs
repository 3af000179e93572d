//! Contextual search run once before generation.
//!
//! Search never blocks a run: failures degrade to a message in the report.

use draftloop_agent::{SearchProvider, SearchResult};
use draftloop_logging::{LogEvent, Logger};
use tracing::warn;

/// Characters of each snippet shown in the report
pub const SNIPPET_CHARS: usize = 120;

pub const NO_RESULTS_MESSAGE: &str = "> No highly relevant blogs found for this topic.";

pub fn search_query(prompt: &str) -> String {
    format!("{} blog post", prompt)
}

/// Search for existing posts on the topic and format them for the report
pub async fn contextual_search(
    provider: &dyn SearchProvider,
    prompt: &str,
    logger: &Logger,
) -> String {
    let query = search_query(prompt);
    match provider.search(&query).await {
        Ok(results) => {
            logger.log(&LogEvent::SearchCompleted {
                query,
                results: results.len(),
            });
            format_search_results(&results)
        }
        Err(e) => {
            warn!(provider = provider.name(), error = %e, "Contextual search failed");
            logger.log(&LogEvent::SearchSkipped {
                reason: e.to_string(),
            });
            format!("> Error during contextual search: {}", e)
        }
    }
}

pub fn format_search_results(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return NO_RESULTS_MESSAGE.to_string();
    }

    let mut output = String::from("### Found Existing Blogs:\n");
    for (i, result) in results.iter().enumerate() {
        output.push_str(&format!("{}. **[{}]({})**\n", i + 1, result.title, result.url));
        output.push_str(&format!(
            "  - Snippet: {}...\n\n",
            truncate_chars(&result.snippet, SNIPPET_CHARS)
        ));
    }
    output
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use draftloop_agent::CapabilityError;
    use draftloop_logging::LogFormat;
    use std::sync::Mutex;

    struct FakeSearch {
        reply: Result<Vec<SearchResult>, String>,
        queries: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SearchProvider for FakeSearch {
        fn name(&self) -> &str {
            "fake"
        }

        async fn search(&self, query: &str) -> Result<Vec<SearchResult>, CapabilityError> {
            self.queries.lock().unwrap().push(query.to_string());
            self.reply.clone().map_err(CapabilityError::Transport)
        }
    }

    fn result(title: &str, snippet: &str) -> SearchResult {
        SearchResult {
            title: title.to_string(),
            url: format!("https://example.com/{}", title.to_lowercase()),
            snippet: snippet.to_string(),
        }
    }

    #[test]
    fn test_search_query() {
        assert_eq!(search_query("Rust async"), "Rust async blog post");
    }

    #[test]
    fn test_format_empty() {
        assert_eq!(format_search_results(&[]), NO_RESULTS_MESSAGE);
    }

    #[test]
    fn test_format_numbers_and_truncates() {
        let long = "x".repeat(300);
        let formatted = format_search_results(&[result("First", "short"), result("Second", &long)]);

        assert!(formatted.starts_with("### Found Existing Blogs:\n"));
        assert!(formatted.contains("1. **[First](https://example.com/first)**\n  - Snippet: short...\n"));
        assert!(formatted.contains("2. **[Second](https://example.com/second)**"));
        assert!(formatted.contains(&format!("Snippet: {}...\n", "x".repeat(SNIPPET_CHARS))));
        assert!(!formatted.contains(&"x".repeat(SNIPPET_CHARS + 1)));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "é".repeat(200);
        assert_eq!(truncate_chars(&text, 3), "ééé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[tokio::test]
    async fn test_contextual_search_uses_blog_query() {
        let provider = FakeSearch {
            reply: Ok(vec![result("Post", "about it")]),
            queries: Mutex::new(vec![]),
        };

        let output = contextual_search(&provider, "Tide pools", &Logger::silent()).await;

        assert_eq!(provider.queries.lock().unwrap().as_slice(), ["Tide pools blog post"]);
        assert!(output.contains("**[Post]"));
    }

    #[tokio::test]
    async fn test_contextual_search_failure_degrades() {
        let provider = FakeSearch {
            reply: Err("dns failure".to_string()),
            queries: Mutex::new(vec![]),
        };

        let output = contextual_search(&provider, "Tide pools", &Logger::silent()).await;

        assert!(output.starts_with("> Error during contextual search"));
        assert!(output.contains("dns failure"));
    }

    #[tokio::test]
    async fn test_contextual_search_logs_summary_before_returning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.jsonl");
        let logger = Logger::with_file(LogFormat::Json, &path)
            .unwrap()
            .without_console();
        let provider = FakeSearch {
            reply: Ok(vec![result("One", "a"), result("Two", "b")]),
            queries: Mutex::new(vec![]),
        };

        let output = contextual_search(&provider, "Tide pools", &logger).await;

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["event"], "search_completed");
        assert_eq!(lines[0]["query"], "Tide pools blog post");
        assert_eq!(lines[0]["results"], 2);
        assert!(output.starts_with("### Found Existing Blogs:"));
    }
}
