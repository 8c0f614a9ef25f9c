//! SearxNG-backed web searcher.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::error::{ResearchError, Result};
use crate::security::ServiceEndpoint;
use crate::traits::searcher::{SearchResult, WebSearcher};

/// Per-request budget for one search.
const SEARCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Web searcher over a SearxNG instance's JSON API.
///
/// The instance must have the `json` output format enabled.
pub struct SearxSearcher {
    client: reqwest::Client,
    endpoint: ServiceEndpoint,
    timeout: Duration,
    /// Default number of results to return.
    pub default_limit: usize,
}

#[derive(Deserialize)]
struct SearxResponse {
    #[serde(default)]
    results: Vec<SearxResult>,
}

#[derive(Deserialize)]
struct SearxResult {
    url: String,
    title: Option<String>,
    content: Option<String>,
}

impl SearxSearcher {
    pub fn new(endpoint: ServiceEndpoint) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            timeout: SEARCH_TIMEOUT,
            default_limit: 10,
        }
    }

    /// Set the per-request timeout. Default: 15s.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the default result limit.
    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit;
        self
    }

    /// Set a custom HTTP client. The per-request timeout still applies.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn request(&self, query: &str) -> reqwest::RequestBuilder {
        let request = self
            .client
            .get(self.endpoint.url("/search"))
            .timeout(self.timeout)
            .query(&[("q", query), ("format", "json"), ("language", "en")]);
        self.endpoint.authorize(request)
    }
}

fn into_results(response: SearxResponse, limit: usize) -> Vec<SearchResult> {
    response
        .results
        .into_iter()
        .filter_map(|r| {
            let mut result = SearchResult::from_url(&r.url)?;
            if let Some(title) = r.title.filter(|t| !t.is_empty()) {
                result = result.with_title(title);
            }
            if let Some(content) = r.content.filter(|c| !c.is_empty()) {
                result = result.with_snippet(content);
            }
            Some(result)
        })
        .take(limit)
        .collect()
}

#[async_trait]
impl WebSearcher for SearxSearcher {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        self.search_with_limit(query, self.default_limit).await
    }

    async fn search_with_limit(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let response = self
            .request(query)
            .send()
            .await
            .map_err(|e| ResearchError::Search(Box::new(e)))?;

        if !response.status().is_success() {
            return Err(ResearchError::Search(
                format!("SearxNG error: {}", response.status()).into(),
            ));
        }

        let body: SearxResponse = response
            .json()
            .await
            .map_err(|e| ResearchError::Search(Box::new(e)))?;

        Ok(into_results(body, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_results_filtered_and_limited() {
        let json = r#"{"results": [
            {"url": "https://a.example/1", "title": "One", "content": "first"},
            {"url": "::broken::", "title": "Bad"},
            {"url": "https://b.example/2", "title": ""},
            {"url": "https://c.example/3"}
        ]}"#;
        let response: SearxResponse = serde_json::from_str(json).unwrap();
        let results = into_results(response, 2);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title.as_deref(), Some("One"));
        assert_eq!(results[0].snippet.as_deref(), Some("first"));
        assert_eq!(results[1].url.as_str(), "https://b.example/2");
        assert!(results[1].title.is_none());
    }

    #[test]
    fn test_requests_carry_timeout() {
        let searcher = SearxSearcher::new(ServiceEndpoint::new("http://localhost:8080"));
        let request = searcher.request("heat pumps").build().unwrap();
        assert_eq!(request.timeout(), Some(&Duration::from_secs(15)));
        assert_eq!(
            request.url().as_str(),
            "http://localhost:8080/search?q=heat+pumps&format=json&language=en"
        );

        let searcher = searcher.with_timeout(Duration::from_secs(3));
        let request = searcher.request("q").build().unwrap();
        assert_eq!(request.timeout(), Some(&Duration::from_secs(3)));
    }

    #[test]
    fn test_missing_results_field() {
        let response: SearxResponse = serde_json::from_str("{}").unwrap();
        assert!(into_results(response, 5).is_empty());
    }
}
