//! Firecrawl-compatible crawl job client.
//!
//! Submits a crawl with `POST {base}/v1/crawl` and reads job status from
//! `GET {base}/v1/crawl/{id}`. Polling itself lives in the orchestrator.
//!
//! Requires the `firecrawl` feature to be enabled.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{CrawlError, CrawlResult};
use crate::security::ServiceEndpoint;
use crate::traits::crawl_service::{CrawlService, JobId, JobStatus};
use crate::types::page::{Page, PageSource};

/// Client for a Firecrawl (or self-hosted compatible) crawl API.
///
/// # Example
///
/// ```rust,ignore
/// use research_core::ingestors::FirecrawlClient;
/// use research_core::security::ServiceEndpoint;
///
/// let endpoint = ServiceEndpoint::new("http://localhost:3002").with_api_key(key);
/// let client = FirecrawlClient::new(endpoint)?;
/// let job = client.submit("https://example.com", 3).await?;
/// ```
pub struct FirecrawlClient {
    client: Client,
    endpoint: ServiceEndpoint,
}

#[derive(Serialize)]
struct CrawlRequest<'a> {
    url: &'a str,
    limit: usize,
}

#[derive(Deserialize)]
struct CrawlStartResponse {
    #[serde(default)]
    success: Option<bool>,
    id: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct CrawlStatusResponse {
    status: String,
    #[serde(default, alias = "pages")]
    data: Option<Vec<CrawlPageData>>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct CrawlPageData {
    #[serde(alias = "text")]
    markdown: Option<String>,
    url: Option<String>,
    title: Option<String>,
    metadata: Option<PageMetadata>,
}

#[derive(Deserialize)]
struct PageMetadata {
    title: Option<String>,
    #[serde(rename = "sourceURL")]
    source_url: Option<String>,
}

impl FirecrawlClient {
    /// Create a client for the given endpoint.
    pub fn new(endpoint: ServiceEndpoint) -> CrawlResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CrawlError::Http(Box::new(e)))?;

        Ok(Self { client, endpoint })
    }

    /// Set a custom HTTP client.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    async fn read_json<R: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> CrawlResult<R> {
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(CrawlError::http(format!(
                "Firecrawl API error: {} - {}",
                status, text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| CrawlError::Http(Box::new(e)))
    }
}

/// Convert one returned page; pages without text or URL are dropped.
fn page_from_data(data: CrawlPageData) -> Option<Page> {
    let text = data.markdown.filter(|m| !m.trim().is_empty())?;
    let (meta_title, meta_url) = match data.metadata {
        Some(meta) => (meta.title, meta.source_url),
        None => (None, None),
    };
    let url = data.url.or(meta_url)?;
    let title = data.title.or(meta_title).unwrap_or_default();
    Some(Page::new(url, title, text, PageSource::Service))
}

fn parse_status(job: &JobId, response: CrawlStatusResponse) -> JobStatus {
    match response.status.as_str() {
        "completed" => JobStatus::Completed(
            response
                .data
                .unwrap_or_default()
                .into_iter()
                .filter_map(page_from_data)
                .collect(),
        ),
        "failed" | "cancelled" => JobStatus::Failed(response.error),
        other => {
            debug!(job_id = %job, status = %other, "Crawl job still running");
            JobStatus::Pending
        }
    }
}

#[async_trait]
impl CrawlService for FirecrawlClient {
    async fn submit(&self, url: &str, limit: usize) -> CrawlResult<JobId> {
        let request = self
            .client
            .post(self.endpoint.url("/v1/crawl"))
            .json(&CrawlRequest { url, limit });
        let response = self
            .endpoint
            .authorize(request)
            .send()
            .await
            .map_err(|e| CrawlError::Http(Box::new(e)))?;

        let started: CrawlStartResponse = Self::read_json(response).await?;
        match started.id {
            Some(id) if started.success != Some(false) => {
                debug!(url = %url, job_id = %id, limit, "Crawl job submitted");
                Ok(JobId::new(id))
            }
            _ => Err(CrawlError::http(format!(
                "Firecrawl did not start a crawl for {}: {}",
                url,
                started.error.unwrap_or_else(|| "no job id".to_string())
            ))),
        }
    }

    async fn status(&self, job: &JobId) -> CrawlResult<JobStatus> {
        let request = self
            .client
            .get(self.endpoint.url(&format!("/v1/crawl/{}", job)));
        let response = self
            .endpoint
            .authorize(request)
            .send()
            .await
            .map_err(|e| CrawlError::Http(Box::new(e)))?;

        let status: CrawlStatusResponse = Self::read_json(response).await?;
        Ok(parse_status(job, status))
    }
}
