//! Page types - crawled documents and their provenance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::text::truncate_chars;

/// A crawled or extracted web document reduced to title + text.
///
/// Pages are immutable once created; the text is already truncated to the
/// configured maximum when it reaches the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// URL the content came from
    pub url: String,

    /// Page title (falls back to the URL when none was found)
    pub title: String,

    /// Page text, usually markdown
    pub text: String,

    /// Which path produced this page
    pub source: PageSource,

    /// When the page was fetched
    pub fetched_at: DateTime<Utc>,
}

/// How a page was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSource {
    /// Returned by the asynchronous crawling service
    Service,

    /// Fetched directly by the fallback extractor
    Fallback,
}

impl Page {
    /// Create a new page. An empty title is replaced by the URL.
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        text: impl Into<String>,
        source: PageSource,
    ) -> Self {
        let url = url.into();
        let title = title.into();
        let title = if title.trim().is_empty() {
            url.clone()
        } else {
            title.trim().to_string()
        };

        Self {
            url,
            title,
            text: text.into(),
            source,
            fetched_at: Utc::now(),
        }
    }

    /// Truncate the text to at most `max_chars` characters.
    pub fn truncated(mut self, max_chars: usize) -> Self {
        let cut = truncate_chars(&self.text, max_chars).len();
        self.text.truncate(cut);
        self
    }

    /// Check if this page has content.
    pub fn has_content(&self) -> bool {
        !self.text.trim().is_empty()
    }

    /// Get content length in characters.
    pub fn text_length(&self) -> usize {
        self.text.chars().count()
    }
}
