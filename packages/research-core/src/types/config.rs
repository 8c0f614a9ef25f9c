//! Configuration types for crawling, indexing, and search fan-out.
//!
//! Every tunable is a named field with a documented default. Call
//! [`ResearchConfig::validate`] once at startup; components assume a
//! validated config.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::crawlers::poll::PollPolicy;
use crate::error::ConfigError;

/// Top-level configuration for a research run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    pub crawl: CrawlConfig,
    pub index: IndexConfig,
    pub search: SearchConfig,
}

impl ResearchConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the crawl settings.
    pub fn with_crawl(mut self, crawl: CrawlConfig) -> Self {
        self.crawl = crawl;
        self
    }

    /// Replace the index settings.
    pub fn with_index(mut self, index: IndexConfig) -> Self {
        self.index = index;
        self
    }

    /// Replace the search settings.
    pub fn with_search(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }

    /// Check every section for values the pipeline cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.crawl.validate()?;
        self.index.validate()?;
        self.search.validate()
    }
}

/// Configuration for the crawl orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Maximum per-URL jobs in flight at once.
    ///
    /// This is the backpressure on the crawling service. Default: 8.
    pub concurrency: usize,

    /// Page limit sent with each crawl job submission. Default: 3.
    pub limit_per_url: usize,

    /// Job status polling. Default: every 2s for up to 30s.
    pub poll: PollPolicy,

    /// Timeout for the direct fallback fetch. Default: 15s.
    #[serde(with = "duration_secs")]
    pub fallback_timeout: Duration,

    /// Every page's text is truncated to this many characters. Default: 8192.
    pub max_page_chars: usize,

    /// Body length kept by the fallback extractor. Default: 4000.
    pub extract_body_chars: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            limit_per_url: 3,
            poll: PollPolicy::default(),
            fallback_timeout: Duration::from_secs(15),
            max_page_chars: 8192,
            extract_body_chars: 4000,
        }
    }
}

impl CrawlConfig {
    /// Set the concurrency limit.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the per-URL page limit.
    pub fn with_limit_per_url(mut self, limit: usize) -> Self {
        self.limit_per_url = limit;
        self
    }

    /// Set the poll policy.
    pub fn with_poll(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Set the fallback fetch timeout.
    pub fn with_fallback_timeout(mut self, timeout: Duration) -> Self {
        self.fallback_timeout = timeout;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::Zero {
                field: "crawl.concurrency",
            });
        }
        if self.limit_per_url == 0 {
            return Err(ConfigError::Zero {
                field: "crawl.limit_per_url",
            });
        }
        if self.poll.interval.is_zero() {
            return Err(ConfigError::Zero {
                field: "crawl.poll.interval",
            });
        }
        if self.poll.deadline.is_zero() {
            return Err(ConfigError::Zero {
                field: "crawl.poll.deadline",
            });
        }
        if self.max_page_chars == 0 {
            return Err(ConfigError::Zero {
                field: "crawl.max_page_chars",
            });
        }
        if self.extract_body_chars == 0 {
            return Err(ConfigError::Zero {
                field: "crawl.extract_body_chars",
            });
        }
        Ok(())
    }
}

/// Configuration for the vector index and per-section retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Page text is truncated to this length before embedding. Default: 8192.
    pub index_text_chars: usize,

    /// Neighbors retrieved per outline section. Default: 8.
    pub snippets_per_section: usize,

    /// Snippet length in a generation prompt. Default: 500.
    pub snippet_chars: usize,

    /// Embedding requests in flight while building an index. Default: 4.
    pub embed_concurrency: usize,

    /// Consult the embedding cache. Default: true.
    ///
    /// Turning this off is always correct, just slower.
    pub use_cache: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            index_text_chars: 8192,
            snippets_per_section: 8,
            snippet_chars: 500,
            embed_concurrency: 4,
            use_cache: true,
        }
    }
}

impl IndexConfig {
    /// Set the number of snippets per section.
    pub fn with_snippets_per_section(mut self, k: usize) -> Self {
        self.snippets_per_section = k;
        self
    }

    /// Set the snippet length.
    pub fn with_snippet_chars(mut self, chars: usize) -> Self {
        self.snippet_chars = chars;
        self
    }

    /// Enable or disable the embedding cache.
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.use_cache = enabled;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.index_text_chars == 0 {
            return Err(ConfigError::Zero {
                field: "index.index_text_chars",
            });
        }
        if self.snippets_per_section == 0 {
            return Err(ConfigError::Zero {
                field: "index.snippets_per_section",
            });
        }
        if self.snippet_chars == 0 {
            return Err(ConfigError::Zero {
                field: "index.snippet_chars",
            });
        }
        if self.embed_concurrency == 0 {
            return Err(ConfigError::Zero {
                field: "index.embed_concurrency",
            });
        }
        if self.snippet_chars > self.index_text_chars {
            return Err(ConfigError::Exceeds {
                field: "index.snippet_chars",
                value: self.snippet_chars,
                limit_field: "index.index_text_chars",
                limit: self.index_text_chars,
            });
        }
        Ok(())
    }
}

/// Configuration for keyword search fan-out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// URLs requested per planner keyword. Default: 5.
    pub urls_per_keyword: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { urls_per_keyword: 5 }
    }
}

impl SearchConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.urls_per_keyword == 0 {
            return Err(ConfigError::Zero {
                field: "search.urls_per_keyword",
            });
        }
        Ok(())
    }
}

/// Serde helper: `Duration` as fractional seconds.
pub mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(ResearchConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config =
            ResearchConfig::new().with_crawl(CrawlConfig::default().with_concurrency(0));
        assert_eq!(
            config.validate(),
            Err(ConfigError::Zero {
                field: "crawl.concurrency"
            })
        );
    }

    #[test]
    fn test_snippet_longer_than_index_text_rejected() {
        let config = ResearchConfig::new().with_index(IndexConfig {
            index_text_chars: 400,
            ..Default::default()
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Exceeds { .. })
        ));
    }

    #[test]
    fn test_json_roundtrip_uses_seconds() {
        let config = ResearchConfig::default();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["crawl"]["fallback_timeout"], 15.0);
        assert_eq!(json["crawl"]["poll"]["interval"], 2.0);

        let parsed: ResearchConfig = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let parsed: ResearchConfig =
            serde_json::from_str(r#"{"crawl": {"concurrency": 2}}"#).unwrap();
        assert_eq!(parsed.crawl.concurrency, 2);
        assert_eq!(parsed.crawl.limit_per_url, 3);
        assert_eq!(parsed.index.snippets_per_section, 8);
    }

    #[test]
    fn test_partial_poll_table_fills_defaults() {
        let parsed: ResearchConfig =
            serde_json::from_str(r#"{"crawl": {"poll": {"interval": 1.0}}}"#).unwrap();
        assert_eq!(parsed.crawl.poll.interval, Duration::from_secs(1));
        assert_eq!(parsed.crawl.poll.deadline, Duration::from_secs(30));
        assert!(parsed.crawl.poll.max_attempts.is_none());
    }
}
