//! Settings for the research CLI.
//!
//! Sources, lowest precedence first:
//! - Built-in defaults
//! - An optional TOML file holding a `ResearchConfig` (`[crawl]`, `[index]`, `[search]`)
//! - Environment variables (a `.env` file is loaded first when present)
//! - Command-line flags, applied by `main`

use anyhow::{Context, Result};
use research_core::ResearchConfig;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Service locations, models and pipeline tunables for one process.
#[derive(Debug, Clone)]
pub struct Settings {
    pub firecrawl_url: String,
    pub firecrawl_api_key: Option<String>,
    pub searx_url: String,
    pub openai_base_url: String,
    pub openai_api_key: Option<String>,
    pub chat_model: String,
    pub embed_model: String,
    pub embed_cache_db: PathBuf,
    pub research: ResearchConfig,
}

impl Settings {
    /// Load settings from `.env`, the optional config file, and the environment.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenvy::dotenv();
        Self::from_lookup(config_file, |name| env::var(name).ok())
    }

    fn from_lookup(
        config_file: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut research = match config_file {
            Some(path) => read_config_file(path)?,
            None => ResearchConfig::default(),
        };

        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let or_default = |name: &str, default: &str| var(name).unwrap_or_else(|| default.to_string());

        if let Some(n) = parse_var(&var, "CRAWL_CONCURRENCY")? {
            research.crawl.concurrency = n;
        }
        if let Some(n) = parse_var(&var, "LIMIT_PER_URL")? {
            research.crawl.limit_per_url = n;
        }
        if let Some(n) = parse_var(&var, "URLS_PER_KEYWORD")? {
            research.search.urls_per_keyword = n;
        }
        if let Some(n) = parse_var(&var, "SNIPPETS_PER_SECTION")? {
            research.index.snippets_per_section = n;
        }

        Ok(Self {
            firecrawl_url: or_default("FIRECRAWL_URL", "http://localhost:3002"),
            firecrawl_api_key: var("FIRECRAWL_API_KEY"),
            searx_url: normalize_searx_url(&or_default("SEARX_URL", "http://localhost:8080")),
            openai_base_url: or_default("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            openai_api_key: var("OPENAI_API_KEY"),
            chat_model: or_default("CHAT_MODEL", "gpt-4o-mini"),
            embed_model: or_default("EMBED_MODEL", "text-embedding-3-small"),
            embed_cache_db: PathBuf::from(or_default("EMBED_CACHE_DB", "embeddings.db")),
            research,
        })
    }
}

fn read_config_file(path: &Path) -> Result<ResearchConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}

fn parse_var<T>(var: impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    var(name)
        .map(|value| {
            value
                .trim()
                .parse()
                .with_context(|| format!("{} must be a valid number, got {:?}", name, value))
        })
        .transpose()
}

/// SearxNG URLs are often given with the `/search` path; the searcher adds it.
fn normalize_searx_url(url: &str) -> String {
    let url = url.trim_end_matches('/');
    url.strip_suffix("/search").unwrap_or(url).to_string()
}
