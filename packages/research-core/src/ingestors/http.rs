//! Direct HTTP extractor, the crawl fallback.
//!
//! Fetches one URL with a browser-like user agent, isolates the main article
//! body, strips markup to plain text, and wraps the result as markdown with
//! an `# <title>` header.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Node, Selector};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::error::{CrawlError, CrawlResult};
use crate::text::truncate_chars;
use crate::traits::fetcher::PageFetcher;
use crate::types::page::{Page, PageSource};

/// Browser-like User-Agent; some sites refuse obvious bots.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0 Safari/537.36";

/// Containers tried in order for the main article body.
const MAIN_SELECTORS: &[&str] = &[
    "main",
    "article",
    "[role='main']",
    "#content",
    "#main",
    ".content",
    ".main",
    ".post-content",
    ".entry-content",
];

/// Subtrees dropped from the body when no main container exists.
const SKIP_TAGS: &[&str] = &[
    "nav", "header", "footer", "aside", "script", "style", "noscript", "form", "iframe",
    "template", "svg",
];

/// Tags that end a line of text.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "br", "li", "tr", "h1", "h2", "h3", "h4", "h5", "h6", "section", "blockquote",
    "pre", "table", "ul", "ol", "dd", "dt",
];

/// Site-name separators a `<title>` is cut at.
const TITLE_SEPARATORS: &[&str] = &[" | ", "|", " - ", " — ", "::"];

/// Readability-style extractor over reqwest + scraper.
///
/// # Example
///
/// ```rust,ignore
/// use research_core::ingestors::HttpExtractor;
///
/// let extractor = HttpExtractor::new().with_body_chars(4000);
/// let page = extractor.fetch("https://example.com", Duration::from_secs(15)).await?;
/// ```
#[derive(Debug, Clone)]
pub struct HttpExtractor {
    client: reqwest::Client,
    user_agent: String,
    body_chars: usize,
}

impl Default for HttpExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpExtractor {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            body_chars: 4000,
        }
    }

    /// Set a custom HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Set a custom user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the body length kept after extraction.
    pub fn with_body_chars(mut self, chars: usize) -> Self {
        self.body_chars = chars;
        self
    }

    async fn fetch_html(&self, url: &str, timeout: Duration) -> CrawlResult<String> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| CrawlError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CrawlError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| CrawlError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl PageFetcher for HttpExtractor {
    async fn fetch(&self, url: &str, timeout: Duration) -> CrawlResult<Page> {
        Url::parse(url).map_err(|_| CrawlError::InvalidUrl {
            url: url.to_string(),
        })?;

        debug!(url = %url, ?timeout, "Direct fetch starting");
        let html = self.fetch_html(url, timeout).await.inspect_err(|e| {
            warn!(url = %url, error = %e, "Direct fetch failed");
        })?;

        let page = extract_page(url, &html, self.body_chars);
        debug!(url = %url, chars = page.text_length(), "Direct fetch extracted");
        Ok(page)
    }
}

/// Reduce raw HTML to a [`Page`] with `# <title>\n\n<body>` text.
///
/// Never fails: malformed markup yields whatever text survives parsing, and a
/// missing title falls back to the first `<h1>`, then to the URL.
pub fn extract_page(url: &str, html: &str, body_chars: usize) -> Page {
    let document = Html::parse_document(html);
    let title = extract_title(&document).unwrap_or_else(|| url.to_string());
    let body = extract_body_text(&document);
    let body = truncate_chars(&body, body_chars);
    let text = format!("# {}\n\n{}", title, body);
    Page::new(url, title, text, PageSource::Fallback)
}

fn extract_title(document: &Html) -> Option<String> {
    let from_title = Selector::parse("title").ok().and_then(|selector| {
        document
            .select(&selector)
            .next()
            .map(|el| short_title(&el.text().collect::<String>()))
            .filter(|t| !t.is_empty())
    });
    if from_title.is_some() {
        return from_title;
    }

    let selector = Selector::parse("h1").ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| collapse(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty())
}

/// Cut a `<title>` at the first site-name separator.
fn short_title(raw: &str) -> String {
    let title = collapse(raw);
    for separator in TITLE_SEPARATORS {
        if let Some((head, _)) = title.split_once(separator) {
            let head = head.trim();
            if !head.is_empty() {
                return head.to_string();
            }
        }
    }
    title
}

fn extract_body_text(document: &Html) -> String {
    let root = MAIN_SELECTORS
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .find_map(|selector| document.select(&selector).next())
        .or_else(|| {
            Selector::parse("body")
                .ok()
                .and_then(|selector| document.select(&selector).next())
        })
        .unwrap_or_else(|| document.root_element());

    let mut raw = String::new();
    collect_text(root, &mut raw);

    raw.lines()
        .map(collapse)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if SKIP_TAGS.contains(&name) {
                    continue;
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, out);
                }
                if BLOCK_TAGS.contains(&name) {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

fn collapse(text: &str) -> String {
    crate::text::collapse_whitespace(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE: &str = r#"
        <html>
          <head><title>Battery Chemistry | Example News</title></head>
          <body>
            <nav><a href="/">Home</a> <a href="/about">About</a></nav>
            <article>
              <h1>Battery Chemistry</h1>
              <p>Lithium iron phosphate cells   trade density for safety.</p>
              <p>Sodium-ion is cheaper.</p>
              <script>track();</script>
            </article>
            <footer>Copyright</footer>
          </body>
        </html>
    "#;

    #[test]
    fn test_extracts_main_article() {
        let page = extract_page("https://example.com/a", ARTICLE, 4000);
        assert_eq!(page.title, "Battery Chemistry");
        assert_eq!(page.source, PageSource::Fallback);
        assert!(page.text.starts_with("# Battery Chemistry\n\n"));
        assert!(page
            .text
            .contains("Lithium iron phosphate cells trade density for safety."));
        assert!(!page.text.contains("Home"));
        assert!(!page.text.contains("Copyright"));
        assert!(!page.text.contains("track()"));
    }

    #[test]
    fn test_body_without_main_drops_boilerplate() {
        let html = r#"<html><body>
            <header>Site header</header>
            <div><p>First paragraph.</p><p>Second paragraph.</p></div>
            <aside>Related links</aside>
        </body></html>"#;
        let page = extract_page("https://example.com/b", html, 4000);
        assert!(page.text.contains("First paragraph.\nSecond paragraph."));
        assert!(!page.text.contains("Site header"));
        assert!(!page.text.contains("Related links"));
    }

    #[test]
    fn test_title_falls_back_to_h1_then_url() {
        let with_h1 = extract_page("https://example.com/c", "<body><h1>Heading</h1></body>", 100);
        assert_eq!(with_h1.title, "Heading");

        let bare = extract_page("https://example.com/d", "<p>just text", 100);
        assert_eq!(bare.title, "https://example.com/d");
        assert!(bare.text.starts_with("# https://example.com/d\n\n"));
    }

    #[test]
    fn test_body_truncated() {
        let html = format!("<body><p>{}</p></body>", "x".repeat(10_000));
        let page = extract_page("https://example.com/e", &html, 4000);
        let body = page.text.split_once("\n\n").unwrap().1;
        assert_eq!(body.chars().count(), 4000);
    }

    #[test]
    fn test_short_title_separators() {
        assert_eq!(short_title("Article - Site"), "Article");
        assert_eq!(short_title("Docs :: Rust"), "Docs");
        assert_eq!(short_title("Plain title"), "Plain title");
        assert_eq!(short_title("| Only site"), "| Only site");
    }

    #[test]
    fn test_malformed_html_does_not_panic() {
        let page = extract_page("https://example.com/f", "<div><p>open <b>tags", 100);
        assert!(page.text.contains("open tags"));
    }

    #[tokio::test]
    async fn test_invalid_url_rejected() {
        let extractor = HttpExtractor::new();
        let err = extractor
            .fetch("not a url", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, CrawlError::InvalidUrl { .. }));
    }
}
