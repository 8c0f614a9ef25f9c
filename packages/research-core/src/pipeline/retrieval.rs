//! Per-section retrieval, generation, assembly, and citation check.
//!
//! Given the crawled pages and an outline, this builds one vector index,
//! retrieves snippets for each section title, asks the [`SectionWriter`] for
//! prose, assembles the document, and reports dangling citations.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::assemble::assemble_document;
use super::embed::EmbeddingCache;
use super::grounding::{verify_citations, DanglingCitations};
use super::index::VectorIndex;
use super::progress::Progress;
use crate::error::{ResearchError, Result};
use crate::text::{shorten, truncate_chars};
use crate::traits::ai::SectionWriter;
use crate::types::config::IndexConfig;
use crate::types::page::Page;
use crate::types::report::{ReportDocument, Section, Snippet};

/// A verified document.
#[derive(Debug, Clone, Serialize)]
pub struct VerifiedDocument {
    pub document: ReportDocument,
    pub dangling: DanglingCitations,
}

/// The retrieval-and-verification stage of a research run.
pub struct RetrievalPipeline {
    cache: Arc<EmbeddingCache>,
    writer: Arc<dyn SectionWriter>,
    config: IndexConfig,
    progress: Progress,
}

impl RetrievalPipeline {
    pub fn new(
        cache: Arc<EmbeddingCache>,
        writer: Arc<dyn SectionWriter>,
        config: IndexConfig,
    ) -> Self {
        Self {
            cache,
            writer,
            config,
            progress: Progress::silent(),
        }
    }

    /// Forward progress lines.
    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }

    /// Build the index over every page's text, truncated for embedding.
    pub async fn build_index(&self, pages: &[Page]) -> Result<VectorIndex> {
        let texts = pages
            .iter()
            .map(|p| truncate_chars(&p.text, self.config.index_text_chars).to_string())
            .collect();
        VectorIndex::build(&self.cache, texts, self.config.embed_concurrency).await
    }

    /// Nearest snippets for a section title, numbered `[1]..[k]`.
    pub async fn retrieve(&self, index: &VectorIndex, title: &str) -> Result<Vec<Snippet>> {
        let neighbors = index
            .query(&self.cache, title, self.config.snippets_per_section)
            .await?;

        Ok(neighbors
            .into_iter()
            .enumerate()
            .filter_map(|(i, neighbor)| {
                let text = index.text(neighbor.position)?;
                Some(Snippet {
                    number: i + 1,
                    position: neighbor.position,
                    score: neighbor.score,
                    text: shorten(text, self.config.snippet_chars),
                })
            })
            .collect())
    }

    /// Retrieve and write one section.
    pub async fn write_section(&self, index: &VectorIndex, title: &str) -> Result<Section> {
        let snippets = self.retrieve(index, title).await?;
        debug!(section = %title, snippets = snippets.len(), "Snippets retrieved");
        let body = self.writer.write_section(title, &snippets).await?;
        Ok(Section::new(title, body))
    }

    /// Run the whole stage.
    ///
    /// Fails with [`ResearchError::NoPages`] before touching the index when
    /// `pages` is empty. Generation errors abort; dangling citations don't.
    pub async fn run(
        &self,
        title: &str,
        section_titles: &[String],
        pages: &[Page],
    ) -> Result<VerifiedDocument> {
        if pages.is_empty() {
            return Err(ResearchError::NoPages);
        }

        let index = self.build_index(pages).await?;
        self.progress
            .emit(format!("· Indexed {} texts (dim {})", index.len(), index.dim()));

        let mut sections = Vec::with_capacity(section_titles.len());
        for (i, section_title) in section_titles.iter().enumerate() {
            self.progress.emit(format!(
                "· Writing section {}/{}: {}",
                i + 1,
                section_titles.len(),
                section_title
            ));
            sections.push(self.write_section(&index, section_title).await?);
        }

        let document = assemble_document(title, sections, pages);
        let dangling = verify_citations(&document);

        if dangling.is_empty() {
            info!(references = document.references().len(), "All citations resolve");
            self.progress.emit("✓ All citations resolve");
        } else {
            warn!(dangling = %dangling, references = document.references().len(), "Dangling citations");
            self.progress.emit(format!("⚠ Dangling citations: {}", dangling));
        }

        Ok(VerifiedDocument { document, dangling })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryStore;
    use crate::testing::{MockEmbedder, MockSectionWriter};
    use crate::types::page::PageSource;

    fn page(n: usize, text: &str) -> Page {
        Page::new(
            format!("https://site{}.example/", n),
            format!("Page {}", n),
            text,
            PageSource::Fallback,
        )
    }

    fn pipeline(writer: Arc<MockSectionWriter>, config: IndexConfig) -> RetrievalPipeline {
        let cache = Arc::new(EmbeddingCache::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MockEmbedder::new()),
        ));
        RetrievalPipeline::new(cache, writer, config)
    }

    #[tokio::test]
    async fn test_no_pages_fails_fast() {
        let writer = Arc::new(MockSectionWriter::new());
        let err = pipeline(writer.clone(), IndexConfig::default())
            .run("T", &["Intro".to_string()], &[])
            .await
            .unwrap_err();

        assert!(matches!(err, ResearchError::NoPages));
        assert!(writer.calls().is_empty());
    }

    #[tokio::test]
    async fn test_k_clamped_to_page_count() {
        let writer = Arc::new(MockSectionWriter::new());
        let pages = vec![page(1, "solar"), page(2, "wind"), page(3, "hydro")];
        let stage = pipeline(writer.clone(), IndexConfig::default());

        stage.run("T", &["Energy".to_string()], &pages).await.unwrap();

        let calls = writer.calls();
        assert_eq!(calls[0].snippets.len(), 3);
        let numbers: Vec<_> = calls[0].snippets.iter().map(|s| s.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_snippets_shortened() {
        let writer = Arc::new(MockSectionWriter::new());
        let long = "word ".repeat(400);
        let config = IndexConfig::default().with_snippet_chars(50);
        let stage = pipeline(writer.clone(), config);

        stage.run("T", &["Words".to_string()], &[page(1, &long)]).await.unwrap();

        let snippet = &writer.calls()[0].snippets[0];
        assert!(snippet.text.chars().count() <= 50);
        assert!(snippet.text.ends_with("..."));
    }

    #[tokio::test]
    async fn test_most_similar_page_first() {
        let writer = Arc::new(MockSectionWriter::new());
        let pages = vec![
            page(1, "offshore wind turbine maintenance"),
            page(2, "rooftop solar panel efficiency"),
        ];
        let config = IndexConfig::default().with_snippets_per_section(1);
        let stage = pipeline(writer.clone(), config);

        stage
            .run("T", &["rooftop solar panel efficiency".to_string()], &pages)
            .await
            .unwrap();

        assert_eq!(writer.calls()[0].snippets[0].position, 1);
    }

    #[tokio::test]
    async fn test_dangling_reported_not_fatal() {
        let writer = Arc::new(
            MockSectionWriter::new()
                .with_body("A", "Fine [1] and [2].")
                .with_body("B", "Broken [9]."),
        );
        let pages = vec![page(1, "one"), page(2, "two")];
        let stage = pipeline(writer, IndexConfig::default());

        let verified = stage
            .run("T", &["A".to_string(), "B".to_string()], &pages)
            .await
            .unwrap();

        assert_eq!(verified.dangling.numbers().collect::<Vec<_>>(), vec![9]);
        assert_eq!(verified.document.sections().len(), 2);
    }

    #[tokio::test]
    async fn test_generation_failure_aborts() {
        let writer = Arc::new(MockSectionWriter::new().failing_on("B"));
        let stage = pipeline(writer.clone(), IndexConfig::default());

        let err = stage
            .run(
                "T",
                &["A".to_string(), "B".to_string(), "C".to_string()],
                &[page(1, "one")],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ResearchError::Generation(_)));
        // No retry, no further sections
        assert_eq!(writer.calls().len(), 2);
    }
}
