//! Integration tests for a full research run.
//!
//! These tests drive the whole pipeline with mock collaborators:
//! 1. Plan keywords and sections
//! 2. Search and de-duplicate URLs
//! 3. Crawl with service failures and direct-fetch fallback
//! 4. Index, write sections, assemble, verify citations

use std::sync::Arc;

use research_core::{
    testing::{
        MockCrawlService, MockEmbedder, MockFetcher, MockPlanner, MockSectionWriter,
        MockWebSearcher,
    },
    MemoryStore, Page, PageSource, ResearchError, ResearchPlan, Researcher,
};

const URLS: [&str; 5] = [
    "https://grid.example/storage",
    "https://battery.example/",
    "https://pumped.example/hydro",
    "https://dead.example/",
    "https://flywheel.example/",
];

fn plan() -> ResearchPlan {
    ResearchPlan::new(
        "Grid-Scale Energy Storage",
        vec![
            "Overview".to_string(),
            "Battery Chemistry".to_string(),
            "Outlook".to_string(),
        ],
        vec!["grid storage".to_string(), "battery storage".to_string()],
    )
}

/// Two keywords whose results overlap, five unique URLs in total.
fn searcher() -> MockWebSearcher {
    MockWebSearcher::new()
        .with_urls("grid storage", &[URLS[0], URLS[1], URLS[2]])
        .with_urls("battery storage", &[URLS[1], URLS[3], URLS[4]])
}

/// Every URL but the dead one can be fetched directly.
fn fetcher() -> MockFetcher {
    MockFetcher::new()
        .with_page(URLS[0], "Grid Storage", "Utilities deploy storage to balance the grid.")
        .with_page(URLS[1], "Batteries", "Lithium iron phosphate cells dominate new projects.")
        .with_page(URLS[2], "Pumped Hydro", "Pumped hydro is the largest installed storage.")
        .with_failure(URLS[3])
        .with_page(URLS[4], "Flywheels", "Flywheels provide short bursts of frequency response.")
}

fn writer() -> MockSectionWriter {
    MockSectionWriter::new()
        .with_body("Overview", "Storage balances supply [1] and demand [3].")
        .with_body("Battery Chemistry", "LFP leads [2]; sodium-ion follows [5].")
        .with_body("Outlook", "Growth continues [4].")
}

#[tokio::test]
async fn test_fallback_run_reports_dangling_citation() {
    let service = Arc::new(MockCrawlService::unreachable());
    let fetcher = Arc::new(fetcher());

    let researcher = Researcher::builder()
        .with_planner(Arc::new(MockPlanner::new(plan())))
        .with_searcher(Arc::new(searcher()))
        .with_crawl_service(service.clone())
        .with_fetcher(fetcher.clone())
        .with_embedder(Arc::new(MockEmbedder::new()))
        .with_section_writer(Arc::new(writer()))
        .build()
        .unwrap();

    let report = researcher.run("How will grids store energy?").await.unwrap();

    // Five unique URLs, every one tried on the service first
    let expected_urls: Vec<String> = URLS.iter().map(|u| u.to_string()).collect();
    assert_eq!(report.urls, expected_urls);
    assert_eq!(service.submitted().len(), 5);
    assert_eq!(fetcher.calls().len(), 5);

    // Four pages survive, numbered in URL order
    assert_eq!(report.stats.urls, 5);
    assert_eq!(report.stats.via_fallback, 4);
    assert_eq!(report.stats.failed, 1);
    assert_eq!(report.pages.len(), 4);
    assert!(report.pages.iter().all(|p| p.source == PageSource::Fallback));

    let references = report.document.references();
    assert_eq!(references.len(), 4);
    let urls: Vec<&str> = references.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(urls, vec![URLS[0], URLS[1], URLS[2], URLS[4]]);
    assert_eq!(references[3].number, 4);
    assert_eq!(references[3].title, "Flywheels");

    // Three sections in outline order, [5] has no source
    let titles: Vec<&str> = report
        .document
        .sections()
        .iter()
        .map(|s| s.title.as_str())
        .collect();
    assert_eq!(titles, vec!["Overview", "Battery Chemistry", "Outlook"]);
    assert_eq!(report.dangling.numbers().collect::<Vec<_>>(), vec![5]);

    let markdown = report.markdown();
    assert!(markdown.starts_with("# Grid-Scale Energy Storage\n\n## Overview\n\n"));
    assert!(markdown.contains("## References\n\n[1] Grid Storage — https://grid.example/storage\n"));
    assert!(markdown.contains("[4] Flywheels — https://flywheel.example/\n"));
}

#[tokio::test(start_paused = true)]
async fn test_service_pages_keep_url_order() {
    let service = Arc::new(
        MockCrawlService::new()
            .with_pages(
                URLS[0],
                vec![
                    Page::new(URLS[0], "Storage Hub", "Storage overview.", PageSource::Service),
                    Page::new(
                        "https://grid.example/storage/costs",
                        "Storage Costs",
                        "Costs fell sharply.",
                        PageSource::Service,
                    ),
                ],
            )
            .with_failed_job(URLS[1])
            .with_pending_polls(1),
    );

    let researcher = Researcher::builder()
        .with_planner(Arc::new(MockPlanner::new(plan())))
        .with_searcher(Arc::new(searcher()))
        .with_crawl_service(service)
        .with_fetcher(Arc::new(fetcher()))
        .with_embedder(Arc::new(MockEmbedder::new()))
        .with_section_writer(Arc::new(MockSectionWriter::new()))
        .build()
        .unwrap();

    let report = researcher.run("How will grids store energy?").await.unwrap();

    assert_eq!(report.stats.via_service, 1);
    assert_eq!(report.stats.via_fallback, 3);
    let urls: Vec<&str> = report
        .document
        .references()
        .iter()
        .map(|r| r.url.as_str())
        .collect();
    assert_eq!(
        urls,
        vec![
            URLS[0],
            "https://grid.example/storage/costs",
            URLS[1],
            URLS[2],
            URLS[4]
        ]
    );
    assert!(report.dangling.is_empty());
}

#[tokio::test]
async fn test_second_run_hits_warm_cache() {
    let embedder = Arc::new(MockEmbedder::new());
    let store = Arc::new(MemoryStore::new());

    let researcher = Researcher::builder()
        .with_planner(Arc::new(MockPlanner::new(plan())))
        .with_searcher(Arc::new(searcher()))
        .with_crawl_service(Arc::new(MockCrawlService::unreachable()))
        .with_fetcher(Arc::new(fetcher()))
        .with_embedder(embedder.clone())
        .with_store(store.clone())
        .with_section_writer(Arc::new(writer()))
        .build()
        .unwrap();

    let first = researcher.run("How will grids store energy?").await.unwrap();
    let calls_after_first = embedder.call_count();
    // Four page texts plus three section titles
    assert_eq!(calls_after_first, 7);
    assert_eq!(first.cache.misses, 7);

    let second = researcher.run("How will grids store energy?").await.unwrap();
    assert_eq!(embedder.call_count(), calls_after_first);
    assert_eq!(second.cache.hits, 7);
    assert_eq!(second.markdown(), first.markdown());
    assert_ne!(second.run_id, first.run_id);
}

#[tokio::test]
async fn test_every_url_failing_is_no_pages() {
    let researcher = Researcher::builder()
        .with_planner(Arc::new(MockPlanner::new(plan())))
        .with_searcher(Arc::new(MockWebSearcher::new().with_urls("grid storage", &[URLS[3]])))
        .with_crawl_service(Arc::new(MockCrawlService::unreachable()))
        .with_fetcher(Arc::new(fetcher()))
        .with_embedder(Arc::new(MockEmbedder::new()))
        .with_section_writer(Arc::new(writer()))
        .build()
        .unwrap();

    let err = researcher.run("How will grids store energy?").await.unwrap_err();
    assert!(matches!(err, ResearchError::NoPages));
}

#[tokio::test]
async fn test_generation_failure_aborts_run() {
    let writer = Arc::new(writer().failing_on("Battery Chemistry"));
    let researcher = Researcher::builder()
        .with_planner(Arc::new(MockPlanner::new(plan())))
        .with_searcher(Arc::new(searcher()))
        .with_crawl_service(Arc::new(MockCrawlService::unreachable()))
        .with_fetcher(Arc::new(fetcher()))
        .with_embedder(Arc::new(MockEmbedder::new()))
        .with_section_writer(writer.clone())
        .build()
        .unwrap();

    let err = researcher.run("How will grids store energy?").await.unwrap_err();
    assert!(matches!(err, ResearchError::Generation(_)));
    assert_eq!(writer.calls().len(), 2);
}
