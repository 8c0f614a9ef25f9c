//! `deep-research` - run one research question and write a cited report.

mod config;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use research_core::{
    ContentHash, FirecrawlClient, HttpExtractor, OpenAI, Progress, ResearchError, Researcher,
    SearxSearcher, ServiceEndpoint, SqliteStore,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Settings;

#[derive(Parser, Debug)]
#[command(name = "deep-research")]
#[command(about = "Research a question on the open web and write a cited markdown report")]
struct Cli {
    /// The research question
    question: String,

    /// TOML file with `[crawl]`, `[index]` and `[search]` settings
    #[arg(short, long, env = "RESEARCH_CONFIG")]
    config: Option<PathBuf>,

    /// Directory the report is written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Maximum URLs crawled at once
    #[arg(long)]
    concurrency: Option<usize>,

    /// Pages requested per crawl job
    #[arg(long)]
    limit_per_url: Option<usize>,

    /// Skip the embedding cache
    #[arg(long)]
    no_cache: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,research_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut settings =
        Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(concurrency) = cli.concurrency {
        settings.research.crawl.concurrency = concurrency;
    }
    if let Some(limit) = cli.limit_per_url {
        settings.research.crawl.limit_per_url = limit;
    }
    if cli.no_cache {
        settings.research.index.use_cache = false;
    }

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let printer = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            println!("{}", line.bright_blue());
        }
    });

    let researcher = build_researcher(&settings, Progress::new(tx)).await?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    println!("{} {}", "🔎 Researching:".bright_green().bold(), cli.question);
    let result = researcher.run_with_cancel(&cli.question, cancel).await;

    if let Err(e) = researcher.close().await {
        tracing::warn!(error = %e, "Failed to close embedding store");
    }
    // Dropping the researcher closes the progress channel
    drop(researcher);
    let _ = printer.await;

    let report = match result {
        Ok(report) => report,
        Err(ResearchError::Cancelled) => {
            println!("{}", "Cancelled.".yellow());
            return Ok(());
        }
        Err(e) => return Err(e).context("Research run failed"),
    };

    let path = write_report(&cli.output_dir, &cli.question, report.markdown())?;

    println!();
    println!(
        "{} {} sections, {} references",
        "✓".bright_green(),
        report.document.sections().len(),
        report.document.references().len()
    );
    if !report.dangling.is_empty() {
        println!(
            "{} {}",
            "⚠ Unresolved citations:".yellow().bold(),
            report.dangling
        );
    }
    println!("{} {}", "📄 Report written to".bright_green(), path.display());

    Ok(())
}

async fn build_researcher(settings: &Settings, progress: Progress) -> Result<Researcher> {
    let mut ai = OpenAI::new(&settings.openai_base_url)
        .with_model(&settings.chat_model)
        .with_embedding_model(&settings.embed_model);
    if let Some(key) = &settings.openai_api_key {
        ai = ai.with_api_key(key);
    }
    let ai = Arc::new(ai);

    let mut firecrawl = ServiceEndpoint::new(&settings.firecrawl_url);
    if let Some(key) = &settings.firecrawl_api_key {
        firecrawl = firecrawl.with_api_key(key);
    }
    let crawl_service =
        FirecrawlClient::new(firecrawl).context("Failed to create crawl service client")?;

    let searcher = SearxSearcher::new(ServiceEndpoint::new(&settings.searx_url));
    let fetcher =
        HttpExtractor::new().with_body_chars(settings.research.crawl.extract_body_chars);

    let store = SqliteStore::open(&settings.embed_cache_db)
        .await
        .with_context(|| {
            format!(
                "Failed to open embedding cache {}",
                settings.embed_cache_db.display()
            )
        })?;

    Researcher::builder()
        .with_planner(ai.clone())
        .with_section_writer(ai.clone())
        .with_embedder(ai)
        .with_searcher(Arc::new(searcher))
        .with_crawl_service(Arc::new(crawl_service))
        .with_fetcher(Arc::new(fetcher))
        .with_store(Arc::new(store))
        .with_config(settings.research.clone())
        .with_progress(progress)
        .build()
        .context("Invalid research configuration")
}

/// Write `report_<hash8>.md`, named after the question.
fn write_report(dir: &Path, question: &str, markdown: &str) -> Result<PathBuf> {
    let path = dir.join(report_file_name(question));
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    std::fs::write(&path, markdown)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

fn report_file_name(question: &str) -> String {
    let hash = ContentHash::of(question);
    format!("report_{}.md", &hash.as_str()[..8])
}
