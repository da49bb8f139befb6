//! `webindex` CLI: ingest captured web-archive files and search the local
//! index they build.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use webindex::config::WebIndexConfig;
use webindex::{CancelToken, OnnxEmbeddingEngine, Orchestrator, SearchMode};

#[derive(Parser)]
#[command(name = "webindex", version, about = "Local semantic search over captured web pages")]
struct Cli {
    /// Path to the pipeline's YAML configuration file.
    #[arg(long, short = 'c', default_value = "webindex.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode a captured web-archive file and add it to the index.
    Ingest {
        /// Path to the raw MIME multipart archive file.
        archive: PathBuf,
        /// Source URL the archive was captured from.
        #[arg(long)]
        url: String,
        /// Override the extracted page title.
        #[arg(long)]
        title: Option<String>,
        /// Unix-millisecond capture timestamp. Defaults to now.
        #[arg(long)]
        captured_at: Option<u64>,
    },
    /// Query the index.
    Search {
        query: String,
        /// Overrides the configured orchestrator.default_search_limit.
        #[arg(long, short = 'n')]
        limit: Option<usize>,
        /// Overrides the configured orchestrator.search_mode.
        #[arg(long, value_enum)]
        mode: Option<SearchModeArg>,
    },
    /// Remove a page (and every trace of it) from the index.
    Delete { page_id: String },
    /// Print aggregate index counters.
    Stats,
    /// Rebuild the BM25 inverted index from persisted passages.
    Rebuild,
    /// Print page metadata and settings, for backup.
    Export,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum SearchModeArg {
    Dense,
    Bm25,
    Hybrid,
}

impl From<SearchModeArg> for SearchMode {
    fn from(value: SearchModeArg) -> Self {
        match value {
            SearchModeArg::Dense => SearchMode::Dense,
            SearchModeArg::Bm25 => SearchMode::Bm25,
            SearchModeArg::Hybrid => SearchMode::Hybrid,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = WebIndexConfig::from_file(&cli.config)?;
    let default_limit = config.orchestrator.default_search_limit;
    let default_mode = config.orchestrator.search_mode;
    let engine: Orchestrator<OnnxEmbeddingEngine> = webindex::open(config)?;

    match cli.command {
        Command::Ingest { archive, url, title, captured_at } => {
            let bytes = std::fs::read(&archive)?;
            let captured_at = captured_at.unwrap_or_else(now_millis);
            let record = engine
                .ingest(&bytes, &url, title.as_deref(), captured_at, &CancelToken::new())
                .await?;
            println!(
                "ingested {} ({} passages, {} dims) captured at {}",
                record.url, record.chunk_count, record.dimensions, record.timestamp
            );
        }
        Command::Search { query, limit, mode } => {
            let limit = limit.unwrap_or(default_limit);
            let mode = mode.map(SearchMode::from).unwrap_or(default_mode);
            let hits = engine.search(&query, limit, mode).await?;
            for (rank, hit) in hits.iter().enumerate() {
                println!(
                    "{:>2}. [{:.4}] {}  ({})\n    {}",
                    rank + 1,
                    hit.score,
                    hit.page_title,
                    hit.page_url,
                    truncate(&hit.chunk_text, 160)
                );
            }
        }
        Command::Delete { page_id } => {
            engine.delete_page(&page_id).await?;
            println!("deleted {page_id}");
        }
        Command::Stats => {
            let stats = engine.stats().await?;
            println!("pages:    {}", stats.page_count);
            println!("passages: {}", stats.passage_count);
            println!("on disk:  {} bytes", stats.bytes_on_disk);
            println!("model:    {}", if stats.model_ready { "ready" } else { "unavailable" });
        }
        Command::Rebuild => {
            engine.rebuild_lexical_index().await?;
            println!("lexical index rebuilt");
        }
        Command::Export => {
            let snapshot = engine.export().await;
            for page in &snapshot.pages {
                println!("{}\t{}\t{} passages", page.url, page.title, page.chunk_count);
            }
        }
    }

    Ok(())
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the unix epoch")
        .as_millis() as u64
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut s: String = text.chars().take(max_chars).collect();
        s.push('…');
        s
    }
}
