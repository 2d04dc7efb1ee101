pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "gleaner",
    about = "Source-collection orchestrator for sentiment analysis pipelines",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register a new source
    AddSource {
        #[arg(long)]
        name: String,
        #[arg(long)]
        url: String,
        /// Source kind selecting a collection strategy: "rss" or "html"
        #[arg(long)]
        kind: String,
        /// Desired collection interval in seconds
        #[arg(long, default_value_t = 3600)]
        interval_secs: i64,
    },
    /// List registered sources
    Sources,
    /// Start collection jobs and wait for them (no ids = all active sources)
    Collect {
        source_ids: Vec<i64>,
    },
    /// List collection jobs
    Jobs {
        /// Filter by status: queued, running, completed, failed
        #[arg(long)]
        status: Option<String>,
        #[arg(long, default_value_t = 0)]
        skip: usize,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Show one job
    Job {
        id: i64,
    },
    /// List collected items
    Items {
        #[arg(long)]
        source_id: Option<i64>,
        /// Filter by processed flag (true/false)
        #[arg(long)]
        processed: Option<bool>,
        #[arg(long, default_value_t = 0)]
        skip: usize,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Mark an item as consumed by downstream analysis
    MarkProcessed {
        id: i64,
    },
    /// List registered feed sources
    Feeds,
    /// Fetch one registered feed now
    FetchFeed {
        source_id: i64,
    },
    /// Fetch all active feeds now and print aggregate results
    FetchAll,
    /// Parse a feed URL without registering it
    Parse {
        url: String,
    },
    /// Collection statistics
    Stats,
}
