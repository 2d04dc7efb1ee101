use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gleaner::app::AppContext;
use gleaner::cli::{commands, Cli, Commands};
use gleaner::config::CollectorConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = CollectorConfig::load()?;
    let ctx = AppContext::new(config)?;

    match cli.command {
        Commands::AddSource {
            name,
            url,
            kind,
            interval_secs,
        } => {
            commands::add_source(&ctx, &name, &url, &kind, interval_secs)?;
        }
        Commands::Sources => {
            commands::list_sources(&ctx)?;
        }
        Commands::Collect { source_ids } => {
            commands::collect(&ctx, source_ids).await?;
        }
        Commands::Jobs {
            status,
            skip,
            limit,
        } => {
            commands::list_jobs(&ctx, status.as_deref(), skip, limit)?;
        }
        Commands::Job { id } => {
            commands::show_job(&ctx, id)?;
        }
        Commands::Items {
            source_id,
            processed,
            skip,
            limit,
        } => {
            commands::list_items(&ctx, source_id, processed, skip, limit)?;
        }
        Commands::MarkProcessed { id } => {
            commands::mark_processed(&ctx, id)?;
        }
        Commands::Feeds => {
            commands::list_feeds(&ctx)?;
        }
        Commands::FetchFeed { source_id } => {
            commands::fetch_feed(&ctx, source_id).await?;
        }
        Commands::FetchAll => {
            commands::fetch_all(&ctx).await?;
        }
        Commands::Parse { url } => {
            commands::parse_url(&ctx, &url).await?;
        }
        Commands::Stats => {
            commands::stats(&ctx)?;
        }
    }

    Ok(())
}
