use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::app::{AppContext, GleanerError, Result};
use crate::domain::{Job, JobStatus, Source};
use crate::store::{ItemFilter, SourceStore};

pub fn add_source(
    ctx: &AppContext,
    name: &str,
    url: &str,
    kind: &str,
    interval_secs: i64,
) -> Result<()> {
    let mut source = Source::new(name, url, kind);
    source.interval_secs = interval_secs;

    let id = ctx.store.add_source(&source)?;
    println!("Added source {}: {} ({})", id, name, url);
    Ok(())
}

pub fn list_sources(ctx: &AppContext) -> Result<()> {
    let sources = ctx.store.get_all_sources()?;

    if sources.is_empty() {
        println!("No sources");
        return Ok(());
    }

    for source in sources {
        println!(
            "{} [{}] {} ({}){}\n  {}",
            source.id,
            source.kind,
            source.name,
            if source.active { "active" } else { "inactive" },
            source
                .last_collected
                .map(|dt| format!(" last collected {}", format_time(dt)))
                .unwrap_or_default(),
            source.url
        );
    }

    Ok(())
}

pub async fn collect(ctx: &AppContext, source_ids: Vec<i64>) -> Result<()> {
    let jobs = ctx.orchestrator.clone().start_collection(source_ids).await?;

    if jobs.is_empty() {
        println!("No active sources to collect");
        return Ok(());
    }

    println!("Started {} collection jobs", jobs.len());

    // The jobs run in the background of this process; poll until every one
    // reaches a terminal state so their outcomes can be printed.
    let ids: Vec<i64> = jobs.iter().map(|j| j.id).collect();
    loop {
        let mut all_done = true;
        for id in &ids {
            let job = ctx
                .orchestrator
                .get_job(*id)?
                .ok_or(GleanerError::JobNotFound(*id))?;
            if !job.status.is_terminal() {
                all_done = false;
                break;
            }
        }
        if all_done {
            break;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    for id in ids {
        if let Some(job) = ctx.orchestrator.get_job(id)? {
            print_job(&job);
        }
    }

    Ok(())
}

pub fn list_jobs(
    ctx: &AppContext,
    status: Option<&str>,
    skip: usize,
    limit: usize,
) -> Result<()> {
    let status = match status {
        Some(s) => Some(
            JobStatus::parse(s)
                .ok_or_else(|| GleanerError::Other(format!("Unknown job status: {}", s)))?,
        ),
        None => None,
    };

    let jobs = ctx.orchestrator.get_jobs(status, skip, limit)?;

    if jobs.is_empty() {
        println!("No jobs");
        return Ok(());
    }

    for job in jobs {
        print_job(&job);
    }

    Ok(())
}

pub fn show_job(ctx: &AppContext, id: i64) -> Result<()> {
    let job = ctx
        .orchestrator
        .get_job(id)?
        .ok_or(GleanerError::JobNotFound(id))?;
    print_job(&job);
    Ok(())
}

pub fn list_items(
    ctx: &AppContext,
    source_id: Option<i64>,
    processed: Option<bool>,
    skip: usize,
    limit: usize,
) -> Result<()> {
    let filter = ItemFilter {
        source_id,
        processed,
    };
    let items = ctx.orchestrator.get_items(filter, skip, limit)?;

    if items.is_empty() {
        println!("No items");
        return Ok(());
    }

    for item in items {
        println!(
            "{} [source {}]{} {} ({} chars, {})",
            item.id,
            item.source_id,
            if item.processed { " [processed]" } else { "" },
            item.title.as_deref().unwrap_or("(untitled)"),
            item.content.chars().count(),
            format_time(item.collected_at)
        );
    }

    Ok(())
}

pub fn mark_processed(ctx: &AppContext, id: i64) -> Result<()> {
    if ctx.orchestrator.mark_processed(id)? {
        println!("Item {} marked processed", id);
    } else {
        println!("Item {} not found", id);
    }
    Ok(())
}

pub fn list_feeds(ctx: &AppContext) -> Result<()> {
    let feeds = ctx.feeds.list_feeds()?;

    if feeds.is_empty() {
        println!("No feed sources");
        return Ok(());
    }

    for feed in feeds {
        println!(
            "{} {} ({}){}\n  {}",
            feed.id,
            feed.name,
            if feed.active { "active" } else { "inactive" },
            feed.last_collected
                .map(|dt| format!(" last collected {}", format_time(dt)))
                .unwrap_or_default(),
            feed.url
        );
    }

    Ok(())
}

pub async fn fetch_feed(ctx: &AppContext, source_id: i64) -> Result<()> {
    // An unfetchable feed is reported, not a command failure. Collection
    // jobs are where fetch errors become FAILED outcomes.
    let result = match ctx.feeds.fetch_feed(source_id).await {
        Ok(result) => result,
        Err(e @ GleanerError::SourceNotFound(_)) => return Err(e),
        Err(e) => {
            println!("Could not fetch feed {}: {}", source_id, e);
            return Ok(());
        }
    };

    println!(
        "{}: {} entries",
        result.feed_title.as_deref().unwrap_or("(untitled feed)"),
        result.items_collected
    );
    for entry in result.entries {
        println!(
            "  {} {}",
            entry
                .published_at
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "          ".to_string()),
            entry.title.as_deref().unwrap_or("(untitled)")
        );
    }

    Ok(())
}

pub async fn fetch_all(ctx: &AppContext) -> Result<()> {
    let result = ctx.feeds.clone().fetch_all().await?;

    println!(
        "Fetched {} feeds: {} with items, {} without",
        result.total_feeds, result.success_count, result.error_count
    );
    for feed in result.results {
        println!(
            "  source {}: {} entries{}",
            feed.source_id,
            feed.items_collected,
            feed.feed_title
                .map(|t| format!(" ({})", t))
                .unwrap_or_default()
        );
    }

    Ok(())
}

pub async fn parse_url(ctx: &AppContext, url: &str) -> Result<()> {
    let parsed = ctx.feeds.parse_url(url).await;

    if !parsed.ok {
        println!("Could not parse feed: {}", url);
        return Ok(());
    }

    if let Some(info) = parsed.feed {
        println!("Title: {}", info.title.as_deref().unwrap_or("(none)"));
        if let Some(description) = info.description {
            println!("Description: {}", description);
        }
        if let Some(language) = info.language {
            println!("Language: {}", language);
        }
    }
    println!("Entries: {}", parsed.total_entries);
    for entry in parsed.entries {
        println!("  - {}", entry.title.as_deref().unwrap_or("(untitled)"));
    }

    Ok(())
}

pub fn stats(ctx: &AppContext) -> Result<()> {
    let stats = ctx.orchestrator.stats()?;

    println!("Sources with data:     {}", stats.total_sources);
    println!("Active sources:        {}", stats.active_sources);
    println!("Total items collected: {}", stats.total_items_collected);
    println!("Items collected today: {}", stats.items_collected_today);
    println!(
        "Last collection:       {}",
        stats
            .last_collection
            .map(format_time)
            .unwrap_or_else(|| "never".to_string())
    );

    Ok(())
}

fn print_job(job: &Job) {
    let outcome = match job.status {
        JobStatus::Completed => format!("{} items", job.items_collected),
        JobStatus::Failed => job
            .error_message
            .clone()
            .unwrap_or_else(|| "unknown error".to_string()),
        _ => String::new(),
    };

    println!(
        "job {} [source {}] {}{}",
        job.id,
        job.source_id,
        job.status,
        if outcome.is_empty() {
            String::new()
        } else {
            format!(": {}", outcome)
        }
    );
}

fn format_time(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}
