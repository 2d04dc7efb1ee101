//! Feed listing and parsing helper.
//!
//! Used by the RSS collection strategy and exposed independently for ad-hoc
//! "parse this URL" requests and the "fetch all feeds now" surface.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use feed_rs::parser;
use html_escape::decode_html_entities;
use reqwest::Client;
use serde::Serialize;

use crate::app::{GleanerError, Result};
use crate::domain::Source;
use crate::limiter::DomainLimiter;
use crate::store::SourceStore;

/// Entries included in an ad-hoc parse preview.
pub const PREVIEW_ENTRIES: usize = 5;

/// Whether a source kind is handled by the feed pipeline.
pub fn is_feed_kind(kind: &str) -> bool {
    kind.eq_ignore_ascii_case("rss") || kind.eq_ignore_ascii_case("feed")
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedInfo {
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub author: Option<String>,
}

/// Result of an ad-hoc parse; `ok` is false when the URL could not be
/// fetched or parsed.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedFeed {
    pub ok: bool,
    pub feed: Option<FeedInfo>,
    pub total_entries: usize,
    pub entries: Vec<FeedEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedFetchResult {
    pub source_id: i64,
    pub feed_title: Option<String>,
    pub items_collected: u64,
    pub entries: Vec<FeedEntry>,
    pub fetched_at: DateTime<Utc>,
}

impl FeedFetchResult {
    fn empty(source_id: i64, feed_title: Option<String>) -> Self {
        Self {
            source_id,
            feed_title,
            items_collected: 0,
            entries: Vec::new(),
            fetched_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchAllResult {
    pub total_feeds: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub results: Vec<FeedFetchResult>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedSummary {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub active: bool,
    pub last_collected: Option<DateTime<Utc>>,
}

pub struct FeedService {
    sources: Arc<dyn SourceStore>,
    limiter: Arc<DomainLimiter>,
    client: Client,
}

impl FeedService {
    pub fn new(sources: Arc<dyn SourceStore>, limiter: Arc<DomainLimiter>, client: Client) -> Self {
        Self {
            sources,
            limiter,
            client,
        }
    }

    /// All registered feed sources, active or not.
    pub fn list_feeds(&self) -> Result<Vec<FeedSummary>> {
        let feeds = self
            .sources
            .get_all_sources()?
            .into_iter()
            .filter(|s| is_feed_kind(&s.kind))
            .map(|s| FeedSummary {
                id: s.id,
                name: s.name,
                url: s.url,
                active: s.active,
                last_collected: s.last_collected,
            })
            .collect();

        Ok(feeds)
    }

    /// Parse a feed URL without registering it. Never errors; failures are
    /// reported as `ok = false` with zero entries.
    pub async fn parse_url(&self, url: &str) -> ParsedFeed {
        match self.download_and_parse(url).await {
            Ok(feed) => {
                let info = feed_info(&feed);
                let entries: Vec<FeedEntry> = feed.entries.into_iter().map(to_entry).collect();
                ParsedFeed {
                    ok: true,
                    feed: Some(info),
                    total_entries: entries.len(),
                    entries: entries.into_iter().take(PREVIEW_ENTRIES).collect(),
                }
            }
            Err(e) => {
                tracing::error!("Failed to parse feed {}: {}", url, e);
                ParsedFeed {
                    ok: false,
                    feed: None,
                    total_entries: 0,
                    entries: Vec::new(),
                }
            }
        }
    }

    /// Fetch and parse one registered feed, advancing its `last_collected`.
    pub async fn fetch_feed(&self, source_id: i64) -> Result<FeedFetchResult> {
        let source = self
            .sources
            .get_source(source_id)?
            .ok_or(GleanerError::SourceNotFound(source_id))?;

        let feed = self.download_and_parse(&source.url).await?;

        let feed_title = feed
            .title
            .as_ref()
            .map(|t| decode_html_entities(&t.content).to_string());
        let entries: Vec<FeedEntry> = feed.entries.into_iter().map(to_entry).collect();

        self.sources.set_last_collected(source.id, Utc::now())?;

        Ok(FeedFetchResult {
            source_id,
            feed_title,
            items_collected: entries.len() as u64,
            entries,
            fetched_at: Utc::now(),
        })
    }

    /// Fetch every active feed source concurrently under the domain limiter
    /// and aggregate the outcome. Per-feed errors become zero-item results;
    /// the call itself only fails on a store error.
    pub async fn fetch_all(self: Arc<Self>) -> Result<FetchAllResult> {
        let feeds: Vec<Source> = self
            .sources
            .get_all_sources()?
            .into_iter()
            .filter(|s| is_feed_kind(&s.kind) && s.active)
            .collect();
        let total_feeds = feeds.len();

        let mut handles = Vec::new();
        for feed in feeds {
            let service = self.clone();
            let handle = tokio::spawn(async move {
                let _permit = service.limiter.acquire(&feed.url).await;
                match service.fetch_feed(feed.id).await {
                    Ok(result) => result,
                    Err(e) => {
                        tracing::error!("Failed to fetch feed {}: {}", feed.id, e);
                        FeedFetchResult::empty(feed.id, Some(feed.name))
                    }
                }
            });
            handles.push(handle);
        }

        let mut results = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    tracing::error!("Task join error: {}", e);
                }
            }
        }

        let success_count = results.iter().filter(|r| r.items_collected > 0).count();
        let error_count = total_feeds - success_count;

        Ok(FetchAllResult {
            total_feeds,
            success_count,
            error_count,
            results,
            fetched_at: Utc::now(),
        })
    }

    async fn download_and_parse(&self, url: &str) -> Result<feed_rs::model::Feed> {
        let response = self.client.get(url).send().await?;
        let response = response.error_for_status()?;
        let body = response.bytes().await?;

        parser::parse(body.as_ref()).map_err(|e| GleanerError::FeedParse(e.to_string()))
    }
}

fn feed_info(feed: &feed_rs::model::Feed) -> FeedInfo {
    FeedInfo {
        title: feed
            .title
            .as_ref()
            .map(|t| decode_html_entities(&t.content).to_string()),
        link: feed.links.first().map(|l| l.href.clone()),
        description: feed
            .description
            .as_ref()
            .map(|d| decode_html_entities(&d.content).to_string()),
        language: feed.language.clone(),
    }
}

fn to_entry(entry: feed_rs::model::Entry) -> FeedEntry {
    let description = entry
        .summary
        .map(|s| decode_html_entities(&s.content).to_string())
        .or_else(|| {
            entry
                .content
                .and_then(|c| c.body)
                .map(|b| decode_html_entities(&b).to_string())
        });

    FeedEntry {
        title: entry
            .title
            .map(|t| decode_html_entities(&t.content).to_string()),
        link: entry.links.first().map(|l| l.href.clone()),
        description,
        published_at: entry
            .published
            .or(entry.updated)
            .map(|dt| dt.with_timezone(&Utc)),
        author: entry.authors.first().map(|a| a.name.clone()),
    }
}
