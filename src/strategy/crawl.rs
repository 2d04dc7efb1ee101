use std::sync::Arc;

use async_trait::async_trait;
use html_escape::decode_html_entities;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::app::Result;
use crate::domain::{CollectedItem, Source};
use crate::limiter::DomainLimiter;
use crate::store::ItemStore;
use crate::strategy::CollectionStrategy;

#[derive(Serialize)]
struct CrawlRequest<'a> {
    url: &'a str,
    js_render: bool,
}

#[derive(Deserialize)]
struct CrawlResponse {
    #[serde(default)]
    markdown: Option<String>,
    #[serde(default)]
    html: Option<String>,
}

/// Collects rendered pages through an external headless-crawl worker.
///
/// The worker accepts `{url, js_render}` and answers with a markdown or HTML
/// payload. Non-2xx responses and empty payloads count as zero items for the
/// attempt, not as failures; only transport errors fail the job.
pub struct CrawlStrategy {
    items: Arc<dyn ItemStore>,
    limiter: Arc<DomainLimiter>,
    client: Client,
    endpoint: String,
    min_content_length: usize,
}

impl CrawlStrategy {
    pub fn new(
        items: Arc<dyn ItemStore>,
        limiter: Arc<DomainLimiter>,
        client: Client,
        crawler_url: &str,
        min_content_length: usize,
    ) -> Self {
        let endpoint = if crawler_url.ends_with('/') {
            format!("{}crawl", crawler_url)
        } else {
            format!("{}/crawl", crawler_url)
        };

        Self {
            items,
            limiter,
            client,
            endpoint,
            min_content_length,
        }
    }
}

#[async_trait]
impl CollectionStrategy for CrawlStrategy {
    fn supports(&self, kind: &str) -> bool {
        kind.eq_ignore_ascii_case("html") || kind.eq_ignore_ascii_case("crawl")
    }

    async fn collect(&self, source: &Source) -> Result<u64> {
        let _permit = self.limiter.acquire(&source.url).await;

        let response = self
            .client
            .post(&self.endpoint)
            .json(&CrawlRequest {
                url: &source.url,
                js_render: true,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::warn!(
                "Crawl worker returned {} for source {}",
                response.status(),
                source.id
            );
            return Ok(0);
        }

        let payload: CrawlResponse = response.json().await?;
        let text = match (payload.markdown, payload.html) {
            (Some(md), _) if !md.trim().is_empty() => md.trim().to_string(),
            (_, Some(html)) if !html.trim().is_empty() => html_to_text(&html),
            _ => {
                tracing::warn!("Crawl worker returned empty payload for source {}", source.id);
                return Ok(0);
            }
        };

        if text.chars().count() < self.min_content_length {
            tracing::debug!(
                "Content below threshold ({} chars) for source {}",
                text.chars().count(),
                source.id
            );
            return Ok(0);
        }

        let item = CollectedItem::new(source.id, text, source.url.clone());
        self.items.add_item(&item)?;

        Ok(1)
    }
}

/// Strip tags, decode entities, and collapse whitespace into single spaces.
pub(crate) fn html_to_text(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;

    for c in html.chars() {
        match c {
            '<' => {
                in_tag = true;
                // Tag boundaries separate words.
                text.push(' ');
            }
            '>' => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }

    normalize_whitespace(&decode_html_entities(&text))
}

pub(crate) fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
