use std::sync::Arc;

use async_trait::async_trait;

use crate::app::Result;
use crate::domain::{CollectedItem, Source};
use crate::feed::{is_feed_kind, FeedService};
use crate::limiter::DomainLimiter;
use crate::store::ItemStore;
use crate::strategy::CollectionStrategy;

/// Collects syndication feeds through the feed service, persisting one item
/// per entry. Fails closed: fetch or parse errors propagate so the job
/// records the failure reason.
pub struct RssStrategy {
    feeds: Arc<FeedService>,
    items: Arc<dyn ItemStore>,
    limiter: Arc<DomainLimiter>,
}

impl RssStrategy {
    pub fn new(
        feeds: Arc<FeedService>,
        items: Arc<dyn ItemStore>,
        limiter: Arc<DomainLimiter>,
    ) -> Self {
        Self {
            feeds,
            items,
            limiter,
        }
    }
}

#[async_trait]
impl CollectionStrategy for RssStrategy {
    fn supports(&self, kind: &str) -> bool {
        is_feed_kind(kind)
    }

    async fn collect(&self, source: &Source) -> Result<u64> {
        // Held for the whole fetch; released on drop on every exit path.
        let _permit = self.limiter.acquire(&source.url).await;

        let result = self.feeds.fetch_feed(source.id).await?;

        for entry in &result.entries {
            let body = entry.description.clone().unwrap_or_default();
            let url = entry
                .link
                .clone()
                .unwrap_or_else(|| source.url.clone());

            let mut item = CollectedItem::new(source.id, body, url);
            item.title = entry.title.clone();
            item.author = entry.author.clone();
            item.published_at = entry.published_at;

            self.items.add_item(&item)?;
        }

        Ok(result.items_collected)
    }
}
