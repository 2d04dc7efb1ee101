//! Pluggable fetch-and-normalize strategies selected by source kind.

mod crawl;
mod rss;

pub use crawl::CrawlStrategy;
pub use rss::RssStrategy;

use std::sync::Arc;

use async_trait::async_trait;

use crate::app::Result;
use crate::domain::Source;

/// One implementation per source kind. Implementations must be safe to call
/// from many concurrent jobs; the only shared mutable state they touch is
/// mediated by the domain limiter.
#[async_trait]
pub trait CollectionStrategy: Send + Sync {
    /// Whether this strategy handles sources of the given kind.
    fn supports(&self, kind: &str) -> bool;

    /// Fetch and persist content for one source, returning the number of
    /// items collected. Zero items is a valid outcome, not a failure.
    async fn collect(&self, source: &Source) -> Result<u64>;
}

/// Registry of collection strategies.
///
/// Kinds are resolved fresh on every dispatch; a source's kind can change
/// between collections, so the match is never cached on the job.
#[derive(Default)]
pub struct StrategyRegistry {
    strategies: Vec<Arc<dyn CollectionStrategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, strategy: Arc<dyn CollectionStrategy>) {
        self.strategies.push(strategy);
    }

    /// First registered strategy supporting the kind, if any.
    pub fn resolve(&self, kind: &str) -> Option<Arc<dyn CollectionStrategy>> {
        self.strategies.iter().find(|s| s.supports(kind)).cloned()
    }
}
