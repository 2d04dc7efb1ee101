use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::app::error::{GleanerError, Result};
use crate::config::CollectorConfig;
use crate::feed::FeedService;
use crate::limiter::DomainLimiter;
use crate::orchestrator::CollectionOrchestrator;
use crate::store::sqlite::SqliteStore;
use crate::store::{ItemStore, SourceStore};
use crate::strategy::{CrawlStrategy, RssStrategy, StrategyRegistry};

pub struct AppContext {
    pub config: CollectorConfig,
    pub store: Arc<SqliteStore>,
    pub limiter: Arc<DomainLimiter>,
    pub feeds: Arc<FeedService>,
    pub orchestrator: Arc<CollectionOrchestrator>,
}

impl AppContext {
    pub fn new(config: CollectorConfig) -> Result<Self> {
        let db_path = match config.db_path.clone() {
            Some(path) => path,
            None => Self::default_db_path()?,
        };
        let store = Arc::new(SqliteStore::new(&db_path)?);
        Self::with_store(config, store)
    }

    pub fn in_memory(config: CollectorConfig) -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory()?);
        Self::with_store(config, store)
    }

    pub fn with_store(config: CollectorConfig, store: Arc<SqliteStore>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .gzip(true)
            .brotli(true)
            .user_agent(&config.user_agent)
            .build()?;

        let limiter = Arc::new(DomainLimiter::new(config.max_concurrent_per_domain));

        let source_store: Arc<dyn SourceStore> = store.clone();
        let item_store: Arc<dyn ItemStore> = store.clone();

        let feeds = Arc::new(FeedService::new(
            source_store.clone(),
            limiter.clone(),
            client.clone(),
        ));

        let mut registry = StrategyRegistry::new();
        registry.register(Arc::new(RssStrategy::new(
            feeds.clone(),
            item_store.clone(),
            limiter.clone(),
        )));
        registry.register(Arc::new(CrawlStrategy::new(
            item_store,
            limiter.clone(),
            client,
            &config.crawler_url,
            config.min_content_length,
        )));

        let orchestrator = Arc::new(CollectionOrchestrator::new(
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(registry),
        ));

        Ok(Self {
            config,
            store,
            limiter,
            feeds,
            orchestrator,
        })
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| GleanerError::Config("Could not find data directory".into()))?;
        let gleaner_dir = data_dir.join("gleaner");
        std::fs::create_dir_all(&gleaner_dir)?;
        Ok(gleaner_dir.join("gleaner.db"))
    }
}
