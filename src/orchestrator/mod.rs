//! Collection orchestrator: job creation, fan-out across sources, and
//! job-state transitions.

use std::sync::Arc;

use chrono::{DateTime, NaiveTime, Utc};
use serde::Serialize;

use crate::app::Result;
use crate::domain::{CollectedItem, Job, JobStatus, Source};
use crate::store::{ItemFilter, ItemStore, JobStore, SourceStore};
use crate::strategy::StrategyRegistry;

/// Fixed failure message for jobs whose source id resolves to nothing.
pub const SOURCE_NOT_FOUND: &str = "Source not found";

#[derive(Debug, Clone, Serialize)]
pub struct CollectionStats {
    pub total_sources: i64,
    pub active_sources: i64,
    pub total_items_collected: i64,
    pub items_collected_today: i64,
    pub last_collection: Option<DateTime<Utc>>,
}

pub struct CollectionOrchestrator {
    sources: Arc<dyn SourceStore>,
    jobs: Arc<dyn JobStore>,
    items: Arc<dyn ItemStore>,
    registry: Arc<StrategyRegistry>,
}

impl CollectionOrchestrator {
    pub fn new(
        sources: Arc<dyn SourceStore>,
        jobs: Arc<dyn JobStore>,
        items: Arc<dyn ItemStore>,
        registry: Arc<StrategyRegistry>,
    ) -> Self {
        Self {
            sources,
            jobs,
            items,
            registry,
        }
    }

    /// Create one job per source id and dispatch each asynchronously.
    ///
    /// An empty id list means "all active sources". Returns the created jobs
    /// without waiting for any of them; poll job status separately. Jobs are
    /// dispatched in registration order but complete in any order.
    pub async fn start_collection(self: Arc<Self>, source_ids: Vec<i64>) -> Result<Vec<Job>> {
        let ids: Vec<i64> = if source_ids.is_empty() {
            self.sources
                .get_all_sources()?
                .into_iter()
                .filter(|s| s.active)
                .map(|s| s.id)
                .collect()
        } else {
            source_ids
        };

        let mut created = Vec::with_capacity(ids.len());
        for source_id in ids {
            let mut job = Job::new(source_id);
            job.id = self.jobs.add_job(&job)?;

            let orchestrator = Arc::clone(&self);
            let job_id = job.id;
            tokio::spawn(async move {
                orchestrator.run_job(job_id, source_id).await;
            });

            created.push(job);
        }

        Ok(created)
    }

    async fn run_job(&self, job_id: i64, source_id: i64) {
        if let Err(e) = self.try_run_job(job_id, source_id).await {
            tracing::error!("Job {} could not record its outcome: {}", job_id, e);
        }
    }

    async fn try_run_job(&self, job_id: i64, source_id: i64) -> Result<()> {
        let Some(mut job) = self.jobs.get_job(job_id)? else {
            tracing::warn!("Job not found: {}", job_id);
            return Ok(());
        };

        job.start()?;
        self.jobs.update_job(&job)?;

        let Some(source) = self.sources.get_source(source_id)? else {
            job.fail(SOURCE_NOT_FOUND)?;
            return self.jobs.update_job(&job);
        };

        match self.collect_source(&source).await {
            Ok(count) => {
                job.complete(count as i64)?;
                self.sources.set_last_collected(source.id, Utc::now())?;
            }
            Err(e) => {
                tracing::error!("Collection failed for job {}: {}", job_id, e);
                job.fail(e.to_string())?;
            }
        }

        self.jobs.update_job(&job)
    }

    /// Dispatch one source to its strategy. An unknown kind collects zero
    /// items rather than failing the job.
    async fn collect_source(&self, source: &Source) -> Result<u64> {
        tracing::info!("Collecting from source: {} (kind={})", source.name, source.kind);

        let Some(strategy) = self.registry.resolve(&source.kind) else {
            tracing::warn!(
                "No collection strategy for kind: {} (source={})",
                source.kind,
                source.id
            );
            return Ok(0);
        };

        strategy.collect(source).await
    }

    pub fn get_job(&self, id: i64) -> Result<Option<Job>> {
        self.jobs.get_job(id)
    }

    pub fn get_jobs(
        &self,
        status: Option<JobStatus>,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Job>> {
        self.jobs.get_jobs(status, skip, limit)
    }

    pub fn get_items(
        &self,
        filter: ItemFilter,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<CollectedItem>> {
        self.items.get_items(filter, skip, limit)
    }

    pub fn mark_processed(&self, item_id: i64) -> Result<bool> {
        self.items.mark_processed(item_id)
    }

    pub fn stats(&self) -> Result<CollectionStats> {
        let sources = self.sources.get_all_sources()?;
        let active_sources = sources.iter().filter(|s| s.active).count() as i64;

        let today_start = Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc();

        Ok(CollectionStats {
            total_sources: self.items.distinct_source_count()?,
            active_sources,
            total_items_collected: self.items.count_items()?,
            items_collected_today: self.items.count_items_since(today_start)?,
            last_collection: self.items.latest_collected_at()?,
        })
    }
}
