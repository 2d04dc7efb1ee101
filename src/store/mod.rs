pub mod sqlite;

use chrono::{DateTime, Utc};

use crate::app::Result;
use crate::domain::{CollectedItem, Job, JobStatus, Source};

pub use sqlite::SqliteStore;

/// Filter for listing collected items.
#[derive(Debug, Clone, Copy, Default)]
pub struct ItemFilter {
    pub source_id: Option<i64>,
    pub processed: Option<bool>,
}

pub trait SourceStore: Send + Sync {
    fn add_source(&self, source: &Source) -> Result<i64>;
    fn get_source(&self, id: i64) -> Result<Option<Source>>;
    fn get_all_sources(&self) -> Result<Vec<Source>>;
    fn set_last_collected(&self, id: i64, at: DateTime<Utc>) -> Result<()>;
    fn set_active(&self, id: i64, active: bool) -> Result<()>;
}

pub trait JobStore: Send + Sync {
    fn add_job(&self, job: &Job) -> Result<i64>;
    fn get_job(&self, id: i64) -> Result<Option<Job>>;
    fn get_jobs(&self, status: Option<JobStatus>, skip: usize, limit: usize) -> Result<Vec<Job>>;
    fn update_job(&self, job: &Job) -> Result<()>;
}

pub trait ItemStore: Send + Sync {
    fn add_item(&self, item: &CollectedItem) -> Result<i64>;
    fn get_item(&self, id: i64) -> Result<Option<CollectedItem>>;
    fn get_items(&self, filter: ItemFilter, skip: usize, limit: usize) -> Result<Vec<CollectedItem>>;
    fn mark_processed(&self, id: i64) -> Result<bool>;
    fn count_items(&self) -> Result<i64>;
    fn count_items_since(&self, since: DateTime<Utc>) -> Result<i64>;
    fn latest_collected_at(&self) -> Result<Option<DateTime<Utc>>>;
    fn distinct_source_count(&self) -> Result<i64>;
}
