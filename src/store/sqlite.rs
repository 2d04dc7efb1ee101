use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};

use crate::app::{GleanerError, Result};
use crate::domain::{CollectedItem, Job, JobStatus, Source};
use crate::store::{ItemFilter, ItemStore, JobStore, SourceStore};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.conn()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        migrations
            .to_latest(&mut conn)
            .map_err(|e| GleanerError::Other(format!("Migration failed: {}", e)))?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            GleanerError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<DateTime<Utc>>().ok())
    }

    fn row_to_source(row: &Row<'_>) -> rusqlite::Result<Source> {
        Ok(Source {
            id: row.get(0)?,
            name: row.get(1)?,
            url: row.get(2)?,
            kind: row.get(3)?,
            active: row.get::<_, i64>(4)? != 0,
            last_collected: row
                .get::<_, Option<String>>(5)?
                .and_then(|s| Self::parse_datetime(&s)),
            interval_secs: row.get(6)?,
            metadata: row
                .get::<_, Option<String>>(7)?
                .and_then(|s| serde_json::from_str(&s).ok()),
            created_at: row
                .get::<_, String>(8)
                .ok()
                .and_then(|s| Self::parse_datetime(&s))
                .unwrap_or_else(Utc::now),
        })
    }

    fn row_to_job(row: &Row<'_>) -> rusqlite::Result<Job> {
        let status_str: String = row.get(2)?;
        let status = JobStatus::parse(&status_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                format!("unknown job status: {}", status_str).into(),
            )
        })?;

        Ok(Job {
            id: row.get(0)?,
            source_id: row.get(1)?,
            status,
            started_at: row
                .get::<_, Option<String>>(3)?
                .and_then(|s| Self::parse_datetime(&s)),
            completed_at: row
                .get::<_, Option<String>>(4)?
                .and_then(|s| Self::parse_datetime(&s)),
            items_collected: row.get(5)?,
            error_message: row.get(6)?,
            created_at: row
                .get::<_, String>(7)
                .ok()
                .and_then(|s| Self::parse_datetime(&s))
                .unwrap_or_else(Utc::now),
        })
    }

    fn row_to_item(row: &Row<'_>) -> rusqlite::Result<CollectedItem> {
        Ok(CollectedItem {
            id: row.get(0)?,
            source_id: row.get(1)?,
            title: row.get(2)?,
            author: row.get(3)?,
            content: row.get(4)?,
            url: row.get(5)?,
            published_at: row
                .get::<_, Option<String>>(6)?
                .and_then(|s| Self::parse_datetime(&s)),
            collected_at: row
                .get::<_, String>(7)
                .ok()
                .and_then(|s| Self::parse_datetime(&s))
                .unwrap_or_else(Utc::now),
            fingerprint: row.get(8)?,
            processed: row.get::<_, i64>(9)? != 0,
            quality_score: row.get(10)?,
            semantic_consistency: row.get(11)?,
            outlier_score: row.get(12)?,
            trust_score: row.get(13)?,
        })
    }
}

const SOURCE_COLUMNS: &str =
    "id, name, url, kind, active, last_collected, interval_secs, metadata, created_at";
const JOB_COLUMNS: &str =
    "id, source_id, status, started_at, completed_at, items_collected, error_message, created_at";
const ITEM_COLUMNS: &str = "id, source_id, title, author, content, url, published_at, \
     collected_at, fingerprint, processed, quality_score, semantic_consistency, \
     outlier_score, trust_score";

impl SourceStore for SqliteStore {
    fn add_source(&self, source: &Source) -> Result<i64> {
        let metadata = source
            .metadata
            .as_ref()
            .map(|m| serde_json::to_string(m).map_err(|e| GleanerError::Other(e.to_string())))
            .transpose()?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sources (name, url, kind, active, last_collected, interval_secs, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                source.name,
                source.url,
                source.kind,
                source.active as i64,
                source.last_collected.map(|dt| dt.to_rfc3339()),
                source.interval_secs,
                metadata,
                source.created_at.to_rfc3339(),
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    fn get_source(&self, id: i64) -> Result<Option<Source>> {
        let conn = self.conn()?;
        let result = conn
            .query_row(
                &format!("SELECT {} FROM sources WHERE id = ?1", SOURCE_COLUMNS),
                params![id],
                Self::row_to_source,
            )
            .optional()?;

        Ok(result)
    }

    fn get_all_sources(&self) -> Result<Vec<Source>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare(&format!("SELECT {} FROM sources ORDER BY id", SOURCE_COLUMNS))?;

        let sources = stmt
            .query_map([], Self::row_to_source)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(sources)
    }

    fn set_last_collected(&self, id: i64, at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE sources SET last_collected = ?1 WHERE id = ?2",
            params![at.to_rfc3339(), id],
        )?;
        Ok(())
    }

    fn set_active(&self, id: i64, active: bool) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE sources SET active = ?1 WHERE id = ?2",
            params![active as i64, id],
        )?;
        Ok(())
    }
}

impl JobStore for SqliteStore {
    fn add_job(&self, job: &Job) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO jobs (source_id, status, started_at, completed_at, items_collected, error_message, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                job.source_id,
                job.status.as_str(),
                job.started_at.map(|dt| dt.to_rfc3339()),
                job.completed_at.map(|dt| dt.to_rfc3339()),
                job.items_collected,
                job.error_message,
                job.created_at.to_rfc3339(),
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    fn get_job(&self, id: i64) -> Result<Option<Job>> {
        let conn = self.conn()?;
        let result = conn
            .query_row(
                &format!("SELECT {} FROM jobs WHERE id = ?1", JOB_COLUMNS),
                params![id],
                Self::row_to_job,
            )
            .optional()?;

        Ok(result)
    }

    fn get_jobs(&self, status: Option<JobStatus>, skip: usize, limit: usize) -> Result<Vec<Job>> {
        let conn = self.conn()?;

        let jobs = match status {
            Some(status) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM jobs WHERE status = ?1 ORDER BY id LIMIT ?2 OFFSET ?3",
                    JOB_COLUMNS
                ))?;
                let jobs = stmt
                    .query_map(
                        params![status.as_str(), limit as i64, skip as i64],
                        Self::row_to_job,
                    )?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                jobs
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM jobs ORDER BY id LIMIT ?1 OFFSET ?2",
                    JOB_COLUMNS
                ))?;
                let jobs = stmt
                    .query_map(params![limit as i64, skip as i64], Self::row_to_job)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                jobs
            }
        };

        Ok(jobs)
    }

    fn update_job(&self, job: &Job) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE jobs SET status = ?1, started_at = ?2, completed_at = ?3,
                             items_collected = ?4, error_message = ?5
             WHERE id = ?6",
            params![
                job.status.as_str(),
                job.started_at.map(|dt| dt.to_rfc3339()),
                job.completed_at.map(|dt| dt.to_rfc3339()),
                job.items_collected,
                job.error_message,
                job.id,
            ],
        )?;
        Ok(())
    }
}

impl ItemStore for SqliteStore {
    fn add_item(&self, item: &CollectedItem) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO items (source_id, title, author, content, url, published_at,
                                collected_at, fingerprint, processed, quality_score,
                                semantic_consistency, outlier_score, trust_score)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                item.source_id,
                item.title,
                item.author,
                item.content,
                item.url,
                item.published_at.map(|dt| dt.to_rfc3339()),
                item.collected_at.to_rfc3339(),
                item.fingerprint,
                item.processed as i64,
                item.quality_score,
                item.semantic_consistency,
                item.outlier_score,
                item.trust_score,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    fn get_item(&self, id: i64) -> Result<Option<CollectedItem>> {
        let conn = self.conn()?;
        let result = conn
            .query_row(
                &format!("SELECT {} FROM items WHERE id = ?1", ITEM_COLUMNS),
                params![id],
                Self::row_to_item,
            )
            .optional()?;

        Ok(result)
    }

    fn get_items(
        &self,
        filter: ItemFilter,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<CollectedItem>> {
        let conn = self.conn()?;

        let mut sql = format!("SELECT {} FROM items", ITEM_COLUMNS);
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<rusqlite::types::Value> = Vec::new();

        if let Some(source_id) = filter.source_id {
            clauses.push("source_id = ?");
            values.push(source_id.into());
        }
        if let Some(processed) = filter.processed {
            clauses.push("processed = ?");
            values.push((processed as i64).into());
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY id LIMIT ? OFFSET ?");
        values.push((limit as i64).into());
        values.push((skip as i64).into());

        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(params_from_iter(values), Self::row_to_item)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(items)
    }

    fn mark_processed(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let updated = conn.execute("UPDATE items SET processed = 1 WHERE id = ?1", params![id])?;
        Ok(updated > 0)
    }

    fn count_items(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
        Ok(count)
    }

    fn count_items_since(&self, since: DateTime<Utc>) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM items WHERE collected_at >= ?1",
            params![since.to_rfc3339()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn latest_collected_at(&self) -> Result<Option<DateTime<Utc>>> {
        let conn = self.conn()?;
        let latest: Option<String> = conn.query_row(
            "SELECT MAX(collected_at) FROM items",
            [],
            |row| row.get(0),
        )?;
        Ok(latest.and_then(|s| Self::parse_datetime(&s)))
    }

    fn distinct_source_count(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row(
            "SELECT COUNT(DISTINCT source_id) FROM items",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::content_fingerprint;

    fn sample_source() -> Source {
        Source::new("Pension Daily", "https://example.com/rss", "rss")
    }

    #[test]
    fn test_source_round_trip() {
        let store = SqliteStore::in_memory().unwrap();
        let mut source = sample_source();
        source.metadata = serde_json::from_str(r#"{"language": "en", "region": "EU"}"#).unwrap();

        let id = store.add_source(&source).unwrap();
        let loaded = store.get_source(id).unwrap().unwrap();

        assert_eq!(loaded.name, "Pension Daily");
        assert_eq!(loaded.url, "https://example.com/rss");
        assert_eq!(loaded.kind, "rss");
        assert!(loaded.active);
        assert!(loaded.last_collected.is_none());
        let metadata = loaded.metadata.unwrap();
        assert_eq!(metadata["language"], "en");
    }

    #[test]
    fn test_get_missing_source_is_none() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.get_source(42).unwrap().is_none());
    }

    #[test]
    fn test_set_last_collected() {
        let store = SqliteStore::in_memory().unwrap();
        let id = store.add_source(&sample_source()).unwrap();

        let at = Utc::now();
        store.set_last_collected(id, at).unwrap();

        let loaded = store.get_source(id).unwrap().unwrap();
        let stamped = loaded.last_collected.unwrap();
        assert!((stamped - at).num_seconds().abs() < 2);
    }

    #[test]
    fn test_set_active() {
        let store = SqliteStore::in_memory().unwrap();
        let id = store.add_source(&sample_source()).unwrap();

        store.set_active(id, false).unwrap();
        assert!(!store.get_source(id).unwrap().unwrap().active);
    }

    #[test]
    fn test_job_round_trip_and_update() {
        let store = SqliteStore::in_memory().unwrap();
        let source_id = store.add_source(&sample_source()).unwrap();

        let mut job = Job::new(source_id);
        job.id = store.add_job(&job).unwrap();

        job.start().unwrap();
        job.complete(12).unwrap();
        store.update_job(&job).unwrap();

        let loaded = store.get_job(job.id).unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Completed);
        assert_eq!(loaded.items_collected, 12);
        assert!(loaded.started_at.is_some());
        assert!(loaded.completed_at.is_some());
        assert!(loaded.error_message.is_none());
    }

    #[test]
    fn test_get_jobs_filters_by_status() {
        let store = SqliteStore::in_memory().unwrap();
        let source_id = store.add_source(&sample_source()).unwrap();

        let mut completed = Job::new(source_id);
        completed.id = store.add_job(&completed).unwrap();
        completed.start().unwrap();
        completed.complete(1).unwrap();
        store.update_job(&completed).unwrap();

        let mut failed = Job::new(source_id);
        failed.id = store.add_job(&failed).unwrap();
        failed.start().unwrap();
        failed.fail("no luck").unwrap();
        store.update_job(&failed).unwrap();

        let all = store.get_jobs(None, 0, 50).unwrap();
        assert_eq!(all.len(), 2);

        let only_failed = store.get_jobs(Some(JobStatus::Failed), 0, 50).unwrap();
        assert_eq!(only_failed.len(), 1);
        assert_eq!(only_failed[0].error_message.as_deref(), Some("no luck"));
    }

    #[test]
    fn test_get_jobs_skip_and_limit() {
        let store = SqliteStore::in_memory().unwrap();
        let source_id = store.add_source(&sample_source()).unwrap();

        for _ in 0..5 {
            store.add_job(&Job::new(source_id)).unwrap();
        }

        let page = store.get_jobs(None, 2, 2).unwrap();
        assert_eq!(page.len(), 2);
        let all = store.get_jobs(None, 0, 50).unwrap();
        assert_eq!(page[0].id, all[2].id);
    }

    #[test]
    fn test_item_round_trip() {
        let store = SqliteStore::in_memory().unwrap();
        let source_id = store.add_source(&sample_source()).unwrap();

        let mut item = CollectedItem::new(
            source_id,
            "long article about pension funds".into(),
            "https://example.com/article".into(),
        );
        item.title = Some("Funds under pressure".into());
        item.author = Some("Jane Doe".into());

        let id = store.add_item(&item).unwrap();
        let loaded = store.get_item(id).unwrap().unwrap();

        assert_eq!(loaded.title.as_deref(), Some("Funds under pressure"));
        assert_eq!(loaded.author.as_deref(), Some("Jane Doe"));
        assert_eq!(
            loaded.fingerprint,
            content_fingerprint("long article about pension funds")
        );
        assert!(!loaded.processed);
        // Analysis scores are nullable and start unset.
        assert!(loaded.quality_score.is_none());
        assert!(loaded.semantic_consistency.is_none());
        assert!(loaded.outlier_score.is_none());
        assert!(loaded.trust_score.is_none());
    }

    #[test]
    fn test_item_analysis_scores_round_trip() {
        let store = SqliteStore::in_memory().unwrap();
        let source_id = store.add_source(&sample_source()).unwrap();

        let mut item = CollectedItem::new(
            source_id,
            "scored content".into(),
            "https://example.com/scored".into(),
        );
        item.quality_score = Some(0.82);
        item.semantic_consistency = Some(0.9);
        item.outlier_score = Some(0.05);
        item.trust_score = Some(0.7);

        let id = store.add_item(&item).unwrap();
        let loaded = store.get_item(id).unwrap().unwrap();

        assert_eq!(loaded.quality_score, Some(0.82));
        assert_eq!(loaded.semantic_consistency, Some(0.9));
        assert_eq!(loaded.outlier_score, Some(0.05));
        assert_eq!(loaded.trust_score, Some(0.7));
    }

    #[test]
    fn test_item_filters() {
        let store = SqliteStore::in_memory().unwrap();
        let s1 = store.add_source(&sample_source()).unwrap();
        let s2 = store.add_source(&sample_source()).unwrap();

        let a = store
            .add_item(&CollectedItem::new(s1, "a".into(), "https://e.com/a".into()))
            .unwrap();
        store
            .add_item(&CollectedItem::new(s1, "b".into(), "https://e.com/b".into()))
            .unwrap();
        store
            .add_item(&CollectedItem::new(s2, "c".into(), "https://e.com/c".into()))
            .unwrap();

        store.mark_processed(a).unwrap();

        let by_source = store
            .get_items(
                ItemFilter {
                    source_id: Some(s1),
                    processed: None,
                },
                0,
                50,
            )
            .unwrap();
        assert_eq!(by_source.len(), 2);

        let unprocessed_s1 = store
            .get_items(
                ItemFilter {
                    source_id: Some(s1),
                    processed: Some(false),
                },
                0,
                50,
            )
            .unwrap();
        assert_eq!(unprocessed_s1.len(), 1);
        assert_eq!(unprocessed_s1[0].content, "b");

        let processed = store
            .get_items(
                ItemFilter {
                    source_id: None,
                    processed: Some(true),
                },
                0,
                50,
            )
            .unwrap();
        assert_eq!(processed.len(), 1);
        assert_eq!(processed[0].content, "a");
    }

    #[test]
    fn test_mark_processed_missing_item() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(!store.mark_processed(99).unwrap());
    }

    #[test]
    fn test_item_counts_and_latest() {
        let store = SqliteStore::in_memory().unwrap();
        let s1 = store.add_source(&sample_source()).unwrap();

        assert_eq!(store.count_items().unwrap(), 0);
        assert!(store.latest_collected_at().unwrap().is_none());

        store
            .add_item(&CollectedItem::new(s1, "x".into(), "https://e.com/x".into()))
            .unwrap();
        store
            .add_item(&CollectedItem::new(s1, "y".into(), "https://e.com/y".into()))
            .unwrap();

        assert_eq!(store.count_items().unwrap(), 2);
        assert_eq!(store.distinct_source_count().unwrap(), 1);
        assert!(store.latest_collected_at().unwrap().is_some());

        let long_ago = Utc::now() - chrono::Duration::days(1);
        assert_eq!(store.count_items_since(long_ago).unwrap(), 2);
        let future = Utc::now() + chrono::Duration::days(1);
        assert_eq!(store.count_items_since(future).unwrap(), 0);
    }

    #[test]
    fn test_store_persists_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gleaner.db");

        let id = {
            let store = SqliteStore::new(&path).unwrap();
            store.add_source(&sample_source()).unwrap()
        };

        let reopened = SqliteStore::new(&path).unwrap();
        assert!(reopened.get_source(id).unwrap().is_some());
    }
}
