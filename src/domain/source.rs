use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A registered origin to collect content from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: i64,
    pub name: String,
    pub url: String,
    /// Discriminator selecting a collection strategy, e.g. "rss" or "html".
    /// Kinds with no registered strategy are skipped, not errored.
    pub kind: String,
    pub active: bool,
    pub last_collected: Option<DateTime<Utc>>,
    /// Desired seconds between collections; informational for schedulers.
    pub interval_secs: i64,
    pub metadata: Option<Map<String, Value>>,
    pub created_at: DateTime<Utc>,
}

impl Source {
    pub fn new(name: impl Into<String>, url: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            url: url.into(),
            kind: kind.into(),
            active: true,
            last_collected: None,
            interval_secs: 3600,
            metadata: None,
            created_at: Utc::now(),
        }
    }
}
