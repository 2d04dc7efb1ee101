use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One normalized unit of content produced by a fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectedItem {
    pub id: i64,
    pub source_id: i64,
    pub title: Option<String>,
    pub author: Option<String>,
    pub content: String,
    pub url: String,
    pub published_at: Option<DateTime<Utc>>,
    pub collected_at: DateTime<Utc>,
    /// Dedup key for downstream consumers; see [`content_fingerprint`].
    pub fingerprint: String,
    /// Owned by the downstream analysis consumer, never set by this crate.
    pub processed: bool,
    /// Scores attached by downstream analysis stages; this crate only
    /// stores them. All nullable.
    pub quality_score: Option<f64>,
    pub semantic_consistency: Option<f64>,
    pub outlier_score: Option<f64>,
    pub trust_score: Option<f64>,
}

impl CollectedItem {
    pub fn new(source_id: i64, content: String, url: String) -> Self {
        let fingerprint = content_fingerprint(&content);
        Self {
            id: 0,
            source_id,
            title: None,
            author: None,
            content,
            url,
            published_at: None,
            collected_at: Utc::now(),
            fingerprint,
            processed: false,
            quality_score: None,
            semantic_consistency: None,
            outlier_score: None,
            trust_score: None,
        }
    }
}

/// Compute a stable fingerprint of normalized content text.
///
/// Hex-encoded SHA-256 of the text bytes. Deterministic: depends on nothing
/// but the text itself, not collection time, source id, or URL.
pub fn content_fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}
