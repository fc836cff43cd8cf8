use chrono::{DateTime, Utc};
use serde::Serialize;

/// Per-feed result of one fetch cycle. `updated` means at least one article
/// was accepted; a 304 or an unchanged document reports `false`.
#[derive(Debug, Clone, Serialize)]
pub struct FetchOutcome {
    pub feed_id: i64,
    pub status: u16,
    pub updated: bool,
    pub fetched_at: DateTime<Utc>,
    pub articles_created: usize,
    pub articles_skipped: usize,
}
