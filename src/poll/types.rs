use serde::Serialize;

use crate::fetch::FetchOutcome;

/// One feed's entry in the batch result list.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FeedResult {
    Success { feed_id: i64, data: FetchOutcome },
    Error { feed_id: i64, error: FeedErrorInfo },
}

impl FeedResult {
    pub fn feed_id(&self) -> i64 {
        match self {
            FeedResult::Success { feed_id, .. } | FeedResult::Error { feed_id, .. } => *feed_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FeedErrorInfo {
    pub code: String,
    pub message: String,
}

/// Aggregate of one scheduling pass. One failing feed never fails the batch;
/// it just shows up in `failures` and `results`.
#[derive(Debug, Serialize)]
pub struct PollSummary {
    pub total_feeds: usize,
    pub successes: usize,
    pub failures: usize,
    pub updated_feeds: usize,
    pub articles_created: usize,
    pub articles_skipped: usize,
    pub results: Vec<FeedResult>,
}

// Plan envelope types
#[derive(Serialize)]
pub struct DueFeedSample {
    pub feed_id: i64,
    pub url: String,
    pub title: String,
}

#[derive(Serialize)]
pub struct PollPlan {
    pub due_feeds: usize,
    pub wave_size: usize,
    pub timeout_secs: u64,
    pub sample_feeds: Vec<DueFeedSample>,
}
