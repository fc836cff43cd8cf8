use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FeedRow {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

// Plan envelope types
#[derive(Serialize)]
pub struct FeedAddPlan {
    pub action: &'static str,
    pub url: String,
    pub name: Option<String>,
}

// Apply/result envelope types
#[derive(Serialize)]
pub struct FeedAddResult {
    pub inserted: bool,
    pub feed: FeedRow,
}

#[derive(Serialize)]
pub struct FeedList {
    pub feeds: Vec<FeedRow>,
}
