use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::feed::types::FeedRow;

/// Feeds that have never been fetched, or whose last fetch is older than the
/// refresh cutoff. Oldest first so starved feeds get priority.
pub async fn select_due_feeds(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
) -> Result<Vec<FeedRow>, sqlx::Error> {
    sqlx::query_as::<_, FeedRow>(
        r#"
        SELECT id, url, title, description, last_fetched_at, etag, last_modified
        FROM feeds
        WHERE last_fetched_at IS NULL OR last_fetched_at < $1
        ORDER BY last_fetched_at ASC NULLS FIRST
        "#,
    )
    .bind(cutoff)
    .fetch_all(pool)
    .await
}
