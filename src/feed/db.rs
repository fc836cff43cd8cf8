use sqlx::{PgPool, Row};

use super::types::FeedRow;

const FEED_COLUMNS: &str = "id, url, title, description, last_fetched_at, etag, last_modified";

/// Insert or refresh a feed keyed by its unique URL. Returns the stored row
/// and whether it was newly created.
pub async fn upsert_feed(
    pool: &PgPool,
    url: &str,
    title: &str,
    description: Option<&str>,
) -> Result<(FeedRow, bool), sqlx::Error> {
    let row = sqlx::query(
        r#"
        INSERT INTO feeds (url, title, description)
        VALUES ($1, $2, $3)
        ON CONFLICT (url)
        DO UPDATE SET title = EXCLUDED.title, description = EXCLUDED.description
        RETURNING id, url, title, description, last_fetched_at, etag, last_modified,
                  (xmax = 0) AS inserted
        "#,
    )
    .bind(url)
    .bind(title)
    .bind(description)
    .fetch_one(pool)
    .await?;

    let inserted: bool = row.get("inserted");
    let feed = FeedRow {
        id: row.get("id"),
        url: row.get("url"),
        title: row.get("title"),
        description: row.get("description"),
        last_fetched_at: row.get("last_fetched_at"),
        etag: row.get("etag"),
        last_modified: row.get("last_modified"),
    };

    Ok((feed, inserted))
}

pub async fn find_feed(pool: &PgPool, id: i64) -> Result<Option<FeedRow>, sqlx::Error> {
    sqlx::query_as::<_, FeedRow>(&format!("SELECT {FEED_COLUMNS} FROM feeds WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_feed_by_url(pool: &PgPool, url: &str) -> Result<Option<FeedRow>, sqlx::Error> {
    sqlx::query_as::<_, FeedRow>(&format!("SELECT {FEED_COLUMNS} FROM feeds WHERE url = $1"))
        .bind(url)
        .fetch_optional(pool)
        .await
}

pub async fn list_feeds(pool: &PgPool) -> Result<Vec<FeedRow>, sqlx::Error> {
    sqlx::query_as::<_, FeedRow>(&format!("SELECT {FEED_COLUMNS} FROM feeds ORDER BY id"))
        .fetch_all(pool)
        .await
}
