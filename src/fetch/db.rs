use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::normalize::CandidateItem;

/// Batch-insert accepted items. `ON CONFLICT DO NOTHING` absorbs rows that a
/// concurrent poll cycle committed between our lookup and this insert.
/// Returns the number of rows actually written.
pub async fn insert_articles(
    pool: &PgPool,
    feed_id: i64,
    items: &[CandidateItem],
) -> Result<u64, sqlx::Error> {
    let mut guids: Vec<Option<String>> = Vec::with_capacity(items.len());
    let mut links: Vec<String> = Vec::with_capacity(items.len());
    let mut hashes: Vec<Option<String>> = Vec::with_capacity(items.len());
    let mut titles: Vec<String> = Vec::with_capacity(items.len());
    let mut descriptions: Vec<Option<String>> = Vec::with_capacity(items.len());
    let mut contents: Vec<Option<String>> = Vec::with_capacity(items.len());
    let mut authors: Vec<Option<String>> = Vec::with_capacity(items.len());
    let mut pub_dates: Vec<Option<DateTime<Utc>>> = Vec::with_capacity(items.len());

    for item in items {
        guids.push(item.guid.clone());
        links.push(item.link.clone());
        hashes.push(item.content_hash.clone());
        titles.push(item.title.clone());
        descriptions.push(item.description.clone());
        contents.push(item.content.clone());
        authors.push(item.author.clone());
        pub_dates.push(item.pub_date);
    }

    let res = sqlx::query(
        r#"
        INSERT INTO articles (feed_id, guid, link, content_hash, title, description, content, author, pub_date)
        SELECT $1, g, l, h, t, d, c, a, p
        FROM UNNEST($2::text[], $3::text[], $4::text[], $5::text[], $6::text[], $7::text[], $8::text[], $9::timestamptz[])
             AS input(g, l, h, t, d, c, a, p)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(feed_id)
    .bind(&guids)
    .bind(&links)
    .bind(&hashes)
    .bind(&titles)
    .bind(&descriptions)
    .bind(&contents)
    .bind(&authors)
    .bind(&pub_dates)
    .execute(pool)
    .await?;

    Ok(res.rows_affected())
}

/// Stamp the fetch cycle on the feed row. Validators are overwritten with
/// whatever the response carried, including clearing ones the server dropped.
pub async fn touch_feed(
    pool: &PgPool,
    feed_id: i64,
    fetched_at: DateTime<Utc>,
    etag: Option<&str>,
    last_modified: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE feeds SET last_fetched_at = $2, etag = $3, last_modified = $4 WHERE id = $1")
        .bind(feed_id)
        .bind(fetched_at)
        .bind(etag)
        .bind(last_modified)
        .execute(pool)
        .await?;
    Ok(())
}
