use anyhow::{Result, bail};
use chrono::Utc;
use clap::Args;
use reqwest::header;
use reqwest::{Client, Response, StatusCode};
use sqlx::PgPool;
use tracing::Instrument;

use crate::dedup;
use crate::feed::db as feed_db;
use crate::feed::types::FeedRow;
use crate::normalize;
use crate::parse::{self, ParserInput};
use crate::telemetry;
use crate::telemetry::ops::fetch::Phase as FetchPhase;

mod db;
pub mod error;
pub mod types;

pub use error::FetchError;
pub use types::FetchOutcome;

pub const USER_AGENT: &str = "GroupFeeder/1.0";
pub const ACCEPT_HEADER: &str = "application/xml, text/xml, application/rss+xml, application/atom+xml, application/feed+json, application/json";

/// groupfeeder fetch — run one feed through the pipeline
#[derive(Args)]
pub struct FetchCmd {
    #[arg(long)]
    pub feed: Option<i64>,
    #[arg(long)]
    pub feed_url: Option<String>,
    #[arg(long, default_value_t = false)]
    pub apply: bool,
}

pub async fn run(pool: &PgPool, args: FetchCmd) -> Result<()> {
    let log = telemetry::fetch();
    let _g = log
        .root_span_kv([
            ("mode", if args.apply { "apply".to_string() } else { "plan".to_string() }),
            ("feed", format!("{:?}", args.feed)),
            ("feed_url", format!("{:?}", args.feed_url)),
        ])
        .entered();

    let feed = match (args.feed, args.feed_url.as_deref()) {
        (Some(id), _) => feed_db::find_feed(pool, id).await?,
        (None, Some(url)) => feed_db::find_feed_by_url(pool, url).await?,
        (None, None) => bail!("provide --feed or --feed-url"),
    };

    let Some(feed) = feed else { bail!("feed not found") };

    if !args.apply {
        log.info(format!("📝 Fetch plan — feed_id={} url={}", feed.id, feed.url));
        log.info("   Use --apply to execute.");
        if telemetry::config::json_mode() {
            log.plan(&feed)?;
        }
        return Ok(());
    }

    let client = Client::new();

    match fetch_feed(pool, &client, &feed).await {
        Ok(outcome) => {
            log.outcome(feed.id, outcome.status, outcome.articles_created, outcome.articles_skipped);
            if telemetry::config::json_mode() {
                log.result(&outcome)?;
            }
            Ok(())
        }
        Err(err) => bail!("feed {} failed ({}): {}", feed.id, err.code(), err),
    }
}

/// Fetch one feed and commit anything new. Idempotent with respect to content
/// the store has already seen.
///
/// The feed row is stamped (timestamp + validators) on success and on 304; it
/// is deliberately left stale on every error path so the feed stays due and
/// gets retried on the next cycle.
pub async fn fetch_feed(
    pool: &PgPool,
    client: &Client,
    feed: &FeedRow,
) -> Result<FetchOutcome, FetchError> {
    let log = telemetry::fetch();

    let mut request = client
        .get(&feed.url)
        .header(header::USER_AGENT, USER_AGENT)
        .header(header::ACCEPT, ACCEPT_HEADER);

    if let Some(etag) = &feed.etag {
        request = request.header(header::IF_NONE_MATCH, etag.as_str());
    }
    if let Some(last_modified) = &feed.last_modified {
        request = request.header(header::IF_MODIFIED_SINCE, last_modified.as_str());
    }

    let response = request
        .send()
        .instrument(log.span(&FetchPhase::Request))
        .await
        .map_err(|source| FetchError::Network { url: feed.url.clone(), source })?;

    let fetched_at = Utc::now();
    let status = response.status().as_u16();
    let etag = header_value(&response, header::ETAG);
    let last_modified = header_value(&response, header::LAST_MODIFIED);
    let content_type = header_value(&response, header::CONTENT_TYPE).unwrap_or_default();

    if response.status() == StatusCode::NOT_MODIFIED {
        // servers may rotate validators even on a 304
        db::touch_feed(pool, feed.id, fetched_at, etag.as_deref(), last_modified.as_deref()).await?;
        log.debug_kv("not modified", [("feed_id", feed.id.to_string())]);

        return Ok(FetchOutcome {
            feed_id: feed.id,
            status,
            updated: false,
            fetched_at,
            articles_created: 0,
            articles_skipped: 0,
        });
    }

    if !response.status().is_success() {
        return Err(FetchError::Http { status });
    }

    let body = response.text().await.map_err(|source| FetchError::Network {
        url: feed.url.clone(),
        source,
    })?;

    let parsed = log.span(&FetchPhase::Parse).in_scope(|| {
        let parsed = if looks_like_json(&content_type, &body) {
            let value = serde_json::from_str(&body)
                .map_err(|err| FetchError::Parse { message: err.to_string() })?;
            parse::parse_feed(ParserInput::Json(value))
        } else {
            parse::parse_feed(ParserInput::Text(&body))
        };
        parsed.map_err(|err| FetchError::Parse { message: err.to_string() })
    })?;

    let items = normalize::candidates(&parsed, &feed.url);
    log.debug_kv(
        "parsed feed",
        [
            ("feed_id", feed.id.to_string()),
            ("format", parsed.format.as_str().to_string()),
            ("items", items.len().to_string()),
        ],
    );

    if items.is_empty() {
        db::touch_feed(pool, feed.id, fetched_at, etag.as_deref(), last_modified.as_deref()).await?;

        return Ok(FetchOutcome {
            feed_id: feed.id,
            status,
            updated: false,
            fetched_at,
            articles_created: 0,
            articles_skipped: 0,
        });
    }

    let total = items.len();
    let mut seen = dedup::load_seen(pool, feed.id, &items)
        .instrument(log.span(&FetchPhase::Dedup))
        .await?;
    let accepted = log
        .span(&FetchPhase::Dedup)
        .in_scope(|| dedup::filter_new(items, &mut seen));

    if !accepted.is_empty() {
        let inserted = db::insert_articles(pool, feed.id, &accepted)
            .instrument(log.span(&FetchPhase::Commit))
            .await?;
        if (inserted as usize) < accepted.len() {
            // a concurrent cycle won the race on some rows; the conflict
            // backstop already dropped them
            log.debug_kv(
                "insert conflicts dropped",
                [
                    ("feed_id", feed.id.to_string()),
                    ("accepted", accepted.len().to_string()),
                    ("inserted", inserted.to_string()),
                ],
            );
        }
    }

    db::touch_feed(pool, feed.id, fetched_at, etag.as_deref(), last_modified.as_deref()).await?;

    Ok(FetchOutcome {
        feed_id: feed.id,
        status,
        updated: !accepted.is_empty(),
        fetched_at,
        articles_created: accepted.len(),
        articles_skipped: total - accepted.len(),
    })
}

// A feed is JSON if the server says so or the body starts like a JSON value.
pub(crate) fn looks_like_json(content_type: &str, body: &str) -> bool {
    content_type.contains("json")
        || matches!(body.trim_start().chars().next(), Some('{') | Some('['))
}

fn header_value(response: &Response, name: header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(String::from)
}
