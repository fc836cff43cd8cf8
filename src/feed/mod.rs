use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use reqwest::Client;
use reqwest::header;
use sqlx::PgPool;
use url::Url;

use crate::fetch::{ACCEPT_HEADER, USER_AGENT, looks_like_json};
use crate::normalize::json_scalar;
use crate::parse::{FeedDocument, ParsedFeed, ParserInput, parse_feed};
use crate::telemetry;
use crate::telemetry::ops::feed::Phase as FeedPhase;

pub mod db;
pub mod types;
mod validate;

/// groupfeeder feed add/ls
#[derive(Args)]
pub struct FeedCmd {
    #[command(subcommand)]
    pub cmd: FeedSub,
}

#[derive(Subcommand)]
pub enum FeedSub {
    // register a feed (plan-only by default; use --apply to write)
    Add {
        url: String,
        /// Override the display title derived from the feed document
        #[arg(long)]
        name: Option<String>,
        #[arg(long, default_value_t = false)]
        apply: bool,
    },
    // list registered feeds
    Ls,
}

pub async fn run(pool: &PgPool, args: FeedCmd) -> Result<()> {
    let log = telemetry::feed();
    let _g = log.root_span().entered();
    match args.cmd {
        FeedSub::Add { url, name, apply } => add_feed(pool, url, name, apply).await?,
        FeedSub::Ls => ls_feeds(pool).await?,
    }
    Ok(())
}

async fn add_feed(pool: &PgPool, url: String, name: Option<String>, apply: bool) -> Result<()> {
    let log = telemetry::feed();
    let _g = log
        .root_span_kv([
            ("mode", if apply { "apply".to_string() } else { "plan".to_string() }),
            ("url", url.clone()),
            ("name", format!("{:?}", name)),
        ])
        .entered();

    // friendly error before any network or DB I/O
    if !validate::is_valid_feed_url(&url) {
        bail!("Invalid feed url: {}", url);
    }

    if !apply {
        let _s = log.span(&FeedPhase::Plan).entered();
        log.info(format!("📝 Feed plan — add url={} name={:?}", url, name));
        log.info("   Use --apply to execute.");
        if telemetry::config::json_mode() {
            let plan = types::FeedAddPlan { action: "add", url: url.clone(), name: name.clone() };
            log.plan(&plan)?;
        }
        return Ok(());
    }

    let parsed = probe_feed(&url).await?;

    let title = name
        .or_else(|| document_title(&parsed))
        .unwrap_or_else(|| host_fallback(&url));
    let description = document_description(&parsed);

    let _s = log.span(&FeedPhase::Add).entered();
    let (feed, inserted) = db::upsert_feed(pool, &url, &title, description.as_deref()).await?;

    if inserted {
        log.info(format!("➕ Feed added — id={} title={}", feed.id, feed.title));
    } else {
        log.info(format!("♻️ Feed refreshed — id={} title={}", feed.id, feed.title));
    }
    if telemetry::config::json_mode() {
        let result = types::FeedAddResult { inserted, feed };
        log.result(&result)?;
    }
    Ok(())
}

async fn ls_feeds(pool: &PgPool) -> Result<()> {
    let log = telemetry::feed();
    let _s = log.span(&FeedPhase::List).entered();
    let feeds = db::list_feeds(pool).await?;

    log.info("📡 Feeds:");
    for row in &feeds {
        log.info(format!(
            "[{}] {} ({}) last_fetched_at={:?}",
            row.id, row.url, row.title, row.last_fetched_at
        ));
    }
    if telemetry::config::json_mode() {
        let list = types::FeedList { feeds };
        log.result(&list)?;
    }
    Ok(())
}

// Fetch and parse the document once so registration can derive a title and
// fail loudly on dead or unparseable feeds.
async fn probe_feed(url: &str) -> Result<ParsedFeed> {
    let log = telemetry::feed();
    let _s = log.span(&FeedPhase::Probe).entered();

    let client = Client::new();
    let response = client
        .get(url)
        .header(header::USER_AGENT, USER_AGENT)
        .header(header::ACCEPT, ACCEPT_HEADER)
        .send()
        .await?;

    if !response.status().is_success() {
        bail!("Feed responded with status {}", response.status().as_u16());
    }

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let body = response.text().await?;

    if looks_like_json(&content_type, &body) {
        let value: serde_json::Value = serde_json::from_str(&body)?;
        parse_feed(ParserInput::Json(value))
    } else {
        parse_feed(ParserInput::Text(&body))
    }
}

fn document_title(parsed: &ParsedFeed) -> Option<String> {
    match &parsed.document {
        FeedDocument::Rss(channel) => non_empty(channel.title()),
        FeedDocument::Atom(feed) => non_empty(&feed.title().to_string()),
        FeedDocument::Json(value) => json_scalar(value, "title"),
    }
}

fn document_description(parsed: &ParsedFeed) -> Option<String> {
    match &parsed.document {
        FeedDocument::Rss(channel) => non_empty(channel.description()),
        FeedDocument::Atom(feed) => feed.subtitle().and_then(|text| non_empty(&text.to_string())),
        FeedDocument::Json(value) => json_scalar(value, "description"),
    }
}

fn host_fallback(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(String::from))
        .unwrap_or_else(|| url.to_string())
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() { None } else { Some(value.to_string()) }
}
