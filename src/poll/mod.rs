use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Args;
use reqwest::Client;
use sqlx::PgPool;
use tokio::task::JoinSet;

use crate::feed::types::FeedRow;
use crate::fetch::{self, FetchError};
use crate::telemetry;
use crate::telemetry::emit::Meta;
use crate::telemetry::ops::poll::Phase as PollPhase;

mod db;
pub mod types;

use types::{DueFeedSample, FeedErrorInfo, FeedResult, PollPlan, PollSummary};

pub const DEFAULT_REFRESH_MINS: i64 = 15;
pub const DEFAULT_WAVE_SIZE: usize = 5;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// groupfeeder poll — fetch every due feed once
#[derive(Args)]
pub struct PollCmd {
    #[arg(long, default_value_t = false)]
    pub apply: bool,
    /// Feeds fetched concurrently within one wave
    #[arg(long, default_value_t = DEFAULT_WAVE_SIZE)]
    pub wave_size: usize,
    /// Hard per-feed deadline
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,
    /// A feed is due once its last fetch is older than this
    #[arg(long, default_value_t = DEFAULT_REFRESH_MINS)]
    pub refresh_mins: i64,
    #[arg(long, default_value_t = 10)]
    pub plan_limit: usize,
}

pub async fn run(pool: &PgPool, args: PollCmd) -> Result<()> {
    let log = telemetry::poll();
    let _g = log
        .root_span_kv([
            ("mode", if args.apply { "apply".to_string() } else { "plan".to_string() }),
            ("wave_size", args.wave_size.to_string()),
            ("timeout_secs", args.timeout_secs.to_string()),
            ("refresh_mins", args.refresh_mins.to_string()),
        ])
        .entered();

    let started = Instant::now();

    let _select_span = log.span(&PollPhase::Select).entered();
    let cutoff = chrono::Utc::now() - chrono::Duration::minutes(args.refresh_mins);
    let feeds = db::select_due_feeds(pool, cutoff).await?;
    drop(_select_span);

    if !args.apply {
        log.info(format!(
            "📝 Poll plan — due={} wave_size={} timeout={}s",
            feeds.len(),
            args.wave_size,
            args.timeout_secs
        ));
        for feed in feeds.iter().take(args.plan_limit) {
            log.info(format!("  feed_id={} url={} last_fetched_at={:?}", feed.id, feed.url, feed.last_fetched_at));
        }
        if feeds.len() > args.plan_limit {
            log.info(format!("  ... ({} more)", feeds.len() - args.plan_limit));
        }
        log.info("   Use --apply to execute.");
        if telemetry::config::json_mode() {
            let samples: Vec<DueFeedSample> = feeds
                .iter()
                .take(args.plan_limit)
                .map(|f| DueFeedSample { feed_id: f.id, url: f.url.clone(), title: f.title.clone() })
                .collect();
            let plan = PollPlan {
                due_feeds: feeds.len(),
                wave_size: args.wave_size,
                timeout_secs: args.timeout_secs,
                sample_feeds: samples,
            };
            log.plan(&plan)?;
        }
        return Ok(());
    }

    let client = Client::new();
    let summary = run_batch(
        pool,
        &client,
        feeds,
        args.wave_size,
        Duration::from_secs(args.timeout_secs),
    )
    .await;

    log.totals(
        summary.total_feeds,
        summary.successes,
        summary.failures,
        summary.updated_feeds,
        summary.articles_created,
        summary.articles_skipped,
    );

    if telemetry::config::json_mode() {
        let meta = Meta { duration_ms: Some(started.elapsed().as_millis()) };
        log.result_meta(&summary, meta)?;
    }
    Ok(())
}

/// Fetch every given feed once: sequential waves, concurrent within a wave,
/// one hard timeout per feed. Safe to call again immediately; feeds with no
/// new upstream content commit nothing.
pub async fn run_batch(
    pool: &PgPool,
    client: &Client,
    feeds: Vec<FeedRow>,
    wave_size: usize,
    timeout: Duration,
) -> PollSummary {
    let log = telemetry::poll();
    let mut results: Vec<FeedResult> = Vec::with_capacity(feeds.len());

    for wave in waves(feeds, wave_size) {
        let _wave_span = log
            .span_kv(&PollPhase::Wave, [("feeds", wave.len().to_string())])
            .entered();

        let mut set = JoinSet::new();
        let mut feed_ids: HashMap<tokio::task::Id, i64> = HashMap::new();

        for feed in wave {
            let pool = pool.clone();
            let client = client.clone();
            let feed_id = feed.id;
            let handle = set.spawn(async move { process_feed(&pool, &client, feed, timeout).await });
            feed_ids.insert(handle.id(), feed_id);
        }

        // completion order, not submission order
        while let Some(joined) = set.join_next_with_id().await {
            match joined {
                Ok((_, result)) => {
                    log.debug_kv("feed done", [("feed_id", result.feed_id().to_string())]);
                    results.push(result);
                }
                Err(join_err) => {
                    let feed_id = feed_ids.get(&join_err.id()).copied().unwrap_or_default();
                    log.error_kv(
                        "feed task failed",
                        [("feed_id", feed_id.to_string()), ("error", join_err.to_string())],
                    );
                    results.push(error_result(
                        feed_id,
                        &FetchError::Unknown { message: format!("feed task failed: {join_err}") },
                    ));
                }
            }
        }
    }

    let _agg_span = log.span(&PollPhase::Aggregate).entered();
    summarize(results)
}

async fn process_feed(
    pool: &PgPool,
    client: &Client,
    feed: FeedRow,
    timeout: Duration,
) -> FeedResult {
    let log = telemetry::poll();

    match with_timeout(timeout, fetch::fetch_feed(pool, client, &feed)).await {
        Ok(data) => FeedResult::Success { feed_id: feed.id, data },
        Err(err) => {
            log.warn_kv(
                "feed fetch failed",
                [
                    ("feed_id", feed.id.to_string()),
                    ("code", err.code().to_string()),
                    ("error", err.to_string()),
                ],
            );
            error_result(feed.id, &err)
        }
    }
}

// Racing the fetch against a deadline; losing drops the fetch future, which
// aborts the in-flight request rather than leaking it.
async fn with_timeout<T, F>(timeout: Duration, fut: F) -> Result<T, FetchError>
where
    F: Future<Output = Result<T, FetchError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout { timeout_secs: timeout.as_secs() }),
    }
}

fn error_result(feed_id: i64, err: &FetchError) -> FeedResult {
    FeedResult::Error {
        feed_id,
        error: FeedErrorInfo { code: err.code().to_string(), message: err.to_string() },
    }
}

fn waves<T>(items: Vec<T>, size: usize) -> Vec<Vec<T>> {
    if size == 0 {
        return vec![items];
    }

    let mut out: Vec<Vec<T>> = Vec::new();
    let mut current = Vec::with_capacity(size);
    for item in items {
        current.push(item);
        if current.len() == size {
            out.push(std::mem::replace(&mut current, Vec::with_capacity(size)));
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn summarize(results: Vec<FeedResult>) -> PollSummary {
    let mut summary = PollSummary {
        total_feeds: results.len(),
        successes: 0,
        failures: 0,
        updated_feeds: 0,
        articles_created: 0,
        articles_skipped: 0,
        results: Vec::new(),
    };

    for result in &results {
        match result {
            FeedResult::Success { data, .. } => {
                summary.successes += 1;
                if data.updated {
                    summary.updated_feeds += 1;
                }
                summary.articles_created += data.articles_created;
                summary.articles_skipped += data.articles_skipped;
            }
            FeedResult::Error { .. } => summary.failures += 1,
        }
    }

    summary.results = results;
    summary
}

#[cfg(test)]
mod tests {
    use super::types::{FeedErrorInfo, FeedResult};
    use super::{FetchError, summarize, waves, with_timeout};
    use crate::fetch::FetchOutcome;
    use chrono::Utc;
    use std::time::Duration;

    #[test]
    fn twelve_feeds_at_wave_size_five_split_five_five_two() {
        let sizes: Vec<usize> = waves((0..12).collect(), 5).iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![5, 5, 2]);
    }

    #[test]
    fn wave_size_zero_means_one_wave() {
        let sizes: Vec<usize> = waves((0..7).collect(), 0).iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![7]);
    }

    #[test]
    fn empty_input_means_no_waves() {
        assert!(waves(Vec::<i64>::new(), 5).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn a_stalled_fetch_times_out_with_its_own_code() {
        let result =
            with_timeout::<FetchOutcome, _>(Duration::from_secs(30), std::future::pending()).await;

        let err = result.unwrap_err();
        assert_eq!(err.code(), "TIMEOUT");
        assert!(err.to_string().contains("30s"));
    }

    #[tokio::test]
    async fn a_fast_fetch_passes_through_the_timeout() {
        let outcome = FetchOutcome {
            feed_id: 1,
            status: 200,
            updated: true,
            fetched_at: Utc::now(),
            articles_created: 2,
            articles_skipped: 1,
        };

        let result = with_timeout(Duration::from_secs(30), async { Ok(outcome) }).await;
        assert_eq!(result.unwrap().articles_created, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn a_timeout_error_does_not_leak_into_other_results() {
        // two fetches racing in one wave: one stalls, one finishes
        let slow = with_timeout::<FetchOutcome, _>(Duration::from_secs(30), std::future::pending());
        let fast = with_timeout(Duration::from_secs(30), async {
            Ok(FetchOutcome {
                feed_id: 2,
                status: 200,
                updated: false,
                fetched_at: Utc::now(),
                articles_created: 0,
                articles_skipped: 3,
            })
        });

        let (slow_result, fast_result) = tokio::join!(slow, fast);
        assert_eq!(slow_result.unwrap_err().code(), "TIMEOUT");
        assert!(fast_result.is_ok());
    }

    #[test]
    fn summaries_aggregate_successes_and_failures() {
        let results = vec![
            FeedResult::Success {
                feed_id: 1,
                data: FetchOutcome {
                    feed_id: 1,
                    status: 200,
                    updated: true,
                    fetched_at: Utc::now(),
                    articles_created: 3,
                    articles_skipped: 1,
                },
            },
            FeedResult::Success {
                feed_id: 2,
                data: FetchOutcome {
                    feed_id: 2,
                    status: 304,
                    updated: false,
                    fetched_at: Utc::now(),
                    articles_created: 0,
                    articles_skipped: 0,
                },
            },
            FeedResult::Error {
                feed_id: 3,
                error: FeedErrorInfo {
                    code: FetchError::Timeout { timeout_secs: 30 }.code().to_string(),
                    message: "feed fetch exceeded 30s timeout".to_string(),
                },
            },
        ];

        let summary = summarize(results);

        assert_eq!(summary.total_feeds, 3);
        assert_eq!(summary.successes, 2);
        assert_eq!(summary.failures, 1);
        assert_eq!(summary.updated_feeds, 1);
        assert_eq!(summary.articles_created, 3);
        assert_eq!(summary.articles_skipped, 1);
        assert_eq!(summary.results.len(), 3);
        assert_eq!(summary.results[2].feed_id(), 3);
    }
}
