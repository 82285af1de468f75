use crate::catalog::CatalogIndex;
use crate::feed::fetcher::{fetch_single_feed, FeedFailure, FeedFetch, FetchOptions};
use crate::store::{
    CommitOutcome, EnrichedEntry, EntryStore, FailureCategory, FeedReport, FeedSource,
    FetchStatus,
};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Raised when too many feeds failed for the run's output to be trusted.
#[derive(Debug, Error)]
#[error(
    "Catastrophic failure: {failed} of {total} feeds failed ({:.1}% > {:.1}% threshold)",
    .rate * 100.0,
    .threshold * 100.0
)]
pub struct FailureThresholdExceeded {
    pub failed: usize,
    pub total: usize,
    pub rate: f64,
    pub threshold: f64,
}

/// Everything a completed fetch run produced.
#[derive(Debug)]
pub struct FetchOutcome {
    /// Validated entries, including one placeholder per failed feed
    pub store: EntryStore,
    /// One report per feed source, in completion order
    pub reports: Vec<FeedReport>,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl FetchOutcome {
    pub fn failure_rate(&self) -> f64 {
        failure_rate(self.failed, self.total)
    }
}

/// Fraction of failed feeds; zero when there were no feeds at all.
pub fn failure_rate(failed: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        failed as f64 / total as f64
    }
}

/// Fetches every source concurrently and collects the results.
///
/// No failure cancels its siblings: every fetch runs to completion (including
/// its own retries) before the outcome is evaluated. Each failed feed becomes
/// a placeholder entry so it stays visible in the output.
///
/// # Errors
///
/// Returns [`FailureThresholdExceeded`] when the share of failed feeds is
/// strictly greater than `options.failure_threshold`. Partial results are
/// discarded in that case.
pub async fn fetch_all(
    client: &reqwest::Client,
    sources: &[FeedSource],
    catalog: &CatalogIndex,
    options: &FetchOptions,
) -> Result<FetchOutcome, FailureThresholdExceeded> {
    let total = sources.len();
    let concurrency = options.max_concurrency.unwrap_or(total).max(1);
    tracing::info!(feeds = total, concurrency, "Fetching feeds");

    let results: Vec<(Result<FeedFetch, FeedFailure>, Duration)> = stream::iter(sources)
        .map(|source| async move {
            let started = Instant::now();
            let result = fetch_single_feed(client, source, catalog, options).await;
            (result, started.elapsed())
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    let mut store = EntryStore::new();
    let mut reports = Vec::with_capacity(total);
    let mut failed = 0;

    for (result, elapsed) in results {
        let duration_ms = elapsed.as_millis() as u64;
        match result {
            Ok(fetch) => {
                let mut stored = 0;
                for raw in fetch.entries {
                    let entry = EnrichedEntry::success(raw, fetch.fetched_at);
                    if store.commit(entry) == CommitOutcome::Stored {
                        stored += 1;
                    }
                }
                reports.push(FeedReport {
                    feed_url: fetch.feed_url,
                    status: FetchStatus::Success,
                    entries_count: stored,
                    error: None,
                    error_type: None,
                    fetched_at: fetch.fetched_at,
                    duration_ms,
                });
            }
            Err(failure) => {
                failed += 1;
                let classified = failure.classified();
                let fetched_at = Utc::now();
                tracing::error!(
                    feed = %failure.feed_url,
                    project = failure.project_name.as_deref().unwrap_or(""),
                    kind = %classified.kind,
                    error = %failure.error,
                    "Feed failed"
                );

                store.commit(EnrichedEntry::failed_feed(
                    &failure.feed_url,
                    &classified,
                    failure.project_name.as_deref(),
                    fetched_at,
                ));
                reports.push(FeedReport {
                    feed_url: failure.feed_url,
                    status: FetchStatus::Error,
                    entries_count: 0,
                    error: Some(failure.error.to_string()),
                    error_type: Some(FailureCategory::from_classified(&classified)),
                    fetched_at,
                    duration_ms,
                });
            }
        }
    }

    let succeeded = total - failed;
    let rate = failure_rate(failed, total);
    tracing::info!(
        succeeded,
        failed,
        entries = store.len(),
        failure_rate = rate,
        "Feed fetch complete"
    );

    if rate > options.failure_threshold {
        return Err(FailureThresholdExceeded {
            failed,
            total,
            rate,
            threshold: options.failure_threshold,
        });
    }

    Ok(FetchOutcome {
        store,
        reports,
        total,
        succeeded,
        failed,
    })
}
