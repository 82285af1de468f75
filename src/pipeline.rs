//! One complete ingestion run: catalog first, then every feed.

use crate::catalog::{fetch_catalog, load_catalog_file, CatalogError, CatalogIndex};
use crate::config::Config;
use crate::feed::{fetch_all, FailureThresholdExceeded, FetchOutcome};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Failures that abort a run. Individual feed failures never do on their own.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to load project catalog: {0}")]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    TooManyFailures(#[from] FailureThresholdExceeded),
}

#[derive(Debug)]
pub struct PipelineRun {
    pub catalog: CatalogIndex,
    pub outcome: FetchOutcome,
    pub catalog_duration: Duration,
    pub fetch_duration: Duration,
}

/// Loads the catalog from `catalog_path` when set, otherwise downloads it.
pub async fn load_catalog(
    client: &reqwest::Client,
    config: &Config,
) -> Result<CatalogIndex, CatalogError> {
    match &config.catalog_path {
        Some(path) => load_catalog_file(path),
        None => {
            fetch_catalog(
                client,
                &config.catalog_url,
                config.fetch_timeout(),
                &config.retry,
            )
            .await
        }
    }
}

/// Runs the pipeline end to end.
///
/// The catalog is built once before any feed is requested and is only read
/// afterwards. A catalog failure is fatal since unmatched output would
/// silently lose all project metadata.
pub async fn run(client: &reqwest::Client, config: &Config) -> Result<PipelineRun, PipelineError> {
    let started = Instant::now();
    let catalog = load_catalog(client, config).await?;
    let catalog_duration = started.elapsed();

    let started = Instant::now();
    let outcome = fetch_all(client, &config.feeds, &catalog, &config.to_fetch_options()).await?;
    let fetch_duration = started.elapsed();

    tracing::info!(
        projects = catalog.len(),
        entries = outcome.store.len(),
        catalog_ms = catalog_duration.as_millis() as u64,
        fetch_ms = fetch_duration.as_millis() as u64,
        "Pipeline run finished"
    );

    Ok(PipelineRun {
        catalog,
        outcome,
        catalog_duration,
        fetch_duration,
    })
}
