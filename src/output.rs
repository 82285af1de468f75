//! JSON document written at the end of a run.

use crate::pipeline::PipelineRun;
use crate::store::{FeedReport, ValidatedEntry};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const SCHEMA_VERSION: &str = "1.0.0";

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to serialize output: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub feeds_total: usize,
    pub feeds_successful: usize,
    pub feeds_failed: usize,
    pub entries_total: usize,
    pub catalog_projects_total: usize,
    /// Distinct catalog projects that at least one healthy feed matched
    pub catalog_projects_matched: usize,
}

/// Wall-clock time spent in each pipeline stage.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Performance {
    pub catalog_fetch_ms: u64,
    pub feeds_fetch_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub schema_version: &'static str,
    pub generated_at: DateTime<Utc>,
    pub generated_by: String,
    pub build_duration_ms: u64,
    pub stats: Stats,
    pub performance: Performance,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputDocument {
    pub metadata: Metadata,
    /// Newest first
    pub entries: Vec<ValidatedEntry>,
    pub feeds: Vec<FeedReport>,
}

impl OutputDocument {
    pub fn new(run: PipelineRun, build_duration: Duration) -> Self {
        let PipelineRun {
            catalog,
            outcome,
            catalog_duration,
            fetch_duration,
        } = run;

        let entries = outcome.store.into_sorted();
        let matched: HashSet<&str> = entries
            .iter()
            .filter(|e| !e.is_error())
            .filter_map(|e| e.raw.project_name.as_deref())
            .filter(|name| !name.is_empty())
            .collect();

        let stats = Stats {
            feeds_total: outcome.total,
            feeds_successful: outcome.succeeded,
            feeds_failed: outcome.failed,
            entries_total: entries.len(),
            catalog_projects_total: catalog.len(),
            catalog_projects_matched: matched.len(),
        };

        Self {
            metadata: Metadata {
                schema_version: SCHEMA_VERSION,
                generated_at: Utc::now(),
                generated_by: concat!("firehose v", env!("CARGO_PKG_VERSION")).to_string(),
                build_duration_ms: build_duration.as_millis() as u64,
                stats,
                performance: Performance {
                    catalog_fetch_ms: catalog_duration.as_millis() as u64,
                    feeds_fetch_ms: fetch_duration.as_millis() as u64,
                },
            },
            entries,
            feeds: outcome.reports,
        }
    }

    pub fn to_json(&self) -> Result<String, OutputError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes the document to `path` without ever leaving a partial file.
    pub fn write_to(&self, path: &Path) -> Result<(), OutputError> {
        let json = self.to_json()?;
        write_atomic(path, json.as_bytes())
    }
}

fn io_error(path: &Path, source: std::io::Error) -> OutputError {
    OutputError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Write-to-temp-then-rename, so readers only ever see a complete file.
fn write_atomic(dst: &Path, content: &[u8]) -> Result<(), OutputError> {
    use std::time::{SystemTime, UNIX_EPOCH};

    // Unpredictable temp name; create_new refuses to follow a planted symlink
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let temp_path = dst.with_extension(format!("tmp.{suffix:016x}"));

    let mut temp_file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)
        .map_err(|e| io_error(&temp_path, e))?;

    let written = temp_file
        .write_all(content)
        .and_then(|()| temp_file.sync_all());
    drop(temp_file);
    if let Err(e) = written {
        let _ = std::fs::remove_file(&temp_path);
        return Err(io_error(&temp_path, e));
    }

    #[cfg(windows)]
    if dst.exists() {
        if let Err(e) = std::fs::remove_file(dst) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(io_error(dst, e));
        }
    }

    if let Err(e) = std::fs::rename(&temp_path, dst) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(io_error(dst, e));
    }

    tracing::info!(path = %dst.display(), bytes = content.len(), "Wrote output");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogIndex, CatalogProject};
    use crate::feed::{classify, FetchOutcome};
    use crate::store::{EnrichedEntry, EntryStore, FetchStatus, RawEntry};
    use chrono::TimeZone;

    fn sample_run() -> PipelineRun {
        let mut catalog = CatalogIndex::new();
        catalog.insert(
            "dapr/dapr".to_string(),
            CatalogProject {
                name: "Dapr".to_string(),
                description: None,
                repo_url: Some("https://github.com/dapr/dapr".to_string()),
                homepage_url: None,
                maturity: None,
            },
        );

        let now = Utc::now();
        let mut store = EntryStore::new();
        for (i, day) in [(1, 1), (2, 3)] {
            store.commit(EnrichedEntry::success(
                RawEntry {
                    title: format!("Dapr v1.13.{i}"),
                    link: format!("https://github.com/dapr/dapr/releases/tag/v1.13.{i}"),
                    feed_url: "https://github.com/dapr/dapr/releases.atom".to_string(),
                    project_name: Some("Dapr".to_string()),
                    iso_date: Utc.with_ymd_and_hms(2024, 3, day, 0, 0, 0).single(),
                    ..RawEntry::default()
                },
                now,
            ));
        }
        store.commit(EnrichedEntry::failed_feed(
            "https://example.com/broken.xml",
            &classify("HTTP error: status code 404", Some(404)),
            None,
            now,
        ));

        PipelineRun {
            catalog,
            outcome: FetchOutcome {
                store,
                reports: Vec::new(),
                total: 2,
                succeeded: 1,
                failed: 1,
            },
            catalog_duration: Duration::from_millis(120),
            fetch_duration: Duration::from_millis(840),
        }
    }

    #[test]
    fn test_document_stats_and_order() {
        let doc = OutputDocument::new(sample_run(), Duration::from_millis(1500));

        assert_eq!(doc.metadata.build_duration_ms, 1500);
        let stats = &doc.metadata.stats;
        assert_eq!(stats.feeds_total, 2);
        assert_eq!(stats.feeds_failed, 1);
        assert_eq!(stats.entries_total, 3);
        assert_eq!(stats.catalog_projects_total, 1);
        assert_eq!(stats.catalog_projects_matched, 1);
        assert_eq!(doc.metadata.performance.catalog_fetch_ms, 120);
        assert_eq!(doc.metadata.performance.feeds_fetch_ms, 840);

        assert_eq!(doc.entries[0].raw.title, "Dapr v1.13.2");
        assert_eq!(doc.entries[1].raw.title, "Dapr v1.13.1");
        assert_eq!(doc.entries[2].status, FetchStatus::Error);
    }

    #[test]
    fn test_json_shape() {
        let doc = OutputDocument::new(sample_run(), Duration::ZERO);
        let value: serde_json::Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();

        assert_eq!(value["metadata"]["schemaVersion"], "1.0.0");
        assert_eq!(value["metadata"]["stats"]["feedsSuccessful"], 1);
        assert_eq!(value["metadata"]["performance"]["catalogFetchMs"], 120);
        assert_eq!(value["metadata"]["performance"]["feedsFetchMs"], 840);
        assert_eq!(value["entries"][0]["projectName"], "Dapr");
        assert_eq!(value["entries"][0]["status"], "success");
        assert_eq!(value["entries"][2]["error"]["category"], "validation");
        assert!(value["feeds"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_write_to_replaces_existing_file() {
        let dir = std::env::temp_dir().join("firehose_output_test_write");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("releases.json");
        std::fs::write(&path, "stale").unwrap();

        let doc = OutputDocument::new(sample_run(), Duration::ZERO);
        doc.write_to(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"schemaVersion\": \"1.0.0\""));
        let leftovers = std::fs::read_dir(&dir)
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .map(|e| e.file_name().to_string_lossy().contains("tmp"))
                    .unwrap_or(false)
            })
            .count();
        assert_eq!(leftovers, 0);

        std::fs::remove_dir_all(&dir).ok();
    }
}
