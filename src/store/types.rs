use crate::catalog::{CatalogProject, Maturity};
use crate::feed::{ClassifiedError, ErrorKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Inputs
// ============================================================================

/// A feed to ingest, as listed in the configuration roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedSource {
    pub url: String,
    /// Overrides the feed's own `<title>` when set
    #[serde(default, alias = "name", alias = "display_name")]
    pub display_name: Option<String>,
}

impl FeedSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            display_name: None,
        }
    }
}

// ============================================================================
// Entries
// ============================================================================

/// One item parsed from a feed, optionally enriched with catalog metadata.
///
/// Fields mirror what downstream renderers consume; everything but `title`,
/// `link` and `feed_url` is optional. Nothing here is validated yet, see
/// [`ValidatedEntry`](crate::store::ValidatedEntry).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEntry {
    pub title: String,
    pub link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pub_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_snippet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iso_date: Option<DateTime<Utc>>,
    pub feed_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_maturity: Option<Maturity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_homepage: Option<String>,
}

impl RawEntry {
    /// Copies the catalog fields onto this entry.
    pub fn enrich(&mut self, project: &CatalogProject) {
        self.project_name = Some(project.name.clone());
        self.project_description = project.description.clone();
        self.project_maturity = project.maturity;
        self.project_homepage = project.homepage_url.clone();
    }

    /// Storage key: the guid when present, otherwise the link.
    pub fn key(&self) -> &str {
        match self.guid.as_deref() {
            Some(guid) if !guid.trim().is_empty() => guid,
            _ => &self.link,
        }
    }
}

/// Whether an entry came from a healthy feed or stands in for a failed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStatus {
    Success,
    Error,
}

/// Display-oriented bucket for a feed failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureCategory {
    Network,
    Parse,
    Validation,
    Timeout,
}

impl FailureCategory {
    /// Timeouts and DNS failures → `Timeout`, parse failures → `Parse`,
    /// 4xx statuses → `Validation`, everything else → `Network`.
    pub fn from_classified(err: &ClassifiedError) -> Self {
        let message = err.message.to_lowercase();
        if message.contains("timeout") || message.contains("dns") {
            FailureCategory::Timeout
        } else if message.contains("parse") {
            FailureCategory::Parse
        } else if matches!(err.status_code, Some(400..=499)) {
            FailureCategory::Validation
        } else {
            FailureCategory::Network
        }
    }
}

impl std::fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FailureCategory::Network => "network",
            FailureCategory::Parse => "parse",
            FailureCategory::Validation => "validation",
            FailureCategory::Timeout => "timeout",
        };
        f.write_str(s)
    }
}

/// Error details carried by a failed-feed placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryError {
    pub kind: ErrorKind,
    pub message: String,
    pub category: FailureCategory,
}

/// A [`RawEntry`] plus pipeline metadata, ready for validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedEntry {
    #[serde(flatten)]
    pub raw: RawEntry,
    pub status: FetchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<EntryError>,
    pub fetched_at: DateTime<Utc>,
}

impl EnrichedEntry {
    /// Wraps an entry parsed from a healthy feed.
    pub fn success(raw: RawEntry, fetched_at: DateTime<Utc>) -> Self {
        Self {
            raw,
            status: FetchStatus::Success,
            error: None,
            fetched_at,
        }
    }

    /// Builds the placeholder that keeps a failed feed visible in the output.
    ///
    /// The title names the project when the feed matched the catalog, and
    /// falls back to the feed URL otherwise. The link is the feed URL itself.
    pub fn failed_feed(
        feed_url: &str,
        error: &ClassifiedError,
        project_name: Option<&str>,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        let label = project_name.unwrap_or(feed_url);
        let raw = RawEntry {
            title: format!("Feed Error: {label}"),
            link: feed_url.to_string(),
            feed_url: feed_url.to_string(),
            project_name: project_name.map(str::to_string),
            ..RawEntry::default()
        };

        Self {
            raw,
            status: FetchStatus::Error,
            error: Some(EntryError {
                kind: error.kind,
                message: error.to_string(),
                category: FailureCategory::from_classified(error),
            }),
            fetched_at,
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == FetchStatus::Error
    }
}

// ============================================================================
// Per-feed reporting
// ============================================================================

/// Outcome of one feed fetch, reported alongside the entry collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedReport {
    pub feed_url: String,
    pub status: FetchStatus,
    pub entries_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<FailureCategory>,
    pub fetched_at: DateTime<Utc>,
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::classify;

    #[test]
    fn test_key_prefers_guid() {
        let mut entry = RawEntry {
            link: "https://example.com/a".into(),
            guid: Some("tag:github.com,2008:Repository/1/v1.0.0".into()),
            ..RawEntry::default()
        };
        assert_eq!(entry.key(), "tag:github.com,2008:Repository/1/v1.0.0");

        entry.guid = Some("   ".into());
        assert_eq!(entry.key(), "https://example.com/a");

        entry.guid = None;
        assert_eq!(entry.key(), "https://example.com/a");
    }

    #[test]
    fn test_enrich_copies_catalog_fields() {
        let project = CatalogProject {
            name: "Dapr".into(),
            description: Some("Portable runtime".into()),
            repo_url: Some("https://github.com/dapr/dapr".into()),
            homepage_url: Some("https://dapr.io".into()),
            maturity: Some(Maturity::Graduated),
        };
        let mut entry = RawEntry::default();
        entry.enrich(&project);

        assert_eq!(entry.project_name.as_deref(), Some("Dapr"));
        assert_eq!(entry.project_description.as_deref(), Some("Portable runtime"));
        assert_eq!(entry.project_maturity, Some(Maturity::Graduated));
        assert_eq!(entry.project_homepage.as_deref(), Some("https://dapr.io"));
    }

    #[test]
    fn test_failed_feed_placeholder_uses_project_name() {
        let err = classify("Not Found", Some(404));
        let entry = EnrichedEntry::failed_feed(
            "https://github.com/dapr/dapr/releases.atom",
            &err,
            Some("Dapr"),
            Utc::now(),
        );

        assert_eq!(entry.raw.title, "Feed Error: Dapr");
        assert_eq!(entry.raw.link, "https://github.com/dapr/dapr/releases.atom");
        assert!(entry.is_error());
        let details = entry.error.unwrap();
        assert_eq!(details.kind, ErrorKind::Permanent);
        assert_eq!(details.category, FailureCategory::Validation);
    }

    #[test]
    fn test_failed_feed_placeholder_falls_back_to_url() {
        let err = classify("request timed out", None);
        let entry =
            EnrichedEntry::failed_feed("https://example.com/feed.xml", &err, None, Utc::now());
        assert_eq!(entry.raw.title, "Feed Error: https://example.com/feed.xml");
        assert_eq!(entry.error.unwrap().category, FailureCategory::Timeout);
    }

    #[test]
    fn test_failure_categories() {
        assert_eq!(
            FailureCategory::from_classified(&classify("Parse error: bad xml", None)),
            FailureCategory::Parse
        );
        assert_eq!(
            FailureCategory::from_classified(&classify("dns error", None)),
            FailureCategory::Timeout
        );
        assert_eq!(
            FailureCategory::from_classified(&classify("boom", Some(503))),
            FailureCategory::Network
        );
        assert_eq!(
            FailureCategory::from_classified(&classify("gone", Some(410))),
            FailureCategory::Validation
        );
    }

    #[test]
    fn test_serialized_shape_is_camel_case() {
        let entry = EnrichedEntry::success(
            RawEntry {
                title: "v1.0.0".into(),
                link: "https://example.com/v1.0.0".into(),
                feed_url: "https://example.com/feed".into(),
                content_snippet: Some("notes".into()),
                ..RawEntry::default()
            },
            Utc::now(),
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["title"], "v1.0.0");
        assert_eq!(json["feedUrl"], "https://example.com/feed");
        assert_eq!(json["contentSnippet"], "notes");
        assert_eq!(json["status"], "success");
        assert!(json.get("error").is_none());
        assert!(json.get("projectName").is_none());
    }
}
