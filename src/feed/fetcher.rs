use crate::catalog::{match_project, CatalogIndex, CatalogProject};
use crate::feed::classify::{classify, ClassifiedError, Classify};
use crate::feed::parser::{parse_feed, ParsedFeed};
use crate::feed::retry::{retry_with_backoff, RetryConfig};
use crate::store::{FeedSource, RawEntry};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors from a single fetch attempt.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {}", error_chain(.0))]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status code {0}")]
    HttpStatus(u16),
    /// Attempt exceeded the per-attempt timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    /// Feed XML could not be parsed as RSS or Atom
    #[error("Parse error: {0}")]
    Parse(String),
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
}

impl FetchError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            FetchError::HttpStatus(code) => Some(*code),
            FetchError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl Classify for FetchError {
    fn classify(&self) -> ClassifiedError {
        let message = match self {
            FetchError::Network(e) if e.is_timeout() => format!("request timed out: {self}"),
            _ => self.to_string(),
        };
        classify(&message, self.status_code())
    }
}

/// reqwest's Display stops at the outermost error; the causes carry the
/// DNS/connection details the classifier looks for.
fn error_chain(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// A feed that could not be fetched, even after retries.
///
/// Carries enough context for the orchestrator to report which project failed.
#[derive(Debug, Error)]
#[error("Failed to fetch {feed_url}: {error}")]
pub struct FeedFailure {
    pub feed_url: String,
    #[source]
    pub error: FetchError,
    pub project_name: Option<String>,
}

impl FeedFailure {
    pub fn classified(&self) -> ClassifiedError {
        self.error.classify()
    }
}

/// Entries from one successfully fetched feed, in feed order.
#[derive(Debug, Clone)]
pub struct FeedFetch {
    pub feed_url: String,
    pub feed_title: Option<String>,
    pub project_name: Option<String>,
    pub entries: Vec<RawEntry>,
    pub fetched_at: DateTime<Utc>,
}

/// Per-run fetch settings.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Timeout applied to each individual attempt
    pub timeout: Duration,
    pub retry: RetryConfig,
    /// Upper bound on in-flight fetches; `None` fetches every feed at once
    pub max_concurrency: Option<usize>,
    /// Failure rate above which the whole run is aborted
    pub failure_threshold: f64,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            retry: RetryConfig::default(),
            max_concurrency: None,
            failure_threshold: 0.5,
        }
    }
}

/// Fetches and parses one feed, enriching its entries from the catalog.
///
/// Download and parse run together inside the retry engine, so transient
/// network failures are retried while malformed documents fail at once.
///
/// # Errors
///
/// Returns a [`FeedFailure`] naming the feed and, when the feed matched the
/// catalog, its project.
pub async fn fetch_single_feed(
    client: &reqwest::Client,
    source: &FeedSource,
    catalog: &CatalogIndex,
    options: &FetchOptions,
) -> Result<FeedFetch, FeedFailure> {
    let project = match_project(&source.url, catalog);
    if let Some(p) = project {
        tracing::debug!(
            feed = %source.url,
            project = %p.name,
            maturity = ?p.maturity,
            "Matched feed to catalog project"
        );
    }

    let result = retry_with_backoff(
        || fetch_and_parse(client, &source.url, options.timeout),
        &options.retry,
        &source.url,
    )
    .await;

    let parsed = match result {
        Ok(parsed) => parsed,
        Err(error) => {
            return Err(FeedFailure {
                feed_url: source.url.clone(),
                error,
                project_name: project.map(|p| p.name.clone()),
            });
        }
    };

    let fetched_at = Utc::now();
    let (feed_title, entries) = build_entries(parsed, source, project);
    tracing::info!(
        feed = %source.url,
        title = feed_title.as_deref().unwrap_or(""),
        entries = entries.len(),
        "Fetched feed"
    );

    Ok(FeedFetch {
        feed_url: source.url.clone(),
        feed_title,
        project_name: project.map(|p| p.name.clone()),
        entries,
        fetched_at,
    })
}

async fn fetch_and_parse(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<ParsedFeed, FetchError> {
    let bytes = tokio::time::timeout(timeout, download(client, url))
        .await
        .map_err(|_| FetchError::Timeout(timeout))??;

    parse_feed(&bytes).map_err(|e| FetchError::Parse(e.to_string()))
}

async fn download(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, FetchError> {
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        return Err(FetchError::HttpStatus(response.status().as_u16()));
    }

    read_limited_bytes(response, MAX_FEED_SIZE).await
}

/// Maps parsed items to entries, applying the display-name override and
/// catalog enrichment.
pub(crate) fn build_entries(
    parsed: ParsedFeed,
    source: &FeedSource,
    project: Option<&CatalogProject>,
) -> (Option<String>, Vec<RawEntry>) {
    let feed_title = source.display_name.clone().or(parsed.title);

    let entries = parsed
        .items
        .into_iter()
        .map(|item| {
            let mut entry = RawEntry {
                title: item.title,
                link: item.link.unwrap_or_default(),
                pub_date: item.published.map(|d| d.to_rfc2822()),
                content: item.content,
                content_snippet: item.summary,
                guid: item.guid,
                iso_date: item.published,
                feed_url: source.url.clone(),
                feed_title: feed_title.clone(),
                ..RawEntry::default()
            };
            if let Some(project) = project {
                entry.enrich(project);
            }
            entry
        })
        .collect();

    (feed_title, entries)
}

/// Streams the body, failing as soon as it grows past `limit` bytes.
///
/// Content-Length is checked up front but not trusted: a missing or lying
/// header still cannot push the buffer past the cap.
pub(crate) async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();

    if let Some(len) = expected_length {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
