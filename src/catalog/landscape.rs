//! CNCF landscape-style catalog documents.
//!
//! Structure: `landscape` → categories → `subcategories` → `items`. Each item
//! may carry `name`, `repo_url`, `homepage_url`, `project` (maturity) and an
//! `extra` map holding free-text summaries. Parsing is permissive: malformed
//! branches are skipped rather than failing the whole document.

use crate::catalog::{extract_slug, CatalogIndex, CatalogProject, Maturity};
use crate::feed::{
    classify, read_limited_bytes, retry_with_backoff, ClassifiedError, Classify, FetchError,
    RetryConfig,
};
use serde_yml::Value;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

const MAX_CATALOG_SIZE: usize = 50 * 1024 * 1024; // 50MB

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Catalog HTTP error: status code {0}")]
    HttpStatus(u16),
    #[error("Catalog request timed out after {0:?}")]
    Timeout(Duration),
    #[error("Catalog too large")]
    TooLarge,
    #[error("Catalog download failed: {0}")]
    Download(#[source] FetchError),
    #[error("Invalid YAML in catalog: {0}")]
    Parse(String),
    #[error("Failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),
}

impl From<FetchError> for CatalogError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::ResponseTooLarge => CatalogError::TooLarge,
            FetchError::Network(e) => CatalogError::Network(e),
            FetchError::HttpStatus(code) => CatalogError::HttpStatus(code),
            FetchError::Timeout(d) => CatalogError::Timeout(d),
            other => CatalogError::Download(other),
        }
    }
}

impl Classify for CatalogError {
    fn classify(&self) -> ClassifiedError {
        match self {
            CatalogError::HttpStatus(code) => classify(&self.to_string(), Some(*code)),
            CatalogError::Network(e) => classify(&self.to_string(), e.status().map(|s| s.as_u16())),
            _ => classify(&self.to_string(), None),
        }
    }
}

/// Downloads and parses the catalog at `url`, retrying transient failures.
pub async fn fetch_catalog(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
    retry: &RetryConfig,
) -> Result<CatalogIndex, CatalogError> {
    tracing::info!(url = %url, "Fetching catalog");

    let text = retry_with_backoff(
        || download(client, url, timeout, MAX_CATALOG_SIZE),
        retry,
        url,
    )
    .await?;
    tracing::debug!(bytes = text.len(), "Catalog downloaded");

    let index = parse_landscape(&text)?;
    tracing::info!(projects = index.len(), "Parsed catalog");
    Ok(index)
}

/// Reads and parses a catalog stored on disk.
pub fn load_catalog_file(path: &Path) -> Result<CatalogIndex, CatalogError> {
    let text = std::fs::read_to_string(path)?;
    let index = parse_landscape(&text)?;
    tracing::info!(path = %path.display(), projects = index.len(), "Loaded catalog file");
    Ok(index)
}

async fn download(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
    limit: usize,
) -> Result<String, CatalogError> {
    let response = tokio::time::timeout(timeout, client.get(url).send())
        .await
        .map_err(|_| CatalogError::Timeout(timeout))??;

    if !response.status().is_success() {
        return Err(CatalogError::HttpStatus(response.status().as_u16()));
    }

    let bytes = tokio::time::timeout(timeout, read_limited_bytes(response, limit))
        .await
        .map_err(|_| CatalogError::Timeout(timeout))??;
    String::from_utf8(bytes).map_err(|e| CatalogError::Parse(e.to_string()))
}

/// Parses a landscape document into a slug-keyed index.
///
/// Items without a GitHub `repo_url` cannot be matched to feeds and are
/// skipped. A document without a top-level `landscape` list yields an empty
/// index.
pub fn parse_landscape(text: &str) -> Result<CatalogIndex, CatalogError> {
    let doc: Value = serde_yml::from_str(text).map_err(|e| CatalogError::Parse(e.to_string()))?;
    let mut index = CatalogIndex::new();

    let Some(categories) = doc.get("landscape").and_then(Value::as_sequence) else {
        tracing::warn!("No landscape list found in catalog document");
        return Ok(index);
    };

    let items = categories
        .iter()
        .filter_map(|category| category.get("subcategories")?.as_sequence())
        .flatten()
        .filter_map(|subcategory| subcategory.get("items")?.as_sequence())
        .flatten();

    for item in items {
        let Some(project) = parse_item(item) else {
            continue;
        };
        let Some(slug) = project.repo_url.as_deref().and_then(extract_slug) else {
            continue;
        };
        index.insert(slug, project);
    }

    Ok(index)
}

fn parse_item(item: &Value) -> Option<CatalogProject> {
    if !item.is_mapping() {
        return None;
    }

    let text = |key: &str| {
        item.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let extra = item.get("extra");
    let extra_text = |key: &str| extra.and_then(|e| e.get(key)).and_then(Value::as_str);

    let description = extra_text("summary_use_case")
        .or_else(|| extra_text("summary_business_use_case"))
        .or_else(|| item.get("description").and_then(Value::as_str))
        .map(collapse_whitespace)
        .filter(|s| !s.is_empty());

    Some(CatalogProject {
        name: text("name").unwrap_or_default(),
        description,
        repo_url: text("repo_url"),
        homepage_url: text("homepage_url"),
        maturity: item.get("project").and_then(Value::as_str).and_then(Maturity::parse),
    })
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::ErrorKind;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LANDSCAPE: &str = r#"
landscape:
  - category:
    name: Orchestration & Management
    subcategories:
      - subcategory:
        name: Application Definition
        items:
          - item:
            name: Dapr
            homepage_url: https://dapr.io/
            repo_url: https://github.com/dapr/dapr
            project: graduated
            extra:
              summary_use_case: >
                Building microservice
                applications   with portable APIs.
          - item:
            name: Some Product
            homepage_url: https://product.example.com
          - item:
            name: Archived Thing
            repo_url: https://github.com/old/thing
            project: archived
            description: "  An   old   thing  "
  - category:
    name: Runtime
    subcategories:
      - subcategory:
        name: Container Runtime
        items:
          - item:
            name: WasmEdge Runtime
            repo_url: https://github.com/WasmEdge/WasmEdge
            project: sandbox
            extra:
              summary_business_use_case: Lightweight runtime.
          - item:
            name: WasmEdge Runtime (Wasm)
            repo_url: https://github.com/WasmEdge/WasmEdge
            project: sandbox
          - item:
            name: Not On GitHub
            repo_url: https://gitlab.com/group/project
  - category:
    name: Empty
"#;

    #[test]
    fn test_parse_nested_structure() {
        let index = parse_landscape(LANDSCAPE).unwrap();
        assert_eq!(index.len(), 3);

        let dapr = index.get("dapr/dapr").unwrap();
        assert_eq!(dapr.name, "Dapr");
        assert_eq!(dapr.maturity, Some(Maturity::Graduated));
        assert_eq!(dapr.homepage_url.as_deref(), Some("https://dapr.io/"));
        assert_eq!(
            dapr.description.as_deref(),
            Some("Building microservice applications with portable APIs.")
        );
    }

    #[test]
    fn test_unknown_maturity_and_description_fallback() {
        let index = parse_landscape(LANDSCAPE).unwrap();
        let archived = index.get("old/thing").unwrap();
        assert_eq!(archived.maturity, None);
        assert_eq!(archived.description.as_deref(), Some("An old thing"));
    }

    #[test]
    fn test_duplicate_listing_prefers_plain_name() {
        let index = parse_landscape(LANDSCAPE).unwrap();
        let wasmedge = index.get("WasmEdge/WasmEdge").unwrap();
        assert_eq!(wasmedge.name, "WasmEdge Runtime");
        assert_eq!(wasmedge.description.as_deref(), Some("Lightweight runtime."));
    }

    #[test]
    fn test_missing_landscape_key_yields_empty_index() {
        let index = parse_landscape("other: 1\n").unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_invalid_yaml_is_permanent_error() {
        let err = parse_landscape("landscape: [unclosed").unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)));
        assert_eq!(err.classify().kind, ErrorKind::Permanent);
    }

    #[test]
    fn test_non_mapping_items_skipped() {
        let doc = r#"
landscape:
  - subcategories:
      - items:
          - just a string
          - name: Helm
            repo_url: https://github.com/helm/helm
"#;
        let index = parse_landscape(doc).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.get("helm/helm").unwrap().name, "Helm");
    }

    #[tokio::test]
    async fn test_fetch_catalog_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/landscape.yml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LANDSCAPE))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let index = fetch_catalog(
            &client,
            &format!("{}/landscape.yml", server.uri()),
            Duration::from_secs(10),
            &RetryConfig::default(),
        )
        .await
        .unwrap();
        assert_eq!(index.len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_catalog_404_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let err = fetch_catalog(
            &client,
            &format!("{}/landscape.yml", server.uri()),
            Duration::from_secs(10),
            &RetryConfig::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CatalogError::HttpStatus(404)));
    }

    #[tokio::test]
    async fn test_download_stops_at_size_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/landscape.yml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LANDSCAPE))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/landscape.yml", server.uri());

        let err = download(&client, &url, Duration::from_secs(10), 64)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::TooLarge));

        let text = download(&client, &url, Duration::from_secs(10), LANDSCAPE.len())
            .await
            .unwrap();
        assert_eq!(text, LANDSCAPE);
    }

    #[test]
    fn test_load_catalog_file() {
        let dir = std::env::temp_dir().join("firehose_catalog_test_file");
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("landscape.yml");
        std::fs::write(&file, LANDSCAPE).unwrap();

        let index = load_catalog_file(&file).unwrap();
        assert!(index.get("dapr/dapr").is_some());

        std::fs::remove_dir_all(&dir).ok();
    }
}
