use crate::catalog::{CatalogIndex, CatalogProject};
use url::Url;

const GITHUB_HOST: &str = "github.com";

/// Extracts the `org/repo` slug from a GitHub URL.
///
/// Only `github.com` URLs qualify. The slug is the first two path segments,
/// so repository pages, release feeds and tag links of one repository all map
/// to the same slug.
///
/// # Examples
///
/// ```
/// use firehose::catalog::extract_slug;
///
/// assert_eq!(
///     extract_slug("https://github.com/dapr/dapr/releases.atom").as_deref(),
///     Some("dapr/dapr")
/// );
/// assert_eq!(extract_slug("https://example.com/feed"), None);
/// ```
pub fn extract_slug(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    if parsed.host_str()? != GITHUB_HOST {
        return None;
    }

    let mut segments = parsed.path().trim_matches('/').split('/');
    let org = segments.next().filter(|s| !s.is_empty())?;
    let repo = segments.next().filter(|s| !s.is_empty())?;
    Some(format!("{org}/{repo}"))
}

/// Looks up the catalog project a feed belongs to. Pure, no I/O.
pub fn match_project<'a>(feed_url: &str, catalog: &'a CatalogIndex) -> Option<&'a CatalogProject> {
    let slug = extract_slug(feed_url)?;
    catalog.get(&slug)
}
