//! Version numbers embedded in release titles.
//!
//! Parsing is deliberately permissive: the first `vMAJOR.MINOR.PATCH[-PRE]`
//! looking substring anywhere in the title wins.

use regex::Regex;
use serde::Serialize;
use std::cmp::Ordering;
use std::sync::OnceLock;

static SEMVER_RE: OnceLock<Option<Regex>> = OnceLock::new();

fn semver_re() -> Option<&'static Regex> {
    SEMVER_RE
        .get_or_init(|| Regex::new(r"\bv?(\d+)\.(\d+)\.(\d+)(?:-([a-zA-Z0-9.-]+))?\b").ok())
        .as_ref()
}

#[derive(Debug, Clone, Serialize)]
pub struct SemanticVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Option<String>,
    /// The exact substring matched in the title
    pub original: String,
}

impl SemanticVersion {
    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }
}

/// Ordering and equality ignore `original`, so `v1.2.3` equals `1.2.3`.
impl PartialEq for SemanticVersion {
    fn eq(&self, other: &Self) -> bool {
        compare_versions(self, other) == Ordering::Equal
    }
}

impl Eq for SemanticVersion {}

impl PartialOrd for SemanticVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SemanticVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_versions(self, other)
    }
}

impl std::fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format_version(self))
    }
}

/// Kind of bump between two consecutive releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseType {
    Major,
    Minor,
    Patch,
    Unknown,
}

impl std::fmt::Display for ReleaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReleaseType::Major => "major",
            ReleaseType::Minor => "minor",
            ReleaseType::Patch => "patch",
            ReleaseType::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Extracts the first semantic version found in `title`.
///
/// A candidate whose numbers do not fit in a `u64` is skipped and the
/// search continues with the next one.
///
/// # Examples
///
/// ```
/// use firehose::release::parse_version;
///
/// let v = parse_version("Release v1.2.3").unwrap();
/// assert_eq!((v.major, v.minor, v.patch), (1, 2, 3));
/// assert_eq!(v.prerelease, None);
///
/// let rc = parse_version("v2.0.0-rc.1").unwrap();
/// assert_eq!(rc.prerelease.as_deref(), Some("rc.1"));
///
/// assert!(parse_version("no version here").is_none());
/// ```
pub fn parse_version(title: &str) -> Option<SemanticVersion> {
    if title.is_empty() {
        return None;
    }

    semver_re()?.captures_iter(title).find_map(|caps| {
        let number = |i: usize| caps.get(i)?.as_str().parse::<u64>().ok();

        Some(SemanticVersion {
            major: number(1)?,
            minor: number(2)?,
            patch: number(3)?,
            prerelease: caps.get(4).map(|m| m.as_str().to_string()),
            original: caps.get(0)?.as_str().to_string(),
        })
    })
}

/// Total order on versions.
///
/// Major, minor and patch compare numerically. When those are equal a
/// release sorts above any of its prereleases, and two prereleases compare
/// by their tags as plain strings.
pub fn compare_versions(a: &SemanticVersion, b: &SemanticVersion) -> Ordering {
    a.major
        .cmp(&b.major)
        .then(a.minor.cmp(&b.minor))
        .then(a.patch.cmp(&b.patch))
        .then_with(|| match (&a.prerelease, &b.prerelease) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(x), Some(y)) => x.cmp(y),
        })
}

/// True when both versions share major and minor numbers.
pub fn is_same_minor_series(a: &SemanticVersion, b: &SemanticVersion) -> bool {
    a.major == b.major && a.minor == b.minor
}

/// Canonical `vMAJOR.MINOR.PATCH[-PRE]` rendering.
pub fn format_version(version: &SemanticVersion) -> String {
    let mut formatted = format!("v{}.{}.{}", version.major, version.minor, version.patch);
    if let Some(pre) = &version.prerelease {
        formatted.push('-');
        formatted.push_str(pre);
    }
    formatted
}

/// Classifies the bump from `previous` to `current`.
pub fn release_type(current: &SemanticVersion, previous: Option<&SemanticVersion>) -> ReleaseType {
    let Some(previous) = previous else {
        return ReleaseType::Unknown;
    };

    if current.major > previous.major {
        ReleaseType::Major
    } else if current.minor > previous.minor {
        ReleaseType::Minor
    } else if current.patch > previous.patch {
        ReleaseType::Patch
    } else {
        ReleaseType::Unknown
    }
}
