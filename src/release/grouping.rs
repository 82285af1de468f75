use crate::release::semver::{is_same_minor_series, parse_version, SemanticVersion};
use crate::store::ValidatedEntry;

/// A run of adjacent releases from one project, shown as a single lead
/// release with the older ones folded underneath.
#[derive(Debug, Clone)]
pub struct ReleaseGroup<'a> {
    pub project_key: String,
    pub lead: &'a ValidatedEntry,
    /// Older than `lead`, in input order
    pub collapsed: Vec<&'a ValidatedEntry>,
    /// Version parsed from the lead's title
    pub version: Option<SemanticVersion>,
}

impl ReleaseGroup<'_> {
    /// True when the group has anything to fold.
    pub fn is_collapsible(&self) -> bool {
        !self.collapsed.is_empty()
    }
}

fn project_key(entry: &ValidatedEntry) -> String {
    let raw = &entry.raw;
    [raw.project_name.as_deref(), raw.feed_title.as_deref()]
        .into_iter()
        .flatten()
        .find(|s| !s.is_empty())
        .unwrap_or("Unknown")
        .to_string()
}

fn can_collapse(
    group: &ReleaseGroup<'_>,
    key: &str,
    version: Option<&SemanticVersion>,
) -> bool {
    if group.project_key != key {
        return false;
    }
    let (Some(lead), Some(version)) = (group.version.as_ref(), version) else {
        return false;
    };

    match (lead.is_prerelease(), version.is_prerelease()) {
        // Parallel release-candidate trains stay together regardless of series
        (true, true) => true,
        (false, false) => is_same_minor_series(lead, version),
        _ => false,
    }
}

/// Folds a newest-first entry sequence into release groups.
///
/// Each entry is compared against the lead of the most recent group only. It
/// joins that group when the project matches and both titles carry a version
/// that is either a prerelease on both sides or a stable release in the same
/// `MAJOR.MINOR` series. Anything else starts a new group.
pub fn group_releases(entries: &[ValidatedEntry]) -> Vec<ReleaseGroup<'_>> {
    let mut groups: Vec<ReleaseGroup<'_>> = Vec::new();

    for entry in entries {
        let key = project_key(entry);
        let version = parse_version(&entry.raw.title);

        if let Some(group) = groups.last_mut() {
            if can_collapse(group, &key, version.as_ref()) {
                group.collapsed.push(entry);
                continue;
            }
        }

        groups.push(ReleaseGroup {
            project_key: key,
            lead: entry,
            collapsed: Vec::new(),
            version,
        });
    }

    tracing::debug!(
        entries = entries.len(),
        groups = groups.len(),
        "Grouped releases"
    );
    groups
}

/// Human summary of the folded releases, e.g. "3 more releases".
pub fn collapsed_summary(group: &ReleaseGroup<'_>) -> String {
    match group.collapsed.len() {
        0 => String::new(),
        1 => "1 more release".to_string(),
        n => format!("{n} more releases"),
    }
}

/// Comma-separated versions of the folded releases.
///
/// Entries whose title has no version are listed by title instead.
pub fn collapsed_version_list(group: &ReleaseGroup<'_>) -> String {
    group
        .collapsed
        .iter()
        .map(|entry| match parse_version(&entry.raw.title) {
            Some(v) => format!("v{}.{}.{}", v.major, v.minor, v.patch),
            None => entry.raw.title.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
