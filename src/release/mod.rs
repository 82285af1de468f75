//! Semantic versions in release titles and the grouping built on them.

mod grouping;
mod semver;

pub use grouping::{collapsed_summary, collapsed_version_list, group_releases, ReleaseGroup};
pub use semver::{
    compare_versions, format_version, is_same_minor_series, parse_version, release_type,
    ReleaseType, SemanticVersion,
};
