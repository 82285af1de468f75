use crate::store::types::EnrichedEntry;
use crate::util::validate_uri;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::ops::Deref;
use thiserror::Error;

/// Reasons an entry is refused by the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Title is required")]
    EmptyTitle,
    #[error("Link must be a valid URL: {link:?} ({reason})")]
    InvalidLink { link: String, reason: String },
    #[error("Feed URL must be a valid URL: {url:?} ({reason})")]
    InvalidFeedUrl { url: String, reason: String },
    #[error("Project homepage must be a valid URL: {url:?} ({reason})")]
    InvalidHomepage { url: String, reason: String },
}

/// An [`EnrichedEntry`] that passed validation.
///
/// Only [`ValidatedEntry::validate`] can build one, so holding a value
/// guarantees a non-blank title and well-formed `link` and `feed_url`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidatedEntry(EnrichedEntry);

impl ValidatedEntry {
    pub fn validate(entry: EnrichedEntry) -> Result<Self, ValidationError> {
        let raw = &entry.raw;

        if raw.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if let Err(e) = validate_uri(&raw.link) {
            return Err(ValidationError::InvalidLink {
                link: raw.link.clone(),
                reason: e.to_string(),
            });
        }
        if let Err(e) = validate_uri(&raw.feed_url) {
            return Err(ValidationError::InvalidFeedUrl {
                url: raw.feed_url.clone(),
                reason: e.to_string(),
            });
        }
        if let Some(homepage) = &raw.project_homepage {
            if let Err(e) = validate_uri(homepage) {
                return Err(ValidationError::InvalidHomepage {
                    url: homepage.clone(),
                    reason: e.to_string(),
                });
            }
        }

        Ok(Self(entry))
    }

    pub fn into_inner(self) -> EnrichedEntry {
        self.0
    }
}

impl Deref for ValidatedEntry {
    type Target = EnrichedEntry;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// What happened to an entry handed to [`EntryStore::commit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Stored,
    /// Another entry with the same key was committed first
    Duplicate,
    Rejected(ValidationError),
}

/// In-memory collection of validated entries, keyed by guid or link.
///
/// The first entry committed for a key wins. Insertion order is kept, so
/// items from one feed stay in the order the feed listed them.
#[derive(Debug, Default)]
pub struct EntryStore {
    entries: Vec<ValidatedEntry>,
    keys: HashSet<String>,
}

impl EntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates `entry` and stores it unless its key is already taken.
    ///
    /// Invalid entries are logged and dropped; they never reach the collection.
    pub fn commit(&mut self, entry: EnrichedEntry) -> CommitOutcome {
        let title = entry.raw.title.clone();
        let feed_url = entry.raw.feed_url.clone();

        let validated = match ValidatedEntry::validate(entry) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(
                    feed = %feed_url,
                    title = %title,
                    error = %e,
                    "Invalid entry dropped"
                );
                return CommitOutcome::Rejected(e);
            }
        };

        let key = validated.raw.key().to_string();
        if self.keys.contains(&key) {
            tracing::debug!(feed = %feed_url, key = %key, "Duplicate entry skipped");
            return CommitOutcome::Duplicate;
        }

        self.keys.insert(key);
        self.entries.push(validated);
        CommitOutcome::Stored
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidatedEntry> {
        self.entries.iter()
    }

    /// Entries sorted newest first by publication date.
    ///
    /// Undated entries (including failed-feed placeholders) go last. The sort
    /// is stable, so ties keep insertion order.
    pub fn into_sorted(self) -> Vec<ValidatedEntry> {
        let mut entries = self.entries;
        entries.sort_by(|a, b| match (a.raw.iso_date, b.raw.iso_date) {
            (Some(a), Some(b)) => b.cmp(&a),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        entries
    }
}

impl<'a> IntoIterator for &'a EntryStore {
    type Item = &'a ValidatedEntry;
    type IntoIter = std::slice::Iter<'a, ValidatedEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
