//! Entry data model and the validating in-memory store.
//!
//! Every entry, whether parsed from a feed or synthesized for a failed one,
//! passes through [`EntryStore::commit`]. That is the only place entries are
//! validated.

mod entries;
mod types;

pub use entries::{CommitOutcome, EntryStore, ValidatedEntry, ValidationError};
pub use types::{
    EnrichedEntry, EntryError, FailureCategory, FeedReport, FeedSource, FetchStatus, RawEntry,
};
