//! Feed ingestion: classification, retry, parsing, fetching and orchestration.
//!
//! # Architecture
//!
//! - [`classify`] - maps raw failures onto transient / permanent / unknown
//! - [`retry`] - exponential backoff driven by the classifier
//! - [`parser`] - RSS/Atom parsing using the `feed-rs` crate
//! - [`fetcher`] - one feed: HTTP retrieval, parsing and catalog enrichment
//! - [`orchestrator`] - every feed concurrently, with the aggregate failure threshold
//!
//! # Example
//!
//! ```ignore
//! use firehose::feed::{fetch_all, FetchOptions};
//!
//! let outcome = fetch_all(&client, &sources, &catalog, &FetchOptions::default()).await?;
//! let entries = outcome.store.into_sorted();
//! ```

mod classify;
mod fetcher;
mod orchestrator;
mod parser;
mod retry;

pub use classify::{classify, should_retry, ClassifiedError, Classify, ErrorKind};
pub use fetcher::{fetch_single_feed, FeedFailure, FeedFetch, FetchError, FetchOptions};
pub(crate) use fetcher::read_limited_bytes;
pub use orchestrator::{failure_rate, fetch_all, FailureThresholdExceeded, FetchOutcome};
pub use parser::{parse_feed, ParsedFeed, ParsedItem};
pub use retry::{retry_with_backoff, RetryConfig};
