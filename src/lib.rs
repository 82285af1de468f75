//! Release-feed ingestion.
//!
//! Fetches a roster of Atom/RSS release feeds concurrently, enriches each
//! entry with project metadata from a catalog, validates and deduplicates the
//! results, and groups adjacent releases of the same version series.

pub mod catalog;
pub mod config;
pub mod feed;
pub mod output;
pub mod pipeline;
pub mod release;
pub mod store;
pub mod util;
