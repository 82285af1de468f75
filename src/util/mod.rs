//! Utility functions shared across the pipeline.
//!
//! - **URI validation**: syntax checks for entry links and catalog homepages,
//!   plus the stricter http(s) check for feed sources

mod url_validator;

pub use url_validator::{validate_fetch_url, validate_uri, UrlValidationError};
