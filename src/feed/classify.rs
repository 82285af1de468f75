//! Failure taxonomy for feed and catalog fetches.
//!
//! Every failure is reduced to a [`ClassifiedError`] carrying one of three
//! [`ErrorKind`]s. The retry engine only looks at the kind: permanent failures
//! surface immediately, transient and unknown ones are retried.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

static STATUS_CODE_RE: OnceLock<Option<Regex>> = OnceLock::new();

fn status_code_re() -> Option<&'static Regex> {
    STATUS_CODE_RE
        .get_or_init(|| Regex::new(r"(?i)status code (\d+)").ok())
        .as_ref()
}

const TIMEOUT_PATTERNS: &[&str] = &["etimedout", "timeout", "timed out", "deadline exceeded"];
const CONNECTION_PATTERNS: &[&str] = &[
    "econnreset",
    "econnrefused",
    "connection reset",
    "connection refused",
    "connection closed",
];
const DNS_PATTERNS: &[&str] = &[
    "enotfound",
    "getaddrinfo",
    "dns error",
    "failed to lookup address",
];
const PARSE_PATTERNS: &[&str] = &[
    "parse error",
    "invalid xml",
    "invalid json",
    "invalid yaml",
    "unexpected token",
];

/// Coarse failure category that drives the retry decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Retryable: 5xx, 429, timeouts, connection resets, DNS failures
    Transient,
    /// Not retryable: 4xx client errors, malformed documents
    Permanent,
    /// Anything unrecognised; retried like a transient failure
    Unknown,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::Transient => "transient",
            ErrorKind::Permanent => "permanent",
            ErrorKind::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// A raw failure reduced to its kind plus a short human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

impl std::fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status_code {
            Some(code) if !self.message.contains(&code.to_string()) => {
                write!(f, "{} ({})", self.message, code)
            }
            _ => f.write_str(&self.message),
        }
    }
}

/// Errors that can be mapped onto the failure taxonomy.
///
/// Implemented by every error type that flows through
/// [`retry_with_backoff`](crate::feed::retry_with_backoff).
pub trait Classify {
    fn classify(&self) -> ClassifiedError;
}

impl Classify for ClassifiedError {
    fn classify(&self) -> ClassifiedError {
        self.clone()
    }
}

/// Classifies a failure from its message and optional HTTP status.
///
/// Rules are applied in order and the first match wins:
///
/// 1. status 500-599 → transient ("Server error")
/// 2. status 429 → transient ("Rate limited")
/// 3. status 400, 401, 403, 404 → permanent ("Client error")
/// 4. timeout / connection reset / DNS message → transient
/// 5. parse-error message → permanent
/// 6. anything else → unknown, keeping the original message
///
/// When `status` is `None`, a `status code NNN` fragment in the message is
/// used instead.
pub fn classify(message: &str, status: Option<u16>) -> ClassifiedError {
    let status = status.or_else(|| status_from_message(message));

    if let Some(code) = status {
        match code {
            500..=599 => {
                return classified(ErrorKind::Transient, format!("Server error ({code})"), status);
            }
            429 => return classified(ErrorKind::Transient, "Rate limited", status),
            400 | 401 | 403 | 404 => {
                return classified(ErrorKind::Permanent, format!("Client error ({code})"), status);
            }
            _ => {}
        }
    }

    let lower = message.to_lowercase();
    let matches_any = |patterns: &[&str]| patterns.iter().any(|p| lower.contains(p));

    if matches_any(TIMEOUT_PATTERNS) {
        return classified(ErrorKind::Transient, "Network timeout", status);
    }
    if matches_any(CONNECTION_PATTERNS) {
        return classified(ErrorKind::Transient, "Connection error", status);
    }
    if matches_any(DNS_PATTERNS) {
        return classified(ErrorKind::Transient, "DNS resolution failed", status);
    }
    if matches_any(PARSE_PATTERNS) {
        return classified(ErrorKind::Permanent, "Parse error", status);
    }

    classified(ErrorKind::Unknown, message, status)
}

/// True for transient and unknown failures, false for permanent ones.
pub fn should_retry(err: &ClassifiedError) -> bool {
    matches!(err.kind, ErrorKind::Transient | ErrorKind::Unknown)
}

fn classified(
    kind: ErrorKind,
    message: impl Into<String>,
    status_code: Option<u16>,
) -> ClassifiedError {
    ClassifiedError {
        kind,
        message: message.into(),
        status_code,
    }
}

fn status_from_message(message: &str) -> Option<u16> {
    status_code_re()?
        .captures(message)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
