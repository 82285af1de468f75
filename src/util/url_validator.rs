use thiserror::Error;
use url::Url;

/// Errors that can occur during URI validation.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum UrlValidationError {
    /// The string is empty or only whitespace.
    #[error("URL is empty")]
    Empty,
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
}

/// Validates that a string is a well-formed absolute URI of any scheme.
///
/// This is a syntax check only, used for stored links. It does not reject
/// loopback or private hosts, since entry links are never requested.
///
/// # Errors
///
/// Returns [`UrlValidationError`] if:
/// - The string is blank ([`UrlValidationError::Empty`])
/// - The URL cannot be parsed ([`UrlValidationError::InvalidUrl`])
///
/// # Examples
///
/// ```
/// use firehose::util::validate_uri;
///
/// let url = validate_uri("https://github.com/dapr/dapr/releases.atom").unwrap();
/// assert_eq!(url.host_str(), Some("github.com"));
///
/// assert!(validate_uri("ftp://mirror.example.org/pub/v1.0.0.tar.gz").is_ok());
/// assert!(validate_uri("not a url").is_err());
/// ```
pub fn validate_uri(url_str: &str) -> Result<Url, UrlValidationError> {
    if url_str.trim().is_empty() {
        return Err(UrlValidationError::Empty);
    }

    Ok(Url::parse(url_str)?)
}

/// Validates a URL that will actually be fetched: [`validate_uri`] plus an
/// `http`/`https` scheme.
pub fn validate_fetch_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = validate_uri(url_str)?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }
}
