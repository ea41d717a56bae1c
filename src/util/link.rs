use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Entry has no link")]
    Missing,
    #[error("Invalid link: {0}")]
    Invalid(#[from] url::ParseError),
    #[error("Refusing to open {0} link")]
    UnsupportedScheme(String),
}

/// Validate an entry link before opening it in the system browser.
///
/// Only `http` and `https` links are opened; feed content is untrusted and
/// other schemes (`file:`, `javascript:`, custom handlers) could launch
/// arbitrary local programs.
///
/// ```
/// use readr::util::validate_link;
///
/// assert!(validate_link(Some("https://example.com/post")).is_ok());
/// assert!(validate_link(Some("file:///etc/passwd")).is_err());
/// assert!(validate_link(None).is_err());
/// ```
pub fn validate_link(link: Option<&str>) -> Result<Url, LinkError> {
    let raw = link.map(str::trim).filter(|l| !l.is_empty());
    let url = Url::parse(raw.ok_or(LinkError::Missing)?)?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(LinkError::UnsupportedScheme(other.to_string())),
    }
}
