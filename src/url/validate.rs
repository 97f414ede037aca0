use crate::UrlError;
use url::Url;

/// Checks that a string is an absolute http(s) URL with a host
///
/// The input collaborator is expected to hand over well-formed URLs; this is
/// the engine's own re-check before a job is accepted.
///
/// # Examples
///
/// ```
/// use regex_sweep::url::validate_url;
///
/// assert!(validate_url("https://example.com/page").is_ok());
/// assert!(validate_url("example.com/page").is_err());
/// assert!(validate_url("ftp://example.com/file").is_err());
/// ```
pub fn validate_url(candidate: &str) -> Result<Url, UrlError> {
    let url = Url::parse(candidate).map_err(|e| UrlError::Parse {
        url: candidate.to_string(),
        reason: e.to_string(),
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost(candidate.to_string()));
    }

    Ok(url)
}
