//! Rewrites repository "browse" URLs into direct-content URLs.
//!
//! `https://github.com/<owner>/<repo>/blob/<branch>/<path>` serves an HTML page;
//! the file itself lives at
//! `https://raw.githubusercontent.com/<owner>/<repo>/<branch>/<path>`.
//! URLs on any other host are returned as given.

use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("URL '{0}' has no scheme; provide a complete URL including http:// or https://")]
    MissingScheme(String),
    #[error("invalid URL '{url}': {reason}")]
    Invalid { url: String, reason: String },
    #[error("'{0}' is not a GitHub file URL (expected github.com/<owner>/<repo>/blob/<branch>/<path>)")]
    MalformedGithubPath(String),
}

/// Parses `input`, rewriting GitHub file pages to their raw content location.
pub fn normalize(input: &str) -> Result<Url, UrlError> {
    let url = Url::parse(input).map_err(|e| match e {
        url::ParseError::RelativeUrlWithoutBase => UrlError::MissingScheme(input.to_string()),
        other => UrlError::Invalid { url: input.to_string(), reason: other.to_string() },
    })?;

    if url.host_str() != Some("github.com") {
        return Ok(url);
    }

    // ["", owner, repo, "blob", branch, path...]
    let parts: Vec<&str> = url.path().split('/').collect();
    if parts.len() < 6 || parts[5..].iter().all(|p| p.is_empty()) {
        return Err(UrlError::MalformedGithubPath(input.to_string()));
    }
    let raw = format!(
        "https://raw.githubusercontent.com/{}/{}/{}/{}",
        parts[1],
        parts[2],
        parts[4],
        parts[5..].join("/")
    );
    Url::parse(&raw).map_err(|e| UrlError::Invalid { url: raw.clone(), reason: e.to_string() })
}
