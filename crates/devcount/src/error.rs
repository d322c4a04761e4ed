use thiserror::Error;

use crate::http::HttpError;

/// Longest response excerpt carried in error messages.
const EXCERPT_CHARS: usize = 200;

/// A page fetch that could not produce a JSON document.
///
/// Fetch errors are fatal to the run and are never retried.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The transport failed before a response arrived.
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: HttpError,
    },

    /// Credentials were rejected (401/403), or an error status came without a JSON body.
    #[error("HTTP {status} from {url}: {}", excerpt(.body))]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    /// The body was not valid JSON.
    #[error("response from {url} is not valid JSON: {source}")]
    Parse {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    /// URL of the request that failed.
    pub fn url(&self) -> &str {
        match self {
            Self::Network { url, .. } | Self::Status { url, .. } | Self::Parse { url, .. } => url,
        }
    }

    /// Whether the server rejected the credentials.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Status { status: 401 | 403, .. })
    }
}

/// A JSON page that does not have the shape of a Bitbucket page.
///
/// Unlike [`FetchError`] this is recovered from: the traversal that hit it
/// returns what it collected so far.
#[derive(Debug, Clone, Error, PartialEq, Eq, serde::Serialize)]
#[error("malformed page from {url} (start={start}): {reason}")]
pub struct MalformedPage {
    /// Paged endpoint, without the `start` parameter.
    pub url: String,
    /// Offset of the offending page.
    pub start: u64,
    /// What was wrong with it.
    pub reason: String,
    /// The raw response, for diagnosis.
    pub raw: String,
}

/// Shorten `text` to a single line of at most [`EXCERPT_CHARS`] characters.
pub fn excerpt(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() > EXCERPT_CHARS || line.len() < text.trim_end().len() {
        let truncated: String = line.chars().take(EXCERPT_CHARS).collect();
        format!("{truncated}...")
    } else {
        line.to_string()
    }
}
