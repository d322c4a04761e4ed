//! Immutable run configuration.
//!
//! A [`TraversalConfig`] is validated once, before any network call, and then
//! shared by reference with the client and the census.

use std::fmt;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use thiserror::Error;
use url::Url;

/// Default lookback window, in days.
pub const DEFAULT_LOOKBACK_DAYS: u32 = 90;

/// Default pause between two page fetches of the same traversal.
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(100);

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Errors raised while assembling the run configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// No server hostname was supplied.
    #[error("a Bitbucket Server hostname is required")]
    MissingHostname,

    /// The hostname could not be turned into a base URL.
    #[error("invalid hostname '{hostname}': {reason}")]
    InvalidHostname { hostname: String, reason: String },

    /// Neither a token nor a username/password pair was supplied.
    #[error("either a token or a username and password is required")]
    MissingCredentials,

    /// Both a token and a username/password pair were supplied.
    #[error("use either a token or a username and password, not both")]
    ConflictingCredentials,

    /// Only one half of the basic-auth pair was supplied.
    #[error("basic authentication needs both a username and a password")]
    IncompleteBasicAuth,

    /// The lookback window is empty.
    #[error("the lookback window must be at least one day")]
    EmptyLookback,
}

/// Credentials used for every request.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Personal access token, sent as `Bearer`.
    Token(String),
    /// Username and password, sent as HTTP basic auth.
    Basic { username: String, password: String },
}

impl Credentials {
    /// Pick the authentication scheme from the optional CLI/config values.
    ///
    /// Empty strings count as absent. Exactly one scheme must remain.
    pub fn from_parts(
        token: Option<String>,
        username: Option<String>,
        password: Option<String>,
    ) -> Result<Self, ConfigError> {
        let token = token.filter(|t| !t.is_empty());
        let username = username.filter(|u| !u.is_empty());
        let password = password.filter(|p| !p.is_empty());

        match (token, username, password) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => {
                Err(ConfigError::ConflictingCredentials)
            }
            (Some(token), None, None) => Ok(Self::Token(token)),
            (None, Some(username), Some(password)) => Ok(Self::Basic { username, password }),
            (None, Some(_), None) | (None, None, Some(_)) => Err(ConfigError::IncompleteBasicAuth),
            (None, None, None) => Err(ConfigError::MissingCredentials),
        }
    }

    /// Value of the `Authorization` header.
    #[must_use]
    pub fn authorization_header(&self) -> String {
        match self {
            Self::Token(token) => format!("Bearer {token}"),
            Self::Basic { username, password } => {
                format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
            }
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token(_) => f.write_str("Token(<redacted>)"),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

/// Everything a census run needs to know, fixed at start-up.
#[derive(Debug, Clone)]
pub struct TraversalConfig {
    base_url: Url,
    credentials: Credentials,
    lookback_days: u32,
    started_at: DateTime<Utc>,
    cutoff_ms: i64,
    project_filter: Option<String>,
    repo_filter: Option<String>,
    page_delay: Duration,
}

impl TraversalConfig {
    /// Build a configuration whose lookback window ends now.
    pub fn new(
        hostname: &str,
        credentials: Credentials,
        lookback_days: u32,
    ) -> Result<Self, ConfigError> {
        Self::new_at(hostname, credentials, lookback_days, Utc::now())
    }

    /// Build a configuration whose lookback window ends at `started_at`.
    pub fn new_at(
        hostname: &str,
        credentials: Credentials,
        lookback_days: u32,
        started_at: DateTime<Utc>,
    ) -> Result<Self, ConfigError> {
        if lookback_days == 0 {
            return Err(ConfigError::EmptyLookback);
        }

        let base_url = base_url_from_hostname(hostname)?;
        let cutoff_ms = started_at.timestamp_millis() - i64::from(lookback_days) * MS_PER_DAY;

        Ok(Self {
            base_url,
            credentials,
            lookback_days,
            started_at,
            cutoff_ms,
            project_filter: None,
            repo_filter: None,
            page_delay: DEFAULT_PAGE_DELAY,
        })
    }

    /// Only descend into the project with this exact key.
    #[must_use]
    pub fn with_project_filter(mut self, key: Option<String>) -> Self {
        self.project_filter = key.filter(|k| !k.is_empty());
        self
    }

    /// Only descend into repositories with this exact slug.
    #[must_use]
    pub fn with_repo_filter(mut self, slug: Option<String>) -> Self {
        self.repo_filter = slug.filter(|s| !s.is_empty());
        self
    }

    /// Override the pause between page fetches.
    #[must_use]
    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn lookback_days(&self) -> u32 {
        self.lookback_days
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Commits authored strictly before this epoch-millisecond instant are
    /// outside the window.
    pub fn cutoff_ms(&self) -> i64 {
        self.cutoff_ms
    }

    pub fn project_filter(&self) -> Option<&str> {
        self.project_filter.as_deref()
    }

    pub fn repo_filter(&self) -> Option<&str> {
        self.repo_filter.as_deref()
    }

    pub fn page_delay(&self) -> Duration {
        self.page_delay
    }
}

/// Turn a bare hostname (or a full URL) into the server base URL.
///
/// A missing scheme defaults to `https`. Trailing slashes are dropped.
pub fn base_url_from_hostname(hostname: &str) -> Result<Url, ConfigError> {
    let hostname = hostname.trim().trim_end_matches('/');
    if hostname.is_empty() {
        return Err(ConfigError::MissingHostname);
    }

    let candidate = if hostname.starts_with("http://") || hostname.starts_with("https://") {
        hostname.to_string()
    } else {
        format!("https://{hostname}")
    };

    let url = Url::parse(&candidate).map_err(|e| ConfigError::InvalidHostname {
        hostname: hostname.to_string(),
        reason: e.to_string(),
    })?;

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidHostname {
            hostname: hostname.to_string(),
            reason: "no host component".to_string(),
        });
    }

    Ok(url)
}
