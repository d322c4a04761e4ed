//! Configuration file support for devcount.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `DEVCOUNT_`, e.g., `DEVCOUNT_AUTH__TOKEN`)
//! 3. Config file (./devcount.toml, then ~/.config/devcount/config.toml)
//! 4. Built-in defaults
//!
//! Example config file:
//! ```toml
//! [server]
//! hostname = "bitbucket.example.com"
//!
//! [auth]
//! token = "NjQ0..."  # or username + password, never both
//!
//! [census]
//! lookback_days = 90
//! page_delay_ms = 100
//! project_name = "CORE"  # optional
//! repo_name = "engine"   # optional
//! ```

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use devcount::config::{DEFAULT_LOOKBACK_DAYS, DEFAULT_PAGE_DELAY};
use devcount::{ConfigError, Credentials, TraversalConfig};
use directories::ProjectDirs;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub census: CensusConfig,
}

/// Bitbucket Server location.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Hostname or base URL, e.g. "bitbucket.example.com".
    /// Can also be set via DEVCOUNT_SERVER__HOSTNAME.
    pub hostname: Option<String>,
}

/// Credentials. Either `token`, or `username` and `password`.
#[derive(Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub token: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl AuthConfig {
    fn is_empty(&self) -> bool {
        self.token.is_none() && self.username.is_none() && self.password.is_none()
    }
}

/// Census defaults.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CensusConfig {
    /// Count authors of commits made within this many days.
    pub lookback_days: u32,
    /// Pause between page fetches, in milliseconds.
    pub page_delay_ms: u64,
    /// Only scan the project with this exact key.
    pub project_name: Option<String>,
    /// Only scan repositories with this exact slug.
    pub repo_name: Option<String>,
}

impl Default for CensusConfig {
    fn default() -> Self {
        Self {
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            page_delay_ms: DEFAULT_PAGE_DELAY.as_millis() as u64,
            project_name: None,
            repo_name: None,
        }
    }
}

/// Values given on the command line.
#[derive(Debug, Default)]
pub struct Overrides {
    pub hostname: Option<String>,
    pub token: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub project_name: Option<String>,
    pub repo_name: Option<String>,
    pub lookback_days: Option<u32>,
    pub page_delay_ms: Option<u64>,
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/devcount/config.toml)
    /// 3. Local config file (./devcount.toml)
    /// 4. Environment variables with DEVCOUNT_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = Self::default_config_path()
            && path.exists()
        {
            tracing::debug!("Loading config from {:?}", path);
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }

        let local_config = PathBuf::from("devcount.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./devcount.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // DEVCOUNT_CENSUS__LOOKBACK_DAYS -> census.lookback_days
        builder = builder.add_source(
            Environment::with_prefix("DEVCOUNT")
                .prefix_separator("_")
                .separator("__"),
        );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }

    /// Get the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "devcount").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Layer command-line values on top.
    ///
    /// Credentials are taken as a group: any credential flag replaces all
    /// configured credentials, so a token in the config file never collides
    /// with `--username`/`--password`.
    #[must_use]
    pub fn with_overrides(mut self, cli: Overrides) -> Self {
        let cli_auth = AuthConfig {
            token: cli.token,
            username: cli.username,
            password: cli.password,
        };
        if !cli_auth.is_empty() {
            self.auth = cli_auth;
        }

        if cli.hostname.is_some() {
            self.server.hostname = cli.hostname;
        }
        if cli.project_name.is_some() {
            self.census.project_name = cli.project_name;
        }
        if cli.repo_name.is_some() {
            self.census.repo_name = cli.repo_name;
        }
        if let Some(days) = cli.lookback_days {
            self.census.lookback_days = days;
        }
        if let Some(ms) = cli.page_delay_ms {
            self.census.page_delay_ms = ms;
        }
        self
    }

    /// Validate the merged values into the library's run configuration.
    pub fn traversal_config(&self) -> Result<TraversalConfig, ConfigError> {
        let hostname = self
            .server
            .hostname
            .as_deref()
            .filter(|h| !h.trim().is_empty())
            .ok_or(ConfigError::MissingHostname)?;

        let credentials = Credentials::from_parts(
            self.auth.token.clone(),
            self.auth.username.clone(),
            self.auth.password.clone(),
        )?;

        Ok(
            TraversalConfig::new(hostname, credentials, self.census.lookback_days)?
                .with_project_filter(self.census.project_name.clone())
                .with_repo_filter(self.census.repo_name.clone())
                .with_page_delay(Duration::from_millis(self.census.page_delay_ms)),
        )
    }
}
