//! devcount CLI - counts active committers on a Bitbucket Server instance.

mod config;
mod progress;
mod report;

use std::sync::Arc;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use console::Term;
use devcount::{BitbucketClient, Census, ConfigError};
use tracing_subscriber::EnvFilter;

use crate::progress::ProgressReporter;
use crate::report::OutputFormat;

#[derive(Parser)]
#[command(name = "devcount")]
#[command(version)]
#[command(about = "Count active committers on a Bitbucket Server instance")]
#[command(
    long_about = "devcount walks every project, repository and recent commit on a Bitbucket \
Server instance and reports the unique commit authors (name and email) seen within a \
lookback window. Use it to size per-committer licenses."
)]
#[command(after_long_help = r#"EXAMPLES
    Count authors of the last 90 days with a personal access token:
        $ devcount --hostname bitbucket.example.com --token NjQ0...

    Only look at one repository, with basic auth:
        $ devcount --hostname bitbucket.example.com -u svc-census -p s3cret \
            --project-name CORE --repo-name engine

    Machine-readable output for the last 30 days:
        $ devcount --hostname bitbucket.example.com --token NjQ0... -d 30 -o json

CONFIGURATION
    devcount reads configuration from:
      1. ~/.config/devcount/config.toml (or $XDG_CONFIG_HOME/devcount/config.toml)
      2. ./devcount.toml
      3. Environment variables (DEVCOUNT_* prefix, e.g., DEVCOUNT_AUTH__TOKEN)
      4. .env file in current directory
    Command-line flags override all of them.

ENVIRONMENT VARIABLES
    DEVCOUNT_SERVER__HOSTNAME       Bitbucket Server hostname
    DEVCOUNT_AUTH__TOKEN            Personal access token
    DEVCOUNT_AUTH__USERNAME         Basic auth username
    DEVCOUNT_AUTH__PASSWORD         Basic auth password
    DEVCOUNT_CENSUS__LOOKBACK_DAYS  Lookback window in days (default: 90)
    DEVCOUNT_CENSUS__PAGE_DELAY_MS  Pause between page requests (default: 100)
    RUST_LOG                        Log filter for non-interactive runs
"#)]
struct Cli {
    /// Bitbucket Server hostname, e.g. bitbucket.example.com (https is assumed)
    #[arg(short = 'H', long)]
    hostname: Option<String>,

    /// Personal access token (instead of --username/--password)
    #[arg(short, long, conflicts_with_all = ["username", "password"])]
    token: Option<String>,

    /// Basic auth username
    #[arg(short, long)]
    username: Option<String>,

    /// Basic auth password
    #[arg(short, long)]
    password: Option<String>,

    /// Only scan the project with this exact key
    #[arg(long)]
    project_name: Option<String>,

    /// Only scan repositories with this exact slug
    #[arg(long)]
    repo_name: Option<String>,

    /// Count authors of commits made within this many days (default from config or 90)
    #[arg(short = 'd', long)]
    lookback_days: Option<u32>,

    /// Pause between page requests in milliseconds (default from config or 100)
    #[arg(long)]
    page_delay_ms: Option<u64>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

impl Cli {
    fn overrides(&self) -> config::Overrides {
        config::Overrides {
            hostname: self.hostname.clone(),
            token: self.token.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            project_name: self.project_name.clone(),
            repo_name: self.repo_name.clone(),
            lookback_days: self.lookback_days,
            page_delay_ms: self.page_delay_ms,
        }
    }
}

/// Print usage with the configuration error and exit with status 2.
fn usage_error(err: ConfigError) -> ! {
    let kind = match err {
        ConfigError::ConflictingCredentials => ErrorKind::ArgumentConflict,
        ConfigError::MissingHostname
        | ConfigError::MissingCredentials
        | ConfigError::IncompleteBasicAuth => ErrorKind::MissingRequiredArgument,
        _ => ErrorKind::ValueValidation,
    };
    Cli::command().error(kind, err).exit()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Structured logging only when not attached to a TTY
    if !Term::stdout().is_term() {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::new("devcount=info,devcount_cli=info"),
        };

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();

    // Load configuration (config file -> env vars -> defaults), then apply flags
    let settings = config::Config::load().with_overrides(cli.overrides());
    let traversal = match settings.traversal_config() {
        Ok(traversal) => traversal,
        Err(err) => usage_error(err),
    };

    let client = BitbucketClient::new(&traversal)?;

    let reporter = Arc::new(ProgressReporter::new());
    let callback = reporter.as_callback();

    let result = Census::new(&client, &traversal)
        .with_progress(Some(&callback))
        .run()
        .await;
    reporter.finish();

    let report = match result {
        Ok(report) => report,
        Err(err) => {
            if err.is_auth_failure() {
                eprintln!("Authentication was rejected; check the token or username/password.");
            }
            return Err(err.into());
        }
    };

    println!("{}", report::render(&report, cli.output)?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn token_conflicts_with_basic_auth_flags() {
        let result = Cli::try_parse_from([
            "devcount",
            "--hostname",
            "bb.example.com",
            "--token",
            "tok",
            "--username",
            "alice",
        ]);
        let err = result.err().map(|e| e.kind());
        assert_eq!(err, Some(ErrorKind::ArgumentConflict));
    }

    #[test]
    fn flags_become_overrides() {
        let cli = Cli::try_parse_from([
            "devcount",
            "-H",
            "bb.example.com",
            "-u",
            "alice",
            "-p",
            "pa55",
            "--project-name",
            "CORE",
            "-d",
            "30",
            "--page-delay-ms",
            "0",
            "-o",
            "json",
        ])
        .unwrap();

        let overrides = cli.overrides();
        assert_eq!(overrides.hostname.as_deref(), Some("bb.example.com"));
        assert_eq!(overrides.username.as_deref(), Some("alice"));
        assert_eq!(overrides.password.as_deref(), Some("pa55"));
        assert_eq!(overrides.token, None);
        assert_eq!(overrides.project_name.as_deref(), Some("CORE"));
        assert_eq!(overrides.lookback_days, Some(30));
        assert_eq!(overrides.page_delay_ms, Some(0));
        assert!(matches!(cli.output, OutputFormat::Json));
    }

    #[test]
    fn output_defaults_to_text() {
        let cli = Cli::try_parse_from(["devcount"]).unwrap();
        assert!(matches!(cli.output, OutputFormat::Text));
        assert!(cli.overrides().hostname.is_none());
    }
}
