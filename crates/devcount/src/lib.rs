//! devcount - counts active committers on a Bitbucket Server instance.
//!
//! The library walks the paged REST API (projects, then repositories, then
//! commits) and builds a deduplicated roster of commit authors whose commits
//! fall inside a lookback window.
//!
//! # Example
//!
//! ```ignore
//! use devcount::{BitbucketClient, Census, Credentials, TraversalConfig};
//!
//! let credentials = Credentials::from_parts(Some(token), None, None)?;
//! let config = TraversalConfig::new("bitbucket.example.com", credentials, 90)?;
//! let client = BitbucketClient::new(&config)?;
//!
//! let report = Census::new(&client, &config).run().await?;
//! println!("Found {} authors in the last {} days", report.unique_authors(), report.lookback_days);
//! ```

pub mod bitbucket;
pub mod census;
pub mod config;
pub mod error;
pub mod http;
pub mod identity;
pub mod pagination;
pub mod predicate;
pub mod progress;

pub use bitbucket::BitbucketClient;
pub use census::{Census, CensusReport, RepositoryTally};
pub use config::{ConfigError, Credentials, TraversalConfig};
pub use error::{FetchError, MalformedPage};
pub use identity::{AuthorIdentity, IdentitySet};
pub use pagination::{Collected, Outcome, PageFetcher, PaginatedCollector};
pub use predicate::{BailPredicate, SkipPredicate};
pub use progress::{CensusProgress, ProgressCallback, emit};
