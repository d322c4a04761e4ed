//! Bitbucket Server client for the census.
//!
//! # Module Structure
//!
//! - [`api`] - REST endpoint URLs
//! - [`types`] - Page envelope and payload types
//! - `client` - Authenticated [`PageFetcher`](crate::pagination::PageFetcher)
//!
//! # Example
//!
//! ```ignore
//! use devcount::bitbucket::{self, BitbucketClient, Project};
//! use devcount::pagination::PaginatedCollector;
//!
//! let client = BitbucketClient::new(&config)?;
//! let projects = PaginatedCollector::new(&client, config.page_delay())
//!     .collect::<Project>(&bitbucket::projects_url(config.base_url()), None, None)
//!     .await?;
//! ```

pub mod api;
mod client;
pub mod types;

pub use api::{commits_url, projects_url, repos_url};
pub use client::{BitbucketClient, REQUEST_TIMEOUT};
pub use types::{Author, Commit, Page, Project, ProjectRef, Repository};
