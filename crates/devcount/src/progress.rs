//! Progress reporting types for census runs.
//!
//! The library never prints. It emits [`CensusProgress`] events through an
//! optional callback and the CLI decides how to render them.

/// Progress events emitted while paging and aggregating.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum CensusProgress {
    /// Starting to page through an endpoint.
    FetchingPages {
        /// Paged endpoint, without the `start` parameter.
        url: String,
    },

    /// Fetched and accepted one page.
    FetchedPage {
        url: String,
        /// Offset the page was fetched with.
        start: u64,
        /// Number of items on the page.
        count: usize,
        /// Items kept so far across all pages of this traversal.
        total_so_far: usize,
    },

    /// Stopped paging because an item tripped the bail predicate.
    Bailed {
        url: String,
        /// Items kept before the bail.
        total: usize,
    },

    /// Finished paging an endpoint.
    FetchComplete { url: String, total: usize },

    /// A page did not have the expected shape; results for this traversal are partial.
    MalformedPage {
        url: String,
        start: u64,
        reason: String,
        /// The raw response body.
        raw: String,
    },

    /// Project listing finished.
    ProjectsListed {
        /// Projects returned by the server.
        total: usize,
        /// Projects that passed the name filter.
        selected: usize,
    },

    /// Starting to scan one project.
    ScanningProject { key: String },

    /// Repository listing for a project finished.
    RepositoriesListed {
        project: String,
        total: usize,
        selected: usize,
    },

    /// Starting to scan one repository.
    ScanningRepository { project: String, slug: String },

    /// Commit listing for a repository finished.
    RepositoryScanned {
        project: String,
        slug: String,
        /// Commits inside the lookback window.
        commits: usize,
        /// Authors seen for the first time in this repository.
        new_authors: usize,
        lookback_days: u32,
    },

    /// A repository returned commits out of newest-first order.
    UnsortedCommits { project: String, slug: String },

    /// The whole run finished.
    CensusComplete {
        authors: usize,
        repositories: usize,
        lookback_days: u32,
    },
}

/// Progress callback for census operations.
pub type ProgressCallback = Box<dyn Fn(CensusProgress) + Send + Sync>;

/// Send `event` to the callback, if there is one.
#[inline]
pub fn emit(callback: Option<&ProgressCallback>, event: CensusProgress) {
    if let Some(cb) = callback {
        cb(event);
    }
}
