use devcount::CensusProgress;

/// Logging reporter using tracing for structured output.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: CensusProgress) {
        match event {
            CensusProgress::FetchingPages { url } => {
                tracing::debug!(url = %url, "Fetching pages");
            }

            CensusProgress::FetchedPage {
                url,
                start,
                count,
                total_so_far,
            } => {
                tracing::debug!(url = %url, start, count, total_so_far, "Fetched page");
            }

            CensusProgress::Bailed { url, total } => {
                tracing::debug!(url = %url, total, "Reached the lookback cutoff");
            }

            CensusProgress::FetchComplete { url, total } => {
                tracing::debug!(url = %url, total, "Fetch complete");
            }

            CensusProgress::ProjectsListed { total, selected } => {
                tracing::info!(total, selected, "Projects found");
            }

            CensusProgress::ScanningProject { key } => {
                tracing::info!(project = %key, "Scanning project");
            }

            CensusProgress::RepositoriesListed {
                project,
                total,
                selected,
            } => {
                tracing::debug!(project = %project, total, selected, "Repositories found");
            }

            CensusProgress::ScanningRepository { project, slug } => {
                tracing::debug!(repo = %format!("{}/{}", project, slug), "Scanning repository");
            }

            CensusProgress::RepositoryScanned {
                project,
                slug,
                commits,
                new_authors,
                lookback_days,
            } => {
                tracing::info!(
                    repo = %format!("{}/{}", project, slug),
                    commits,
                    new_authors,
                    "Found {} commits within {} days",
                    commits,
                    lookback_days
                );
            }

            CensusProgress::CensusComplete {
                authors,
                repositories,
                lookback_days,
            } => {
                tracing::info!(authors, repositories, lookback_days, "Census complete");
            }

            // MalformedPage and UnsortedCommits are logged at warn level by the library.
            _ => {}
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}
