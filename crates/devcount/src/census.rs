//! The three-level census: projects → repositories → commits → authors.
//!
//! Every level is a [`PaginatedCollector`] traversal:
//!
//! | level        | bail                        | skip                     |
//! |--------------|-----------------------------|--------------------------|
//! | projects     | -                           | exact project key filter |
//! | repositories | -                           | exact repo slug filter   |
//! | commits      | authored before the cutoff  | -                        |
//!
//! A [`FetchError`] at any level aborts the run. A malformed page only
//! truncates the traversal that hit it; the census moves on to the next
//! sibling and lists the truncation in the [`CensusReport`].

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::bitbucket::{self, Commit, Project, ProjectRef, Repository};
use crate::config::TraversalConfig;
use crate::error::{FetchError, MalformedPage};
use crate::identity::{AuthorIdentity, IdentitySet};
use crate::pagination::{Collected, PageFetcher, PaginatedCollector};
use crate::predicate::{ExactName, OlderThan, SkipPredicate};
use crate::progress::{CensusProgress, ProgressCallback, emit};

/// Per-repository outcome of a census run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryTally {
    pub project: String,
    pub slug: String,
    /// Commits authored inside the lookback window.
    pub commits: usize,
    /// Authors first seen in this repository.
    pub new_authors: usize,
    /// Whether the commit listing was cut short by a malformed page.
    pub truncated: bool,
}

/// Result of a census run.
#[derive(Debug, Clone, Serialize)]
pub struct CensusReport {
    pub lookback_days: u32,
    pub started_at: DateTime<Utc>,
    /// Epoch milliseconds; older commits were not counted.
    pub cutoff_ms: i64,
    /// Keys of the projects that were scanned.
    pub projects: Vec<String>,
    pub repositories: Vec<RepositoryTally>,
    /// Unique authors in first-seen order.
    pub authors: Vec<AuthorIdentity>,
    /// Traversals that ended on a malformed page.
    pub truncated: Vec<MalformedPage>,
}

impl CensusReport {
    pub fn unique_authors(&self) -> usize {
        self.authors.len()
    }

    pub fn commits_in_window(&self) -> usize {
        self.repositories.iter().map(|r| r.commits).sum()
    }

    /// Whether any traversal returned partial results.
    pub fn is_partial(&self) -> bool {
        !self.truncated.is_empty()
    }
}

/// Runs the census against any [`PageFetcher`].
pub struct Census<'a, F: ?Sized> {
    fetcher: &'a F,
    config: &'a TraversalConfig,
    on_progress: Option<&'a ProgressCallback>,
}

impl<'a, F: PageFetcher + ?Sized> Census<'a, F> {
    pub fn new(fetcher: &'a F, config: &'a TraversalConfig) -> Self {
        Self {
            fetcher,
            config,
            on_progress: None,
        }
    }

    #[must_use]
    pub fn with_progress(mut self, on_progress: Option<&'a ProgressCallback>) -> Self {
        self.on_progress = on_progress;
        self
    }

    fn collector(&self) -> PaginatedCollector<'a, F> {
        PaginatedCollector::new(self.fetcher, self.config.page_delay())
            .with_progress(self.on_progress)
    }

    /// List projects, keeping only the filtered one when a project filter is set.
    pub async fn select_projects(&self) -> Result<Collected<Project>, FetchError> {
        let url = bitbucket::projects_url(self.config.base_url());
        let filter = self.config.project_filter().map(ExactName::new);
        let skip = filter.as_ref().map(|f| f as &dyn SkipPredicate<Project>);

        let projects = self.collector().collect(&url, None, skip).await?;

        emit(
            self.on_progress,
            CensusProgress::ProjectsListed {
                total: projects.seen,
                selected: projects.items.len(),
            },
        );
        if let Some(key) = self.config.project_filter()
            && projects.items.is_empty()
        {
            tracing::warn!(project = key, "No project matched the project filter");
        }

        Ok(projects)
    }

    /// List a project's repositories, keeping only the filtered one when a
    /// repository filter is set.
    ///
    /// Repositories whose payload has no `project` get `project_key`.
    pub async fn select_repositories(
        &self,
        project_key: &str,
    ) -> Result<Collected<Repository>, FetchError> {
        let url = bitbucket::repos_url(self.config.base_url(), project_key);
        let filter = self.config.repo_filter().map(ExactName::new);
        let skip = filter.as_ref().map(|f| f as &dyn SkipPredicate<Repository>);

        let mut repos = self.collector().collect(&url, None, skip).await?;
        for repo in repos.items.iter_mut().filter(|r| r.project.is_none()) {
            repo.project = Some(ProjectRef {
                key: project_key.to_string(),
            });
        }

        emit(
            self.on_progress,
            CensusProgress::RepositoriesListed {
                project: project_key.to_string(),
                total: repos.seen,
                selected: repos.items.len(),
            },
        );

        Ok(repos)
    }

    /// List a repository's commits newest-first, stopping at the first one
    /// authored before the cutoff.
    pub async fn recent_commits(
        &self,
        project_key: &str,
        repo_slug: &str,
    ) -> Result<Collected<Commit>, FetchError> {
        let url = bitbucket::commits_url(self.config.base_url(), project_key, repo_slug);
        let bail = OlderThan::new(self.config.cutoff_ms());

        let commits = self.collector().collect(&url, Some(&bail), None).await?;

        if !is_newest_first(&commits.items) {
            tracing::warn!(
                project = project_key,
                repo = repo_slug,
                "Commits are not newest-first; authors past the cutoff may be missed"
            );
            emit(
                self.on_progress,
                CensusProgress::UnsortedCommits {
                    project: project_key.to_string(),
                    slug: repo_slug.to_string(),
                },
            );
        }

        Ok(commits)
    }

    /// Walk every selected project and repository and build the report.
    pub async fn run(&self) -> Result<CensusReport, FetchError> {
        let lookback_days = self.config.lookback_days();
        let mut identities = IdentitySet::new();
        let mut repositories: Vec<RepositoryTally> = Vec::new();
        let mut truncated: Vec<MalformedPage> = Vec::new();

        tracing::info!(
            base_url = %self.config.base_url(),
            lookback_days,
            project_filter = ?self.config.project_filter(),
            repo_filter = ?self.config.repo_filter(),
            "Starting census"
        );

        let projects = self.select_projects().await?;
        truncated.extend(projects.malformed().cloned());
        let project_keys: Vec<String> = projects.items.into_iter().map(|p| p.key).collect();

        for project_key in &project_keys {
            emit(
                self.on_progress,
                CensusProgress::ScanningProject {
                    key: project_key.clone(),
                },
            );

            let repos = self.select_repositories(project_key).await?;
            truncated.extend(repos.malformed().cloned());

            for repo in repos.items {
                let repo_project = repo.project_key().unwrap_or(project_key.as_str()).to_string();
                emit(
                    self.on_progress,
                    CensusProgress::ScanningRepository {
                        project: repo_project.clone(),
                        slug: repo.slug.clone(),
                    },
                );

                let commits = self.recent_commits(&repo_project, &repo.slug).await?;

                let new_authors = commits
                    .items
                    .iter()
                    .filter(|c| identities.add(AuthorIdentity::from(&c.author)))
                    .count();

                emit(
                    self.on_progress,
                    CensusProgress::RepositoryScanned {
                        project: repo_project.clone(),
                        slug: repo.slug.clone(),
                        commits: commits.items.len(),
                        new_authors,
                        lookback_days,
                    },
                );

                repositories.push(RepositoryTally {
                    project: repo_project,
                    slug: repo.slug,
                    commits: commits.items.len(),
                    new_authors,
                    truncated: commits.is_truncated(),
                });
                truncated.extend(commits.malformed().cloned());
            }
        }

        emit(
            self.on_progress,
            CensusProgress::CensusComplete {
                authors: identities.len(),
                repositories: repositories.len(),
                lookback_days,
            },
        );
        tracing::info!(
            authors = identities.len(),
            repositories = repositories.len(),
            truncated = truncated.len(),
            "Census complete"
        );

        Ok(CensusReport {
            lookback_days,
            started_at: self.config.started_at(),
            cutoff_ms: self.config.cutoff_ms(),
            projects: project_keys,
            repositories,
            authors: identities.into_vec(),
            truncated,
        })
    }
}

/// Whether `commits` are ordered by non-increasing author timestamp.
fn is_newest_first(commits: &[Commit]) -> bool {
    commits
        .windows(2)
        .all(|w| w[0].author_timestamp >= w[1].author_timestamp)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use chrono::TimeZone;
    use serde_json::json;

    use super::*;
    use crate::config::Credentials;
    use crate::pagination::testing::ScriptedFetcher;

    const BASE: &str = "https://bb.example.com/rest/api/1.0";
    const DAY_MS: i64 = 24 * 60 * 60 * 1000;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn now_ms() -> i64 {
        start().timestamp_millis()
    }

    fn config() -> TraversalConfig {
        TraversalConfig::new_at(
            "bb.example.com",
            Credentials::Token("tok".to_string()),
            90,
            start(),
        )
        .unwrap()
        .with_page_delay(Duration::ZERO)
    }

    fn projects_url() -> String {
        format!("{BASE}/projects")
    }

    fn repos_url(project: &str) -> String {
        format!("{BASE}/projects/{project}/repos")
    }

    fn commits_url(project: &str, repo: &str) -> String {
        format!("{BASE}/projects/{project}/repos/{repo}/commits")
    }

    fn last_page(values: serde_json::Value) -> serde_json::Value {
        json!({"values": values, "isLastPage": true})
    }

    fn commit(days_ago: i64, name: &str) -> serde_json::Value {
        json!({
            "authorTimestamp": now_ms() - days_ago * DAY_MS,
            "author": {"name": name, "emailAddress": format!("{}@example.com", name.to_lowercase())}
        })
    }

    fn authors(report: &CensusReport) -> Vec<&str> {
        report.authors.iter().map(AuthorIdentity::as_str).collect()
    }

    #[tokio::test]
    async fn collects_unique_authors_across_repositories() {
        let fetcher = ScriptedFetcher::new()
            .page(&projects_url(), 0, last_page(json!([{"key": "A"}, {"key": "B"}])))
            .page(&repos_url("A"), 0, last_page(json!([{"slug": "api"}, {"slug": "web"}])))
            .page(&repos_url("B"), 0, last_page(json!([{"slug": "ops"}])))
            .page(
                &commits_url("A", "api"),
                0,
                last_page(json!([commit(1, "Ada"), commit(2, "Bob"), commit(3, "Ada")])),
            )
            .page(
                &commits_url("A", "web"),
                0,
                last_page(json!([commit(5, "Cy"), commit(200, "Old")])),
            )
            .page(
                &commits_url("B", "ops"),
                0,
                last_page(json!([commit(10, "Bob"), commit(20, "Dee")])),
            );

        let config = config();
        let report = Census::new(&fetcher, &config).run().await.unwrap();

        assert_eq!(
            authors(&report),
            vec![
                "Ada <ada@example.com>",
                "Bob <bob@example.com>",
                "Cy <cy@example.com>",
                "Dee <dee@example.com>",
            ]
        );
        assert_eq!(report.unique_authors(), 4);
        assert_eq!(report.lookback_days, 90);
        assert_eq!(report.projects, vec!["A", "B"]);
        assert_eq!(report.commits_in_window(), 3 + 1 + 2);
        assert_eq!(
            report.repositories[1],
            RepositoryTally {
                project: "A".to_string(),
                slug: "web".to_string(),
                commits: 1,
                new_authors: 1,
                truncated: false,
            }
        );
        assert!(!report.is_partial());
    }

    #[tokio::test]
    async fn project_filter_selects_exactly_the_named_project() {
        let fetcher = ScriptedFetcher::new()
            .page(&projects_url(), 0, last_page(json!([{"key": "A"}, {"key": "B"}])))
            .page(&repos_url("B"), 0, last_page(json!([])));

        let config = config().with_project_filter(Some("B".to_string()));
        let census = Census::new(&fetcher, &config);

        let projects = census.select_projects().await.unwrap();
        let keys: Vec<&str> = projects.items.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["B"]);
        assert_eq!(projects.seen, 2);

        let report = census.run().await.unwrap();
        assert_eq!(report.projects, vec!["B"]);
        assert!(
            !fetcher
                .calls()
                .iter()
                .any(|(url, _)| url == &repos_url("A"))
        );
    }

    #[tokio::test]
    async fn repo_filter_does_not_stop_sibling_enumeration() {
        let fetcher = ScriptedFetcher::new()
            .page(&projects_url(), 0, last_page(json!([{"key": "A"}])))
            .paged(
                &repos_url("A"),
                2,
                vec![
                    vec![json!({"slug": "docs"}), json!({"slug": "infra"})],
                    vec![json!({"slug": "api"})],
                ],
            )
            .page(&commits_url("A", "api"), 0, last_page(json!([commit(1, "Ada")])));

        let config = config().with_repo_filter(Some("api".to_string()));
        let report = Census::new(&fetcher, &config).run().await.unwrap();

        assert_eq!(report.repositories.len(), 1);
        assert_eq!(report.repositories[0].slug, "api");
        assert_eq!(authors(&report), vec!["Ada <ada@example.com>"]);
    }

    #[tokio::test]
    async fn malformed_commit_page_only_truncates_that_repository() {
        let fetcher = ScriptedFetcher::new()
            .page(&projects_url(), 0, last_page(json!([{"key": "A"}])))
            .page(&repos_url("A"), 0, last_page(json!([{"slug": "bad"}, {"slug": "good"}])))
            .page(
                &commits_url("A", "bad"),
                0,
                json!({"values": [commit(1, "Ada")], "isLastPage": false, "nextPageStart": 1}),
            )
            .page(&commits_url("A", "bad"), 1, json!({"errors": [{"message": "oops"}]}))
            .page(&commits_url("A", "good"), 0, last_page(json!([commit(2, "Bob")])));

        let config = config();
        let report = Census::new(&fetcher, &config).run().await.unwrap();

        assert_eq!(
            authors(&report),
            vec!["Ada <ada@example.com>", "Bob <bob@example.com>"]
        );
        assert!(report.repositories[0].truncated);
        assert!(!report.repositories[1].truncated);
        assert_eq!(report.truncated.len(), 1);
        assert_eq!(report.truncated[0].url, commits_url("A", "bad"));
        assert!(report.truncated[0].raw.contains("oops"));
        assert!(report.is_partial());
    }

    #[tokio::test]
    async fn malformed_repository_listing_moves_to_next_project() {
        let fetcher = ScriptedFetcher::new()
            .page(&projects_url(), 0, last_page(json!([{"key": "A"}, {"key": "B"}])))
            .page(&repos_url("A"), 0, json!({"message": "not a page"}))
            .page(&repos_url("B"), 0, last_page(json!([{"slug": "ops"}])))
            .page(&commits_url("B", "ops"), 0, last_page(json!([commit(1, "Dee")])));

        let config = config();
        let report = Census::new(&fetcher, &config).run().await.unwrap();

        assert_eq!(report.projects, vec!["A", "B"]);
        assert_eq!(authors(&report), vec!["Dee <dee@example.com>"]);
        assert_eq!(report.truncated.len(), 1);
    }

    #[tokio::test]
    async fn fetch_error_aborts_the_run() {
        let fetcher = ScriptedFetcher::new()
            .page(&projects_url(), 0, last_page(json!([{"key": "A"}])))
            .page(&repos_url("A"), 0, last_page(json!([{"slug": "api"}])));

        let config = config();
        let err = Census::new(&fetcher, &config).run().await.unwrap_err();
        assert!(err.url().contains("/repos/api/commits"));
    }

    #[tokio::test]
    async fn lookback_bails_at_first_old_commit() {
        let fetcher = ScriptedFetcher::new()
            .page(&projects_url(), 0, last_page(json!([{"key": "A"}])))
            .page(&repos_url("A"), 0, last_page(json!([{"slug": "api"}])))
            .page(
                &commits_url("A", "api"),
                0,
                json!({
                    "values": [commit(0, "Now"), commit(10, "Ten"), commit(100, "Hundred")],
                    "isLastPage": false,
                    "nextPageStart": 3
                }),
            );

        let config = config();
        let report = Census::new(&fetcher, &config).run().await.unwrap();

        assert_eq!(
            authors(&report),
            vec!["Now <now@example.com>", "Ten <ten@example.com>"]
        );
        assert!(
            !fetcher
                .calls()
                .contains(&(commits_url("A", "api"), 3))
        );
    }

    #[tokio::test]
    async fn unsorted_commits_emit_a_warning_event() {
        let fetcher = ScriptedFetcher::new()
            .page(&projects_url(), 0, last_page(json!([{"key": "A"}])))
            .page(&repos_url("A"), 0, last_page(json!([{"slug": "api"}])))
            .page(
                &commits_url("A", "api"),
                0,
                last_page(json!([commit(5, "Ada"), commit(1, "Bob")])),
            );

        let events: Arc<Mutex<Vec<CensusProgress>>> = Arc::new(Mutex::new(Vec::new()));
        let capture = Arc::clone(&events);
        let callback: ProgressCallback = Box::new(move |event| {
            capture.lock().unwrap_or_else(|e| e.into_inner()).push(event);
        });

        let config = config();
        let report = Census::new(&fetcher, &config)
            .with_progress(Some(&callback))
            .run()
            .await
            .unwrap();

        assert_eq!(report.unique_authors(), 2);
        let events = events.lock().unwrap();
        assert!(
            events
                .iter()
                .any(|e| matches!(e, CensusProgress::UnsortedCommits { slug, .. } if slug == "api"))
        );
        assert!(matches!(
            events.last(),
            Some(CensusProgress::CensusComplete {
                authors: 2,
                repositories: 1,
                lookback_days: 90
            })
        ));
    }

    #[tokio::test]
    async fn repositories_without_project_get_the_listing_key() {
        let fetcher = ScriptedFetcher::new().page(
            &repos_url("A"),
            0,
            last_page(json!([
                {"slug": "bare"},
                {"slug": "full", "project": {"key": "A"}}
            ])),
        );

        let config = config();
        let repos = Census::new(&fetcher, &config)
            .select_repositories("A")
            .await
            .unwrap();

        let owners: Vec<Option<&str>> = repos.items.iter().map(Repository::project_key).collect();
        assert_eq!(owners, vec![Some("A"), Some("A")]);
    }

    #[test]
    fn newest_first_check() {
        let c = |ts: i64| Commit {
            id: None,
            author_timestamp: ts,
            author: bitbucket::Author {
                name: "a".to_string(),
                email_address: String::new(),
            },
        };
        assert!(is_newest_first(&[]));
        assert!(is_newest_first(&[c(3), c(3), c(1)]));
        assert!(!is_newest_first(&[c(1), c(2)]));
    }
}
