//! Bitbucket Server REST payloads.
//!
//! Only the fields the census reads are modelled; unknown fields are ignored
//! so the types keep working across server versions.
//!
//! API docs: https://docs.atlassian.com/bitbucket-server/rest/latest/bitbucket-rest.html

use serde::Deserialize;

/// One page of a paged Bitbucket Server response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Items on this page, in server order.
    pub values: Vec<T>,
    /// Whether this is the final page.
    pub is_last_page: bool,
    /// Offset of the next page; present whenever `is_last_page` is false.
    #[serde(default)]
    pub next_page_start: Option<u64>,
}

impl<T> Page<T> {
    /// Offset to fetch after this page, or `None` when the traversal is done.
    ///
    /// A non-final page must carry a cursor strictly greater than `start`.
    pub fn next_start(&self, start: u64) -> Result<Option<u64>, String> {
        if self.is_last_page {
            return Ok(None);
        }
        match self.next_page_start {
            Some(next) if next > start => Ok(Some(next)),
            Some(next) => Err(format!(
                "nextPageStart {next} does not advance past start {start}"
            )),
            None => Err("isLastPage is false but nextPageStart is missing".to_string()),
        }
    }
}

/// A Bitbucket project.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Project {
    /// Unique project key, used in repository URLs.
    pub key: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
}

/// Project reference embedded in a repository payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProjectRef {
    pub key: String,
}

/// A repository inside a project.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Repository {
    /// URL-safe repository identifier, unique within its project.
    pub slug: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub project: Option<ProjectRef>,
}

impl Repository {
    /// Key of the owning project, if the payload carried one.
    pub fn project_key(&self) -> Option<&str> {
        self.project.as_ref().map(|p| p.key.as_str())
    }
}

/// Commit author as reported by the commits endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub name: String,
    #[serde(default)]
    pub email_address: String,
}

/// A commit on the default branch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    #[serde(default)]
    pub id: Option<String>,
    /// Authoring time in epoch milliseconds.
    pub author_timestamp: i64,
    pub author: Author,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn page_parses_bitbucket_envelope() {
        let page: Page<Project> = serde_json::from_value(json!({
            "size": 2,
            "limit": 25,
            "start": 0,
            "isLastPage": false,
            "nextPageStart": 2,
            "values": [
                {"key": "A", "id": 1, "name": "Alpha", "public": false, "type": "NORMAL"},
                {"key": "B", "id": 2}
            ]
        }))
        .unwrap();

        assert_eq!(page.values.len(), 2);
        assert_eq!(page.values[0].name.as_deref(), Some("Alpha"));
        assert_eq!(page.values[1].name, None);
        assert_eq!(page.next_start(0), Ok(Some(2)));
    }

    #[test]
    fn last_page_needs_no_cursor() {
        let page: Page<Project> =
            serde_json::from_value(json!({"values": [], "isLastPage": true})).unwrap();
        assert_eq!(page.next_start(25), Ok(None));
    }

    #[test]
    fn cursor_must_advance() {
        let page: Page<Project> = serde_json::from_value(
            json!({"values": [], "isLastPage": false, "nextPageStart": 25}),
        )
        .unwrap();
        assert!(page.next_start(25).is_err());
        assert_eq!(page.next_start(0), Ok(Some(25)));
    }

    #[test]
    fn missing_cursor_on_non_final_page_is_an_error() {
        let page: Page<Project> =
            serde_json::from_value(json!({"values": [], "isLastPage": false})).unwrap();
        assert!(page.next_start(0).is_err());
    }

    #[test]
    fn missing_values_fails_to_parse() {
        let result: Result<Page<Project>, _> =
            serde_json::from_value(json!({"errors": [{"message": "nope"}]}));
        assert!(result.is_err());
    }

    #[test]
    fn repository_exposes_project_key() {
        let repo: Repository = serde_json::from_value(json!({
            "slug": "api",
            "name": "API",
            "project": {"key": "PLAT", "id": 7}
        }))
        .unwrap();
        assert_eq!(repo.project_key(), Some("PLAT"));
    }

    #[test]
    fn commit_reads_author_email_address() {
        let commit: Commit = serde_json::from_value(json!({
            "id": "abc123",
            "authorTimestamp": 1_717_200_000_000_i64,
            "author": {"name": "Ada", "emailAddress": "ada@example.com"},
            "committer": {"name": "CI"}
        }))
        .unwrap();
        assert_eq!(commit.author.name, "Ada");
        assert_eq!(commit.author.email_address, "ada@example.com");
        assert_eq!(commit.author_timestamp, 1_717_200_000_000);
    }
}
