//! REST endpoint URLs.

use url::Url;

const REST_PREFIX: [&str; 3] = ["rest", "api", "1.0"];

fn endpoint(base: &Url, segments: &[&str]) -> String {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    // http(s) URLs always have a path to extend.
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(REST_PREFIX).extend(segments);
    }
    url.to_string()
}

/// `GET {base}/rest/api/1.0/projects`
pub fn projects_url(base: &Url) -> String {
    endpoint(base, &["projects"])
}

/// `GET {base}/rest/api/1.0/projects/{projectKey}/repos`
pub fn repos_url(base: &Url, project_key: &str) -> String {
    endpoint(base, &["projects", project_key, "repos"])
}

/// `GET {base}/rest/api/1.0/projects/{projectKey}/repos/{repositorySlug}/commits`
pub fn commits_url(base: &Url, project_key: &str, repo_slug: &str) -> String {
    endpoint(base, &["projects", project_key, "repos", repo_slug, "commits"])
}

/// Append the paging offset to an endpoint URL.
pub fn with_start(url: &str, start: u64) -> String {
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{url}{sep}start={start}")
}
