use std::sync::Mutex;
use std::time::Duration;

use devcount::CensusProgress;
use devcount::error::excerpt;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

#[derive(Default)]
struct ProgressState {
    /// Spinner for the whole run, created on the first event.
    bar: Option<ProgressBar>,
    /// What the spinner is currently working on, e.g. "CORE/engine".
    current: String,
    authors: usize,
}

/// Interactive progress reporter using indicatif.
pub struct InteractiveReporter {
    multi: MultiProgress,
    state: Mutex<ProgressState>,
}

impl InteractiveReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            state: Mutex::new(ProgressState::default()),
        }
    }

    fn bar(&self, state: &mut ProgressState) -> ProgressBar {
        state
            .bar
            .get_or_insert_with(|| {
                let pb = self.multi.add(ProgressBar::new_spinner());
                pb.set_style(Self::counter_style());
                pb.set_prefix(format!("{:12}", "Scanning"));
                pb.enable_steady_tick(Duration::from_millis(100));
                pb
            })
            .clone()
    }

    pub fn handle(&self, event: CensusProgress) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        match event {
            CensusProgress::ProjectsListed { total, selected } => {
                let pb = self.bar(&mut state);
                pb.set_message(format!("{} projects found, {} selected", total, selected));
            }

            CensusProgress::ScanningProject { key } => {
                let pb = self.bar(&mut state);
                pb.set_message(format!("{}: listing repositories...", key));
                state.current = key;
            }

            CensusProgress::ScanningRepository { project, slug } => {
                let pb = self.bar(&mut state);
                state.current = format!("{}/{}", project, slug);
                pb.set_message(format!("{} ({} authors so far)", state.current, state.authors));
            }

            CensusProgress::FetchedPage { total_so_far, .. } => {
                if let Some(ref pb) = state.bar {
                    pb.set_message(format!(
                        "{}: {} items ({} authors so far)",
                        state.current, total_so_far, state.authors
                    ));
                }
            }

            CensusProgress::RepositoryScanned { new_authors, .. } => {
                state.authors += new_authors;
                if let Some(ref pb) = state.bar {
                    pb.inc(1);
                }
            }

            CensusProgress::MalformedPage {
                url,
                start,
                reason,
                raw,
            } => {
                drop(state);
                self.multi.println(malformed_warning(&url, start, &reason, &raw)).ok();
            }

            CensusProgress::UnsortedCommits { project, slug } => {
                drop(state);
                self.multi
                    .println(format!(
                        "⚠ {}/{} returned commits out of order; authors may be missed",
                        project, slug
                    ))
                    .ok();
            }

            CensusProgress::CensusComplete {
                authors,
                repositories,
                lookback_days,
            } => {
                let pb = self.bar(&mut state);
                pb.finish_with_message(format!(
                    "✓ {} authors across {} repositories (last {} days)",
                    authors, repositories, lookback_days
                ));
            }

            _ => {}
        }
    }

    pub fn finish(&self) {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(ref pb) = state.bar
            && !pb.is_finished()
        {
            pb.finish();
        }
    }

    fn counter_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.cyan} {spinner:.green} {pos:>4} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
    }
}

fn malformed_warning(url: &str, start: u64, reason: &str, raw: &str) -> String {
    format!(
        "⚠ Partial results for {} (start={}): {}\n  response: {}",
        url,
        start,
        reason,
        excerpt(raw)
    )
}

impl Default for InteractiveReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_warning_shows_the_response() {
        let line = malformed_warning(
            "https://bb/rest/api/1.0/projects/A/repos/empty/commits",
            0,
            "missing field `values`",
            r#"{"errors":[{"message":"Repository A/empty does not have any commits"}]}"#,
        );

        assert!(line.contains("(start=0): missing field `values`"));
        assert!(line.contains("does not have any commits"));
    }
}
