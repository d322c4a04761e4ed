//! Census report output.

use clap::ValueEnum;
use devcount::error::excerpt;
use devcount::{CensusReport, RepositoryTally};
use serde::Serialize;
use tabled::Tabled;
use tabled::settings::Style;

/// Output format for the census report.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Summary, per-repository table and author list (default)
    #[default]
    Text,
    /// The full report as JSON
    Json,
}

#[derive(Debug, Clone, Tabled)]
struct RepositoryRow {
    #[tabled(rename = "Project")]
    project: String,
    #[tabled(rename = "Repository")]
    slug: String,
    #[tabled(rename = "Commits")]
    commits: usize,
    #[tabled(rename = "New authors")]
    new_authors: usize,
    #[tabled(rename = "Complete")]
    complete: &'static str,
}

impl From<&RepositoryTally> for RepositoryRow {
    fn from(tally: &RepositoryTally) -> Self {
        Self {
            project: tally.project.clone(),
            slug: tally.slug.clone(),
            commits: tally.commits,
            new_authors: tally.new_authors,
            complete: if tally.truncated { "no" } else { "yes" },
        }
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    unique_authors: usize,
    commits_in_window: usize,
    partial: bool,
    #[serde(flatten)]
    report: &'a CensusReport,
}

pub(crate) fn render(
    report: &CensusReport,
    format: OutputFormat,
) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Text => Ok(render_text(report)),
        OutputFormat::Json => render_json(report),
    }
}

fn render_json(report: &CensusReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&JsonReport {
        unique_authors: report.unique_authors(),
        commits_in_window: report.commits_in_window(),
        partial: report.is_partial(),
        report,
    })
}

fn render_text(report: &CensusReport) -> String {
    let mut out = String::new();

    if !report.repositories.is_empty() {
        let rows: Vec<RepositoryRow> =
            report.repositories.iter().map(RepositoryRow::from).collect();
        let mut table = tabled::Table::new(rows);
        table.with(Style::rounded());
        out.push_str(&table.to_string());
        out.push_str("\n\n");
    }

    out.push_str(&format!(
        "Found {} authors in the last {} days\n",
        report.unique_authors(),
        report.lookback_days
    ));
    out.push_str("Authors found:\n");
    for author in &report.authors {
        out.push_str(&format!("{}\n", author));
    }

    if report.is_partial() {
        out.push_str(&format!(
            "\n⚠ {} listing(s) ended early; the count may be low:\n",
            report.truncated.len()
        ));
        for page in &report.truncated {
            out.push_str(&format!("  {}\n", page));
            out.push_str(&format!("    response: {}\n", excerpt(&page.raw)));
        }
    }

    out
}
