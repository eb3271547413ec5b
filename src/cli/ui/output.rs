use console::style;

use crate::discovery::{BatchSummary, RepositoryStatus};
use crate::types::RepositoryOutcome;

pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", style("✓").green(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        println!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        println!("{} {}", style("ℹ").blue(), message);
    }

    pub fn header(&self, message: &str) {
        println!("\n{}", style(message).bold().underlined());
    }

    pub fn section(&self, message: &str) {
        println!("\n{}", style(message).bold());
        println!("{}", "─".repeat(40));
    }

    /// One line per finished repository
    pub fn repository_status(&self, status: &RepositoryStatus) {
        match status {
            RepositoryStatus::Completed(outcome) => self.success(&outcome_line(outcome)),
            RepositoryStatus::Failed { url, message } => {
                self.error(&format!("{}: {}", url, message))
            }
            RepositoryStatus::Skipped { url } => {
                self.warning(&format!("{}: skipped (interrupted)", url))
            }
        }
    }

    pub fn summary(&self, summary: &BatchSummary) {
        self.section("Summary");
        for (label, value) in summary_rows(summary) {
            println!("  {:<22} {}", label, style(value).bold());
        }

        if !summary.errors.is_empty() {
            self.section("Errors");
            for (url, message) in &summary.errors {
                println!("  {} {}", style(url).red(), message);
            }
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

fn outcome_line(outcome: &RepositoryOutcome) -> String {
    if !outcome.deployable {
        return format!("{}: not deployable", outcome.full_name);
    }

    let repo_type = outcome.repo_type.map(|t| t.as_str()).unwrap_or("unknown");
    let names: Vec<&str> = outcome.components.iter().map(|c| c.name.as_str()).collect();
    let mut line = format!(
        "{}: {} ({} component{}: {})",
        outcome.full_name,
        repo_type,
        names.len(),
        if names.len() == 1 { "" } else { "s" },
        names.join(", ")
    );
    if !outcome.warnings.is_empty() {
        line.push_str(&format!(" [{} warning(s)]", outcome.warnings.len()));
    }
    line
}

fn summary_rows(summary: &BatchSummary) -> Vec<(&'static str, usize)> {
    vec![
        ("Repositories processed", summary.total_processed),
        ("Deployable", summary.deployable),
        ("Not deployable", summary.non_deployable),
        ("Mono-repos", summary.mono_repos),
        ("Single-purpose", summary.single_purpose),
        ("Services", summary.services),
        ("Unique teams", summary.unique_teams),
        ("Tech stacks", summary.tech_stacks),
        ("Failed", summary.failed),
        ("Skipped", summary.skipped),
    ]
}
