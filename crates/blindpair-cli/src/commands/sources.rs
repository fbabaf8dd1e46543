//! Response sources shared by `collect` and `aggregate`.

use blindpair_collect::{
    FetchReport, GithubClient, GithubConfig, GithubSource, LocalSource, ResponseSource,
};
use blindpair_models::StudyConfig;
use clap::Args;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::error::{CliError, CliResult};

#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Read records from GitHub issues
    #[arg(long)]
    pub github: bool,

    /// Local result file or directory (repeatable)
    #[arg(long = "results", value_name = "PATH")]
    pub results: Vec<PathBuf>,

    /// GitHub repository owner, overriding config and GITHUB_OWNER
    #[arg(long)]
    pub owner: Option<String>,

    /// GitHub repository name, overriding config and GITHUB_REPO
    #[arg(long)]
    pub repo: Option<String>,

    /// Issue label filter; an empty value lists all issues
    #[arg(long)]
    pub label: Option<String>,

    /// Issue state: open, closed or all
    #[arg(long)]
    pub state: Option<String>,
}

impl SourceArgs {
    /// GitHub settings: environment, then study config, then flags.
    pub fn github_config(&self, study: Option<&StudyConfig>) -> GithubConfig {
        let mut config = GithubConfig::from_env();

        if let Some(section) = study.and_then(|s| s.github.as_ref()) {
            config = config.with_repo(&section.owner, &section.repo);
            config.label = non_empty(&section.label);
            config.state = section.state.clone();
        }

        if let Some(owner) = &self.owner {
            config.owner = owner.clone();
        }
        if let Some(repo) = &self.repo {
            config.repo = repo.clone();
        }
        if let Some(label) = &self.label {
            config.label = non_empty(label);
        }
        if let Some(state) = &self.state {
            config.state = state.clone();
        }
        config
    }

    /// Sources selected by the flags. Without any flag, GitHub is used when
    /// the study config names a repository.
    pub fn sources(&self, study: Option<&StudyConfig>) -> CliResult<Vec<Box<dyn ResponseSource>>> {
        let mut sources: Vec<Box<dyn ResponseSource>> = self
            .results
            .iter()
            .map(|path| Box::new(LocalSource::new(path)) as Box<dyn ResponseSource>)
            .collect();

        let use_github = self.github
            || (self.results.is_empty() && study.is_some_and(|s| s.github.is_some()));
        if use_github {
            let client = GithubClient::new(self.github_config(study))?;
            sources.push(Box::new(GithubSource::new(client)));
        }

        if sources.is_empty() {
            return Err(CliError::invalid_args(
                "no response source: pass --results PATH or --github",
            ));
        }
        Ok(sources)
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Fetch from every source. A source that cannot be read at all is logged
/// and skipped; the run fails only when every source failed.
pub async fn fetch_all(sources: &[Box<dyn ResponseSource>]) -> CliResult<(FetchReport, Vec<String>)> {
    let mut merged = FetchReport::default();
    let mut names = Vec::with_capacity(sources.len());
    let mut failures = Vec::new();

    for source in sources {
        let name = source.describe();
        match source.fetch_all().await {
            Ok(report) => {
                info!(
                    source = %name,
                    records = report.records.len(),
                    skipped = report.skipped.len(),
                    "Fetched records"
                );
                if let Some(e) = &report.error {
                    warn!(source = %name, error = %e, "Retrieval stopped early");
                }
                merged.merge(report);
            }
            Err(e) => {
                warn!(source = %name, error = %e, "Source unavailable");
                failures.push(format!("{}: {}", name, e));
            }
        }
        names.push(name);
    }

    if failures.len() == sources.len() {
        return Err(CliError::invalid_args(format!(
            "no source could be read ({})",
            failures.join("; ")
        )));
    }
    Ok((merged, names))
}
