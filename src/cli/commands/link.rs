//! `prlink link-pr`: link a pull request fetched from GitHub.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::adapters::github::{GitHubClient, StatusState};
use crate::cli::context::AppContext;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{Config, LinkablePullRequest, PrState, RecordRef};

#[derive(Args, Debug)]
pub struct LinkPrArgs {
    /// Pull request URL, e.g. https://github.com/org/repo/pull/42
    pub url: String,

    /// Also fetch the CI status of the pull request's last commit
    #[arg(long)]
    pub status: bool,
}

#[derive(Debug, Serialize)]
pub struct LinkOutput {
    pub number: u64,
    pub title: String,
    pub url: String,
    pub state: PrState,
    pub records: Vec<RecordRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ci_status: Option<StatusState>,
}

impl CommandOutput for LinkOutput {
    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        if self.records.is_empty() {
            lines.push(format!(
                "PR #{} ('{}') does not reference any known record.",
                self.number, self.title
            ));
        } else {
            let records: Vec<String> = self.records.iter().map(ToString::to_string).collect();
            lines.push(format!("Linked PR #{} to {}", self.number, records.join(", ")));
        }
        if let Some(status) = self.ci_status {
            lines.push(format!("CI status: {status:?}"));
        }
        lines.join("\n")
    }
}

pub async fn execute(args: LinkPrArgs, config: &Config, json_mode: bool) -> Result<()> {
    let client = GitHubClient::from_config(&config.github)?;
    let summary = client
        .get_pr_by_url(&args.url)
        .await
        .with_context(|| format!("Failed to fetch {}", args.url))?;
    let pr = LinkablePullRequest::from(&summary);

    let ctx = AppContext::build(config).await?;
    let records = ctx.orchestrator.link_pull_request(&pr).await?;

    let ci_status = match (args.status, summary.repository.as_ref()) {
        (true, Some(repository)) => client
            .fetch_pr_status(&repository.url, summary.number)
            .await?
            .state(),
        _ => None,
    };

    let out = LinkOutput {
        number: pr.number,
        title: pr.title,
        url: pr.url,
        state: pr.state,
        records,
        ci_status,
    };
    output(&out, json_mode);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::RecordKind;

    fn link_output(records: Vec<RecordRef>) -> LinkOutput {
        LinkOutput {
            number: 42,
            title: "PROJ-1 checkout".to_string(),
            url: "https://github.com/org/repo/pull/42".to_string(),
            state: PrState::Open,
            records,
            ci_status: None,
        }
    }

    #[test]
    fn test_human_output_names_records() {
        let out = link_output(vec![RecordRef::new("r1", RecordKind::Feature, "PROJ-1")]);
        assert_eq!(out.to_human(), "Linked PR #42 to Feature:PROJ-1");
        assert!(out.to_json().get("ci_status").is_none());
    }

    #[test]
    fn test_human_output_without_records() {
        let out = link_output(Vec::new());
        assert!(out.to_human().contains("does not reference any known record"));
    }
}
