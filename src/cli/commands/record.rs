//! `prlink record`: manage records in the local store.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::cli::context::{parse_kind, AppContext};
use crate::cli::output::{output, truncate, CommandOutput};
use crate::domain::models::{BranchLink, Config, PrLink, Record, RecordKind};
use crate::domain::ports::RecordRepository;

#[derive(Args, Debug)]
pub struct RecordArgs {
    #[command(subcommand)]
    pub command: RecordCommands,
}

#[derive(Subcommand, Debug)]
pub enum RecordCommands {
    /// Add a record
    Add {
        /// Record kind (requirement, epic, feature)
        kind: String,
        /// Reference number, e.g. PROJ-12
        reference: String,
        /// Display name (defaults to the reference number)
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Show a record with its linked pull requests and branches
    Show {
        /// Reference number
        reference: String,
        /// Record kind; every kind is tried when omitted
        #[arg(short, long)]
        kind: Option<String>,
    },
}

#[derive(Debug, Serialize)]
pub struct RecordOutput {
    pub success: bool,
    pub message: String,
    pub record: Record,
}

impl CommandOutput for RecordOutput {
    fn to_human(&self) -> String {
        self.message.clone()
    }
}

#[derive(Debug, Serialize)]
pub struct RecordDetailOutput {
    pub record: Record,
    pub pull_requests: Vec<PrLink>,
    pub branches: Vec<BranchLink>,
}

impl CommandOutput for RecordDetailOutput {
    fn to_human(&self) -> String {
        let record = &self.record;
        let mut lines = vec![
            format!("{} {}: {}", record.kind, record.reference_num, record.name),
            format!(
                "Status: {}",
                record.workflow_status.as_deref().unwrap_or("-")
            ),
            String::new(),
        ];

        if self.pull_requests.is_empty() {
            lines.push("No linked pull requests.".to_string());
        } else {
            lines.push(format!("Pull requests ({}):", self.pull_requests.len()));
            for pr in &self.pull_requests {
                lines.push(format!(
                    "  #{:<6} {:<8} {:<40} {}",
                    pr.id,
                    pr.state.as_str(),
                    truncate(&pr.name, 40),
                    pr.url
                ));
            }
        }

        if self.branches.is_empty() {
            lines.push("No linked branches.".to_string());
        } else {
            lines.push(format!("Branches ({}):", self.branches.len()));
            for branch in &self.branches {
                lines.push(format!("  {:<30} {}", truncate(&branch.name, 30), branch.url));
            }
        }

        lines.join("\n")
    }
}

pub async fn execute(args: RecordArgs, config: &Config, json_mode: bool) -> Result<()> {
    let ctx = AppContext::build(config).await?;

    match args.command {
        RecordCommands::Add {
            kind,
            reference,
            name,
        } => {
            let kind: RecordKind = kind.parse()?;
            let record = Record::new(kind, reference.clone(), name.unwrap_or_else(|| reference.clone()));
            ctx.records
                .create(&record)
                .await
                .with_context(|| format!("Failed to add {kind} {reference}"))?;

            let out = RecordOutput {
                success: true,
                message: format!("Added {kind} {reference}"),
                record,
            };
            output(&out, json_mode);
        }

        RecordCommands::Show { reference, kind } => {
            let record = ctx.find_record(parse_kind(kind.as_deref())?, &reference).await?;
            let record_ref = record.to_ref();
            let out = RecordDetailOutput {
                pull_requests: ctx.links.pull_requests(&record_ref).await?,
                branches: ctx.links.branches(&record_ref).await?,
                record,
            };
            output(&out, json_mode);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::PrState;

    #[test]
    fn test_detail_output_lists_links() {
        let out = RecordDetailOutput {
            record: Record::new(RecordKind::Feature, "PROJ-1", "Checkout")
                .with_workflow_status("In progress"),
            pull_requests: vec![PrLink {
                id: 5,
                name: "PROJ-1 fix".to_string(),
                url: "https://github.com/org/repo/pull/5".to_string(),
                state: PrState::Merged,
            }],
            branches: vec![BranchLink::new("PROJ-1-fix", "https://github.com/org/repo")],
        };

        let human = out.to_human();
        assert!(human.starts_with("Feature PROJ-1: Checkout"));
        assert!(human.contains("Status: In progress"));
        assert!(human.contains("#5"));
        assert!(human.contains("merged"));
        assert!(human.contains("https://github.com/org/repo/tree/PROJ-1-fix"));

        let json = out.to_json();
        assert_eq!(json["pull_requests"][0]["id"], 5);
        assert_eq!(json["record"]["referenceNum"], "PROJ-1");
    }
}
