//! `prlink unlink`: remove links from a record.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::cli::context::{parse_kind, AppContext};
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{Config, RecordRef};

#[derive(Args, Debug)]
pub struct UnlinkArgs {
    /// Reference number of the record
    pub reference: String,

    /// Record kind; every kind is tried when omitted
    #[arg(short, long)]
    pub kind: Option<String>,

    /// Unlink a single pull request by number
    #[arg(long, conflicts_with = "all", required_unless_present = "all")]
    pub pr: Option<u64>,

    /// Unlink every pull request and branch (record archived)
    #[arg(long)]
    pub all: bool,
}

#[derive(Debug, Serialize)]
pub struct UnlinkOutput {
    pub success: bool,
    pub record: RecordRef,
    /// Pull request number removed, `None` when everything was unlinked.
    pub pr: Option<u64>,
}

impl CommandOutput for UnlinkOutput {
    fn to_human(&self) -> String {
        match self.pr {
            Some(number) => format!("Unlinked PR #{number} from {}", self.record),
            None => format!("Unlinked all pull requests and branches from {}", self.record),
        }
    }
}

pub async fn execute(args: UnlinkArgs, config: &Config, json_mode: bool) -> Result<()> {
    let ctx = AppContext::build(config).await?;
    let record = ctx
        .find_record(parse_kind(args.kind.as_deref())?, &args.reference)
        .await?
        .to_ref();

    match args.pr {
        Some(number) => ctx.links.unlink_pull_request(&record, number).await?,
        None => {
            ctx.links.unlink_pull_requests(&record).await?;
            ctx.links.unlink_branches(&record).await?;
        }
    }

    output(
        &UnlinkOutput {
            success: true,
            record,
            pr: args.pr,
        },
        json_mode,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::RecordKind;

    #[test]
    fn test_human_output() {
        let record = RecordRef::new("r1", RecordKind::Feature, "PROJ-1");
        let single = UnlinkOutput {
            success: true,
            record: record.clone(),
            pr: Some(5),
        };
        assert_eq!(single.to_human(), "Unlinked PR #5 from Feature:PROJ-1");

        let all = UnlinkOutput {
            success: true,
            record,
            pr: None,
        };
        assert!(all.to_human().starts_with("Unlinked all"));
    }
}
