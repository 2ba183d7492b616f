//! `prlink prs`: list the account-level pull request links.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::cli::context::AppContext;
use crate::cli::output::{list_table, output, CommandOutput};
use crate::domain::models::{AccountPrEntry, Config};

#[derive(Args, Debug)]
pub struct PrsArgs {
    /// Only show entries for this pull request number
    #[arg(long)]
    pub pr: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct PrListOutput {
    pub entries: Vec<AccountPrEntry>,
    pub total: usize,
}

impl CommandOutput for PrListOutput {
    fn to_human(&self) -> String {
        if self.entries.is_empty() {
            return "No linked pull requests.".to_string();
        }

        let mut table = list_table(&["pr", "type", "record"]);
        for entry in &self.entries {
            let (typename, reference) = &entry.record_reference;
            table.add_row(vec![format!("#{}", entry.pr_number), typename.clone(), reference.clone()]);
        }
        format!("Found {} link(s):\n{table}", self.total)
    }
}

pub async fn execute(args: PrsArgs, config: &Config, json_mode: bool) -> Result<()> {
    let ctx = AppContext::build(config).await?;
    let entries: Vec<AccountPrEntry> = ctx
        .links
        .all_prs()
        .await?
        .into_iter()
        .filter(|entry| args.pr.is_none_or(|number| entry.pr_number == number))
        .collect();

    output(
        &PrListOutput {
            total: entries.len(),
            entries,
        },
        json_mode,
    );
    Ok(())
}
