//! `prlink extract`: show the references a text would resolve.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Reference;
use crate::services::extract_references;

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Pull request title or branch name
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ExtractOutput {
    pub text: String,
    pub references: Vec<Reference>,
}

impl CommandOutput for ExtractOutput {
    fn to_human(&self) -> String {
        if self.references.is_empty() {
            return format!("No references found in '{}'.", self.text);
        }

        let mut lines = vec![format!("{:<12} {}", "KIND", "IDENTIFIER")];
        lines.extend(
            self.references
                .iter()
                .map(|r| format!("{:<12} {}", r.kind.as_str(), r.identifier)),
        );
        lines.join("\n")
    }
}

pub fn execute(args: ExtractArgs, json_mode: bool) -> Result<()> {
    let references = extract_references(&args.text).unwrap_or_default();
    output(
        &ExtractOutput {
            text: args.text,
            references,
        },
        json_mode,
    );
    Ok(())
}
