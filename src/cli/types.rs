//! CLI type definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::commands::{
    extract::ExtractArgs, link::LinkPrArgs, prs::PrsArgs, record::RecordArgs, serve::ServeArgs,
    unlink::UnlinkArgs,
};

#[derive(Parser)]
#[command(name = "prlink")]
#[command(about = "Link GitHub pull requests and branches to project records", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .prlink/config.yaml + .prlink/local.yaml)
    #[arg(short, long, global = true, env = "PRLINK_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the webhook receiver and event dispatcher
    Serve(ServeArgs),

    /// Print the record references found in a title or branch name
    Extract(ExtractArgs),

    /// Manage records in the local store
    Record(RecordArgs),

    /// Fetch a pull request from GitHub and link it to the records it references
    LinkPr(LinkPrArgs),

    /// Remove pull request or branch links from a record
    Unlink(UnlinkArgs),

    /// List account-level pull request links
    Prs(PrsArgs),
}
