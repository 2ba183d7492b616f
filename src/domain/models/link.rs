//! Link entries stored in record and account extension fields.
//!
//! Each list field holds entries keyed by `id`. Writers upsert by that key,
//! so a list never carries two entries with the same id.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::record::RecordRef;

/// An entry in a keyed list field.
pub trait ListEntry: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Key type used for upsert comparisons.
    type Id: PartialEq + fmt::Debug + Send + Sync;

    /// The key this entry is stored under.
    fn entry_id(&self) -> &Self::Id;
}

/// Lifecycle state of a pull request as shown on a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrState {
    Open,
    Closed,
    Merged,
}

impl PrState {
    /// Derive the link state from GitHub's `state` string and `merged` flag.
    ///
    /// A merged pull request always reports `merged`, whatever its `state`.
    /// Unrecognised states fall back to `open`.
    pub fn from_github(state: &str, merged: bool) -> Self {
        if merged {
            return Self::Merged;
        }
        match state.to_lowercase().as_str() {
            "closed" => Self::Closed,
            "merged" => Self::Merged,
            _ => Self::Open,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Merged => "merged",
        }
    }
}

impl fmt::Display for PrState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pull request linked to a record, keyed by PR number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrLink {
    pub id: u64,
    pub name: String,
    pub url: String,
    pub state: PrState,
}

impl ListEntry for PrLink {
    type Id = u64;

    fn entry_id(&self) -> &u64 {
        &self.id
    }
}

/// A branch linked to a record, keyed by branch name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchLink {
    pub id: String,
    pub name: String,
    pub url: String,
}

impl BranchLink {
    /// Build a branch link pointing at the branch's tree view in `repo_url`.
    pub fn new(branch_name: &str, repo_url: &str) -> Self {
        Self {
            id: branch_name.to_string(),
            name: branch_name.to_string(),
            url: format!("{}/tree/{}", repo_url.trim_end_matches('/'), branch_name),
        }
    }
}

impl ListEntry for BranchLink {
    type Id = String;

    fn entry_id(&self) -> &String {
        &self.id
    }
}

/// Account-level aggregate entry for one (PR, record) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountPrEntry {
    /// Composite key, see [`account_pr_id`].
    pub id: String,
    pub pr_number: u64,
    /// `[record type name, record reference number]`.
    pub record_reference: (String, String),
}

impl AccountPrEntry {
    pub fn new(pr_number: u64, record: &RecordRef) -> Self {
        Self {
            id: account_pr_id(pr_number, &record.reference_num),
            pr_number,
            record_reference: (record.typename().to_string(), record.reference_num.clone()),
        }
    }
}

impl ListEntry for AccountPrEntry {
    type Id = String;

    fn entry_id(&self) -> &String {
        &self.id
    }
}

/// Composite account key: PR number immediately followed by the record's
/// reference number, e.g. `5` + `PROJ-1` = `5PROJ-1`.
pub fn account_pr_id(pr_number: u64, reference_num: &str) -> String {
    format!("{pr_number}{reference_num}")
}

/// Source-neutral description of a pull request to link.
///
/// Built from webhook payloads and from PRs fetched through the GitHub API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkablePullRequest {
    pub number: u64,
    pub title: String,
    pub url: String,
    pub state: PrState,
    /// Head branch name, when the source carries it.
    pub head_branch: Option<String>,
    /// Repository web URL, used to build branch links.
    pub repository_url: Option<String>,
}

impl LinkablePullRequest {
    pub fn to_pr_link(&self) -> PrLink {
        PrLink {
            id: self.number,
            name: self.title.clone(),
            url: self.url.clone(),
            state: self.state,
        }
    }

    /// Branch link for the head branch, when both branch and repository are known.
    pub fn head_branch_link(&self) -> Option<BranchLink> {
        match (&self.head_branch, &self.repository_url) {
            (Some(branch), Some(repo_url)) if !branch.is_empty() => {
                Some(BranchLink::new(branch, repo_url))
            }
            _ => None,
        }
    }
}
