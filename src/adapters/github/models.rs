//! GitHub GraphQL response models.
//!
//! These structs map to the fields selected by the client's queries. They
//! are converted into domain types before reaching the linking services.

use serde::{Deserialize, Serialize};

use crate::domain::models::{LinkablePullRequest, PrState};

/// Repository reference selected on pull requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRef {
    /// Web URL of the repository.
    pub url: String,
}

/// Pull request fields selected for linking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestSummary {
    /// GraphQL node id.
    pub id: String,
    pub number: u64,
    pub title: String,
    /// Web URL of the pull request.
    pub url: String,
    /// `OPEN`, `CLOSED` or `MERGED`.
    pub state: String,
    pub merged: bool,
    #[serde(default)]
    pub head_ref_name: Option<String>,
    #[serde(default)]
    pub repository: Option<RepositoryRef>,
    /// Present only when the status was requested.
    #[serde(default)]
    pub commits: Option<CommitConnection>,
}

impl PullRequestSummary {
    /// Status of the last commit, when it was selected.
    pub fn last_commit_status(&self) -> Option<&CommitStatus> {
        self.commits
            .as_ref()
            .and_then(|commits| commits.nodes.first())
            .map(|node| &node.commit)
    }
}

impl From<&PullRequestSummary> for LinkablePullRequest {
    fn from(pr: &PullRequestSummary) -> Self {
        Self {
            number: pr.number,
            title: pr.title.clone(),
            url: pr.url.clone(),
            state: PrState::from_github(&pr.state, pr.merged),
            head_branch: pr.head_ref_name.clone().filter(|name| !name.is_empty()),
            repository_url: pr.repository.as_ref().map(|repo| repo.url.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitConnection {
    pub nodes: Vec<CommitNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitNode {
    pub commit: CommitStatus,
}

/// Combined CI state of a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusState {
    Expected,
    Error,
    Failure,
    Success,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCheckRollup {
    pub state: StatusState,
}

/// A single commit status context (one CI check).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusContext {
    pub context: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub target_url: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub state: StatusState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub contexts: Vec<StatusContext>,
}

/// CI status of a pull request's last commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitStatus {
    #[serde(default)]
    pub status_check_rollup: Option<StatusCheckRollup>,
    #[serde(default)]
    pub status: Option<Status>,
}

impl CommitStatus {
    /// Rollup state, if GitHub computed one.
    pub fn state(&self) -> Option<StatusState> {
        self.status_check_rollup.as_ref().map(|rollup| rollup.state)
    }
}

/// GraphQL response envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RepositoryPullRequest<T> {
    pub pull_request: Option<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RepositoryData<T> {
    pub repository: Option<RepositoryPullRequest<T>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchData {
    pub search: SearchConnection,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchConnection {
    pub edges: Vec<SearchEdge>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchEdge {
    pub node: serde_json::Value,
}

/// Commits selection used by the status query.
#[derive(Debug, Deserialize)]
pub(crate) struct PrCommits {
    pub commits: CommitConnection,
}
