//! Inbound GitHub webhook payload shapes.
//!
//! Only the fields the linking flow reads are modelled; everything else in
//! the payload is ignored on deserialization and forwarded untouched in
//! domain events.

use serde::{Deserialize, Serialize};

use super::link::{LinkablePullRequest, PrState};

/// Repository object as it appears in webhook payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookRepository {
    pub html_url: String,
}

/// `create` event: a branch or tag was created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePayload {
    /// `"branch"` or `"tag"`.
    pub ref_type: String,
    /// Name of the created ref.
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub repository: WebhookRepository,
    #[serde(default)]
    pub action: Option<String>,
}

impl CreatePayload {
    pub fn is_branch(&self) -> bool {
        self.ref_type == "branch"
    }
}

/// Head ref of a pull request.
///
/// GitHub sends the branch name as `ref`; `name` is accepted as well.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeadRef {
    #[serde(default, alias = "ref")]
    pub name: Option<String>,
}

/// Pull request object inside `pull_request` events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookPullRequest {
    pub title: String,
    pub number: u64,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    pub state: String,
    #[serde(default)]
    pub merged: Option<bool>,
    #[serde(default)]
    pub head: Option<HeadRef>,
    #[serde(default)]
    pub repository: Option<WebhookRepository>,
}

impl WebhookPullRequest {
    /// Web URL of the PR, preferring `html_url` over the API `url`.
    pub fn link_url(&self) -> String {
        self.html_url
            .clone()
            .or_else(|| self.url.clone())
            .unwrap_or_default()
    }

    pub fn head_branch(&self) -> Option<&str> {
        self.head
            .as_ref()
            .and_then(|head| head.name.as_deref())
            .filter(|name| !name.is_empty())
    }

    /// Convert to the link input, falling back to the event-level repository
    /// when the PR object carries none.
    pub fn to_linkable(&self, fallback_repository: Option<&WebhookRepository>) -> LinkablePullRequest {
        let repository_url = self
            .repository
            .as_ref()
            .or(fallback_repository)
            .map(|repo| repo.html_url.clone());

        LinkablePullRequest {
            number: self.number,
            title: self.title.clone(),
            url: self.link_url(),
            state: PrState::from_github(&self.state, self.merged.unwrap_or(false)),
            head_branch: self.head_branch().map(str::to_string),
            repository_url,
        }
    }
}

/// Label attached to an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookLabel {
    pub name: String,
}

/// `pull_request` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestPayload {
    #[serde(default)]
    pub action: Option<String>,
    pub pull_request: WebhookPullRequest,
    #[serde(default)]
    pub repository: Option<WebhookRepository>,
    /// Present on `labeled` / `unlabeled` actions.
    #[serde(default)]
    pub label: Option<WebhookLabel>,
}

impl PullRequestPayload {
    pub fn to_linkable(&self) -> LinkablePullRequest {
        self.pull_request.to_linkable(self.repository.as_ref())
    }
}

/// Pull request fields read from review events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewedPullRequest {
    #[serde(default)]
    pub title: Option<String>,
}

/// `pull_request_review` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewPayload {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub pull_request: Option<ReviewedPullRequest>,
}

impl ReviewPayload {
    pub fn title(&self) -> Option<&str> {
        self.pull_request
            .as_ref()
            .and_then(|pr| pr.title.as_deref())
    }
}
