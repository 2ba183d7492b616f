//! GitHub GraphQL client with rate limiting.
//!
//! Provides the pull request lookups used for manual linking: fetch a PR by
//! URL, search PRs, and read the CI status of a PR's last commit. Includes
//! a token-bucket rate limiter to stay within the authenticated API limit.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::GitHubConfig;

use super::models::{
    CommitStatus, GraphQlResponse, PrCommits, PullRequestSummary, RepositoryData, SearchData,
};
use super::search_query::SearchQuery;

const PR_FOR_LINK_FRAGMENT: &str = r"
fragment PrForLink on PullRequest {
  id
  number
  title
  url
  state
  merged
  headRefName
  repository { url }
}";

const PR_STATUS_FRAGMENT: &str = r"
fragment PrStatus on PullRequest {
  commits(last: 1) {
    nodes {
      commit {
        statusCheckRollup { state }
        status {
          contexts { context description targetUrl avatarUrl state }
        }
      }
    }
  }
}";

const GET_PR_QUERY: &str = r"
query GetPr($name: String!, $owner: String!, $number: Int!) {
  repository(name: $name, owner: $owner) {
    pullRequest(number: $number) { ...PrForLink }
  }
}";

const GET_STATUS_QUERY: &str = r"
query GetStatus($name: String!, $owner: String!, $number: Int!) {
  repository(name: $name, owner: $owner) {
    pullRequest(number: $number) { ...PrStatus }
  }
}";

const SEARCH_FOR_PR_QUERY: &str = r"
query searchForPr($searchQuery: String!, $count: Int!, $includeStatus: Boolean = false) {
  search(query: $searchQuery, type: ISSUE, first: $count) {
    edges {
      node {
        __typename
        ... on PullRequest {
          ...PrForLink
          ...PrStatus @include(if: $includeStatus)
        }
      }
    }
  }
}";

/// Token-bucket rate limiter.
///
/// Allows up to `capacity` requests per `window`. When the bucket is
/// exhausted, [`acquire`](RateLimiter::acquire) sleeps until the window
/// resets.
#[derive(Debug)]
pub struct RateLimiter {
    capacity: u32,
    tokens: u32,
    window: Duration,
    window_start: Instant,
}

impl RateLimiter {
    pub fn new(capacity: u32, window: Duration) -> Self {
        Self {
            capacity,
            tokens: capacity,
            window,
            window_start: Instant::now(),
        }
    }

    /// Acquire a single token, sleeping if necessary.
    pub async fn acquire(&mut self) {
        let elapsed = self.window_start.elapsed();
        if elapsed >= self.window {
            self.tokens = self.capacity;
            self.window_start = Instant::now();
        }

        if self.tokens > 0 {
            self.tokens -= 1;
            return;
        }

        let remaining = self.window.saturating_sub(elapsed);
        tracing::warn!(
            sleep_ms = remaining.as_millis() as u64,
            "GitHub rate limit reached, sleeping"
        );
        tokio::time::sleep(remaining).await;
        self.tokens = self.capacity.saturating_sub(1);
        self.window_start = Instant::now();
    }

    pub fn available(&self) -> u32 {
        self.tokens
    }
}

/// Options for [`GitHubClient::search_for_prs`].
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub query: SearchQuery,
    /// Maximum number of results.
    pub count: u32,
    /// Also select the last commit's CI status.
    pub include_status: bool,
}

impl SearchOptions {
    pub fn new(query: SearchQuery) -> Self {
        Self {
            query,
            count: 20,
            include_status: false,
        }
    }

    #[must_use]
    pub fn count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    #[must_use]
    pub fn include_status(mut self, include: bool) -> Self {
        self.include_status = include;
        self
    }
}

fn url_segments(url: &str) -> DomainResult<Vec<String>> {
    let parsed = Url::parse(url)
        .map_err(|e| DomainError::ValidationFailed(format!("Invalid GitHub URL '{url}': {e}")))?;
    Ok(parsed
        .path_segments()
        .map(|segments| {
            segments
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default())
}

/// Owner and repository name from a GitHub repository or pull request URL.
pub fn repo_from_url(url: &str) -> DomainResult<(String, String)> {
    match url_segments(url)?.as_slice() {
        [owner, name, ..] => Ok((owner.clone(), name.clone())),
        _ => Err(DomainError::ValidationFailed(format!(
            "URL '{url}' does not name a repository"
        ))),
    }
}

/// Pull request number from a URL like `https://github.com/o/r/pull/42`.
pub fn pr_number_from_url(url: &str) -> DomainResult<u64> {
    url_segments(url)?
        .get(3)
        .and_then(|segment| segment.parse().ok())
        .ok_or_else(|| DomainError::ValidationFailed(format!("URL '{url}' does not name a pull request")))
}

/// HTTP client for the GitHub GraphQL API.
///
/// All methods return [`DomainResult`] and map HTTP / network errors
/// to [`DomainError::ExecutionFailed`].
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    token: String,
    api_url: String,
    /// Shared rate limiter (5 000 req/hr for authenticated requests).
    rate_limiter: Arc<Mutex<RateLimiter>>,
}

impl GitHubClient {
    pub fn new(token: impl Into<String>, api_url: impl Into<String>) -> Self {
        let rate_limiter = RateLimiter::new(5_000, Duration::from_secs(3_600));
        Self {
            http: Client::new(),
            token: token.into(),
            api_url: api_url.into(),
            rate_limiter: Arc::new(Mutex::new(rate_limiter)),
        }
    }

    /// Create a client reading the token from the configured variable.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::ValidationFailed`] if the variable is unset
    /// or empty.
    pub fn from_config(config: &GitHubConfig) -> DomainResult<Self> {
        let token = std::env::var(&config.token_env).unwrap_or_default();
        if token.is_empty() {
            return Err(DomainError::ValidationFailed(format!(
                "{} environment variable is not set",
                config.token_env
            )));
        }
        Ok(Self::new(token, config.api_url.clone()))
    }

    async fn graphql<T: DeserializeOwned>(
        &self,
        operation: &str,
        query: String,
        variables: Value,
    ) -> DomainResult<T> {
        self.rate_limiter.lock().await.acquire().await;

        tracing::debug!(operation, "GitHub GraphQL request");
        let resp = self
            .http
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("User-Agent", "prlink")
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| DomainError::ExecutionFailed(format!("GitHub {operation} request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(DomainError::ExecutionFailed(format!(
                "GitHub {operation} returned {status}: {body}"
            )));
        }

        let body: GraphQlResponse<T> = resp
            .json()
            .await
            .map_err(|e| DomainError::ExecutionFailed(format!("GitHub {operation} parse failed: {e}")))?;

        if !body.errors.is_empty() {
            let messages: Vec<String> = body.errors.into_iter().map(|e| e.message).collect();
            return Err(DomainError::ExecutionFailed(format!(
                "GitHub {operation} failed: {}",
                messages.join("; ")
            )));
        }

        body.data
            .ok_or_else(|| DomainError::ExecutionFailed(format!("GitHub {operation} returned no data")))
    }

    /// Fetch a pull request by its web URL.
    pub async fn get_pr_by_url(&self, url: &str) -> DomainResult<PullRequestSummary> {
        let (owner, name) = repo_from_url(url)?;
        let number = pr_number_from_url(url)?;

        let data: RepositoryData<PullRequestSummary> = self
            .graphql(
                "GetPr",
                format!("{GET_PR_QUERY}{PR_FOR_LINK_FRAGMENT}"),
                json!({ "owner": owner, "name": name, "number": number }),
            )
            .await?;

        data.repository
            .and_then(|repo| repo.pull_request)
            .ok_or_else(|| DomainError::ExecutionFailed(format!("Pull request not found: {url}")))
    }

    /// Search pull requests. Non-PR search hits are skipped.
    pub async fn search_for_prs(&self, options: &SearchOptions) -> DomainResult<Vec<PullRequestSummary>> {
        let data: SearchData = self
            .graphql(
                "searchForPr",
                format!("{SEARCH_FOR_PR_QUERY}{PR_FOR_LINK_FRAGMENT}{PR_STATUS_FRAGMENT}"),
                json!({
                    "searchQuery": options.query.to_query(),
                    "count": options.count,
                    "includeStatus": options.include_status,
                }),
            )
            .await?;

        data.search
            .edges
            .into_iter()
            .filter(|edge| edge.node["__typename"] == "PullRequest")
            .map(|edge| serde_json::from_value(edge.node).map_err(DomainError::from))
            .collect()
    }

    /// CI status of the last commit on pull request `number` in the
    /// repository `url` points into.
    pub async fn fetch_pr_status(&self, url: &str, number: u64) -> DomainResult<CommitStatus> {
        let (owner, name) = repo_from_url(url)?;

        let data: RepositoryData<PrCommits> = self
            .graphql(
                "GetStatus",
                format!("{GET_STATUS_QUERY}{PR_STATUS_FRAGMENT}"),
                json!({ "owner": owner, "name": name, "number": number }),
            )
            .await?;

        data.repository
            .and_then(|repo| repo.pull_request)
            .and_then(|pr| pr.commits.nodes.into_iter().next())
            .map(|node| node.commit)
            .ok_or_else(|| DomainError::ExecutionFailed(format!("No commits for {owner}/{name}#{number}")))
    }
}
