//! GitHub GraphQL adapter: pull request lookup, search and status.

pub mod client;
pub mod models;
pub mod search_query;

pub use client::{pr_number_from_url, repo_from_url, GitHubClient, RateLimiter, SearchOptions};
pub use models::{CommitStatus, PullRequestSummary, StatusContext, StatusState};
pub use search_query::{SearchAttribute, SearchQuery};
