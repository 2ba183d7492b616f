//! Domain models for pull request and branch linking.

pub mod config;
pub mod link;
pub mod record;
pub mod reference;
pub mod webhook;

pub use config::{
    Config, DatabaseConfig, GitHubConfig, LabelRule, LinkStoreSettings, LoggingConfig,
    ServerConfig,
};
pub use link::{
    account_pr_id, AccountPrEntry, BranchLink, LinkablePullRequest, ListEntry, PrLink, PrState,
};
pub use record::{Record, RecordRef};
pub use reference::{RecordKind, Reference};
pub use webhook::{
    CreatePayload, HeadRef, PullRequestPayload, ReviewPayload, ReviewedPullRequest,
    WebhookLabel, WebhookPullRequest, WebhookRepository,
};
