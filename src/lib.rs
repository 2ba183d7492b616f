//! prlink - links GitHub pull requests and branches to project records
//!
//! Webhook deliveries (`create`, `pull_request`, `pull_request_review`) are
//! scanned for record references such as `PROJ-12` in PR titles and branch
//! names. Each referenced record gets the PR or branch appended to a
//! namespaced extension field, and an account-level list aggregates every
//! (PR, record) pair.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): link models, record references, port traits
//! - **Service Layer** (`services`): extraction, resolution, link storage,
//!   orchestration and event fan-out
//! - **Adapters** (`adapters`): in-memory and `SQLite` stores, GitHub client,
//!   webhook HTTP receiver
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```
//! use prlink::services::extract_references;
//!
//! let refs = extract_references("PROJ-12-3 tidy validation").unwrap();
//! assert_eq!(refs[0].identifier, "PROJ-12-3");
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    Config, LinkablePullRequest, PrState, Record, RecordKind, RecordRef, Reference,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{LinkStore, LinkingOrchestrator, RecordResolver};
