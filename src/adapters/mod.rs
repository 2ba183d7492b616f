//! Adapters for storage, the GitHub API and inbound HTTP.

pub mod github;
pub mod http;
pub mod memory;
pub mod sqlite;
