//! CLI command implementations.

pub mod extract;
pub mod link;
pub mod prs;
pub mod record;
pub mod serve;
pub mod unlink;
