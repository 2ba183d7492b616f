//! Infrastructure layer module
//!
//! - Configuration management (figment: defaults, YAML, environment)
//! - Logging infrastructure (tracing)

pub mod config;
pub mod logging;
