//! Domain layer for prlink
//!
//! This module contains the link model, record references, and the port
//! traits the services depend on.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
