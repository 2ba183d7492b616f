//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that adapters must implement:
//! - ExtensionFieldStore: namespaced field storage on records and the account
//! - RecordFinder / RecordRepository: record lookup and persistence
//!
//! These traits keep the linking services independent of the host's storage.

pub mod field_store;
pub mod record_repository;

pub use field_store::{ExtensionFieldStore, FieldOwner, StoredField, WriteCondition};
pub use record_repository::{RecordFinder, RecordRepository};
