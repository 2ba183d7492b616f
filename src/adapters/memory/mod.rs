//! In-memory adapters for tests and ephemeral runs.

pub mod field_store;
pub mod record_repository;

pub use field_store::InMemoryFieldStore;
pub use record_repository::InMemoryRecordRepository;
