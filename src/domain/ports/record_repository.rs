//! Record lookup and persistence ports.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Record, RecordKind, RecordRef};

/// Finds records of one kind by reference number.
///
/// Implementations select only identity fields.
#[async_trait]
pub trait RecordFinder: Send + Sync {
    /// Look up a record by reference number. `Ok(None)` when no record matches.
    async fn find(&self, reference_num: &str) -> DomainResult<Option<RecordRef>>;
}

/// Repository interface for project-management records.
#[async_trait]
pub trait RecordRepository: Send + Sync {
    /// Look up a record's identity by kind and reference number.
    ///
    /// Reference numbers compare case-insensitively.
    async fn find(&self, kind: RecordKind, reference_num: &str) -> DomainResult<Option<RecordRef>>;

    /// Load the full record.
    async fn get(&self, kind: RecordKind, reference_num: &str) -> DomainResult<Option<Record>>;

    /// Insert a new record.
    async fn create(&self, record: &Record) -> DomainResult<()>;

    /// Persist changes to an existing record.
    async fn save(&self, record: &Record) -> DomainResult<()>;
}
