//! Extension field store port.
//!
//! Records and the account singleton carry namespaced key-value slots
//! ("extension fields"). Link lists live in those slots. The store offers
//! whole-value reads and writes; a write may be made conditional on the
//! version observed at read time.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

use crate::domain::errors::DomainResult;
use crate::domain::models::RecordRef;

/// Owner of a set of extension fields.
///
/// The account is passed explicitly wherever it is mutated; there is no
/// ambient global account.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldOwner {
    /// The account-level aggregate.
    Account,
    /// A single record.
    Record(RecordRef),
}

impl FieldOwner {
    /// Stable key identifying this owner in storage.
    pub fn storage_key(&self) -> String {
        match self {
            Self::Account => "account".to_string(),
            Self::Record(record) => format!("{}:{}", record.typename(), record.id),
        }
    }
}

impl fmt::Display for FieldOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Account => f.write_str("account"),
            Self::Record(record) => write!(f, "{record}"),
        }
    }
}

impl From<&RecordRef> for FieldOwner {
    fn from(record: &RecordRef) -> Self {
        Self::Record(record.clone())
    }
}

/// A field value together with its write version.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredField {
    pub value: Value,
    /// Incremented on every write; the first write produces version 1.
    pub version: u64,
}

/// Precondition for a field write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteCondition {
    /// Overwrite whatever is stored (last write wins).
    Always,
    /// Write only if the stored version still equals this one.
    /// Version 0 means "the field must still be absent".
    IfVersion(u64),
}

/// Port for reading and writing namespaced extension fields.
#[async_trait]
pub trait ExtensionFieldStore: Send + Sync {
    /// Read a field. Returns `None` when it has never been written.
    async fn get_field(
        &self,
        owner: &FieldOwner,
        namespace: &str,
        field: &str,
    ) -> DomainResult<Option<StoredField>>;

    /// Write a field, returning the new version.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::ConcurrencyConflict`](crate::domain::errors::DomainError::ConcurrencyConflict)
    /// when `condition` is `IfVersion` and the stored version differs.
    async fn set_field(
        &self,
        owner: &FieldOwner,
        namespace: &str,
        field: &str,
        value: Value,
        condition: WriteCondition,
    ) -> DomainResult<u64>;
}
