//! In-memory extension field store.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::{ExtensionFieldStore, FieldOwner, StoredField, WriteCondition};

/// (owner key, namespace, field)
type FieldKey = (String, String, String);

/// Extension field store backed by a map. Conditional writes are checked
/// under the write lock.
#[derive(Default)]
pub struct InMemoryFieldStore {
    fields: RwLock<HashMap<FieldKey, StoredField>>,
}

impl InMemoryFieldStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(owner: &FieldOwner, namespace: &str, field: &str) -> FieldKey {
        (owner.storage_key(), namespace.to_string(), field.to_string())
    }
}

#[async_trait]
impl ExtensionFieldStore for InMemoryFieldStore {
    async fn get_field(
        &self,
        owner: &FieldOwner,
        namespace: &str,
        field: &str,
    ) -> DomainResult<Option<StoredField>> {
        let fields = self.fields.read().await;
        Ok(fields.get(&Self::key(owner, namespace, field)).cloned())
    }

    async fn set_field(
        &self,
        owner: &FieldOwner,
        namespace: &str,
        field: &str,
        value: Value,
        condition: WriteCondition,
    ) -> DomainResult<u64> {
        let key = Self::key(owner, namespace, field);
        let mut fields = self.fields.write().await;
        let current = fields.get(&key).map_or(0, |stored| stored.version);

        if let WriteCondition::IfVersion(expected) = condition {
            if expected != current {
                return Err(DomainError::ConcurrencyConflict {
                    entity: "extension field".to_string(),
                    id: format!("{}/{namespace}/{field}", owner.storage_key()),
                });
            }
        }

        let version = current + 1;
        fields.insert(key, StoredField { value, version });
        Ok(version)
    }
}
