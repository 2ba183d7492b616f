//! SQLite implementation of the ExtensionFieldStore.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::SqlitePool;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::{ExtensionFieldStore, FieldOwner, StoredField, WriteCondition};

#[derive(Clone)]
pub struct SqliteFieldStore {
    pool: SqlitePool,
}

impl SqliteFieldStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn conflict(owner: &FieldOwner, namespace: &str, field: &str) -> DomainError {
    DomainError::ConcurrencyConflict {
        entity: "extension field".to_string(),
        id: format!("{}/{namespace}/{field}", owner.storage_key()),
    }
}

#[async_trait]
impl ExtensionFieldStore for SqliteFieldStore {
    async fn get_field(
        &self,
        owner: &FieldOwner,
        namespace: &str,
        field: &str,
    ) -> DomainResult<Option<StoredField>> {
        let row: Option<(String, i64)> = sqlx::query_as(
            "SELECT value, version FROM extension_fields WHERE owner_key = ? AND namespace = ? AND field = ?",
        )
        .bind(owner.storage_key())
        .bind(namespace)
        .bind(field)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(value, version)| -> DomainResult<StoredField> {
            Ok(StoredField {
                value: serde_json::from_str(&value)?,
                version: version as u64,
            })
        })
        .transpose()
    }

    async fn set_field(
        &self,
        owner: &FieldOwner,
        namespace: &str,
        field: &str,
        value: Value,
        condition: WriteCondition,
    ) -> DomainResult<u64> {
        let owner_key = owner.storage_key();
        let value = serde_json::to_string(&value)?;

        match condition {
            WriteCondition::Always => {
                let (version,): (i64,) = sqlx::query_as(
                    r#"INSERT INTO extension_fields (owner_key, namespace, field, value, version)
                       VALUES (?, ?, ?, ?, 1)
                       ON CONFLICT (owner_key, namespace, field) DO UPDATE SET
                           value = excluded.value,
                           version = extension_fields.version + 1,
                           updated_at = datetime('now')
                       RETURNING version"#,
                )
                .bind(&owner_key)
                .bind(namespace)
                .bind(field)
                .bind(&value)
                .fetch_one(&self.pool)
                .await?;
                Ok(version as u64)
            }
            WriteCondition::IfVersion(0) => {
                let result = sqlx::query(
                    r#"INSERT INTO extension_fields (owner_key, namespace, field, value, version)
                       VALUES (?, ?, ?, ?, 1)
                       ON CONFLICT (owner_key, namespace, field) DO NOTHING"#,
                )
                .bind(&owner_key)
                .bind(namespace)
                .bind(field)
                .bind(&value)
                .execute(&self.pool)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(conflict(owner, namespace, field));
                }
                Ok(1)
            }
            WriteCondition::IfVersion(expected) => {
                let result = sqlx::query(
                    r#"UPDATE extension_fields
                       SET value = ?, version = version + 1, updated_at = datetime('now')
                       WHERE owner_key = ? AND namespace = ? AND field = ? AND version = ?"#,
                )
                .bind(&value)
                .bind(&owner_key)
                .bind(namespace)
                .bind(field)
                .bind(expected as i64)
                .execute(&self.pool)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(conflict(owner, namespace, field));
                }
                Ok(expected + 1)
            }
        }
    }
}
