//! SQLite implementation of the RecordRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Record, RecordKind, RecordRef};
use crate::domain::ports::RecordRepository;

#[derive(Clone)]
pub struct SqliteRecordRepository {
    pool: SqlitePool,
}

impl SqliteRecordRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RecordRow {
    id: String,
    kind: String,
    reference_num: String,
    name: String,
    workflow_status: Option<String>,
}

fn row_to_record(row: RecordRow) -> DomainResult<Record> {
    Ok(Record {
        id: row.id,
        kind: row.kind.parse()?,
        reference_num: row.reference_num,
        name: row.name,
        workflow_status: row.workflow_status,
    })
}

#[async_trait]
impl RecordRepository for SqliteRecordRepository {
    async fn find(&self, kind: RecordKind, reference_num: &str) -> DomainResult<Option<RecordRef>> {
        let row: Option<(String, String)> = sqlx::query_as(
            "SELECT id, reference_num FROM records WHERE kind = ? AND reference_num = ?",
        )
        .bind(kind.as_str())
        .bind(reference_num)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, reference_num)| RecordRef::new(id, kind, reference_num)))
    }

    async fn get(&self, kind: RecordKind, reference_num: &str) -> DomainResult<Option<Record>> {
        let row: Option<RecordRow> = sqlx::query_as(
            r#"SELECT id, kind, reference_num, name, workflow_status
               FROM records WHERE kind = ? AND reference_num = ?"#,
        )
        .bind(kind.as_str())
        .bind(reference_num)
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_record).transpose()
    }

    async fn create(&self, record: &Record) -> DomainResult<()> {
        let result = sqlx::query(
            r#"INSERT INTO records (id, kind, reference_num, name, workflow_status)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(&record.id)
        .bind(record.kind.as_str())
        .bind(&record.reference_num)
        .bind(&record.name)
        .bind(&record.workflow_status)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(DomainError::ValidationFailed(
                format!("{} {} already exists", record.kind, record.reference_num),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, record: &Record) -> DomainResult<()> {
        let result = sqlx::query(
            r#"UPDATE records SET name = ?, workflow_status = ?, updated_at = datetime('now')
               WHERE id = ?"#,
        )
        .bind(&record.name)
        .bind(&record.workflow_status)
        .bind(&record.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::RecordNotFound(record.reference_num.clone()));
        }
        Ok(())
    }
}
