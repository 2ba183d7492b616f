//! In-memory record repository.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Record, RecordKind, RecordRef};
use crate::domain::ports::RecordRepository;

/// Records keyed by kind and upper-cased reference number.
#[derive(Default)]
pub struct InMemoryRecordRepository {
    records: RwLock<HashMap<(RecordKind, String), Record>>,
}

impl InMemoryRecordRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(kind: RecordKind, reference_num: &str) -> (RecordKind, String) {
        (kind, reference_num.to_uppercase())
    }
}

#[async_trait]
impl RecordRepository for InMemoryRecordRepository {
    async fn find(&self, kind: RecordKind, reference_num: &str) -> DomainResult<Option<RecordRef>> {
        let records = self.records.read().await;
        Ok(records.get(&Self::key(kind, reference_num)).map(Record::to_ref))
    }

    async fn get(&self, kind: RecordKind, reference_num: &str) -> DomainResult<Option<Record>> {
        let records = self.records.read().await;
        Ok(records.get(&Self::key(kind, reference_num)).cloned())
    }

    async fn create(&self, record: &Record) -> DomainResult<()> {
        let mut records = self.records.write().await;
        let key = Self::key(record.kind, &record.reference_num);
        if records.contains_key(&key) {
            return Err(DomainError::ValidationFailed(format!(
                "{} {} already exists",
                record.kind, record.reference_num
            )));
        }
        records.insert(key, record.clone());
        Ok(())
    }

    async fn save(&self, record: &Record) -> DomainResult<()> {
        let mut records = self.records.write().await;
        let key = Self::key(record.kind, &record.reference_num);
        match records.get_mut(&key) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(DomainError::RecordNotFound(record.reference_num.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_find_is_case_insensitive() {
        let repo = InMemoryRecordRepository::new();
        let record = Record::new(RecordKind::Feature, "PROJ-9", "Checkout");
        repo.create(&record).await.unwrap();

        assert_eq!(repo.find(RecordKind::Feature, "proj-9").await.unwrap(), Some(record.to_ref()));
        assert!(repo.find(RecordKind::Epic, "PROJ-9").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_create_fails() {
        let repo = InMemoryRecordRepository::new();
        let record = Record::new(RecordKind::Feature, "PROJ-9", "Checkout");
        repo.create(&record).await.unwrap();
        assert!(matches!(
            repo.create(&record).await.unwrap_err(),
            DomainError::ValidationFailed(_)
        ));
    }

    #[tokio::test]
    async fn test_save_requires_existing_record() {
        let repo = InMemoryRecordRepository::new();
        let record = Record::new(RecordKind::Epic, "PROJ-E-1", "Platform");
        assert!(matches!(repo.save(&record).await.unwrap_err(), DomainError::RecordNotFound(_)));

        repo.create(&record).await.unwrap();
        repo.save(&record.clone().with_workflow_status("Done")).await.unwrap();
        let stored = repo.get(RecordKind::Epic, "proj-e-1").await.unwrap().unwrap();
        assert_eq!(stored.workflow_status.as_deref(), Some("Done"));
    }
}
