//! Label rules: set a record's workflow status when a linked pull request
//! gains a configured label.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{LabelRule, RecordRef};
use crate::domain::ports::RecordRepository;

use super::event_bus::{event_name, DomainEvent, EventKind};
use super::event_dispatcher::EventListener;

/// Applies [`LabelRule`]s to records on `<prefix>.pr.labeled` events.
pub struct LabelReactor {
    repository: Arc<dyn RecordRepository>,
    rules: Vec<LabelRule>,
    event_name: String,
}

impl LabelReactor {
    pub fn new(repository: Arc<dyn RecordRepository>, rules: Vec<LabelRule>, event_prefix: &str) -> Self {
        Self {
            repository,
            rules,
            event_name: event_name(event_prefix, EventKind::Pr, "labeled"),
        }
    }

    /// Apply the rule matching `label` to `record`.
    ///
    /// Returns `true` when the record's workflow status was changed and saved.
    /// Label names match exactly.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::RecordNotFound`] if a rule matches but the
    /// record no longer exists, or the repository's storage error.
    pub async fn handle_label(&self, record: &RecordRef, label: &str) -> DomainResult<bool> {
        let Some(rule) = self.rules.iter().find(|rule| rule.label == label) else {
            debug!(record = %record, label, "No rule for label");
            return Ok(false);
        };

        let mut stored = self
            .repository
            .get(record.kind, &record.reference_num)
            .await?
            .ok_or_else(|| DomainError::RecordNotFound(record.to_string()))?;

        if stored.workflow_status.as_deref() == Some(rule.workflow_status.as_str()) {
            debug!(record = %record, status = %rule.workflow_status, "Record already in status");
            return Ok(false);
        }

        stored.workflow_status = Some(rule.workflow_status.clone());
        self.repository.save(&stored).await?;

        info!(record = %record, label, status = %rule.workflow_status, "Applied label rule");
        Ok(true)
    }
}

#[async_trait]
impl EventListener for LabelReactor {
    fn name(&self) -> &str {
        "label-reactor"
    }

    fn interested_in(&self, event: &DomainEvent) -> bool {
        event.name == self.event_name
    }

    async fn handle(&self, event: &DomainEvent) -> DomainResult<()> {
        let Some(record) = &event.record else {
            return Ok(());
        };
        let Some(label) = event.payload["label"]["name"].as_str() else {
            debug!(event = %event.name, "Labeled event without label name");
            return Ok(());
        };

        self.handle_label(record, label).await?;
        Ok(())
    }
}
