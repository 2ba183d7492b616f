//! Linking orchestrator: turns inbound GitHub events into links and
//! domain events.
//!
//! Each event is handled independently:
//!
//! - `pull_request`: resolve references in the PR title, link the PR (and its
//!   head branch) to every resolved record, emit one event per record.
//! - `create`: branches only; resolve references in the branch name, link the
//!   branch to every resolved record concurrently, emit one event per record.
//! - `pull_request_review`: resolve references in the PR title and emit one
//!   event per record, without linking.
//!
//! When nothing resolves, a single event with no record is emitted instead.
//! An event is emitted even when record lookup or a link write fails; the
//! storage error is returned afterwards.

use futures::future::try_join_all;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    CreatePayload, LinkablePullRequest, PullRequestPayload, RecordRef, ReviewPayload,
};

use super::event_bus::{DomainEvent, EventBus, EventKind};
use super::link_store::LinkStore;
use super::record_resolver::{RecordResolver, Resolution};

/// Summary of how one webhook delivery was handled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WebhookOutcome {
    /// GitHub event name (`X-GitHub-Event`).
    pub event: String,
    /// Records the PR or branch was linked to.
    pub records_linked: Vec<RecordRef>,
    pub events_emitted: usize,
    /// The event was acknowledged without processing.
    pub ignored: bool,
}

impl WebhookOutcome {
    fn ignored(event: &str) -> Self {
        Self {
            event: event.to_string(),
            ignored: true,
            ..Self::default()
        }
    }
}

/// Coordinates reference resolution, link writes and event emission.
pub struct LinkingOrchestrator {
    resolver: Arc<RecordResolver>,
    links: Arc<LinkStore>,
    events: Arc<EventBus>,
    event_prefix: String,
}

impl LinkingOrchestrator {
    pub fn new(
        resolver: Arc<RecordResolver>,
        links: Arc<LinkStore>,
        events: Arc<EventBus>,
        event_prefix: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            links,
            events,
            event_prefix: event_prefix.into(),
        }
    }

    pub fn links(&self) -> &Arc<LinkStore> {
        &self.links
    }

    /// Route a webhook delivery by its GitHub event name.
    ///
    /// Unknown event names are acknowledged and ignored.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidPayload`] when the body does not have
    /// the shape the event requires, or a storage error from linking.
    #[instrument(skip(self, payload), fields(action = payload.get("action").and_then(|v| v.as_str()).unwrap_or("")))]
    pub async fn handle_webhook(&self, event: &str, payload: Value) -> DomainResult<WebhookOutcome> {
        info!("Received webhook '{event}'");

        match event {
            "create" => {
                let parsed: CreatePayload = parse_payload(event, &payload)?;
                self.handle_create(&parsed, payload).await
            }
            "pull_request" => {
                let parsed: PullRequestPayload = parse_payload(event, &payload)?;
                self.handle_pull_request(&parsed, payload).await
            }
            "pull_request_review" => {
                let parsed: ReviewPayload = parse_payload(event, &payload)?;
                self.handle_review(&parsed, payload).await
            }
            other => {
                debug!(event = other, "Ignoring unhandled webhook event");
                Ok(WebhookOutcome::ignored(other))
            }
        }
    }

    /// Handle a `create` event. Tags and other non-branch refs are ignored.
    pub async fn handle_create(&self, payload: &CreatePayload, raw: Value) -> DomainResult<WebhookOutcome> {
        if !payload.is_branch() {
            debug!(ref_type = %payload.ref_type, "Ignoring non-branch ref");
            return Ok(WebhookOutcome::ignored("create"));
        }

        let action = payload.action.as_deref();
        let records = match self.resolve_records(&payload.git_ref).await {
            Ok(records) => records,
            Err(e) => {
                self.emit(EventKind::Create, action, &[], raw);
                return Err(e);
            }
        };
        let linked = self
            .link_branch_to_records(&payload.git_ref, &payload.repository.html_url, &records)
            .await;
        let events_emitted = self.emit(EventKind::Create, action, &records, raw);
        linked?;

        Ok(WebhookOutcome {
            event: "create".to_string(),
            records_linked: records,
            events_emitted,
            ignored: false,
        })
    }

    /// Handle a `pull_request` event.
    pub async fn handle_pull_request(
        &self,
        payload: &PullRequestPayload,
        raw: Value,
    ) -> DomainResult<WebhookOutcome> {
        let pr = payload.to_linkable();
        let action = payload.action.as_deref();
        let records = match self.resolve_records(&pr.title).await {
            Ok(records) => records,
            Err(e) => {
                self.emit(EventKind::Pr, action, &[], raw);
                return Err(e);
            }
        };
        let linked = self.link_pull_request_to_records(&pr, &records).await;
        let events_emitted = self.emit(EventKind::Pr, action, &records, raw);
        linked?;

        Ok(WebhookOutcome {
            event: "pull_request".to_string(),
            records_linked: records,
            events_emitted,
            ignored: false,
        })
    }

    /// Handle a `pull_request_review` event. Nothing is linked.
    pub async fn handle_review(&self, payload: &ReviewPayload, raw: Value) -> DomainResult<WebhookOutcome> {
        let action = payload.action.as_deref();
        let records = match payload.title() {
            Some(title) => match self.resolve_records(title).await {
                Ok(records) => records,
                Err(e) => {
                    self.emit(EventKind::PullRequestReview, action, &[], raw);
                    return Err(e);
                }
            },
            None => Vec::new(),
        };
        let events_emitted = self.emit(EventKind::PullRequestReview, action, &records, raw);

        Ok(WebhookOutcome {
            event: "pull_request_review".to_string(),
            records_linked: Vec::new(),
            events_emitted,
            ignored: false,
        })
    }

    /// Link a pull request to every record referenced in its title.
    ///
    /// Returns the records it was linked to.
    pub async fn link_pull_request(&self, pr: &LinkablePullRequest) -> DomainResult<Vec<RecordRef>> {
        let records = self.resolve_records(&pr.title).await?;
        self.link_pull_request_to_records(pr, &records).await?;
        Ok(records)
    }

    /// Link a branch to every record referenced in its name.
    ///
    /// Returns the records it was linked to.
    pub async fn link_branch(&self, branch_name: &str, repo_url: &str) -> DomainResult<Vec<RecordRef>> {
        let records = self.resolve_records(branch_name).await?;
        self.link_branch_to_records(branch_name, repo_url, &records)
            .await?;
        Ok(records)
    }

    async fn resolve_records(&self, text: &str) -> DomainResult<Vec<RecordRef>> {
        let resolution = self.resolver.resolve_text(text).await?;
        match &resolution {
            Resolution::NoReferences => debug!(text, "No references found"),
            Resolution::UnknownRecordType(kind) => {
                warn!(text, kind = %kind, "Reference batch aborted, nothing linked");
            }
            Resolution::Resolved(_) => {}
        }
        Ok(resolution.records())
    }

    // Sequential: every PR link also rewrites the shared account list.
    async fn link_pull_request_to_records(
        &self,
        pr: &LinkablePullRequest,
        records: &[RecordRef],
    ) -> DomainResult<()> {
        for record in records {
            self.links.link_pull_request_to_record(pr, record).await?;
        }
        Ok(())
    }

    // Concurrent: each write targets a different record.
    async fn link_branch_to_records(
        &self,
        branch_name: &str,
        repo_url: &str,
        records: &[RecordRef],
    ) -> DomainResult<()> {
        try_join_all(
            records
                .iter()
                .map(|record| self.links.link_branch_to_record(branch_name, repo_url, record)),
        )
        .await?;
        Ok(())
    }

    fn emit(&self, kind: EventKind, action: Option<&str>, records: &[RecordRef], payload: Value) -> usize {
        let action = action.unwrap_or_else(|| kind.default_action());

        if records.is_empty() {
            self.events
                .publish(DomainEvent::new(&self.event_prefix, kind, action, None, payload));
            return 1;
        }

        for record in records {
            self.events.publish(DomainEvent::new(
                &self.event_prefix,
                kind,
                action,
                Some(record.clone()),
                payload.clone(),
            ));
        }
        records.len()
    }
}

fn parse_payload<T: DeserializeOwned>(event: &str, payload: &Value) -> DomainResult<T> {
    T::deserialize(payload).map_err(|e| DomainError::InvalidPayload(format!("{event}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryFieldStore, InMemoryRecordRepository};
    use crate::domain::models::{Record, RecordKind};
    use crate::domain::ports::{
        ExtensionFieldStore, FieldOwner, RecordFinder, RecordRepository, StoredField, WriteCondition,
    };
    use crate::services::record_resolver::RepositoryFinder;
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::broadcast;

    const PREFIX: &str = "aha-develop.github";

    struct Fixture {
        orchestrator: LinkingOrchestrator,
        links: Arc<LinkStore>,
        events: broadcast::Receiver<DomainEvent>,
    }

    fn assemble(resolver: RecordResolver, store: Arc<dyn ExtensionFieldStore>) -> Fixture {
        let links = Arc::new(LinkStore::new(store, PREFIX));
        let bus = Arc::new(EventBus::default());
        let events = bus.subscribe();

        Fixture {
            orchestrator: LinkingOrchestrator::new(Arc::new(resolver), links.clone(), bus, PREFIX),
            links,
            events,
        }
    }

    async fn repository_with(records: &[Record]) -> Arc<InMemoryRecordRepository> {
        let repository = Arc::new(InMemoryRecordRepository::new());
        for record in records {
            repository.create(record).await.unwrap();
        }
        repository
    }

    async fn fixture(records: &[Record]) -> Fixture {
        let repository = repository_with(records).await;
        assemble(
            RecordResolver::from_repository(repository),
            Arc::new(InMemoryFieldStore::new()),
        )
    }

    /// Finder whose backing storage is unreachable.
    struct UnreachableFinder;

    #[async_trait]
    impl RecordFinder for UnreachableFinder {
        async fn find(&self, _reference_num: &str) -> DomainResult<Option<RecordRef>> {
            Err(DomainError::DatabaseError("connection refused".to_string()))
        }
    }

    /// Field store that accepts reads and rejects every write.
    struct ReadOnlyFieldStore;

    #[async_trait]
    impl ExtensionFieldStore for ReadOnlyFieldStore {
        async fn get_field(
            &self,
            _owner: &FieldOwner,
            _namespace: &str,
            _field: &str,
        ) -> DomainResult<Option<StoredField>> {
            Ok(None)
        }

        async fn set_field(
            &self,
            _owner: &FieldOwner,
            _namespace: &str,
            _field: &str,
            _value: Value,
            _condition: WriteCondition,
        ) -> DomainResult<u64> {
            Err(DomainError::DatabaseError("attempt to write a readonly database".to_string()))
        }
    }

    fn unreachable_resolver() -> RecordResolver {
        RecordKind::ALL.iter().fold(RecordResolver::new(), |resolver, &kind| {
            resolver.with_finder(kind, Arc::new(UnreachableFinder))
        })
    }

    fn drain(rx: &mut broadcast::Receiver<DomainEvent>) -> Vec<DomainEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn pr_payload(title: &str, action: &str) -> Value {
        json!({
            "action": action,
            "pull_request": {
                "title": title,
                "number": 42,
                "html_url": "https://github.com/org/repo/pull/42",
                "state": "open",
                "merged": false,
                "head": { "ref": "feature-x" }
            },
            "repository": { "html_url": "https://github.com/org/repo" }
        })
    }

    #[tokio::test]
    async fn test_pull_request_links_and_emits_per_record() {
        let record = Record::new(RecordKind::Feature, "PROJ-9", "Checkout");
        let mut fx = fixture(&[record.clone()]).await;

        let outcome = fx
            .orchestrator
            .handle_webhook("pull_request", pr_payload("Implements PROJ-9", "opened"))
            .await
            .unwrap();

        assert_eq!(outcome.records_linked, vec![record.to_ref()]);
        assert_eq!(outcome.events_emitted, 1);
        assert_eq!(fx.links.pull_requests(&record.to_ref()).await.unwrap().len(), 1);
        assert_eq!(fx.links.branches(&record.to_ref()).await.unwrap()[0].id, "feature-x");

        let events = drain(&mut fx.events);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "aha-develop.github.pr.opened");
        assert_eq!(events[0].record, Some(record.to_ref()));
        assert_eq!(events[0].payload["pull_request"]["number"], 42);
    }

    #[tokio::test]
    async fn test_pull_request_without_references_emits_unresolved_event() {
        let mut fx = fixture(&[]).await;

        let outcome = fx
            .orchestrator
            .handle_webhook("pull_request", pr_payload("refactor cleanup", "closed"))
            .await
            .unwrap();

        assert!(outcome.records_linked.is_empty());
        assert!(fx.links.all_prs().await.unwrap().is_empty());

        let events = drain(&mut fx.events);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "aha-develop.github.pr.closed");
        assert!(events[0].record.is_none());
    }

    #[tokio::test]
    async fn test_pull_request_with_unknown_record_emits_unresolved_event() {
        let mut fx = fixture(&[]).await;

        fx.orchestrator
            .handle_webhook("pull_request", pr_payload("Implements PROJ-404", "edited"))
            .await
            .unwrap();

        let events = drain(&mut fx.events);
        assert_eq!(events.len(), 1);
        assert!(events[0].record.is_none());
    }

    #[tokio::test]
    async fn test_create_tag_is_ignored() {
        let mut fx = fixture(&[Record::new(RecordKind::Feature, "PROJ-1", "A")]).await;
        let payload = json!({
            "ref_type": "tag",
            "ref": "PROJ-1",
            "repository": { "html_url": "https://github.com/org/repo" }
        });

        let outcome = fx.orchestrator.handle_webhook("create", payload).await.unwrap();

        assert!(outcome.ignored);
        assert_eq!(outcome.events_emitted, 0);
        assert!(drain(&mut fx.events).is_empty());
    }

    #[tokio::test]
    async fn test_create_branch_links_every_record() {
        let a = Record::new(RecordKind::Feature, "PROJ-1", "A");
        let b = Record::new(RecordKind::Feature, "PROJ-2", "B");
        let mut fx = fixture(&[a.clone(), b.clone()]).await;
        let payload = json!({
            "ref_type": "branch",
            "ref": "PROJ-1-PROJ-2-work",
            "repository": { "html_url": "https://github.com/org/repo" }
        });

        // `PROJ-1-PROJ` is not a requirement; the branch resolves two features.
        let outcome = fx.orchestrator.handle_webhook("create", payload).await.unwrap();

        assert_eq!(outcome.records_linked, vec![a.to_ref(), b.to_ref()]);
        for record in [&a, &b] {
            let branches = fx.links.branches(&record.to_ref()).await.unwrap();
            assert_eq!(branches[0].url, "https://github.com/org/repo/tree/PROJ-1-PROJ-2-work");
        }

        let events = drain(&mut fx.events);
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.name == "aha-develop.github.create.created"));
    }

    #[tokio::test]
    async fn test_review_emits_without_linking() {
        let record = Record::new(RecordKind::Epic, "PROJ-E-3", "Epic");
        let mut fx = fixture(&[record.clone()]).await;
        let payload = json!({ "action": "submitted", "pull_request": { "title": "PROJ-E-3 review" } });

        let outcome = fx
            .orchestrator
            .handle_webhook("pull_request_review", payload)
            .await
            .unwrap();

        assert!(outcome.records_linked.is_empty());
        assert!(fx.links.pull_requests(&record.to_ref()).await.unwrap().is_empty());

        let events = drain(&mut fx.events);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "aha-develop.github.pull_request_review.submitted");
        assert_eq!(events[0].record, Some(record.to_ref()));
    }

    #[tokio::test]
    async fn test_review_without_title_emits_unresolved_event() {
        let mut fx = fixture(&[]).await;

        fx.orchestrator
            .handle_webhook("pull_request_review", json!({ "action": "dismissed" }))
            .await
            .unwrap();

        let events = drain(&mut fx.events);
        assert_eq!(events.len(), 1);
        assert!(events[0].record.is_none());
    }

    #[tokio::test]
    async fn test_missing_action_uses_default() {
        let mut fx = fixture(&[]).await;
        let mut payload = pr_payload("nothing", "x");
        payload.as_object_mut().unwrap().remove("action");

        fx.orchestrator.handle_webhook("pull_request", payload).await.unwrap();

        assert_eq!(drain(&mut fx.events)[0].name, "aha-develop.github.pr.unknown");
    }

    #[tokio::test]
    async fn test_unknown_event_is_ignored() {
        let mut fx = fixture(&[]).await;

        let outcome = fx.orchestrator.handle_webhook("push", json!({})).await.unwrap();

        assert!(outcome.ignored);
        assert_eq!(outcome.event, "push");
        assert!(drain(&mut fx.events).is_empty());
    }

    #[tokio::test]
    async fn test_lookup_failure_emits_unresolved_event_then_errors() {
        let mut fx = assemble(unreachable_resolver(), Arc::new(InMemoryFieldStore::new()));

        let err = fx
            .orchestrator
            .handle_webhook("pull_request", pr_payload("Implements PROJ-9", "opened"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::DatabaseError(_)));

        let events = drain(&mut fx.events);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "aha-develop.github.pr.opened");
        assert!(events[0].record.is_none());
        assert!(fx.links.all_prs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lookup_failure_on_branch_and_review_still_emits() {
        let mut fx = assemble(unreachable_resolver(), Arc::new(InMemoryFieldStore::new()));
        let create = json!({
            "ref_type": "branch",
            "ref": "PROJ-9-work",
            "repository": { "html_url": "https://github.com/org/repo" }
        });
        let review = json!({ "action": "submitted", "pull_request": { "title": "PROJ-9" } });

        assert!(fx.orchestrator.handle_webhook("create", create).await.is_err());
        assert!(fx.orchestrator.handle_webhook("pull_request_review", review).await.is_err());

        let names: Vec<String> = drain(&mut fx.events).into_iter().map(|e| e.name).collect();
        assert_eq!(
            names,
            vec![
                "aha-develop.github.create.created".to_string(),
                "aha-develop.github.pull_request_review.submitted".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_link_failure_emits_then_returns_error() {
        let record = Record::new(RecordKind::Feature, "PROJ-9", "Checkout");
        let repository = repository_with(&[record.clone()]).await;
        let mut fx = assemble(
            RecordResolver::from_repository(repository),
            Arc::new(ReadOnlyFieldStore),
        );

        let err = fx
            .orchestrator
            .handle_webhook("pull_request", pr_payload("Implements PROJ-9", "opened"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::DatabaseError(_)));

        let events = drain(&mut fx.events);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].record, Some(record.to_ref()));
    }

    #[tokio::test]
    async fn test_unknown_record_type_links_nothing() {
        let requirement = Record::new(RecordKind::Requirement, "PROJ-1-2", "Login");
        let repository = repository_with(&[requirement.clone()]).await;
        let resolver = RecordResolver::new()
            .with_finder(
                RecordKind::Epic,
                Arc::new(RepositoryFinder::new(repository.clone(), RecordKind::Epic)),
            )
            .with_finder(
                RecordKind::Feature,
                Arc::new(RepositoryFinder::new(repository, RecordKind::Feature)),
            );
        let mut fx = assemble(resolver, Arc::new(InMemoryFieldStore::new()));

        let outcome = fx
            .orchestrator
            .handle_webhook("pull_request", pr_payload("Fixes PROJ-1-2", "opened"))
            .await
            .unwrap();

        assert!(outcome.records_linked.is_empty());
        assert_eq!(outcome.events_emitted, 1);
        assert!(fx.links.all_prs().await.unwrap().is_empty());
        assert!(fx.links.pull_requests(&requirement.to_ref()).await.unwrap().is_empty());

        let events = drain(&mut fx.events);
        assert_eq!(events.len(), 1);
        assert!(events[0].record.is_none());
    }

    #[tokio::test]
    async fn test_malformed_payload_is_rejected() {
        let fx = fixture(&[]).await;

        let err = fx
            .orchestrator
            .handle_webhook("pull_request", json!({ "action": "opened" }))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::InvalidPayload(msg) if msg.starts_with("pull_request")));
    }
}
