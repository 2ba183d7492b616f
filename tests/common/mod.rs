//! Common test utilities for integration tests
//!
//! Provides shared fixtures, payload builders and helpers used across
//! multiple integration test files.

#![allow(dead_code)]

use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::broadcast;

use prlink::adapters::memory::{InMemoryFieldStore, InMemoryRecordRepository};
use prlink::adapters::sqlite::{initialize_database, SqliteFieldStore, SqliteRecordRepository};
use prlink::domain::models::{DatabaseConfig, Record, RecordKind, RecordRef};
use prlink::domain::ports::{ExtensionFieldStore, RecordRepository};
use prlink::services::{DomainEvent, EventBus, LinkStore, LinkingOrchestrator, RecordResolver};

pub const PREFIX: &str = "aha-develop.github";
pub const REPO_URL: &str = "https://github.com/org/repo";

/// Create a temporary test database
///
/// Returns the path to a SQLite database file in a temporary directory.
pub fn temp_db_path() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("test.db");
    (dir, db_path)
}

/// Setup test logging
///
/// Call this at the beginning of tests that need logging.
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Fully wired linking stack over the given stores.
pub struct Harness {
    pub records: Arc<dyn RecordRepository>,
    pub links: Arc<LinkStore>,
    pub event_bus: Arc<EventBus>,
    pub orchestrator: Arc<LinkingOrchestrator>,
    pub events: broadcast::Receiver<DomainEvent>,
}

impl Harness {
    pub fn new(records: Arc<dyn RecordRepository>, fields: Arc<dyn ExtensionFieldStore>) -> Self {
        let links = Arc::new(LinkStore::new(fields, PREFIX));
        let resolver = Arc::new(RecordResolver::from_repository(records.clone()));
        let event_bus = Arc::new(EventBus::default());
        let events = event_bus.subscribe();
        let orchestrator = Arc::new(LinkingOrchestrator::new(
            resolver,
            links.clone(),
            event_bus.clone(),
            PREFIX,
        ));

        Self {
            records,
            links,
            event_bus,
            orchestrator,
            events,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryRecordRepository::new()),
            Arc::new(InMemoryFieldStore::new()),
        )
    }

    /// Harness over an on-disk SQLite database. Keep the `TempDir` alive.
    pub async fn sqlite() -> (TempDir, Self) {
        let (dir, path) = temp_db_path();
        let config = DatabaseConfig {
            path: path.display().to_string(),
            max_connections: 5,
        };
        let pool = initialize_database(&config)
            .await
            .expect("Failed to initialize test database");

        let harness = Self::new(
            Arc::new(SqliteRecordRepository::new(pool.clone())),
            Arc::new(SqliteFieldStore::new(pool)),
        );
        (dir, harness)
    }

    pub async fn seed(&self, kind: RecordKind, reference: &str) -> RecordRef {
        let record = Record::new(kind, reference, format!("Record {reference}"));
        self.records
            .create(&record)
            .await
            .expect("Failed to seed record");
        record.to_ref()
    }

    /// Events published since the last drain.
    pub fn drain_events(&mut self) -> Vec<DomainEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

pub fn pull_request_payload(action: &str, title: &str, number: u64, head: Option<&str>) -> Value {
    let mut pull_request = json!({
        "title": title,
        "number": number,
        "html_url": format!("{REPO_URL}/pull/{number}"),
        "url": format!("https://api.github.com/repos/org/repo/pulls/{number}"),
        "state": "open",
        "merged": false,
    });
    if let Some(branch) = head {
        pull_request["head"] = json!({ "ref": branch, "sha": "0123abcd" });
    }

    json!({
        "action": action,
        "number": number,
        "pull_request": pull_request,
        "repository": { "html_url": REPO_URL, "full_name": "org/repo" },
    })
}

pub fn merged_pull_request_payload(title: &str, number: u64) -> Value {
    let mut payload = pull_request_payload("closed", title, number, None);
    payload["pull_request"]["state"] = json!("closed");
    payload["pull_request"]["merged"] = json!(true);
    payload
}

pub fn create_payload(ref_type: &str, name: &str) -> Value {
    json!({
        "ref": name,
        "ref_type": ref_type,
        "master_branch": "main",
        "repository": { "html_url": REPO_URL },
    })
}

pub fn review_payload(action: &str, title: &str) -> Value {
    json!({
        "action": action,
        "review": { "state": "approved" },
        "pull_request": { "title": title, "number": 9 },
    })
}

pub fn labeled_payload(title: &str, number: u64, label: &str) -> Value {
    let mut payload = pull_request_payload("labeled", title, number, None);
    payload["label"] = json!({ "name": label });
    payload
}
