//! Service wiring shared by the CLI commands.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;

use crate::adapters::sqlite::{initialize_database, SqliteFieldStore, SqliteRecordRepository};
use crate::domain::models::{Config, Record, RecordKind};
use crate::domain::ports::RecordRepository;
use crate::infrastructure::config::ConfigLoader;
use crate::services::{EventBus, EventBusConfig, LinkStore, LinkingOrchestrator, RecordResolver};

/// Load configuration from `path`, or from the default `.prlink/` files.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Services backed by the local SQLite database.
pub struct AppContext {
    pub config: Config,
    pub pool: SqlitePool,
    pub records: Arc<SqliteRecordRepository>,
    pub links: Arc<LinkStore>,
    pub event_bus: Arc<EventBus>,
    pub orchestrator: Arc<LinkingOrchestrator>,
}

impl AppContext {
    pub async fn build(config: &Config) -> Result<Self> {
        let pool = initialize_database(&config.database)
            .await
            .with_context(|| format!("Failed to open database at {}", config.database.path))?;

        let records = Arc::new(SqliteRecordRepository::new(pool.clone()));
        let fields = Arc::new(SqliteFieldStore::new(pool.clone()));

        let links = Arc::new(
            LinkStore::new(fields, config.namespace.clone()).with_settings(config.link_store.clone()),
        );
        let resolver = Arc::new(RecordResolver::from_repository(records.clone()));
        let event_bus = Arc::new(EventBus::new(EventBusConfig::default()));
        let orchestrator = Arc::new(LinkingOrchestrator::new(
            resolver,
            links.clone(),
            event_bus.clone(),
            config.event_prefix.clone(),
        ));

        Ok(Self {
            config: config.clone(),
            pool,
            records,
            links,
            event_bus,
            orchestrator,
        })
    }

    /// Look up a record by reference number. With no kind, each kind is
    /// tried in extraction order and the first match wins.
    pub async fn find_record(&self, kind: Option<RecordKind>, reference: &str) -> Result<Record> {
        let kinds = match kind {
            Some(kind) => vec![kind],
            None => RecordKind::ALL.to_vec(),
        };

        for kind in kinds {
            if let Some(record) = self.records.get(kind, reference).await? {
                return Ok(record);
            }
        }
        anyhow::bail!("Record not found: {reference}")
    }
}

/// Parse an optional `--kind` argument.
pub fn parse_kind(kind: Option<&str>) -> Result<Option<RecordKind>> {
    kind.map(|kind| kind.parse::<RecordKind>().map_err(anyhow::Error::from))
        .transpose()
}
