//! Linking services: extraction, resolution, link persistence and events.

pub mod event_bus;
pub mod event_dispatcher;
pub mod label_reactor;
pub mod link_store;
pub mod linking_orchestrator;
pub mod record_resolver;
pub mod reference_extractor;

pub use event_bus::{DomainEvent, EventBus, EventBusConfig, EventId, EventKind, SequenceNumber};
pub use event_dispatcher::{DispatcherConfig, EventDispatcher, EventListener};
pub use label_reactor::LabelReactor;
pub use link_store::{LinkStore, BRANCHES_FIELD, PULL_REQUESTS_FIELD};
pub use linking_orchestrator::{LinkingOrchestrator, WebhookOutcome};
pub use record_resolver::{RecordResolver, RepositoryFinder, Resolution, ResolvedReference};
pub use reference_extractor::extract_references;
