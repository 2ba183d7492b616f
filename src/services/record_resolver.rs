//! Record resolution: typed references to concrete records.
//!
//! A dispatch table maps each [`RecordKind`] to the [`RecordFinder`] that
//! can look it up. A kind with no registered finder aborts the whole batch;
//! a reference whose record does not exist only empties its own slot.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{RecordKind, RecordRef, Reference};
use crate::domain::ports::{RecordFinder, RecordRepository};

use super::reference_extractor::extract_references;

/// One extracted reference and the record it resolved to, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReference {
    pub reference: Reference,
    pub record: Option<RecordRef>,
}

/// Outcome of resolving the references in a piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The text contains no references.
    NoReferences,
    /// A reference kind has no registered finder; nothing was resolved.
    UnknownRecordType(RecordKind),
    /// Every reference was looked up, in extraction order.
    Resolved(Vec<ResolvedReference>),
}

impl Resolution {
    /// Records that were found, in extraction order.
    pub fn records(&self) -> Vec<RecordRef> {
        match self {
            Self::Resolved(entries) => entries
                .iter()
                .filter_map(|entry| entry.record.clone())
                .collect(),
            Self::NoReferences | Self::UnknownRecordType(_) => Vec::new(),
        }
    }
}

/// Finder that delegates to a [`RecordRepository`] for one fixed kind.
pub struct RepositoryFinder<R: RecordRepository + ?Sized> {
    repository: Arc<R>,
    kind: RecordKind,
}

impl<R: RecordRepository + ?Sized> RepositoryFinder<R> {
    pub fn new(repository: Arc<R>, kind: RecordKind) -> Self {
        Self { repository, kind }
    }
}

#[async_trait]
impl<R: RecordRepository + ?Sized> RecordFinder for RepositoryFinder<R> {
    async fn find(&self, reference_num: &str) -> DomainResult<Option<RecordRef>> {
        self.repository.find(self.kind, reference_num).await
    }
}

/// Resolves references through a kind → finder dispatch table.
#[derive(Default)]
pub struct RecordResolver {
    finders: HashMap<RecordKind, Arc<dyn RecordFinder>>,
}

impl RecordResolver {
    /// Create a resolver with no registered kinds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a resolver that looks up every kind in `repository`.
    pub fn from_repository<R: RecordRepository + ?Sized + 'static>(repository: Arc<R>) -> Self {
        RecordKind::ALL.iter().fold(Self::new(), |resolver, &kind| {
            resolver.with_finder(kind, Arc::new(RepositoryFinder::new(repository.clone(), kind)))
        })
    }

    pub fn with_finder(mut self, kind: RecordKind, finder: Arc<dyn RecordFinder>) -> Self {
        self.register(kind, finder);
        self
    }

    pub fn register(&mut self, kind: RecordKind, finder: Arc<dyn RecordFinder>) {
        self.finders.insert(kind, finder);
    }

    /// Resolve a single reference.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::UnknownRecordType`] when no finder is
    /// registered for the reference's kind, or the finder's storage error.
    pub async fn resolve(&self, reference: &Reference) -> DomainResult<Option<RecordRef>> {
        let finder = self
            .finders
            .get(&reference.kind)
            .ok_or_else(|| DomainError::UnknownRecordType(reference.kind.to_string()))?;

        debug!(kind = %reference.kind, reference = %reference.identifier, "Searching for record");
        finder.find(&reference.identifier).await
    }

    /// Resolve a batch of references in order.
    ///
    /// An unknown kind aborts the batch and yields
    /// [`Resolution::UnknownRecordType`]; earlier lookups are discarded.
    pub async fn resolve_all(&self, references: Vec<Reference>) -> DomainResult<Resolution> {
        if references.is_empty() {
            return Ok(Resolution::NoReferences);
        }

        let mut resolved = Vec::with_capacity(references.len());
        for reference in references {
            match self.resolve(&reference).await {
                Ok(record) => {
                    if record.is_none() {
                        debug!(reference = %reference.identifier, "No record for reference");
                    }
                    resolved.push(ResolvedReference { reference, record });
                }
                Err(DomainError::UnknownRecordType(name)) => {
                    warn!(record_type = %name, "Unknown record type");
                    return Ok(Resolution::UnknownRecordType(reference.kind));
                }
                Err(e) => return Err(e),
            }
        }

        Ok(Resolution::Resolved(resolved))
    }

    /// Extract references from `text` and resolve them.
    pub async fn resolve_text(&self, text: &str) -> DomainResult<Resolution> {
        match extract_references(text) {
            Some(references) => self.resolve_all(references).await,
            None => Ok(Resolution::NoReferences),
        }
    }
}
