//! Typed record references extracted from free text.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::errors::DomainError;

/// The kind of project-management record a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordKind {
    Requirement,
    Epic,
    Feature,
}

impl RecordKind {
    /// All record kinds, in extraction priority order.
    pub const ALL: [Self; 3] = [Self::Requirement, Self::Epic, Self::Feature];

    /// The type name used by the record store (`"Requirement"`, ...).
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Requirement => "Requirement",
            Self::Epic => "Epic",
            Self::Feature => "Feature",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "requirement" => Ok(Self::Requirement),
            "epic" => Ok(Self::Epic),
            "feature" => Ok(Self::Feature),
            _ => Err(DomainError::UnknownRecordType(s.to_string())),
        }
    }
}

/// A typed identifier found in a PR title or branch name.
///
/// References are produced by pattern matching and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    /// Which kind of record the identifier names.
    pub kind: RecordKind,
    /// The identifier as it appeared in the text, e.g. `PROJ-12-3`.
    pub identifier: String,
}

impl Reference {
    pub fn new(kind: RecordKind, identifier: impl Into<String>) -> Self {
        Self {
            kind,
            identifier: identifier.into(),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.identifier)
    }
}
