//! Project-management records that pull requests and branches link to.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::reference::RecordKind;

/// Identity of a record: the minimal fields selected during resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordRef {
    pub id: String,
    pub kind: RecordKind,
    pub reference_num: String,
}

impl RecordRef {
    pub fn new(id: impl Into<String>, kind: RecordKind, reference_num: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            reference_num: reference_num.into(),
        }
    }

    /// Record type name as stored alongside account-level entries.
    pub const fn typename(&self) -> &'static str {
        self.kind.as_str()
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.reference_num)
    }
}

/// A full record as held by the record repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    pub kind: RecordKind,
    pub reference_num: String,
    pub name: String,
    /// Current workflow status name, if one has been set.
    #[serde(default)]
    pub workflow_status: Option<String>,
}

impl Record {
    /// Create a new record with a generated id and no workflow status.
    pub fn new(kind: RecordKind, reference_num: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            reference_num: reference_num.into(),
            name: name.into(),
            workflow_status: None,
        }
    }

    pub fn with_workflow_status(mut self, status: impl Into<String>) -> Self {
        self.workflow_status = Some(status.into());
        self
    }

    /// Identity view of this record.
    pub fn to_ref(&self) -> RecordRef {
        RecordRef::new(self.id.clone(), self.kind, self.reference_num.clone())
    }
}
