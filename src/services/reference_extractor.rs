//! Reference extraction from PR titles and branch names.
//!
//! Three pattern rules are tried in priority order. The first rule with any
//! match wins and only its matches are returned:
//!
//! 1. Requirement: `<1-10 letters>-<digits>-<digits>`, e.g. `PROJ-12-3`
//! 2. Epic: `<1-10 letters>-E-<digits>`, e.g. `PROJ-E-7`
//! 3. Feature: `<1-10 letters>-<digits>`, e.g. `PROJ-12`
//!
//! Patterns match ASCII letters of either case. A string mixing kinds (a requirement and
//! a feature reference) yields only the higher-priority kind.

use regex::Regex;
use std::sync::OnceLock;

use crate::domain::models::{RecordKind, Reference};

static REQUIREMENT_PATTERN: OnceLock<Regex> = OnceLock::new();
static EPIC_PATTERN: OnceLock<Regex> = OnceLock::new();
static FEATURE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn pattern_for(kind: RecordKind) -> &'static Regex {
    let (cell, source) = match kind {
        RecordKind::Requirement => (&REQUIREMENT_PATTERN, r"[A-Za-z]{1,10}-[0-9]+-[0-9]+"),
        RecordKind::Epic => (&EPIC_PATTERN, r"[A-Za-z]{1,10}-[Ee]-[0-9]+"),
        RecordKind::Feature => (&FEATURE_PATTERN, r"[A-Za-z]{1,10}-[0-9]+"),
    };
    cell.get_or_init(|| Regex::new(source).expect("reference pattern is a valid regex"))
}

/// Extract record references from `text`.
///
/// Returns `None` when no rule matches; otherwise a non-empty list in the
/// order the identifiers appear.
pub fn extract_references(text: &str) -> Option<Vec<Reference>> {
    RecordKind::ALL.iter().find_map(|&kind| {
        let references: Vec<Reference> = pattern_for(kind)
            .find_iter(text)
            .map(|m| Reference::new(kind, m.as_str()))
            .collect();

        if references.is_empty() {
            None
        } else {
            Some(references)
        }
    })
}
