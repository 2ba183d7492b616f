//! Builder for GitHub search query strings.
//!
//! ```
//! use prlink::adapters::github::SearchQuery;
//!
//! let query = SearchQuery::new()
//!     .repo("org/one")
//!     .repo("org/two")
//!     .is("pr")
//!     .author("@me")
//!     .term_quoted("text to search for");
//!
//! assert_eq!(
//!     query.to_query(),
//!     r#"repo:org/one repo:org/two is:pr author:@me "text to search for""#
//! );
//! ```
//!
//! Every method returns a new query; the receiver is left unchanged.

use std::fmt;

/// Qualifiers the builder can set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchAttribute {
    Repo,
    Is,
    Author,
    State,
    Head,
    Label,
    In,
}

impl SearchAttribute {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Repo => "repo",
            Self::Is => "is",
            Self::Author => "author",
            Self::State => "state",
            Self::Head => "head",
            Self::Label => "label",
            Self::In => "in",
        }
    }
}

/// Immutable GitHub search query.
///
/// Qualifiers render in the order each attribute was first set; values of
/// one attribute render in the order they were added. Free-text terms come
/// last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    attrs: Vec<(SearchAttribute, Vec<String>)>,
    terms: Vec<String>,
}

fn quote(value: &str) -> String {
    format!("\"{value}\"")
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value for `attribute`.
    #[must_use]
    pub fn with(&self, attribute: SearchAttribute, value: impl Into<String>) -> Self {
        let value = value.into();
        let mut next = self.clone();
        match next.attrs.iter_mut().find(|(attr, _)| *attr == attribute) {
            Some((_, values)) => values.push(value),
            None => next.attrs.push((attribute, vec![value])),
        }
        next
    }

    /// Add a double-quoted value for `attribute`.
    #[must_use]
    pub fn with_quoted(&self, attribute: SearchAttribute, value: &str) -> Self {
        self.with(attribute, quote(value))
    }

    #[must_use]
    pub fn repo(&self, value: impl Into<String>) -> Self {
        self.with(SearchAttribute::Repo, value)
    }

    #[must_use]
    pub fn is(&self, value: impl Into<String>) -> Self {
        self.with(SearchAttribute::Is, value)
    }

    #[must_use]
    pub fn author(&self, value: impl Into<String>) -> Self {
        self.with(SearchAttribute::Author, value)
    }

    #[must_use]
    pub fn state(&self, value: impl Into<String>) -> Self {
        self.with(SearchAttribute::State, value)
    }

    #[must_use]
    pub fn head(&self, value: impl Into<String>) -> Self {
        self.with(SearchAttribute::Head, value)
    }

    #[must_use]
    pub fn label(&self, value: impl Into<String>) -> Self {
        self.with(SearchAttribute::Label, value)
    }

    #[must_use]
    pub fn in_(&self, value: impl Into<String>) -> Self {
        self.with(SearchAttribute::In, value)
    }

    /// Add a free-text term.
    #[must_use]
    pub fn term(&self, term: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.terms.push(term.into());
        next
    }

    /// Add a double-quoted free-text term.
    #[must_use]
    pub fn term_quoted(&self, term: &str) -> Self {
        self.term(quote(term))
    }

    /// Render as `key:value ... terms`.
    pub fn to_query(&self) -> String {
        self.attrs
            .iter()
            .flat_map(|(attr, values)| {
                values
                    .iter()
                    .map(move |value| format!("{}:{}", attr.as_str(), value.trim()))
            })
            .chain(self.terms.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query())
    }
}
