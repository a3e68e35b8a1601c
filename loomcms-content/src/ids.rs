//! Identifier newtypes: ElementId, RowId, LocaleId

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Identifier of a persisted element. An element that has not been saved yet
/// has no id at all (`Option<ElementId>` on the element).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(Ulid);

impl ElementId {
    /// Generate a fresh id.
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// The underlying ULID.
    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Ulid> for ElementId {
    fn from(id: Ulid) -> Self {
        Self(id)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of a persisted content row. Assigned by the store on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(Ulid);

impl RowId {
    /// Generate a fresh id.
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Parse a row id from its string form (e.g. a file stem).
    pub fn from_string(s: &str) -> Option<Self> {
        Ulid::from_string(s).ok().map(Self)
    }
}

impl Default for RowId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Ulid> for RowId {
    fn from(id: Ulid) -> Self {
        Self(id)
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A locale code such as `en` or `fr-CA`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocaleId(String);

impl LocaleId {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for LocaleId {
    fn from(code: &str) -> Self {
        Self(code.to_string())
    }
}

impl fmt::Display for LocaleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
