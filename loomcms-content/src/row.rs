//! Content rows: the per-locale value set for one element.

use std::collections::BTreeSet;

use indexmap::IndexMap;

use crate::error::FieldError;
use crate::ids::{ElementId, LocaleId, RowId};
use crate::value::FieldValue;

/// The persisted value set for one element in one locale.
///
/// At most one row exists per `(element_id, locale)` pair. A row with
/// `id: None` has not been inserted yet; the store assigns the id on first
/// insert. The element id is fixed at construction and never changes.
///
/// Field values live in an ordered handle-keyed map rather than as fixed
/// struct fields, since the set of fields is configuration, not schema.
#[derive(Debug, Clone)]
pub struct ContentRow {
    pub id: Option<RowId>,
    element_id: ElementId,
    pub locale: LocaleId,
    values: IndexMap<String, FieldValue>,
    required: BTreeSet<String>,
    errors: Vec<FieldError>,
}

impl ContentRow {
    /// Create a new, not-yet-persisted row for an element and locale.
    pub fn new(element_id: ElementId, locale: LocaleId) -> Self {
        Self {
            id: None,
            element_id,
            locale,
            values: IndexMap::new(),
            required: BTreeSet::new(),
            errors: Vec::new(),
        }
    }

    /// Reconstruct a row loaded from the store.
    pub fn from_stored(
        id: RowId,
        element_id: ElementId,
        locale: LocaleId,
        values: IndexMap<String, FieldValue>,
    ) -> Self {
        Self {
            id: Some(id),
            element_id,
            locale,
            values,
            required: BTreeSet::new(),
            errors: Vec::new(),
        }
    }

    /// The element this row belongs to. Immutable once set.
    pub fn element_id(&self) -> ElementId {
        self.element_id
    }

    // --- Values ---

    /// The value stored under a field handle, if any.
    pub fn value(&self, handle: &str) -> Option<&FieldValue> {
        self.values.get(handle)
    }

    /// Set the value for a field handle.
    pub fn set_value(&mut self, handle: impl Into<String>, value: FieldValue) {
        self.values.insert(handle.into(), value);
    }

    /// All values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.values.iter()
    }

    // --- Required set ---

    /// Replace the set of handles that must be non-empty at validation time.
    /// The set comes from the field layout, not from the field definitions.
    pub fn set_required_handles(&mut self, handles: impl IntoIterator<Item = String>) {
        self.required = handles.into_iter().collect();
    }

    /// Handles that must be non-empty at validation time.
    pub fn required_handles(&self) -> impl Iterator<Item = &String> {
        self.required.iter()
    }

    // --- Errors ---

    /// Record a validation error.
    pub fn add_error(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    /// All validation errors recorded on this row.
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Clear validation errors before a fresh validation pass.
    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
