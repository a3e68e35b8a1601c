//! Element and submitted-input types

use crate::error::FieldError;
use crate::ids::ElementId;
use indexmap::IndexMap;
use serde_json::Value;

/// A persisted entity that owns localized field content.
///
/// An element with `id: None` has never been saved; the content engine
/// refuses to create rows for it. The element carries its own error
/// collection so a failed content save can surface per-field messages.
#[derive(Debug, Clone)]
pub struct Element {
    pub id: Option<ElementId>,
    pub element_type: String,
    errors: Vec<FieldError>,
}

impl Element {
    /// Create a new, unsaved element of the given type.
    pub fn new(element_type: impl Into<String>) -> Self {
        Self {
            id: None,
            element_type: element_type.into(),
            errors: Vec::new(),
        }
    }

    /// Set the id (the element has been persisted elsewhere).
    pub fn with_id(mut self, id: ElementId) -> Self {
        self.id = Some(id);
        self
    }

    /// Record a single field error.
    pub fn add_error(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    /// Record a batch of field errors (e.g. copied from a content row).
    pub fn add_errors(&mut self, errors: impl IntoIterator<Item = FieldError>) {
        self.errors.extend(errors);
    }

    /// All recorded field errors.
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Submitted field data for one save operation, keyed by field handle.
///
/// Callers build this from whatever surface received the data (a form post,
/// an API payload); the content engine never reaches into an ambient request.
#[derive(Debug, Clone, Default)]
pub struct ElementInput {
    values: IndexMap<String, Value>,
}

impl ElementInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a submitted value, returning self for chaining.
    pub fn with(mut self, handle: impl Into<String>, value: Value) -> Self {
        self.values.insert(handle.into(), value);
        self
    }

    /// Set a submitted value.
    pub fn set(&mut self, handle: impl Into<String>, value: Value) {
        self.values.insert(handle.into(), value);
    }

    /// The submitted value for a handle, if any.
    pub fn get(&self, handle: &str) -> Option<&Value> {
        self.values.get(handle)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
