//! Core field and layout types for the registry.
//!
//! All types serialize to/from YAML via serde. Field definitions describe
//! named, typed units of content. Field layouts are ordered, per-element-type
//! assignments of fields with a layout-scoped required flag.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// The type of a field — determines what shape the value takes and which
/// handler processes it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum FieldType {
    PlainText {
        #[serde(default)]
        multiline: bool,
    },
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    Date,
    Lightswitch,
    /// Stores element ids pointing at entries of another element type.
    Entries {
        source: String,
        #[serde(default)]
        multiple: bool,
    },
}

impl FieldType {
    /// Stable tag name for this kind, matching the serde `kind` tag.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::PlainText { .. } => "plain-text",
            Self::Number { .. } => "number",
            Self::Date => "date",
            Self::Lightswitch => "lightswitch",
            Self::Entries { .. } => "entries",
        }
    }
}

/// A field definition — the complete schema for a single named unit of content.
///
/// The `handle` is the unique string key under which the field's value is
/// stored on a content row. Whether the value may differ per locale is a
/// property of the field itself (`translatable`), not of any layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDef {
    pub id: Ulid,
    pub handle: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub translatable: bool,
}

/// One entry in a field layout: a field reference plus the layout-scoped
/// required flag. The same field may be required in one layout and optional
/// in another.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayoutField {
    pub handle: String,
    #[serde(default)]
    pub required: bool,
}

/// A field layout — the ordered assignment of fields to one element type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldLayout {
    pub element_type: String,
    #[serde(default)]
    pub fields: Vec<LayoutField>,
}

impl FieldLayout {
    /// Create an empty layout for an element type.
    pub fn new(element_type: impl Into<String>) -> Self {
        Self {
            element_type: element_type.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field entry, returning self for chaining.
    pub fn with_field(mut self, handle: impl Into<String>, required: bool) -> Self {
        self.fields.push(LayoutField {
            handle: handle.into(),
            required,
        });
        self
    }

    /// Whether the layout contains a field with the given handle.
    pub fn contains(&self, handle: &str) -> bool {
        self.fields.iter().any(|f| f.handle == handle)
    }

    /// Handles of all entries flagged required, in layout order.
    pub fn required_handles(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.handle.clone())
            .collect()
    }
}
