//! Typed field values and attribute packaging.
//!
//! A `FieldValue` is the in-memory form of one field's content. Persisted
//! rows hold packaged scalars instead: `encode()` turns complex values
//! (reference lists) into a storable JSON-string scalar and passes simple
//! scalars through unchanged; `decode()` reverses it using the field's type.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use ulid::Ulid;

use crate::error::{ContentError, Result};
use crate::ids::ElementId;
use loomcms_fields::FieldType;

/// The value of one field on one content row.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(DateTime<Utc>),
    Refs(Vec<ElementId>),
}

impl FieldValue {
    /// Whether this value counts as empty for required-field validation.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Refs(ids) => ids.is_empty(),
            Self::Number(_) | Self::Bool(_) | Self::Date(_) => false,
        }
    }

    /// Package this value into its storable scalar form.
    ///
    /// Simple scalars pass through unchanged; reference lists are serialized
    /// to a JSON string so every stored column is a scalar.
    pub fn encode(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Text(s) => Value::String(s.clone()),
            Self::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::Bool(b) => Value::Bool(*b),
            Self::Date(dt) => Value::String(dt.to_rfc3339_opts(SecondsFormat::Secs, true)),
            Self::Refs(ids) => {
                let strings: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
                // Serializing a Vec<String> to a JSON string cannot fail
                Value::String(serde_json::to_string(&strings).unwrap_or_default())
            }
        }
    }

    /// Unpack a stored scalar back into a typed value, guided by the field's
    /// declared type.
    pub fn decode(field_type: &FieldType, handle: &str, raw: &Value) -> Result<Self> {
        if raw.is_null() {
            return Ok(Self::Null);
        }

        match field_type {
            FieldType::PlainText { .. } => match raw {
                Value::String(s) => Ok(Self::Text(s.clone())),
                other => Err(bad_stored(handle, "string", other)),
            },
            FieldType::Number { .. } => match raw {
                Value::Number(n) => n
                    .as_f64()
                    .map(Self::Number)
                    .ok_or_else(|| bad_stored(handle, "finite number", raw)),
                other => Err(bad_stored(handle, "number", other)),
            },
            FieldType::Date => match raw {
                Value::String(s) => DateTime::parse_from_rfc3339(s)
                    .map(|dt| Self::Date(dt.with_timezone(&Utc)))
                    .map_err(|e| ContentError::invalid_value(handle, e.to_string())),
                other => Err(bad_stored(handle, "RFC 3339 string", other)),
            },
            FieldType::Lightswitch => match raw {
                Value::Bool(b) => Ok(Self::Bool(*b)),
                other => Err(bad_stored(handle, "boolean", other)),
            },
            FieldType::Entries { .. } => match raw {
                Value::String(packed) => {
                    let strings: Vec<String> = serde_json::from_str(packed)
                        .map_err(|e| ContentError::invalid_value(handle, e.to_string()))?;
                    let mut ids = Vec::with_capacity(strings.len());
                    for s in &strings {
                        let ulid = Ulid::from_string(s).map_err(|e| {
                            ContentError::invalid_value(handle, e.to_string())
                        })?;
                        ids.push(ElementId::from(ulid));
                    }
                    Ok(Self::Refs(ids))
                }
                other => Err(bad_stored(handle, "packed reference string", other)),
            },
        }
    }
}

fn bad_stored(handle: &str, expected: &str, got: &Value) -> ContentError {
    ContentError::invalid_value(handle, format!("expected {expected}, got {got}"))
}
