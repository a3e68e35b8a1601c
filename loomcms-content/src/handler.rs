//! Field type handlers: the behavior unit for one field kind.
//!
//! A handler is transient — built fresh for each operation, bound to one
//! field definition and (when available) the element being saved. It knows
//! how to pull its value out of submitted input, whether it owns a dedicated
//! content column, how to validate a value, and what to do after a save
//! completes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;
use ulid::Ulid;

use crate::element::ElementInput;
use crate::error::{ContentError, Result};
use crate::ids::ElementId;
use crate::value::FieldValue;
use loomcms_fields::{FieldDef, FieldType};

/// Behavior unit for one field kind, bound to one field and one element.
#[async_trait]
pub trait FieldTypeHandler: Send + Sync {
    /// The handle of the bound field.
    fn handle(&self) -> &str;

    /// Extract this field's value from submitted input. A missing entry is
    /// `FieldValue::Null`, not an error.
    fn extract_input(&self, input: &ElementInput) -> Result<FieldValue>;

    /// Whether this field stores its value in a dedicated content column.
    fn has_own_column(&self) -> bool {
        true
    }

    /// Field-level constraint check. Returns a message on violation.
    fn validate(&self, _value: &FieldValue) -> Option<String> {
        None
    }

    /// Hook invoked once after the element's content (and any propagated
    /// locale rows) have been persisted.
    async fn on_after_save(&self) -> Result<()> {
        Ok(())
    }
}

/// Materialize the handler for a field, bound to the element being saved.
pub fn handler_for(field: &FieldDef, element_id: Option<ElementId>) -> Box<dyn FieldTypeHandler> {
    match &field.field_type {
        FieldType::PlainText { .. } => Box::new(PlainTextHandler {
            handle: field.handle.clone(),
        }),
        FieldType::Number { min, max } => Box::new(NumberHandler {
            handle: field.handle.clone(),
            min: *min,
            max: *max,
        }),
        FieldType::Date => Box::new(DateHandler {
            handle: field.handle.clone(),
        }),
        FieldType::Lightswitch => Box::new(LightswitchHandler {
            handle: field.handle.clone(),
        }),
        FieldType::Entries { multiple, .. } => Box::new(EntriesHandler {
            handle: field.handle.clone(),
            multiple: *multiple,
            element_id,
        }),
    }
}

/// Single- or multi-line text.
struct PlainTextHandler {
    handle: String,
}

#[async_trait]
impl FieldTypeHandler for PlainTextHandler {
    fn handle(&self) -> &str {
        &self.handle
    }

    fn extract_input(&self, input: &ElementInput) -> Result<FieldValue> {
        match input.get(&self.handle) {
            None | Some(Value::Null) => Ok(FieldValue::Null),
            Some(Value::String(s)) => Ok(FieldValue::Text(s.clone())),
            Some(other) => Err(bad_input(&self.handle, "string", other)),
        }
    }
}

/// Numeric value with optional range constraints.
struct NumberHandler {
    handle: String,
    min: Option<f64>,
    max: Option<f64>,
}

#[async_trait]
impl FieldTypeHandler for NumberHandler {
    fn handle(&self) -> &str {
        &self.handle
    }

    fn extract_input(&self, input: &ElementInput) -> Result<FieldValue> {
        match input.get(&self.handle) {
            None | Some(Value::Null) => Ok(FieldValue::Null),
            Some(Value::Number(n)) => n
                .as_f64()
                .map(FieldValue::Number)
                .ok_or_else(|| bad_input_msg(&self.handle, "not a finite number")),
            // Form surfaces submit numbers as strings
            Some(Value::String(s)) if !s.trim().is_empty() => {
                let n = s
                    .trim()
                    .parse::<f64>()
                    .map_err(|e| bad_input_msg(&self.handle, &e.to_string()))?;
                // f64 parsing accepts "NaN" and "inf", which have no stored form
                if !n.is_finite() {
                    return Err(bad_input_msg(&self.handle, "not a finite number"));
                }
                Ok(FieldValue::Number(n))
            }
            Some(Value::String(_)) => Ok(FieldValue::Null),
            Some(other) => Err(bad_input(&self.handle, "number", other)),
        }
    }

    fn validate(&self, value: &FieldValue) -> Option<String> {
        let FieldValue::Number(n) = value else {
            return None;
        };
        if let Some(min) = self.min {
            if *n < min {
                return Some(format!("must be no less than {min}"));
            }
        }
        if let Some(max) = self.max {
            if *n > max {
                return Some(format!("must be no greater than {max}"));
            }
        }
        None
    }
}

/// RFC 3339 date-time.
struct DateHandler {
    handle: String,
}

#[async_trait]
impl FieldTypeHandler for DateHandler {
    fn handle(&self) -> &str {
        &self.handle
    }

    fn extract_input(&self, input: &ElementInput) -> Result<FieldValue> {
        match input.get(&self.handle) {
            None | Some(Value::Null) => Ok(FieldValue::Null),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(FieldValue::Null),
            Some(Value::String(s)) => DateTime::parse_from_rfc3339(s.trim())
                .map(|dt| FieldValue::Date(dt.with_timezone(&Utc)))
                .map_err(|e| bad_input_msg(&self.handle, &e.to_string())),
            Some(other) => Err(bad_input(&self.handle, "RFC 3339 string", other)),
        }
    }
}

/// On/off toggle. Accepts booleans and the usual form-post spellings.
struct LightswitchHandler {
    handle: String,
}

#[async_trait]
impl FieldTypeHandler for LightswitchHandler {
    fn handle(&self) -> &str {
        &self.handle
    }

    fn extract_input(&self, input: &ElementInput) -> Result<FieldValue> {
        match input.get(&self.handle) {
            None | Some(Value::Null) => Ok(FieldValue::Null),
            Some(Value::Bool(b)) => Ok(FieldValue::Bool(*b)),
            Some(Value::String(s)) => match s.trim() {
                "" => Ok(FieldValue::Null),
                "1" | "true" | "on" => Ok(FieldValue::Bool(true)),
                "0" | "false" | "off" => Ok(FieldValue::Bool(false)),
                other => Err(bad_input_msg(
                    &self.handle,
                    &format!("not a boolean: {other}"),
                )),
            },
            Some(other) => Err(bad_input(&self.handle, "boolean", other)),
        }
    }
}

/// References to other elements, submitted as an array of element ids.
struct EntriesHandler {
    handle: String,
    multiple: bool,
    element_id: Option<ElementId>,
}

#[async_trait]
impl FieldTypeHandler for EntriesHandler {
    fn handle(&self) -> &str {
        &self.handle
    }

    fn extract_input(&self, input: &ElementInput) -> Result<FieldValue> {
        match input.get(&self.handle) {
            None | Some(Value::Null) => Ok(FieldValue::Null),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(FieldValue::Null),
            Some(Value::String(s)) => Ok(FieldValue::Refs(vec![parse_ref(&self.handle, s)?])),
            Some(Value::Array(items)) => {
                let mut ids = Vec::with_capacity(items.len());
                for item in items {
                    let s = item
                        .as_str()
                        .ok_or_else(|| bad_input(&self.handle, "element id string", item))?;
                    ids.push(parse_ref(&self.handle, s)?);
                }
                Ok(FieldValue::Refs(ids))
            }
            Some(other) => Err(bad_input(&self.handle, "element id array", other)),
        }
    }

    fn validate(&self, value: &FieldValue) -> Option<String> {
        match value {
            FieldValue::Refs(ids) if !self.multiple && ids.len() > 1 => {
                Some("only one relation allowed".into())
            }
            _ => None,
        }
    }

    async fn on_after_save(&self) -> Result<()> {
        // Relation indexes are rebuilt lazily; just note that the save happened.
        debug!(handle = %self.handle, element = ?self.element_id, "relations saved");
        Ok(())
    }
}

fn parse_ref(handle: &str, s: &str) -> Result<ElementId> {
    Ulid::from_string(s.trim())
        .map(ElementId::from)
        .map_err(|e| bad_input_msg(handle, &e.to_string()))
}

fn bad_input(handle: &str, expected: &str, got: &Value) -> ContentError {
    ContentError::invalid_value(handle, format!("expected {expected}, got {got}"))
}

fn bad_input_msg(handle: &str, message: &str) -> ContentError {
    ContentError::invalid_value(handle, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_field(handle: &str, field_type: FieldType) -> FieldDef {
        FieldDef {
            id: Ulid::new(),
            handle: handle.into(),
            name: handle.into(),
            instructions: None,
            field_type,
            translatable: false,
        }
    }

    #[test]
    fn plain_text_extracts_string() {
        let field = make_field("title", FieldType::PlainText { multiline: false });
        let handler = handler_for(&field, None);

        let input = ElementInput::new().with("title", json!("Hello"));
        assert_eq!(
            handler.extract_input(&input).unwrap(),
            FieldValue::Text("Hello".into())
        );

        let empty = ElementInput::new();
        assert_eq!(handler.extract_input(&empty).unwrap(), FieldValue::Null);

        let wrong = ElementInput::new().with("title", json!(["a"]));
        assert!(handler.extract_input(&wrong).is_err());
    }

    #[test]
    fn number_extracts_and_parses_strings() {
        let field = make_field(
            "rating",
            FieldType::Number {
                min: Some(0.0),
                max: Some(5.0),
            },
        );
        let handler = handler_for(&field, None);

        let input = ElementInput::new().with("rating", json!(4));
        assert_eq!(
            handler.extract_input(&input).unwrap(),
            FieldValue::Number(4.0)
        );

        let form = ElementInput::new().with("rating", json!("3.5"));
        assert_eq!(
            handler.extract_input(&form).unwrap(),
            FieldValue::Number(3.5)
        );

        let blank = ElementInput::new().with("rating", json!(""));
        assert_eq!(handler.extract_input(&blank).unwrap(), FieldValue::Null);
    }

    #[test]
    fn number_rejects_non_finite_strings() {
        let field = make_field(
            "rating",
            FieldType::Number {
                min: None,
                max: None,
            },
        );
        let handler = handler_for(&field, None);

        for raw in ["NaN", "inf", "-inf", "infinity"] {
            let input = ElementInput::new().with("rating", json!(raw));
            assert!(
                handler.extract_input(&input).is_err(),
                "{raw} must be rejected"
            );
        }
    }

    #[test]
    fn number_validates_range() {
        let field = make_field(
            "rating",
            FieldType::Number {
                min: Some(0.0),
                max: Some(5.0),
            },
        );
        let handler = handler_for(&field, None);

        assert!(handler.validate(&FieldValue::Number(3.0)).is_none());
        assert!(handler.validate(&FieldValue::Number(-1.0)).is_some());
        assert!(handler.validate(&FieldValue::Number(6.0)).is_some());
        assert!(handler.validate(&FieldValue::Null).is_none());
    }

    #[test]
    fn date_extracts_rfc3339() {
        let field = make_field("published_at", FieldType::Date);
        let handler = handler_for(&field, None);

        let input = ElementInput::new().with("published_at", json!("2024-03-01T12:30:00Z"));
        match handler.extract_input(&input).unwrap() {
            FieldValue::Date(dt) => assert_eq!(dt.to_rfc3339(), "2024-03-01T12:30:00+00:00"),
            other => panic!("expected date, got {other:?}"),
        }

        let garbage = ElementInput::new().with("published_at", json!("yesterday"));
        assert!(handler.extract_input(&garbage).is_err());
    }

    #[test]
    fn lightswitch_accepts_form_spellings() {
        let field = make_field("featured", FieldType::Lightswitch);
        let handler = handler_for(&field, None);

        for (raw, expected) in [
            (json!(true), FieldValue::Bool(true)),
            (json!("1"), FieldValue::Bool(true)),
            (json!("on"), FieldValue::Bool(true)),
            (json!("0"), FieldValue::Bool(false)),
            (json!(""), FieldValue::Null),
        ] {
            let input = ElementInput::new().with("featured", raw);
            assert_eq!(handler.extract_input(&input).unwrap(), expected);
        }
    }

    #[test]
    fn entries_extracts_id_arrays() {
        let field = make_field(
            "related",
            FieldType::Entries {
                source: "article".into(),
                multiple: true,
            },
        );
        let handler = handler_for(&field, None);

        let a = ElementId::new();
        let b = ElementId::new();
        let input =
            ElementInput::new().with("related", json!([a.to_string(), b.to_string()]));
        assert_eq!(
            handler.extract_input(&input).unwrap(),
            FieldValue::Refs(vec![a, b])
        );
    }

    #[test]
    fn entries_single_rejects_multiple() {
        let field = make_field(
            "author",
            FieldType::Entries {
                source: "person".into(),
                multiple: false,
            },
        );
        let handler = handler_for(&field, None);

        let one = FieldValue::Refs(vec![ElementId::new()]);
        let two = FieldValue::Refs(vec![ElementId::new(), ElementId::new()]);
        assert!(handler.validate(&one).is_none());
        assert!(handler.validate(&two).is_some());
    }

    #[test]
    fn all_kinds_own_a_column() {
        for field_type in [
            FieldType::PlainText { multiline: false },
            FieldType::Number {
                min: None,
                max: None,
            },
            FieldType::Date,
            FieldType::Lightswitch,
            FieldType::Entries {
                source: "article".into(),
                multiple: true,
            },
        ] {
            let field = make_field("f", field_type);
            assert!(handler_for(&field, None).has_own_column());
        }
    }
}
