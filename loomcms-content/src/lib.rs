//! Localized element content engine with file-backed storage
//!
//! This crate persists per-locale, per-field content for elements. Fields and
//! field layouts come from `loomcms-fields`; this crate owns the values: one
//! content row per (element, locale) pair, one column per field handle.
//!
//! ## Overview
//!
//! - **Row-per-locale** - an element has at most one content row per locale
//! - **Handle-keyed columns** - field values live under the field's handle,
//!   packaged to scalars for storage
//! - **Layout-scoped validation** - the required set comes from the field
//!   layout, so the same field can be required for one element type and
//!   optional for another
//! - **Locale propagation** - saving a non-translatable field pushes its new
//!   value into every other locale row of the same element
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use loomcms_fields::FieldRegistry;
//! use loomcms_content::{ContentService, Element, ElementInput, FileContentStore, SiteLocales};
//! use loomcms_content::ids::{ElementId, LocaleId};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Arc::new(FieldRegistry::open("/path/to/fields").build().await?);
//! let store = FileContentStore::new("/path/to/content");
//! let locales = Arc::new(SiteLocales::single(LocaleId::from("en")));
//! let service = ContentService::new(registry.clone(), store, locales);
//!
//! let layout = registry.layout_for("article").unwrap();
//! let mut element = Element::new("article").with_id(ElementId::new());
//! let input = ElementInput::new().with("title", json!("Hello"));
//!
//! let saved = service
//!     .save_element_content(&mut element, layout, &input, None)
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Storage Structure
//!
//! ```text
//! content/
//! ├── rows/
//! │   └── {row_id}.json    # One packaged row per (element, locale)
//! └── .lock                # Writer lock for save-plus-propagate sequences
//! ```

pub mod element;
mod error;
pub mod handler;
pub mod ids;
pub mod locale;
pub mod row;
pub mod service;
pub mod store;
pub mod value;

pub use element::{Element, ElementInput};
pub use error::{ContentError, FieldError, Result};
pub use handler::{handler_for, FieldTypeHandler};
pub use ids::{ElementId, LocaleId, RowId};
pub use locale::{LocaleProvider, SiteLocales};
pub use row::ContentRow;
pub use service::{ContentService, PropagationReport};
pub use store::{ContentLock, ContentStore, FileContentStore, StoredRow};
pub use value::FieldValue;
