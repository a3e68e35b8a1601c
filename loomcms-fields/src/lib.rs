//! Field definition and field layout registry
//!
//! `loomcms-fields` is a standalone, schema-only crate that manages field
//! definitions and field layouts. It knows nothing about elements, locales,
//! or content rows — consumers provide their own built-in definitions via
//! `with_defaults()`.
//!
//! # Architecture
//!
//! - **Schema-only**: Owns field definitions and layouts, not field values
//! - **YAML on disk**: One `.yaml` file per field definition, one per layout
//! - **Consumer-agnostic**: Takes a `Path`, consumers decide where it lives
//! - **Default seeding**: `with_defaults()` writes defaults that don't exist,
//!   preserves customizations

pub mod error;
pub mod registry;
pub mod types;

pub use error::{FieldsError, Result};
pub use registry::{FieldDefaults, FieldRegistry, FieldRegistryBuilder};
pub use types::{FieldDef, FieldLayout, FieldType, LayoutField};
