//! ContentService — the save pipeline for localized element content.
//!
//! Orchestrates population of a content row from submitted input, required-
//! field validation, persistence, and propagation of non-translatable values
//! across the element's other locale rows. Collaborators (field registry,
//! content store, locale provider) are injected at construction; the service
//! holds no ambient global state.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::element::{Element, ElementInput};
use crate::error::{ContentError, FieldError, Result};
use crate::handler::handler_for;
use crate::ids::{ElementId, LocaleId};
use crate::locale::LocaleProvider;
use crate::row::ContentRow;
use crate::store::{ContentStore, StoredRow};
use crate::value::FieldValue;
use indexmap::IndexMap;
use loomcms_fields::{FieldLayout, FieldRegistry};

/// Outcome of cross-locale propagation: which sibling rows were updated and
/// which failed. Failures are reported, never silently dropped.
#[derive(Debug, Clone, Default)]
pub struct PropagationReport {
    pub updated: usize,
    pub failed: Vec<(LocaleId, String)>,
}

impl PropagationReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Service for saving and loading per-locale element content.
pub struct ContentService<S: ContentStore> {
    registry: Arc<FieldRegistry>,
    store: S,
    locales: Arc<dyn LocaleProvider>,
}

impl<S: ContentStore> ContentService<S> {
    /// Create a service from its collaborators.
    pub fn new(registry: Arc<FieldRegistry>, store: S, locales: Arc<dyn LocaleProvider>) -> Self {
        Self {
            registry,
            store,
            locales,
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Return the content row for an element, or `None` if there is none.
    ///
    /// With no locale given, any locale matches — on a single-locale install
    /// that is the element's one row.
    pub async fn get_content(
        &self,
        element_id: ElementId,
        locale: Option<&LocaleId>,
    ) -> Result<Option<ContentRow>> {
        match self.store.find_one(element_id, locale).await? {
            Some(stored) => Ok(Some(self.decode_row(stored))),
            None => Ok(None),
        }
    }

    /// Build a content row for an element from submitted input.
    ///
    /// Reuses the element's existing row for the locale when one exists;
    /// otherwise starts a fresh row whose locale defaults to the site's
    /// primary locale. Records the layout's required handles on the row and
    /// extracts a value for every field in the layout. Nothing is persisted.
    pub async fn populate_content_from_input(
        &self,
        element: &Element,
        layout: &FieldLayout,
        input: &ElementInput,
        locale: Option<&LocaleId>,
    ) -> Result<ContentRow> {
        let element_id = element.id.ok_or(ContentError::UnsavedElement)?;

        let existing = self.get_content(element_id, locale).await?;
        let mut row = existing.unwrap_or_else(|| {
            let locale = locale
                .cloned()
                .unwrap_or_else(|| self.locales.primary_locale().clone());
            ContentRow::new(element_id, locale)
        });

        row.set_required_handles(layout.required_handles());

        for (field, _required) in self.registry.fields_for_layout(layout) {
            let handler = handler_for(field, Some(element_id));
            let value = handler.extract_input(input)?;
            row.set_value(field.handle.clone(), value);
        }

        Ok(row)
    }

    /// Populate, save, and run post-save operations for an element's content.
    ///
    /// The composed convenience path. Fails with `UnsavedElement` before any
    /// store access if the element has no id. On validation failure the
    /// row's errors are copied onto the element and `Ok(false)` is returned.
    /// The whole save-plus-propagate sequence runs under the store's writer
    /// lock; a concurrent writer gets the retryable `LockBusy` error.
    pub async fn save_element_content(
        &self,
        element: &mut Element,
        layout: &FieldLayout,
        input: &ElementInput,
        locale: Option<&LocaleId>,
    ) -> Result<bool> {
        if element.id.is_none() {
            return Err(ContentError::UnsavedElement);
        }

        let _lock = self.store.lock().await?;

        let mut row = self
            .populate_content_from_input(element, layout, input, locale)
            .await?;

        if self.save_content(&mut row, true).await? {
            let report = self.post_save_operations(element, &row).await?;
            if !report.is_complete() {
                warn!(
                    element = %row.element_id(),
                    failed = report.failed.len(),
                    "content saved but propagation was partial"
                );
            }
            Ok(true)
        } else {
            element.add_errors(row.errors().to_vec());
            Ok(false)
        }
    }

    /// Persist a content row.
    ///
    /// With `validate` set, the required-handle set and each field's own
    /// constraints are checked first; on failure the errors stay on the row
    /// and nothing is written. Returns whether the write affected a row —
    /// an update that matches nothing reports `false`.
    pub async fn save_content(&self, row: &mut ContentRow, validate: bool) -> Result<bool> {
        if validate && !self.validate_row(row) {
            debug!(element = %row.element_id(), locale = %row.locale, "content validation failed");
            return Ok(false);
        }

        let columns = self.build_columns(row);

        match row.id {
            Some(ref id) => {
                let affected = self.store.update(id, &columns).await?;
                debug!(row = %id, affected, "content row updated");
                Ok(affected > 0)
            }
            None => {
                let id = self
                    .store
                    .insert(row.element_id(), &row.locale, &columns)
                    .await?;
                debug!(row = %id, element = %row.element_id(), locale = %row.locale, "content row inserted");
                row.id = Some(id);
                Ok(true)
            }
        }
    }

    /// Propagate non-translatable values to the element's other locale rows
    /// and fire each field handler's post-save hook exactly once.
    ///
    /// A no-op beyond the hooks on a single-locale site. Sibling rows that
    /// fail to persist are reported in the returned `PropagationReport`
    /// (propagation skips validation — the values already passed it once).
    pub async fn post_save_operations(
        &self,
        element: &Element,
        row: &ContentRow,
    ) -> Result<PropagationReport> {
        let element_id = element.id.ok_or(ContentError::UnsavedElement)?;
        let mut report = PropagationReport::default();

        let mut siblings: Vec<ContentRow> = if self.locales.is_multi_locale() {
            self.store
                .find_for_element_excluding(element_id, &row.locale)
                .await?
                .into_iter()
                .map(|stored| self.decode_row(stored))
                .collect()
        } else {
            Vec::new()
        };

        let mut handlers = Vec::new();
        for (handle, value) in row.values() {
            let Some(field) = self.registry.field_by_handle(handle) else {
                continue;
            };
            let handler = handler_for(field, Some(element_id));

            // Non-translatable fields are single-valued per element, so the
            // just-saved value wins in every locale.
            if !field.translatable && handler.has_own_column() {
                for sibling in &mut siblings {
                    sibling.set_value(handle.clone(), value.clone());
                }
            }

            handlers.push(handler);
        }

        for sibling in &mut siblings {
            match self.save_content(sibling, false).await {
                Ok(true) => report.updated += 1,
                Ok(false) => {
                    warn!(locale = %sibling.locale, "propagation update affected no rows");
                    report
                        .failed
                        .push((sibling.locale.clone(), "update affected no rows".into()));
                }
                Err(e) => {
                    warn!(locale = %sibling.locale, %e, "propagation update failed");
                    report.failed.push((sibling.locale.clone(), e.to_string()));
                }
            }
        }

        for handler in &handlers {
            handler.on_after_save().await?;
        }

        Ok(report)
    }

    // --- Internal ---

    /// Check the required-handle set and per-field constraints, collecting
    /// errors on the row. Returns whether the row is valid.
    fn validate_row(&self, row: &mut ContentRow) -> bool {
        row.clear_errors();

        let mut errors = Vec::new();

        for handle in row.required_handles() {
            let empty = row.value(handle).is_none_or(FieldValue::is_empty);
            if empty {
                errors.push(FieldError::new(handle.clone(), "cannot be blank"));
            }
        }

        for (handle, value) in row.values() {
            let Some(field) = self.registry.field_by_handle(handle) else {
                continue;
            };
            let handler = handler_for(field, Some(row.element_id()));
            if let Some(message) = handler.validate(value) {
                errors.push(FieldError::new(handle.clone(), message));
            }
        }

        let valid = errors.is_empty();
        for error in errors {
            row.add_error(error);
        }
        valid
    }

    /// Package the row's values into the column set to write: every value
    /// whose field declares a dedicated content column, encoded to a scalar.
    fn build_columns(&self, row: &ContentRow) -> IndexMap<String, serde_json::Value> {
        let mut columns = IndexMap::new();
        for (handle, value) in row.values() {
            let Some(field) = self.registry.field_by_handle(handle) else {
                warn!(%handle, "skipping value with no registered field");
                continue;
            };
            let handler = handler_for(field, Some(row.element_id()));
            if handler.has_own_column() {
                columns.insert(handle.clone(), value.encode());
            }
        }
        columns
    }

    /// Unpack a stored row into a typed content row. Columns that no longer
    /// match a registered field, or whose stored value fails to decode, are
    /// dropped with a warning.
    fn decode_row(&self, stored: StoredRow) -> ContentRow {
        let mut values = IndexMap::new();
        for (handle, raw) in &stored.columns {
            let Some(field) = self.registry.field_by_handle(handle) else {
                warn!(%handle, "dropping stored column with no registered field");
                continue;
            };
            match FieldValue::decode(&field.field_type, handle, raw) {
                Ok(value) => {
                    values.insert(handle.clone(), value);
                }
                Err(e) => {
                    warn!(%handle, %e, "dropping undecodable stored value");
                }
            }
        }
        ContentRow::from_stored(stored.id, stored.element_id, stored.locale, values)
    }
}
