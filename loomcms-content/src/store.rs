//! Content store: persistence seam for content rows.
//!
//! The store deals in packaged rows — scalar column values only (see
//! `FieldValue::encode`). `FileContentStore` keeps one pretty-printed JSON
//! file per row under `rows/` with atomic temp-file+rename writes.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs2::FileExt;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs;

use crate::error::{ContentError, Result};
use crate::ids::{ElementId, LocaleId, RowId};

/// A content row in its stored, packaged form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRow {
    pub id: RowId,
    pub element_id: ElementId,
    pub locale: LocaleId,
    /// Packaged scalar value per field handle.
    #[serde(default)]
    pub columns: IndexMap<String, Value>,
}

/// Persistence capability for content rows.
///
/// Invariant enforced by implementations: at most one row per
/// `(element_id, locale)` pair. Rows are never deleted through this seam —
/// deletion cascades from element deletion, which lives elsewhere.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Find the unique row for an element, optionally pinned to a locale.
    async fn find_one(
        &self,
        element_id: ElementId,
        locale: Option<&LocaleId>,
    ) -> Result<Option<StoredRow>>;

    /// All rows for an element in locales other than the given one.
    async fn find_for_element_excluding(
        &self,
        element_id: ElementId,
        locale: &LocaleId,
    ) -> Result<Vec<StoredRow>>;

    /// Insert a new row, returning the generated id. Fails with
    /// `DuplicateRow` if the (element, locale) pair already has one.
    async fn insert(
        &self,
        element_id: ElementId,
        locale: &LocaleId,
        columns: &IndexMap<String, Value>,
    ) -> Result<RowId>;

    /// Replace the columns of an existing row. Returns the number of rows
    /// affected: 0 means the row no longer exists (a no-op failure, not a
    /// crash).
    async fn update(&self, id: &RowId, columns: &IndexMap<String, Value>) -> Result<u64>;

    /// Acquire an exclusive writer lock for a save-plus-propagate sequence.
    /// Stores without a shared medium may return a no-op guard.
    async fn lock(&self) -> Result<ContentLock> {
        Ok(ContentLock::noop())
    }
}

/// RAII writer-lock guard — releases on drop.
pub struct ContentLock {
    file: Option<std::fs::File>,
}

impl ContentLock {
    /// A guard that holds nothing.
    pub fn noop() -> Self {
        Self { file: None }
    }

    fn held(file: std::fs::File) -> Self {
        Self { file: Some(file) }
    }
}

impl Drop for ContentLock {
    fn drop(&mut self) {
        if let Some(file) = &self.file {
            let _ = file.unlock();
        }
    }
}

/// File-backed content store: one JSON file per row.
pub struct FileContentStore {
    root: PathBuf,
}

impl FileContentStore {
    /// Create a store rooted at the given content directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root content directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to the rows directory.
    pub fn rows_dir(&self) -> PathBuf {
        self.root.join("rows")
    }

    /// Path to a row's JSON file.
    pub fn row_path(&self, id: &RowId) -> PathBuf {
        self.rows_dir().join(format!("{id}.json"))
    }

    /// Path to the writer lock file.
    pub fn lock_path(&self) -> PathBuf {
        self.root.join(".lock")
    }

    /// Create the directory structure. Idempotent.
    pub async fn ensure_directories(&self) -> Result<()> {
        fs::create_dir_all(self.rows_dir()).await?;
        Ok(())
    }

    async fn read_row(&self, path: &Path) -> Result<StoredRow> {
        let content = fs::read_to_string(path).await?;
        let row: StoredRow = serde_json::from_str(&content)?;
        Ok(row)
    }

    async fn write_row(&self, row: &StoredRow) -> Result<()> {
        let path = self.row_path(&row.id);
        let content = serde_json::to_string_pretty(row)?;
        atomic_write(&path, content.as_bytes()).await
    }

    /// Read every row in the store.
    async fn read_all_rows(&self) -> Result<Vec<StoredRow>> {
        let rows_dir = self.rows_dir();
        if !rows_dir.exists() {
            return Ok(Vec::new());
        }

        let mut rows = Vec::new();
        let mut entries = fs::read_dir(&rows_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            match self.read_row(&path).await {
                Ok(row) => rows.push(row),
                Err(e) => {
                    tracing::warn!(?path, %e, "skipping unreadable content row");
                }
            }
        }
        Ok(rows)
    }
}

#[async_trait]
impl ContentStore for FileContentStore {
    async fn find_one(
        &self,
        element_id: ElementId,
        locale: Option<&LocaleId>,
    ) -> Result<Option<StoredRow>> {
        let rows = self.read_all_rows().await?;
        Ok(rows.into_iter().find(|row| {
            row.element_id == element_id && locale.is_none_or(|l| &row.locale == l)
        }))
    }

    async fn find_for_element_excluding(
        &self,
        element_id: ElementId,
        locale: &LocaleId,
    ) -> Result<Vec<StoredRow>> {
        let rows = self.read_all_rows().await?;
        Ok(rows
            .into_iter()
            .filter(|row| row.element_id == element_id && &row.locale != locale)
            .collect())
    }

    async fn insert(
        &self,
        element_id: ElementId,
        locale: &LocaleId,
        columns: &IndexMap<String, Value>,
    ) -> Result<RowId> {
        self.ensure_directories().await?;

        if self.find_one(element_id, Some(locale)).await?.is_some() {
            return Err(ContentError::DuplicateRow {
                element_id,
                locale: locale.clone(),
            });
        }

        let row = StoredRow {
            id: RowId::new(),
            element_id,
            locale: locale.clone(),
            columns: columns.clone(),
        };
        self.write_row(&row).await?;
        Ok(row.id)
    }

    async fn update(&self, id: &RowId, columns: &IndexMap<String, Value>) -> Result<u64> {
        let path = self.row_path(id);
        if !path.exists() {
            return Ok(0);
        }

        let mut row = self.read_row(&path).await?;
        row.columns = columns.clone();
        self.write_row(&row).await?;
        Ok(1)
    }

    /// Try to acquire the exclusive writer lock (non-blocking).
    async fn lock(&self) -> Result<ContentLock> {
        let lock_path = self.lock_path();
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&lock_path)?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(ContentLock::held(file)),
            Err(_) => Err(ContentError::LockBusy),
        }
    }
}

/// Atomic write via temp file and rename
async fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, content).await?;
    fs::rename(&temp_path, path).await?;
    Ok(())
}
