//! FieldRegistry — main API surface for field definitions and layouts.
//!
//! Manages field definitions and field layouts as YAML files under a
//! `fields/` directory. Provides in-memory indexes for fast lookup by
//! handle, ULID, and element type.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;
use ulid::Ulid;

use crate::error::{FieldsError, Result};
use crate::types::{FieldDef, FieldLayout};

/// A collection of default field definitions and layouts.
///
/// Consumers build this to pass to `FieldRegistryBuilder::with_defaults()`.
/// On open, defaults that don't already exist on disk are written.
pub struct FieldDefaults {
    fields: Vec<FieldDef>,
    layouts: Vec<FieldLayout>,
}

impl FieldDefaults {
    pub fn new() -> Self {
        Self {
            fields: Vec::new(),
            layouts: Vec::new(),
        }
    }

    /// Add a default field definition.
    pub fn field(mut self, def: FieldDef) -> Self {
        self.fields.push(def);
        self
    }

    /// Add a default field layout.
    pub fn layout(mut self, layout: FieldLayout) -> Self {
        self.layouts.push(layout);
        self
    }

    /// Access the field definitions.
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Access the layouts.
    pub fn layouts(&self) -> &[FieldLayout] {
        &self.layouts
    }
}

impl Default for FieldDefaults {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `FieldRegistry`. Created by `FieldRegistry::open()`.
pub struct FieldRegistryBuilder {
    root: PathBuf,
    defaults: Option<FieldDefaults>,
}

impl FieldRegistryBuilder {
    /// Provide default field definitions and layouts.
    /// Defaults are seeded on first open; existing files are preserved.
    pub fn with_defaults(mut self, defaults: FieldDefaults) -> Self {
        self.defaults = Some(defaults);
        self
    }

    /// Build the registry: create directories, seed defaults, load from disk.
    pub async fn build(self) -> Result<FieldRegistry> {
        let root = self.root;

        let defs_dir = root.join("definitions");
        let layouts_dir = root.join("layouts");
        fs::create_dir_all(&defs_dir).await?;
        fs::create_dir_all(&layouts_dir).await?;

        // Seed defaults before loading
        if let Some(defaults) = self.defaults {
            seed_defaults(&root, &defaults).await?;
        }

        let mut registry = FieldRegistry {
            root,
            fields: Vec::new(),
            layouts: Vec::new(),
            handle_index: HashMap::new(),
            id_index: HashMap::new(),
            layout_index: HashMap::new(),
        };

        registry.load_definitions().await?;
        registry.load_layouts().await?;

        debug!(
            fields = registry.fields.len(),
            layouts = registry.layouts.len(),
            "field registry opened"
        );

        Ok(registry)
    }
}

/// Seed default definitions that don't already exist on disk.
///
/// Fields are matched by ULID — if a file with that ULID exists (even if
/// renamed), the default is skipped. Layouts are matched by element type.
async fn seed_defaults(root: &Path, defaults: &FieldDefaults) -> Result<()> {
    let defs_dir = root.join("definitions");
    let layouts_dir = root.join("layouts");

    let existing_ids = collect_existing_field_ids(&defs_dir).await?;

    for def in &defaults.fields {
        if !existing_ids.contains(&def.id) {
            let yaml = serde_yaml::to_string(def)?;
            let path = defs_dir.join(format!("{}.yaml", def.handle));
            atomic_write(&path, yaml.as_bytes()).await?;
            debug!(handle = %def.handle, id = %def.id, "seeded default field");
        }
    }

    for layout in &defaults.layouts {
        let path = layouts_dir.join(format!("{}.yaml", layout.element_type));
        if !path.exists() {
            let yaml = serde_yaml::to_string(layout)?;
            atomic_write(&path, yaml.as_bytes()).await?;
            debug!(element_type = %layout.element_type, "seeded default layout");
        }
    }

    Ok(())
}

/// Read all .yaml files in definitions/ and extract their ULIDs.
async fn collect_existing_field_ids(defs_dir: &Path) -> Result<Vec<Ulid>> {
    let mut ids = Vec::new();
    if !defs_dir.exists() {
        return Ok(ids);
    }
    let mut entries = fs::read_dir(defs_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
            continue;
        }
        if let Ok(content) = fs::read_to_string(&path).await {
            if let Ok(def) = serde_yaml::from_str::<FieldDef>(&content) {
                ids.push(def.id);
            }
        }
    }
    Ok(ids)
}

/// Registry for field definitions and field layouts.
///
/// Owns a directory on disk with the structure:
/// ```text
/// fields/
///   definitions/    ← one .yaml per field
///   layouts/        ← one .yaml per element type
/// ```
pub struct FieldRegistry {
    root: PathBuf,
    fields: Vec<FieldDef>,
    layouts: Vec<FieldLayout>,
    handle_index: HashMap<String, usize>,
    id_index: HashMap<Ulid, usize>,
    layout_index: HashMap<String, usize>,
}

impl FieldRegistry {
    /// Open or create a fields directory. Returns a builder for optional
    /// configuration.
    ///
    /// ```rust,ignore
    /// // Simple open:
    /// let registry = FieldRegistry::open(path).build().await?;
    ///
    /// // With defaults:
    /// let registry = FieldRegistry::open(path)
    ///     .with_defaults(my_defaults())
    ///     .build()
    ///     .await?;
    /// ```
    pub fn open(root: impl Into<PathBuf>) -> FieldRegistryBuilder {
        FieldRegistryBuilder {
            root: root.into(),
            defaults: None,
        }
    }

    // --- Field definitions ---

    /// Get a field definition by handle.
    pub fn field_by_handle(&self, handle: &str) -> Option<&FieldDef> {
        self.handle_index.get(handle).map(|&i| &self.fields[i])
    }

    /// Get a field definition by ULID.
    pub fn field_by_id(&self, id: &Ulid) -> Option<&FieldDef> {
        self.id_index.get(id).map(|&i| &self.fields[i])
    }

    /// All field definitions, in load order.
    pub fn all_fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Write (create or update) a field definition. Persists to YAML immediately.
    pub async fn write_field(&mut self, def: &FieldDef) -> Result<()> {
        if let Some(existing) = self.field_by_handle(&def.handle) {
            if existing.id != def.id {
                return Err(FieldsError::DuplicateHandle {
                    handle: def.handle.clone(),
                });
            }
        }

        let yaml = serde_yaml::to_string(def)?;
        let path = self.definition_path(&def.handle);
        atomic_write(&path, yaml.as_bytes()).await?;

        // Update in-memory state
        if let Some(&idx) = self.id_index.get(&def.id) {
            // Existing field — might have a new handle
            let old_handle = self.fields[idx].handle.clone();
            if old_handle != def.handle {
                self.handle_index.remove(&old_handle);
                let old_path = self.definition_path(&old_handle);
                let _ = fs::remove_file(&old_path).await;
            }
            self.fields[idx] = def.clone();
            self.handle_index.insert(def.handle.clone(), idx);
        } else {
            // New field
            let idx = self.fields.len();
            self.fields.push(def.clone());
            self.handle_index.insert(def.handle.clone(), idx);
            self.id_index.insert(def.id, idx);
        }

        Ok(())
    }

    /// Delete a field definition by ULID.
    pub async fn delete_field(&mut self, id: &Ulid) -> Result<()> {
        let idx = self
            .id_index
            .get(id)
            .copied()
            .ok_or_else(|| FieldsError::FieldNotFoundById { id: id.to_string() })?;

        let def = &self.fields[idx];
        let path = self.definition_path(&def.handle);
        let _ = fs::remove_file(&path).await;

        let handle = def.handle.clone();
        self.handle_index.remove(&handle);
        self.id_index.remove(id);

        // Swap-remove and fix indexes
        self.fields.swap_remove(idx);
        if idx < self.fields.len() {
            let moved = &self.fields[idx];
            self.handle_index.insert(moved.handle.clone(), idx);
            self.id_index.insert(moved.id, idx);
        }

        Ok(())
    }

    // --- Field layouts ---

    /// Get the field layout for an element type.
    pub fn layout_for(&self, element_type: &str) -> Option<&FieldLayout> {
        self.layout_index
            .get(element_type)
            .map(|&i| &self.layouts[i])
    }

    /// All field layouts.
    pub fn all_layouts(&self) -> &[FieldLayout] {
        &self.layouts
    }

    /// Write (create or update) a field layout. Persists to YAML immediately.
    pub async fn write_layout(&mut self, layout: &FieldLayout) -> Result<()> {
        let yaml = serde_yaml::to_string(layout)?;
        let path = self.layout_path(&layout.element_type);
        atomic_write(&path, yaml.as_bytes()).await?;

        if let Some(&idx) = self.layout_index.get(&layout.element_type) {
            self.layouts[idx] = layout.clone();
        } else {
            let idx = self.layouts.len();
            self.layouts.push(layout.clone());
            self.layout_index.insert(layout.element_type.clone(), idx);
        }

        Ok(())
    }

    // --- Lookup helpers ---

    /// Resolve a layout to its field definitions with the layout-scoped
    /// required flag, in layout order. Entries whose handle has no matching
    /// definition are dropped.
    pub fn fields_for_layout<'a>(&'a self, layout: &FieldLayout) -> Vec<(&'a FieldDef, bool)> {
        layout
            .fields
            .iter()
            .filter_map(|entry| {
                self.field_by_handle(&entry.handle)
                    .map(|def| (def, entry.required))
            })
            .collect()
    }

    /// Resolve a field handle to its ULID.
    pub fn resolve_handle_to_id(&self, handle: &str) -> Option<Ulid> {
        self.field_by_handle(handle).map(|f| f.id)
    }

    /// The root directory path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // --- Internal ---

    fn definition_path(&self, handle: &str) -> PathBuf {
        self.root.join("definitions").join(format!("{handle}.yaml"))
    }

    fn layout_path(&self, element_type: &str) -> PathBuf {
        self.root
            .join("layouts")
            .join(format!("{element_type}.yaml"))
    }

    async fn load_definitions(&mut self) -> Result<()> {
        let defs_dir = self.root.join("definitions");
        let mut entries = fs::read_dir(&defs_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            let content = fs::read_to_string(&path).await?;
            match serde_yaml::from_str::<FieldDef>(&content) {
                Ok(def) => {
                    let idx = self.fields.len();
                    self.handle_index.insert(def.handle.clone(), idx);
                    self.id_index.insert(def.id, idx);
                    self.fields.push(def);
                }
                Err(e) => {
                    tracing::warn!(?path, %e, "skipping invalid field definition");
                }
            }
        }
        Ok(())
    }

    async fn load_layouts(&mut self) -> Result<()> {
        let layouts_dir = self.root.join("layouts");
        let mut entries = fs::read_dir(&layouts_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            let content = fs::read_to_string(&path).await?;
            match serde_yaml::from_str::<FieldLayout>(&content) {
                Ok(layout) => {
                    let idx = self.layouts.len();
                    self.layout_index.insert(layout.element_type.clone(), idx);
                    self.layouts.push(layout);
                }
                Err(e) => {
                    tracing::warn!(?path, %e, "skipping invalid field layout");
                }
            }
        }
        Ok(())
    }
}

/// Write to a temp file then rename for atomic persistence.
async fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "no parent dir"))?;
    let tmp = dir.join(format!(".tmp_{}", Ulid::new()));
    fs::write(&tmp, data).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldLayout, FieldType};
    use tempfile::TempDir;

    fn make_test_field(handle: &str) -> FieldDef {
        FieldDef {
            id: Ulid::new(),
            handle: handle.to_string(),
            name: handle.to_string(),
            instructions: None,
            field_type: FieldType::PlainText { multiline: false },
            translatable: false,
        }
    }

    fn sample_defaults() -> FieldDefaults {
        let title_id = Ulid::from_string("00000000000000000000000001").unwrap();
        let body_id = Ulid::from_string("00000000000000000000000002").unwrap();

        FieldDefaults::new()
            .field(FieldDef {
                id: title_id,
                handle: "title".into(),
                name: "Title".into(),
                instructions: None,
                field_type: FieldType::PlainText { multiline: false },
                translatable: false,
            })
            .field(FieldDef {
                id: body_id,
                handle: "body".into(),
                name: "Body".into(),
                instructions: None,
                field_type: FieldType::PlainText { multiline: true },
                translatable: true,
            })
            .layout(
                FieldLayout::new("article")
                    .with_field("title", true)
                    .with_field("body", false),
            )
    }

    #[tokio::test]
    async fn open_creates_directories() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("fields");
        let _registry = FieldRegistry::open(&root).build().await.unwrap();
        assert!(root.join("definitions").is_dir());
        assert!(root.join("layouts").is_dir());
    }

    #[tokio::test]
    async fn open_empty_directory() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("fields");
        let registry = FieldRegistry::open(&root).build().await.unwrap();
        assert!(registry.all_fields().is_empty());
        assert!(registry.all_layouts().is_empty());
    }

    #[tokio::test]
    async fn write_and_read_field() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("fields");
        let mut registry = FieldRegistry::open(&root).build().await.unwrap();

        let field = make_test_field("title");
        let id = field.id;
        registry.write_field(&field).await.unwrap();

        assert_eq!(registry.all_fields().len(), 1);
        assert_eq!(registry.field_by_handle("title").unwrap().id, id);
        assert_eq!(registry.field_by_id(&id).unwrap().handle, "title");
        assert_eq!(registry.resolve_handle_to_id("title"), Some(id));

        assert!(root.join("definitions/title.yaml").exists());
    }

    #[tokio::test]
    async fn write_field_update_preserves_id() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("fields");
        let mut registry = FieldRegistry::open(&root).build().await.unwrap();

        let mut field = make_test_field("title");
        let id = field.id;
        registry.write_field(&field).await.unwrap();

        field.instructions = Some("Updated".into());
        registry.write_field(&field).await.unwrap();

        assert_eq!(registry.all_fields().len(), 1);
        assert_eq!(
            registry.field_by_id(&id).unwrap().instructions,
            Some("Updated".into())
        );
    }

    #[tokio::test]
    async fn write_field_rehandle() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("fields");
        let mut registry = FieldRegistry::open(&root).build().await.unwrap();

        let mut field = make_test_field("title");
        let id = field.id;
        registry.write_field(&field).await.unwrap();

        field.handle = "heading".into();
        registry.write_field(&field).await.unwrap();

        assert_eq!(registry.all_fields().len(), 1);
        assert!(registry.field_by_handle("title").is_none());
        assert_eq!(registry.field_by_handle("heading").unwrap().id, id);
        assert!(!root.join("definitions/title.yaml").exists());
        assert!(root.join("definitions/heading.yaml").exists());
    }

    #[tokio::test]
    async fn write_field_duplicate_handle_errors() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("fields");
        let mut registry = FieldRegistry::open(&root).build().await.unwrap();

        registry.write_field(&make_test_field("title")).await.unwrap();

        let clash = make_test_field("title");
        let result = registry.write_field(&clash).await;
        assert!(matches!(
            result,
            Err(FieldsError::DuplicateHandle { .. })
        ));
        assert_eq!(registry.all_fields().len(), 1);
    }

    #[tokio::test]
    async fn delete_field() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("fields");
        let mut registry = FieldRegistry::open(&root).build().await.unwrap();

        let field = make_test_field("title");
        let id = field.id;
        registry.write_field(&field).await.unwrap();
        registry.delete_field(&id).await.unwrap();

        assert!(registry.all_fields().is_empty());
        assert!(registry.field_by_handle("title").is_none());
        assert!(registry.field_by_id(&id).is_none());
        assert!(!root.join("definitions/title.yaml").exists());
    }

    #[tokio::test]
    async fn delete_nonexistent_field_errors() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("fields");
        let mut registry = FieldRegistry::open(&root).build().await.unwrap();

        let result = registry.delete_field(&Ulid::new()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn delete_middle_field_fixes_indexes() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("fields");
        let mut registry = FieldRegistry::open(&root).build().await.unwrap();

        let f1 = make_test_field("a");
        let f2 = make_test_field("b");
        let f3 = make_test_field("c");
        let id2 = f2.id;

        registry.write_field(&f1).await.unwrap();
        registry.write_field(&f2).await.unwrap();
        registry.write_field(&f3).await.unwrap();

        registry.delete_field(&id2).await.unwrap();

        assert_eq!(registry.all_fields().len(), 2);
        assert!(registry.field_by_handle("a").is_some());
        assert!(registry.field_by_handle("b").is_none());
        assert!(registry.field_by_handle("c").is_some());
    }

    #[tokio::test]
    async fn write_and_read_layout() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("fields");
        let mut registry = FieldRegistry::open(&root).build().await.unwrap();

        let layout = FieldLayout::new("article")
            .with_field("title", true)
            .with_field("body", false);
        registry.write_layout(&layout).await.unwrap();

        assert_eq!(registry.all_layouts().len(), 1);
        let loaded = registry.layout_for("article").unwrap();
        assert_eq!(loaded.fields.len(), 2);
        assert!(loaded.fields[0].required);
    }

    #[tokio::test]
    async fn fields_for_layout_resolves_in_order() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("fields");
        let mut registry = FieldRegistry::open(&root).build().await.unwrap();

        registry.write_field(&make_test_field("title")).await.unwrap();
        registry.write_field(&make_test_field("body")).await.unwrap();

        let layout = FieldLayout::new("article")
            .with_field("body", false)
            .with_field("title", true)
            .with_field("missing", true);
        registry.write_layout(&layout).await.unwrap();

        let resolved = registry.fields_for_layout(&layout);
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].0.handle, "body");
        assert!(!resolved[0].1);
        assert_eq!(resolved[1].0.handle, "title");
        assert!(resolved[1].1);
    }

    #[tokio::test]
    async fn persistence_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("fields");

        {
            let mut registry = FieldRegistry::open(&root).build().await.unwrap();
            registry.write_field(&make_test_field("title")).await.unwrap();
            registry.write_field(&make_test_field("body")).await.unwrap();
            registry
                .write_layout(
                    &FieldLayout::new("article")
                        .with_field("title", true)
                        .with_field("body", false),
                )
                .await
                .unwrap();
        }

        let registry = FieldRegistry::open(&root).build().await.unwrap();
        assert_eq!(registry.all_fields().len(), 2);
        assert!(registry.field_by_handle("title").is_some());
        assert!(registry.field_by_handle("body").is_some());
        assert_eq!(registry.all_layouts().len(), 1);
        assert!(registry.layout_for("article").is_some());
    }

    #[tokio::test]
    async fn first_open_seeds_all_defaults() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("fields");

        let registry = FieldRegistry::open(&root)
            .with_defaults(sample_defaults())
            .build()
            .await
            .unwrap();

        assert_eq!(registry.all_fields().len(), 2);
        assert!(registry.field_by_handle("title").is_some());
        assert!(registry.field_by_handle("body").is_some());
        assert!(registry.layout_for("article").is_some());

        assert!(root.join("definitions/title.yaml").exists());
        assert!(root.join("definitions/body.yaml").exists());
        assert!(root.join("layouts/article.yaml").exists());
    }

    #[tokio::test]
    async fn subsequent_open_skips_existing() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("fields");

        let _registry = FieldRegistry::open(&root)
            .with_defaults(sample_defaults())
            .build()
            .await
            .unwrap();

        let registry = FieldRegistry::open(&root)
            .with_defaults(sample_defaults())
            .build()
            .await
            .unwrap();

        assert_eq!(registry.all_fields().len(), 2);
        assert_eq!(registry.all_layouts().len(), 1);
    }

    #[tokio::test]
    async fn user_modified_definitions_preserved() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("fields");

        let title_id = Ulid::from_string("00000000000000000000000001").unwrap();

        let mut registry = FieldRegistry::open(&root)
            .with_defaults(sample_defaults())
            .build()
            .await
            .unwrap();

        // User renames "title" to "heading"
        let mut title = registry.field_by_id(&title_id).unwrap().clone();
        title.handle = "heading".into();
        registry.write_field(&title).await.unwrap();
        drop(registry);

        // Reopen with defaults — renamed field must NOT be overwritten
        let registry = FieldRegistry::open(&root)
            .with_defaults(sample_defaults())
            .build()
            .await
            .unwrap();

        assert!(registry.field_by_handle("heading").is_some());
        assert!(registry.field_by_handle("title").is_none());
        assert_eq!(registry.field_by_id(&title_id).unwrap().handle, "heading");
    }
}
