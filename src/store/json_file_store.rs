//! Single-file JSON backing store.
//!
//! The whole catalog is one JSON document. Each commit rewrites it through a
//! temporary file in the same directory, renamed over the old one, so a
//! failed commit leaves the previous file intact.

use super::memory_store::MemoryStore;
use super::trait_def::BackingStore;
use super::update::{UpdateBatch, Updater};
use crate::catalog::{CatalogConfig, CatalogState, MediaItem, Tag, TagType};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

pub struct JsonFileStore {
    file_path: PathBuf,
    inner: MemoryStore,
}

impl JsonFileStore {
    /// Opens the catalog file at `file_path`, creating it from `config` when
    /// it doesn't exist yet.
    pub fn open<P: AsRef<Path>>(file_path: P, config: &CatalogConfig) -> Result<Self> {
        let file_path = file_path.as_ref().to_path_buf();

        let state = if file_path.exists() {
            let content = std::fs::read_to_string(&file_path)
                .with_context(|| format!("Failed to read catalog file {:?}", file_path))?;
            let state: CatalogState = serde_json::from_str(&content)
                .with_context(|| format!("Catalog file {:?} is malformed", file_path))?;
            for problem in state.integrity_problems() {
                warn!("Catalog file {:?}: {}", file_path, problem);
            }
            info!(
                "Opened catalog file {:?}: {} items, {} tags",
                file_path,
                state.items.len(),
                state.tags.len()
            );
            state
        } else {
            let state = CatalogState::new(config.expected_version.clone(), config.default_tag_type);
            write_state(&file_path, &state)?;
            info!("Created catalog file {:?}", file_path);
            state
        };

        Ok(Self {
            file_path,
            inner: MemoryStore::from_state(state),
        })
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

fn write_state(file_path: &Path, state: &CatalogState) -> Result<()> {
    let parent = match file_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let json = serde_json::to_string_pretty(state).context("Failed to serialize catalog")?;

    let mut tmp = NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temporary file in {:?}", parent))?;
    tmp.write_all(json.as_bytes())?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(file_path)
        .with_context(|| format!("Failed to replace catalog file {:?}", file_path))?;
    Ok(())
}

impl BackingStore for JsonFileStore {
    fn version(&self) -> Result<String> {
        self.inner.version()
    }

    fn default_tag_type(&self) -> Result<TagType> {
        self.inner.default_tag_type()
    }

    fn has_item(&self, key: &str) -> Result<bool> {
        self.inner.has_item(key)
    }

    fn get_item(&self, key: &str) -> Result<Option<MediaItem>> {
        self.inner.get_item(key)
    }

    fn get_all_items(&self) -> Result<BTreeMap<String, MediaItem>> {
        self.inner.get_all_items()
    }

    fn has_tag(&self, name: &str) -> Result<bool> {
        self.inner.has_tag(name)
    }

    fn get_tag(&self, name: &str) -> Result<Option<Tag>> {
        self.inner.get_tag(name)
    }

    fn get_all_tags(&self) -> Result<BTreeMap<String, Tag>> {
        self.inner.get_all_tags()
    }

    fn has_tag_type(&self, name: &str) -> Result<bool> {
        self.inner.has_tag_type(name)
    }

    fn get_tag_type(&self, name: &str) -> Result<Option<TagType>> {
        self.inner.get_tag_type(name)
    }

    fn get_all_tag_types(&self) -> Result<BTreeMap<String, TagType>> {
        self.inner.get_all_tag_types()
    }

    fn get_extra(&self, key: &str) -> Result<Option<String>> {
        self.inner.get_extra(key)
    }

    fn get_all_extra(&self) -> Result<BTreeMap<String, String>> {
        self.inner.get_all_extra()
    }

    fn commit(&mut self, batch: &UpdateBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let next = self.inner.staged(batch);
        write_state(&self.file_path, &next)?;
        self.inner.replace(next);
        debug!(
            "Wrote {} operations to catalog file {:?}",
            batch.len(),
            self.file_path
        );
        Ok(())
    }

    fn updater(&mut self) -> Updater<'_> {
        Updater::new(self)
    }

    fn snapshot(&self) -> Result<CatalogState> {
        self.inner.snapshot()
    }
}
