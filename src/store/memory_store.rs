//! In-memory backing store.
//!
//! Keeps a [`CatalogState`] and nothing else. Useful for tests and for
//! catalogs that don't need to outlive the process; it is also the read side
//! of the JSON file store.

use super::trait_def::BackingStore;
use super::update::{UpdateBatch, Updater};
use crate::catalog::{CatalogConfig, CatalogState, MediaItem, Tag, TagType};
use anyhow::Result;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct MemoryStore {
    state: CatalogState,
}

impl MemoryStore {
    /// Creates an empty store with the configured version and default tag type.
    pub fn new(config: &CatalogConfig) -> Self {
        Self {
            state: CatalogState::new(config.expected_version.clone(), config.default_tag_type),
        }
    }

    pub fn from_state(state: CatalogState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &CatalogState {
        &self.state
    }

    /// Returns the state the batch would produce, leaving the store untouched.
    pub(crate) fn staged(&self, batch: &UpdateBatch) -> CatalogState {
        let mut next = self.state.clone();
        next.apply_all(batch.ops());
        next
    }

    pub(crate) fn replace(&mut self, state: CatalogState) {
        self.state = state;
    }
}

impl BackingStore for MemoryStore {
    fn version(&self) -> Result<String> {
        Ok(self.state.version.clone())
    }

    fn default_tag_type(&self) -> Result<TagType> {
        Ok(self.state.default_tag_type)
    }

    fn has_item(&self, key: &str) -> Result<bool> {
        Ok(self.state.items.contains_key(key))
    }

    fn get_item(&self, key: &str) -> Result<Option<MediaItem>> {
        Ok(self.state.items.get(key).cloned())
    }

    fn get_all_items(&self) -> Result<BTreeMap<String, MediaItem>> {
        Ok(self.state.items.clone())
    }

    fn has_tag(&self, name: &str) -> Result<bool> {
        Ok(self.state.tags.contains_key(name))
    }

    fn get_tag(&self, name: &str) -> Result<Option<Tag>> {
        Ok(self.state.tags.get(name).cloned())
    }

    fn get_all_tags(&self) -> Result<BTreeMap<String, Tag>> {
        Ok(self.state.tags.clone())
    }

    fn has_tag_type(&self, name: &str) -> Result<bool> {
        Ok(self.state.tag_types.contains_key(name))
    }

    fn get_tag_type(&self, name: &str) -> Result<Option<TagType>> {
        Ok(self.state.tag_types.get(name).copied())
    }

    fn get_all_tag_types(&self) -> Result<BTreeMap<String, TagType>> {
        Ok(self.state.tag_types.clone())
    }

    fn get_extra(&self, key: &str) -> Result<Option<String>> {
        Ok(self.state.extra_data.get(key).cloned())
    }

    fn get_all_extra(&self) -> Result<BTreeMap<String, String>> {
        Ok(self.state.extra_data.clone())
    }

    fn commit(&mut self, batch: &UpdateBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let next = self.staged(batch);
        self.replace(next);
        debug!("Applied {} operations to memory store", batch.len());
        Ok(())
    }

    fn updater(&mut self) -> Updater<'_> {
        Updater::new(self)
    }

    fn snapshot(&self) -> Result<CatalogState> {
        Ok(self.state.clone())
    }
}
