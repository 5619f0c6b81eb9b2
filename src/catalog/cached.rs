//! Write-back catalog cache.
//!
//! Holds the whole catalog in memory. Mutations are visible immediately and
//! are queued as store operations, nothing reaches the store before
//! [`Catalog::commit`]. Not thread safe: wrap it in a lock to share it.

use super::events::{CatalogListener, EventBus};
use super::models::{MediaItem, Tag, TagType};
use super::state::CatalogState;
use super::trait_def::Catalog;
use super::{is_blank, normalize_item, normalize_tag, warn_on_version_mismatch, CatalogConfig};
use crate::store::{BackingStore, UpdateBatch, UpdateOp};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use tracing::{debug, info};

pub struct CachedCatalog {
    store: Box<dyn BackingStore>,
    config: CatalogConfig,
    state: CatalogState,
    pending: UpdateBatch,
    events: EventBus,
}

impl CachedCatalog {
    /// Loads the full content of `store` into memory.
    pub fn load(store: Box<dyn BackingStore>, config: CatalogConfig) -> Result<Self> {
        let state = store
            .snapshot()
            .context("Failed to load catalog from backing store")?;
        warn_on_version_mismatch(&state.version, &config);
        info!(
            "Loaded catalog: {} items, {} tags, {} tag types",
            state.items.len(),
            state.tags.len(),
            state.tag_types.len()
        );
        Ok(Self {
            store,
            config,
            state,
            pending: UpdateBatch::new(),
            events: EventBus::default(),
        })
    }

    /// Number of operations waiting for the next commit.
    pub fn pending_operations(&self) -> usize {
        self.pending.len()
    }

    /// The wrapped store. It only reflects changes up to the last commit.
    pub fn store(&self) -> &dyn BackingStore {
        self.store.as_ref()
    }

    /// The in-memory catalog, including uncommitted changes.
    pub fn state(&self) -> &CatalogState {
        &self.state
    }

    /// Drops every uncommitted change and reloads the catalog from the store.
    pub fn discard_pending(&mut self) -> Result<()> {
        let state = self
            .store
            .snapshot()
            .context("Failed to reload catalog from backing store")?;
        warn_on_version_mismatch(&state.version, &self.config);
        if !self.pending.is_empty() {
            info!("Discarding {} pending catalog operations", self.pending.len());
        }
        self.state = state;
        self.pending.clear();
        Ok(())
    }

    fn record(&mut self, op: UpdateOp) {
        let events = self.state.apply(&op);
        debug!("Queued {} ({} pending)", op.kind(), self.pending.len() + 1);
        self.pending.push(op);
        self.events.emit(&events);
    }
}

impl Catalog for CachedCatalog {
    fn version(&self) -> Result<String> {
        Ok(self.state.version.clone())
    }

    fn default_tag_type(&self) -> Result<TagType> {
        Ok(self.state.default_tag_type)
    }

    fn set_default_tag_type(&mut self, tag_type: TagType) -> Result<()> {
        self.record(UpdateOp::SetDefaultTagType(tag_type));
        Ok(())
    }

    fn put_item(&mut self, key: &str, item: MediaItem) -> Result<()> {
        if is_blank(key) {
            return Ok(());
        }
        self.record(UpdateOp::PutItem {
            key: key.to_string(),
            item: normalize_item(item),
        });
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        if is_blank(key) {
            return Ok(());
        }
        self.record(UpdateOp::RemoveItem {
            key: key.to_string(),
        });
        Ok(())
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

    fn put_tag(&mut self, name: &str, tag: Tag) -> Result<()> {
        if is_blank(name) {
            return Ok(());
        }
        self.record(UpdateOp::PutTag {
            name: name.to_string(),
            tag: normalize_tag(tag),
        });
        Ok(())
    }

    fn remove_tag(&mut self, name: &str) -> Result<()> {
        if is_blank(name) {
            return Ok(());
        }
        self.record(UpdateOp::RemoveTag {
            name: name.to_string(),
        });
        Ok(())
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

    fn put_tag_type(&mut self, name: &str, tag_type: TagType) -> Result<()> {
        if is_blank(name) {
            return Ok(());
        }
        self.record(UpdateOp::PutTagType {
            name: name.to_string(),
            tag_type,
        });
        Ok(())
    }

    fn remove_tag_type(&mut self, name: &str) -> Result<()> {
        if is_blank(name) {
            return Ok(());
        }
        self.record(UpdateOp::RemoveTagType {
            name: name.to_string(),
        });
        Ok(())
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

    fn put_extra(&mut self, key: &str, value: &str) -> Result<()> {
        if is_blank(key) {
            return Ok(());
        }
        self.record(UpdateOp::PutExtra {
            key: key.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    fn remove_extra(&mut self, key: &str) -> Result<()> {
        if is_blank(key) {
            return Ok(());
        }
        self.record(UpdateOp::RemoveExtra {
            key: key.to_string(),
        });
        Ok(())
    }

    fn has_extra(&self, key: &str) -> Result<bool> {
        Ok(self.state.extra_data.contains_key(key))
    }

    fn get_extra(&self, key: &str) -> Result<Option<String>> {
        Ok(self.state.extra_data.get(key).cloned())
    }

    fn get_all_extra(&self) -> Result<BTreeMap<String, String>> {
        Ok(self.state.extra_data.clone())
    }

    /// Flushes the pending operations in one store round-trip. On failure
    /// the in-memory state and the queue are kept, so the commit can be
    /// retried.
    fn commit(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        self.store.commit(&self.pending).with_context(|| {
            format!(
                "Failed to commit {} catalog operations",
                self.pending.len()
            )
        })?;
        info!("Committed {} catalog operations", self.pending.len());
        self.pending.clear();
        Ok(())
    }

    fn subscribe(&mut self, listener: CatalogListener) {
        self.events.subscribe(listener);
    }
}
