//! Write-through catalog.
//!
//! Every call goes straight to the backing store and every mutation is
//! committed on its own, so reads always reflect the store's current state.

use super::events::{CatalogEvent, CatalogListener, EventBus};
use super::models::{MediaItem, Tag, TagType};
use super::state::CatalogState;
use super::trait_def::Catalog;
use super::{is_blank, normalize_item, normalize_tag, warn_on_version_mismatch, CatalogConfig};
use crate::store::{BackingStore, UpdateOp};
use anyhow::Result;
use std::collections::BTreeMap;

pub struct StoreCatalog {
    store: Box<dyn BackingStore>,
    events: EventBus,
}

impl StoreCatalog {
    pub fn open(store: Box<dyn BackingStore>, config: &CatalogConfig) -> Result<Self> {
        warn_on_version_mismatch(&store.version()?, config);
        Ok(Self {
            store,
            events: EventBus::default(),
        })
    }

    pub fn store(&self) -> &dyn BackingStore {
        self.store.as_ref()
    }

    fn submit(&mut self, op: UpdateOp) -> Result<()> {
        let events = if self.events.has_listeners() {
            self.preview(&op)?
        } else {
            Vec::new()
        };
        self.store.updater().op(op).commit()?;
        self.events.emit(&events);
        Ok(())
    }

    /// Computes the events `op` will produce by applying it to a scratch
    /// state holding only the entries the operation can touch.
    fn preview(&self, op: &UpdateOp) -> Result<Vec<CatalogEvent>> {
        let mut scratch = CatalogState::new(String::new(), self.store.default_tag_type()?);
        match op {
            UpdateOp::PutItem { item, .. } => {
                for tag_name in item.tags.iter() {
                    if let Some(tag) = self.store.get_tag(tag_name)? {
                        scratch.tags.insert(tag_name.clone(), tag);
                    }
                }
            }
            UpdateOp::RemoveItem { key } => {
                if let Some(item) = self.store.get_item(key)? {
                    scratch.items.insert(key.clone(), item);
                }
            }
            UpdateOp::PutTag { tag, .. } => {
                if let Some(type_name) = &tag.tag_type {
                    if let Some(tag_type) = self.store.get_tag_type(type_name)? {
                        scratch.tag_types.insert(type_name.clone(), tag_type);
                    }
                }
            }
            UpdateOp::RemoveTag { name } => {
                if let Some(tag) = self.store.get_tag(name)? {
                    scratch.tags.insert(name.clone(), tag);
                    scratch.items = self.store.get_all_items()?;
                }
            }
            UpdateOp::RemoveTagType { name } => {
                if let Some(tag_type) = self.store.get_tag_type(name)? {
                    scratch.tag_types.insert(name.clone(), tag_type);
                    scratch.tags = self.store.get_all_tags()?;
                }
            }
            UpdateOp::RemoveExtra { key } => {
                if let Some(value) = self.store.get_extra(key)? {
                    scratch.extra_data.insert(key.clone(), value);
                }
            }
            UpdateOp::SetDefaultTagType(_)
            | UpdateOp::PutTagType { .. }
            | UpdateOp::PutExtra { .. } => {}
        }
        Ok(scratch.apply(op))
    }
}

impl Catalog for StoreCatalog {
    fn version(&self) -> Result<String> {
        self.store.version()
    }

    fn default_tag_type(&self) -> Result<TagType> {
        self.store.default_tag_type()
    }

    fn set_default_tag_type(&mut self, tag_type: TagType) -> Result<()> {
        self.submit(UpdateOp::SetDefaultTagType(tag_type))
    }

    fn put_item(&mut self, key: &str, item: MediaItem) -> Result<()> {
        if is_blank(key) {
            return Ok(());
        }
        self.submit(UpdateOp::PutItem {
            key: key.to_string(),
            item: normalize_item(item),
        })
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        if is_blank(key) {
            return Ok(());
        }
        self.submit(UpdateOp::RemoveItem {
            key: key.to_string(),
        })
    }

    fn has_item(&self, key: &str) -> Result<bool> {
        if is_blank(key) {
            return Ok(false);
        }
        self.store.has_item(key)
    }

    fn get_item(&self, key: &str) -> Result<Option<MediaItem>> {
        if is_blank(key) {
            return Ok(None);
        }
        self.store.get_item(key)
    }

    fn get_all_items(&self) -> Result<BTreeMap<String, MediaItem>> {
        self.store.get_all_items()
    }

    fn put_tag(&mut self, name: &str, tag: Tag) -> Result<()> {
        if is_blank(name) {
            return Ok(());
        }
        self.submit(UpdateOp::PutTag {
            name: name.to_string(),
            tag: normalize_tag(tag),
        })
    }

    fn remove_tag(&mut self, name: &str) -> Result<()> {
        if is_blank(name) {
            return Ok(());
        }
        self.submit(UpdateOp::RemoveTag {
            name: name.to_string(),
        })
    }

    fn has_tag(&self, name: &str) -> Result<bool> {
        if is_blank(name) {
            return Ok(false);
        }
        self.store.has_tag(name)
    }

    fn get_tag(&self, name: &str) -> Result<Option<Tag>> {
        if is_blank(name) {
            return Ok(None);
        }
        self.store.get_tag(name)
    }

    fn get_all_tags(&self) -> Result<BTreeMap<String, Tag>> {
        self.store.get_all_tags()
    }

    fn put_tag_type(&mut self, name: &str, tag_type: TagType) -> Result<()> {
        if is_blank(name) {
            return Ok(());
        }
        self.submit(UpdateOp::PutTagType {
            name: name.to_string(),
            tag_type,
        })
    }

    fn remove_tag_type(&mut self, name: &str) -> Result<()> {
        if is_blank(name) {
            return Ok(());
        }
        self.submit(UpdateOp::RemoveTagType {
            name: name.to_string(),
        })
    }

    fn has_tag_type(&self, name: &str) -> Result<bool> {
        if is_blank(name) {
            return Ok(false);
        }
        self.store.has_tag_type(name)
    }

    fn get_tag_type(&self, name: &str) -> Result<Option<TagType>> {
        if is_blank(name) {
            return Ok(None);
        }
        self.store.get_tag_type(name)
    }

    fn get_all_tag_types(&self) -> Result<BTreeMap<String, TagType>> {
        self.store.get_all_tag_types()
    }

    fn put_extra(&mut self, key: &str, value: &str) -> Result<()> {
        if is_blank(key) {
            return Ok(());
        }
        self.submit(UpdateOp::PutExtra {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    fn remove_extra(&mut self, key: &str) -> Result<()> {
        if is_blank(key) {
            return Ok(());
        }
        self.submit(UpdateOp::RemoveExtra {
            key: key.to_string(),
        })
    }

    fn has_extra(&self, key: &str) -> Result<bool> {
        if is_blank(key) {
            return Ok(false);
        }
        Ok(self.store.get_extra(key)?.is_some())
    }

    fn get_extra(&self, key: &str) -> Result<Option<String>> {
        if is_blank(key) {
            return Ok(None);
        }
        self.store.get_extra(key)
    }

    fn get_all_extra(&self) -> Result<BTreeMap<String, String>> {
        self.store.get_all_extra()
    }

    // Every mutation is already committed.
    fn commit(&mut self) -> Result<()> {
        Ok(())
    }

    fn subscribe(&mut self, listener: CatalogListener) {
        self.events.subscribe(listener);
    }
}
