//! A memory store whose commits can be made to fail

use anyhow::{bail, Result};
use pezzottify_library::catalog::{CatalogConfig, CatalogState, MediaItem, Tag, TagType};
use pezzottify_library::store::{BackingStore, MemoryStore, UpdateBatch, Updater};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Wraps a [`MemoryStore`]. While `fail` is set every commit returns an
/// error and changes nothing. The handles stay usable after the store is
/// boxed and moved into a catalog.
pub struct FlakyStore {
    inner: MemoryStore,
    fail: Arc<AtomicBool>,
    commits: Arc<AtomicUsize>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(&CatalogConfig::default()),
            fail: Arc::new(AtomicBool::new(false)),
            commits: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn fail_handle(&self) -> Arc<AtomicBool> {
        self.fail.clone()
    }

    /// Counts successful commits.
    pub fn commit_counter(&self) -> Arc<AtomicUsize> {
        self.commits.clone()
    }
}

impl BackingStore for FlakyStore {
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
        if self.fail.load(Ordering::SeqCst) {
            bail!("Injected commit failure");
        }
        self.inner.commit(batch)?;
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn updater(&mut self) -> Updater<'_> {
        Updater::new(self)
    }

    fn snapshot(&self) -> Result<CatalogState> {
        self.inner.snapshot()
    }
}
