//! Catalog trait definition.
//!
//! Both catalog strategies (write-back cache and write-through) implement
//! this trait, so callers don't need to know when data reaches the store.

use super::events::CatalogListener;
use super::models::{MediaItem, Tag, TagType};
use super::state::filter_items_by_tags;
use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet};

/// The three-map media catalog with its referential-integrity rules.
///
/// Blank keys are never an error: mutations with a blank key do nothing and
/// reads return `false`/`None`. Removing a missing key is a no-op. Errors are
/// only returned when the backing store fails.
pub trait Catalog {
    // =========================================================================
    // Catalog-wide values
    // =========================================================================

    /// The version marker of the loaded catalog.
    fn version(&self) -> Result<String>;

    /// The tag type copied into tag types auto-created by `put_tag`.
    fn default_tag_type(&self) -> Result<TagType>;

    /// Changes the default tag type. Existing tags keep their tag types.
    fn set_default_tag_type(&mut self, tag_type: TagType) -> Result<()>;

    // =========================================================================
    // Media items
    // =========================================================================

    /// Inserts or fully replaces an item. Tags named by the item that don't
    /// exist yet are created untyped.
    fn put_item(&mut self, key: &str, item: MediaItem) -> Result<()>;

    fn remove_item(&mut self, key: &str) -> Result<()>;

    fn has_item(&self, key: &str) -> Result<bool>;

    fn get_item(&self, key: &str) -> Result<Option<MediaItem>>;

    fn get_all_items(&self) -> Result<BTreeMap<String, MediaItem>>;

    /// Items tagged with every tag in `include` and with none in `exclude`.
    fn get_items_by_tags(
        &self,
        include: &BTreeSet<String>,
        exclude: &BTreeSet<String>,
    ) -> Result<BTreeMap<String, MediaItem>> {
        let items = self.get_all_items()?;
        Ok(filter_items_by_tags(&items, include, exclude))
    }

    // =========================================================================
    // Tags
    // =========================================================================

    /// Inserts or fully replaces a tag. A tag type named by the tag that
    /// doesn't exist yet is created with the current default tag type.
    fn put_tag(&mut self, name: &str, tag: Tag) -> Result<()>;

    /// Removes a tag and detaches it from every item holding it.
    fn remove_tag(&mut self, name: &str) -> Result<()>;

    fn has_tag(&self, name: &str) -> Result<bool>;

    fn get_tag(&self, name: &str) -> Result<Option<Tag>>;

    fn get_all_tags(&self) -> Result<BTreeMap<String, Tag>>;

    // =========================================================================
    // Tag types
    // =========================================================================

    fn put_tag_type(&mut self, name: &str, tag_type: TagType) -> Result<()>;

    /// Removes a tag type and clears it from every tag using it.
    fn remove_tag_type(&mut self, name: &str) -> Result<()>;

    fn has_tag_type(&self, name: &str) -> Result<bool>;

    fn get_tag_type(&self, name: &str) -> Result<Option<TagType>>;

    fn get_all_tag_types(&self) -> Result<BTreeMap<String, TagType>>;

    // =========================================================================
    // Extra data
    // =========================================================================

    fn put_extra(&mut self, key: &str, value: &str) -> Result<()>;

    fn remove_extra(&mut self, key: &str) -> Result<()>;

    fn has_extra(&self, key: &str) -> Result<bool>;

    fn get_extra(&self, key: &str) -> Result<Option<String>>;

    fn get_all_extra(&self) -> Result<BTreeMap<String, String>>;

    // =========================================================================
    // Persistence and events
    // =========================================================================

    /// Makes every change so far durable in the backing store.
    fn commit(&mut self) -> Result<()>;

    /// Registers a listener for the events emitted by mutating calls.
    fn subscribe(&mut self, listener: CatalogListener);
}
