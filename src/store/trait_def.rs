//! BackingStore trait definition.

use super::update::{UpdateBatch, Updater};
use crate::catalog::{CatalogState, MediaItem, Tag, TagType};
use anyhow::Result;
use std::collections::BTreeMap;

/// Persistence boundary of a catalog.
///
/// Reads return `Ok(None)`/`Ok(false)` for missing keys, `Err` is reserved
/// for I/O failures and malformed data. Writes go through [`Updater`]:
/// queue operations, then commit them in a single round-trip.
///
/// Applying an operation must perform the same cascades as
/// [`CatalogState::apply`]:
/// - `PutItem` creates missing tags as untyped tags;
/// - `PutTag` creates a missing tag type with the current default tag type;
/// - `RemoveTag` removes the tag name from every item holding it;
/// - `RemoveTagType` clears the type of every tag that had it.
///
/// The write-back cache queues one operation per mutation and relies on the
/// store replicating these cascades when the batch is committed.
pub trait BackingStore: Send {
    fn version(&self) -> Result<String>;

    fn default_tag_type(&self) -> Result<TagType>;

    // =========================================================================
    // Media items
    // =========================================================================

    fn has_item(&self, key: &str) -> Result<bool>;

    fn get_item(&self, key: &str) -> Result<Option<MediaItem>>;

    fn get_all_items(&self) -> Result<BTreeMap<String, MediaItem>>;

    // =========================================================================
    // Tags
    // =========================================================================

    fn has_tag(&self, name: &str) -> Result<bool>;

    fn get_tag(&self, name: &str) -> Result<Option<Tag>>;

    fn get_all_tags(&self) -> Result<BTreeMap<String, Tag>>;

    // =========================================================================
    // Tag types
    // =========================================================================

    fn has_tag_type(&self, name: &str) -> Result<bool>;

    fn get_tag_type(&self, name: &str) -> Result<Option<TagType>>;

    fn get_all_tag_types(&self) -> Result<BTreeMap<String, TagType>>;

    // =========================================================================
    // Extra data
    // =========================================================================

    fn get_extra(&self, key: &str) -> Result<Option<String>>;

    fn get_all_extra(&self) -> Result<BTreeMap<String, String>>;

    // =========================================================================
    // Writes
    // =========================================================================

    /// Applies the batch in order, all or nothing. On error the previously
    /// committed state must still be readable.
    fn commit(&mut self, batch: &UpdateBatch) -> Result<()>;

    /// Starts a new update builder on this store.
    fn updater(&mut self) -> Updater<'_>;

    /// Reads the whole catalog.
    fn snapshot(&self) -> Result<CatalogState> {
        Ok(CatalogState {
            version: self.version()?,
            default_tag_type: self.default_tag_type()?,
            items: self.get_all_items()?,
            tags: self.get_all_tags()?,
            tag_types: self.get_all_tag_types()?,
            extra_data: self.get_all_extra()?,
        })
    }
}
