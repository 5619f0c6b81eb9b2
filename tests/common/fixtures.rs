//! Sample catalog content and store helpers

use super::constants::*;
use anyhow::Result;
use pezzottify_library::catalog::{
    Catalog, CatalogConfig, CatalogEvent, MediaItem, MediaItemChange, Tag, TagChange, TagType,
};
use pezzottify_library::store::{open_store, BackingStore, StoreKind};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Builds an item with a few metadata fields set and the given tags.
pub fn tagged_item(key: &str, tags: &[&str]) -> MediaItem {
    MediaItem::new(key, 180_000).mutate(
        MediaItemChange::default()
            .artist(Some("The Test Band".to_string()))
            .album(Some("First Album".to_string()))
            .track_number(Some(1))
            .year(Some(1999))
            .tags(tags.iter().copied()),
    )
}

/// Fills a catalog with 2 tag types, 4 tags and 3 items.
pub fn populate_catalog(catalog: &mut dyn Catalog) -> Result<()> {
    catalog.put_tag_type(TYPE_GENRE, TagType::new(GENRE_COLOR))?;
    catalog.put_tag_type(TYPE_MOOD, TagType::new(MOOD_COLOR))?;
    catalog.put_tag(TAG_ROCK, Tag::with_type(TYPE_GENRE))?;
    catalog.put_tag(
        TAG_JAZZ,
        Tag::with_type(TYPE_GENRE).mutate(TagChange::default().description(Some("Swing".into()))),
    )?;
    catalog.put_tag(TAG_CHILL, Tag::with_type(TYPE_MOOD))?;
    catalog.put_item(ITEM_1, tagged_item(ITEM_1, &[TAG_ROCK, TAG_LIVE]))?;
    catalog.put_item(ITEM_2, tagged_item(ITEM_2, &[TAG_JAZZ, TAG_CHILL]))?;
    catalog.put_item(ITEM_3, tagged_item(ITEM_3, &[TAG_ROCK]))?;
    catalog.put_extra("owner", "tester")?;
    Ok(())
}

/// Opens a store of `kind` in `dir`, with the default catalog config.
pub fn open_backing_store(kind: StoreKind, dir: &Path) -> Result<Box<dyn BackingStore>> {
    let file_name = match kind {
        StoreKind::Json => "catalog.json",
        StoreKind::Sqlite => "catalog.db",
        StoreKind::Memory => "unused",
    };
    open_store(kind, &dir.join(file_name), &CatalogConfig::default())
}

/// Collects the events emitted by a catalog.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<CatalogEvent>>>,
}

impl EventLog {
    pub fn attach(&self, catalog: &mut dyn Catalog) {
        let events = self.events.clone();
        catalog.subscribe(Box::new(move |event: &CatalogEvent| {
            events.lock().unwrap().push(event.clone());
        }));
    }

    pub fn take(&self) -> Vec<CatalogEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}
