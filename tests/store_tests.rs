//! Backing stores and the write-through catalog

mod common;

use common::*;
use pezzottify_library::catalog::{
    CachedCatalog, Catalog, CatalogConfig, MediaItem, StoreCatalog, Tag, TagType,
};
use pezzottify_library::store::{
    BackingStore, JsonFileStore, MemoryStore, SqliteStore, StoreKind, UpdateBatch, UpdateOp,
};
use tempfile::TempDir;

fn sample_batch() -> UpdateBatch {
    let mut batch = UpdateBatch::new();
    batch.push(UpdateOp::PutTagType {
        name: TYPE_GENRE.to_string(),
        tag_type: TagType::new(GENRE_COLOR),
    });
    batch.push(UpdateOp::PutTag {
        name: TAG_ROCK.to_string(),
        tag: Tag::with_type(TYPE_GENRE),
    });
    batch.push(UpdateOp::PutTag {
        name: TAG_CHILL.to_string(),
        tag: Tag::with_type(TYPE_MOOD),
    });
    batch.push(UpdateOp::PutItem {
        key: ITEM_1.to_string(),
        item: tagged_item(ITEM_1, &[TAG_ROCK, TAG_LIVE]),
    });
    batch.push(UpdateOp::PutItem {
        key: ITEM_2.to_string(),
        item: tagged_item(ITEM_2, &[TAG_CHILL, TAG_ROCK]),
    });
    batch.push(UpdateOp::SetDefaultTagType(TagType::new(3)));
    batch.push(UpdateOp::PutTag {
        name: TAG_JAZZ.to_string(),
        tag: Tag::with_type("style"),
    });
    batch.push(UpdateOp::RemoveTag {
        name: TAG_ROCK.to_string(),
    });
    batch.push(UpdateOp::RemoveTagType {
        name: TYPE_MOOD.to_string(),
    });
    batch.push(UpdateOp::PutExtra {
        key: "k".to_string(),
        value: "v".to_string(),
    });
    batch.push(UpdateOp::RemoveItem {
        key: "never-existed".to_string(),
    });
    batch
}

#[test]
fn test_backends_agree_on_same_batch() {
    let temp_dir = TempDir::new().unwrap();
    let config = CatalogConfig::default();
    let batch = sample_batch();

    let mut stores: Vec<Box<dyn BackingStore>> = vec![
        Box::new(MemoryStore::new(&config)),
        Box::new(JsonFileStore::open(temp_dir.path().join("c.json"), &config).unwrap()),
        Box::new(SqliteStore::open(temp_dir.path().join("c.db"), &config).unwrap()),
    ];
    for store in stores.iter_mut() {
        store.commit(&batch).unwrap();
    }

    let expected = stores[0].snapshot().unwrap();
    assert!(expected.integrity_problems().is_empty());
    assert!(!expected.tags.contains_key(TAG_ROCK));
    assert_eq!(expected.tag_types.get("style"), Some(&TagType::new(3)));
    assert_eq!(expected.tags.get(TAG_CHILL), Some(&Tag::new()));
    for store in stores.iter().skip(1) {
        assert_eq!(store.snapshot().unwrap(), expected);
    }
}

#[test]
fn test_updater_commits_in_one_batch() {
    for kind in [StoreKind::Json, StoreKind::Sqlite] {
        let temp_dir = TempDir::new().unwrap();
        let mut store = open_backing_store(kind, temp_dir.path()).unwrap();

        let updater = store
            .updater()
            .put_tag_type(TYPE_GENRE, TagType::new(GENRE_COLOR))
            .put_item(ITEM_1, tagged_item(ITEM_1, &[TAG_ROCK]))
            .put_tag(TAG_ROCK, Tag::with_type(TYPE_GENRE));
        assert_eq!(updater.len(), 3);
        updater.commit().unwrap();

        assert!(store.has_item(ITEM_1).unwrap());
        assert_eq!(
            store.get_tag(TAG_ROCK).unwrap().unwrap().tag_type.as_deref(),
            Some(TYPE_GENRE)
        );
        assert_eq!(store.get_all_tag_types().unwrap().len(), 1);
    }
}

#[test]
fn test_stores_survive_reopen() {
    for kind in [StoreKind::Json, StoreKind::Sqlite] {
        let temp_dir = TempDir::new().unwrap();
        let batch = sample_batch();
        let expected = {
            let mut store = open_backing_store(kind, temp_dir.path()).unwrap();
            store.commit(&batch).unwrap();
            store.snapshot().unwrap()
        };
        let store = open_backing_store(kind, temp_dir.path()).unwrap();
        assert_eq!(store.snapshot().unwrap(), expected);
    }
}

#[test]
fn test_write_through_persists_each_call() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("catalog.json");
    let config = CatalogConfig::default();
    let store = JsonFileStore::open(&path, &config).unwrap();
    let mut catalog = StoreCatalog::open(Box::new(store), &config).unwrap();

    catalog.put_item(ITEM_1, tagged_item(ITEM_1, &[TAG_ROCK])).unwrap();
    let on_disk = JsonFileStore::open(&path, &config).unwrap();
    assert!(on_disk.has_item(ITEM_1).unwrap());
    assert!(on_disk.has_tag(TAG_ROCK).unwrap());

    catalog.remove_tag(TAG_ROCK).unwrap();
    let on_disk = JsonFileStore::open(&path, &config).unwrap();
    assert!(!on_disk.has_tag(TAG_ROCK).unwrap());
    assert!(on_disk.get_item(ITEM_1).unwrap().unwrap().tags.is_empty());

    // nothing left to flush
    catalog.commit().unwrap();
}

#[test]
fn test_write_through_blank_keys() {
    let config = CatalogConfig::default();
    let mut catalog = StoreCatalog::open(Box::new(MemoryStore::new(&config)), &config).unwrap();

    catalog.put_item(" ", MediaItem::new(" ", 1)).unwrap();
    catalog.put_extra("", "value").unwrap();
    assert!(!catalog.has_item(" ").unwrap());
    assert!(catalog.get_extra("").unwrap().is_none());
    assert!(catalog.get_all_items().unwrap().is_empty());
    assert!(catalog.get_all_extra().unwrap().is_empty());
}

#[test]
fn test_both_strategies_emit_same_events() {
    let temp_dir = TempDir::new().unwrap();
    let config = CatalogConfig::default();

    let mut cached =
        CachedCatalog::load(Box::new(MemoryStore::new(&config)), config.clone()).unwrap();
    let sqlite = SqliteStore::open(temp_dir.path().join("c.db"), &config).unwrap();
    let mut through = StoreCatalog::open(Box::new(sqlite), &config).unwrap();

    let cached_log = EventLog::default();
    let through_log = EventLog::default();
    cached_log.attach(&mut cached);
    through_log.attach(&mut through);

    let catalogs: [&mut dyn Catalog; 2] = [&mut cached, &mut through];
    for catalog in catalogs {
        populate_catalog(catalog).unwrap();
        catalog.remove_tag_type(TYPE_GENRE).unwrap();
        catalog.remove_tag(TAG_LIVE).unwrap();
        catalog.remove_tag(TAG_LIVE).unwrap();
        catalog.remove_item(ITEM_2).unwrap();
        catalog.remove_extra("owner").unwrap();
    }

    let events = cached_log.take();
    assert!(!events.is_empty());
    assert_eq!(through_log.take(), events);

    // items were built separately, so only their keys and tags can match
    cached.commit().unwrap();
    let cached_state = cached.store().snapshot().unwrap();
    let through_state = through.store().snapshot().unwrap();
    assert_eq!(cached_state.tags, through_state.tags);
    assert_eq!(cached_state.tag_types, through_state.tag_types);
    let item_tags = |state: &pezzottify_library::catalog::CatalogState| {
        state
            .items
            .iter()
            .map(|(key, item)| (key.clone(), item.tags.clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(item_tags(&cached_state), item_tags(&through_state));
}

#[test]
fn test_sqlite_rejects_foreign_database() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("other.db");
    {
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute("CREATE TABLE notes (body TEXT)", []).unwrap();
    }
    assert!(SqliteStore::open(&path, &CatalogConfig::default()).is_err());
}
