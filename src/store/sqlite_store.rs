//! SQLite-backed catalog store.
//!
//! Every commit runs in one transaction. Cascades are executed as explicit
//! statements inside that transaction, mirroring `CatalogState::apply`.

use super::schema::CATALOG_VERSIONED_SCHEMAS;
use super::trait_def::BackingStore;
use super::update::{UpdateBatch, UpdateOp, Updater};
use crate::catalog::{is_blank, normalize_item, normalize_tag, CatalogConfig, MediaItem, Tag, TagType};
use crate::sqlite_persistence::migrate_if_needed;
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, types::Type, Connection, Transaction};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info};

const VERSION_KEY: &str = "version";
const DEFAULT_TAG_TYPE_COLOR_KEY: &str = "default_tag_type_color";

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) the catalog database at `db_path`.
    pub fn open<P: AsRef<Path>>(db_path: P, config: &CatalogConfig) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref())
            .with_context(|| format!("Failed to open catalog database {:?}", db_path.as_ref()))?;
        Self::init(conn, config)
    }

    pub fn open_in_memory(config: &CatalogConfig) -> Result<Self> {
        Self::init(Connection::open_in_memory()?, config)
    }

    fn init(mut conn: Connection, config: &CatalogConfig) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrate_if_needed(&mut conn, CATALOG_VERSIONED_SCHEMAS)
            .context("Catalog database has an unexpected schema")?;

        conn.execute(
            "INSERT INTO catalog_info (key, value) VALUES (?1, ?2) ON CONFLICT(key) DO NOTHING",
            params![VERSION_KEY, config.expected_version],
        )?;
        conn.execute(
            "INSERT INTO catalog_info (key, value) VALUES (?1, ?2) ON CONFLICT(key) DO NOTHING",
            params![
                DEFAULT_TAG_TYPE_COLOR_KEY,
                config.default_tag_type.color.to_string()
            ],
        )?;

        let store = SqliteStore { conn };
        let item_count: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM media_items", [], |r| r.get(0))?;
        let tag_count: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM tags", [], |r| r.get(0))?;
        info!(
            "Opened SQLite catalog: {} items, {} tags",
            item_count, tag_count
        );
        Ok(store)
    }

    // =========================================================================
    // Internal Helper Methods
    // =========================================================================

    fn get_info(conn: &Connection, key: &str) -> Result<String> {
        conn.query_row(
            "SELECT value FROM catalog_info WHERE key = ?1",
            params![key],
            |r| r.get(0),
        )
        .with_context(|| format!("Catalog database is missing '{}'", key))
    }

    fn read_default_tag_type(conn: &Connection) -> Result<TagType> {
        let raw = Self::get_info(conn, DEFAULT_TAG_TYPE_COLOR_KEY)?;
        let color = raw
            .parse::<i32>()
            .with_context(|| format!("Malformed default tag type color '{}'", raw))?;
        Ok(TagType::new(color))
    }

    fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    }

    fn get_u64(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<u64> {
        let value: i64 = row.get(idx)?;
        u64::try_from(value).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(idx, value))
    }

    /// Parse a MediaItem from a row (key, title, artist, album, track_number,
    /// year, duration_ms, last_modified, play_count). Tags are filled later.
    fn parse_item_row(row: &rusqlite::Row) -> rusqlite::Result<(String, MediaItem)> {
        let last_modified: String = row.get(7)?;
        Ok((
            row.get(0)?,
            MediaItem {
                title: row.get(1)?,
                artist: row.get(2)?,
                album: row.get(3)?,
                track_number: row.get(4)?,
                year: row.get(5)?,
                duration_ms: Self::get_u64(row, 6)?,
                last_modified: Self::parse_timestamp(7, &last_modified)?,
                play_count: Self::get_u64(row, 8)?,
                tags: BTreeSet::new(),
            },
        ))
    }

    fn parse_tag_row(row: &rusqlite::Row) -> rusqlite::Result<(String, Tag)> {
        Ok((
            row.get(0)?,
            Tag {
                tag_type: row.get(1)?,
                description: row.get(2)?,
            },
        ))
    }

    fn get_item_tags(conn: &Connection, key: &str) -> Result<BTreeSet<String>> {
        let mut stmt =
            conn.prepare_cached("SELECT tag_name FROM media_item_tags WHERE item_key = ?1")?;
        let tags = stmt
            .query_map(params![key], |r| r.get(0))?
            .collect::<Result<BTreeSet<String>, _>>()?;
        Ok(tags)
    }

    fn exists(&self, sql: &str, key: &str) -> Result<bool> {
        match self.conn.query_row(sql, params![key], |_| Ok(())) {
            Ok(()) => Ok(true),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    // =========================================================================
    // Write Operations
    // =========================================================================

    fn apply_op(tx: &Transaction, op: &UpdateOp) -> Result<()> {
        match op {
            UpdateOp::SetDefaultTagType(tag_type) => {
                tx.execute(
                    "INSERT INTO catalog_info (key, value) VALUES (?1, ?2)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                    params![DEFAULT_TAG_TYPE_COLOR_KEY, tag_type.color.to_string()],
                )?;
            }
            UpdateOp::PutItem { key, item } => {
                if is_blank(key) {
                    return Ok(());
                }
                let item = normalize_item(item.clone());
                for tag_name in item.tags.iter() {
                    tx.execute(
                        "INSERT INTO tags (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
                        params![tag_name],
                    )?;
                }
                tx.execute(
                    "INSERT INTO media_items
                        (key, title, artist, album, track_number, year, duration_ms, last_modified, play_count)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                     ON CONFLICT(key) DO UPDATE SET
                        title = excluded.title,
                        artist = excluded.artist,
                        album = excluded.album,
                        track_number = excluded.track_number,
                        year = excluded.year,
                        duration_ms = excluded.duration_ms,
                        last_modified = excluded.last_modified,
                        play_count = excluded.play_count",
                    params![
                        key,
                        item.title,
                        item.artist,
                        item.album,
                        item.track_number,
                        item.year,
                        i64::try_from(item.duration_ms).context("duration_ms out of range")?,
                        item.last_modified.to_rfc3339_opts(SecondsFormat::AutoSi, true),
                        i64::try_from(item.play_count).context("play_count out of range")?,
                    ],
                )?;
                tx.execute(
                    "DELETE FROM media_item_tags WHERE item_key = ?1",
                    params![key],
                )?;
                for tag_name in item.tags.iter() {
                    tx.execute(
                        "INSERT INTO media_item_tags (item_key, tag_name) VALUES (?1, ?2)",
                        params![key, tag_name],
                    )?;
                }
            }
            UpdateOp::RemoveItem { key } => {
                tx.execute(
                    "DELETE FROM media_item_tags WHERE item_key = ?1",
                    params![key],
                )?;
                tx.execute("DELETE FROM media_items WHERE key = ?1", params![key])?;
            }
            UpdateOp::PutTag { name, tag } => {
                if is_blank(name) {
                    return Ok(());
                }
                let tag = normalize_tag(tag.clone());
                if let Some(type_name) = &tag.tag_type {
                    let default_tag_type = Self::read_default_tag_type(tx)?;
                    tx.execute(
                        "INSERT INTO tag_types (name, color) VALUES (?1, ?2)
                         ON CONFLICT(name) DO NOTHING",
                        params![type_name, default_tag_type.color],
                    )?;
                }
                tx.execute(
                    "INSERT INTO tags (name, tag_type, description) VALUES (?1, ?2, ?3)
                     ON CONFLICT(name) DO UPDATE SET
                        tag_type = excluded.tag_type,
                        description = excluded.description",
                    params![name, tag.tag_type, tag.description],
                )?;
            }
            UpdateOp::RemoveTag { name } => {
                tx.execute(
                    "DELETE FROM media_item_tags WHERE tag_name = ?1",
                    params![name],
                )?;
                tx.execute("DELETE FROM tags WHERE name = ?1", params![name])?;
            }
            UpdateOp::PutTagType { name, tag_type } => {
                if is_blank(name) {
                    return Ok(());
                }
                tx.execute(
                    "INSERT INTO tag_types (name, color) VALUES (?1, ?2)
                     ON CONFLICT(name) DO UPDATE SET color = excluded.color",
                    params![name, tag_type.color],
                )?;
            }
            UpdateOp::RemoveTagType { name } => {
                tx.execute(
                    "UPDATE tags SET tag_type = NULL WHERE tag_type = ?1",
                    params![name],
                )?;
                tx.execute("DELETE FROM tag_types WHERE name = ?1", params![name])?;
            }
            UpdateOp::PutExtra { key, value } => {
                if is_blank(key) {
                    return Ok(());
                }
                tx.execute(
                    "INSERT INTO extra_data (key, value) VALUES (?1, ?2)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                    params![key, value],
                )?;
            }
            UpdateOp::RemoveExtra { key } => {
                tx.execute("DELETE FROM extra_data WHERE key = ?1", params![key])?;
            }
        }
        Ok(())
    }
}

impl BackingStore for SqliteStore {
    fn version(&self) -> Result<String> {
        Self::get_info(&self.conn, VERSION_KEY)
    }

    fn default_tag_type(&self) -> Result<TagType> {
        Self::read_default_tag_type(&self.conn)
    }

    fn has_item(&self, key: &str) -> Result<bool> {
        self.exists("SELECT 1 FROM media_items WHERE key = ?1", key)
    }

    fn get_item(&self, key: &str) -> Result<Option<MediaItem>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT key, title, artist, album, track_number, year, duration_ms, last_modified, play_count
             FROM media_items WHERE key = ?1",
        )?;
        let mut item = match stmt.query_row(params![key], Self::parse_item_row) {
            Ok((_, item)) => item,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        item.tags = Self::get_item_tags(&self.conn, key)?;
        Ok(Some(item))
    }

    fn get_all_items(&self) -> Result<BTreeMap<String, MediaItem>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT key, title, artist, album, track_number, year, duration_ms, last_modified, play_count
             FROM media_items",
        )?;
        let mut items = stmt
            .query_map([], Self::parse_item_row)?
            .collect::<Result<BTreeMap<String, MediaItem>, _>>()?;

        let mut stmt = self
            .conn
            .prepare_cached("SELECT item_key, tag_name FROM media_item_tags")?;
        let links = stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))?;
        for link in links {
            let (item_key, tag_name) = link?;
            if let Some(item) = items.get_mut(&item_key) {
                item.tags.insert(tag_name);
            }
        }
        Ok(items)
    }

    fn has_tag(&self, name: &str) -> Result<bool> {
        self.exists("SELECT 1 FROM tags WHERE name = ?1", name)
    }

    fn get_tag(&self, name: &str) -> Result<Option<Tag>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT name, tag_type, description FROM tags WHERE name = ?1")?;
        match stmt.query_row(params![name], Self::parse_tag_row) {
            Ok((_, tag)) => Ok(Some(tag)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn get_all_tags(&self) -> Result<BTreeMap<String, Tag>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT name, tag_type, description FROM tags")?;
        let tags = stmt
            .query_map([], Self::parse_tag_row)?
            .collect::<Result<BTreeMap<String, Tag>, _>>()?;
        Ok(tags)
    }

    fn has_tag_type(&self, name: &str) -> Result<bool> {
        self.exists("SELECT 1 FROM tag_types WHERE name = ?1", name)
    }

    fn get_tag_type(&self, name: &str) -> Result<Option<TagType>> {
        match self.conn.query_row(
            "SELECT color FROM tag_types WHERE name = ?1",
            params![name],
            |r| r.get(0),
        ) {
            Ok(color) => Ok(Some(TagType::new(color))),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn get_all_tag_types(&self) -> Result<BTreeMap<String, TagType>> {
        let mut stmt = self.conn.prepare_cached("SELECT name, color FROM tag_types")?;
        let tag_types = stmt
            .query_map([], |r| Ok((r.get(0)?, TagType::new(r.get(1)?))))?
            .collect::<Result<BTreeMap<String, TagType>, _>>()?;
        Ok(tag_types)
    }

    fn get_extra(&self, key: &str) -> Result<Option<String>> {
        match self.conn.query_row(
            "SELECT value FROM extra_data WHERE key = ?1",
            params![key],
            |r| r.get(0),
        ) {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn get_all_extra(&self) -> Result<BTreeMap<String, String>> {
        let mut stmt = self.conn.prepare_cached("SELECT key, value FROM extra_data")?;
        let extra = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
            .collect::<Result<BTreeMap<String, String>, _>>()?;
        Ok(extra)
    }

    fn commit(&mut self, batch: &UpdateBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let tx = self.conn.transaction()?;
        for op in batch.ops() {
            Self::apply_op(&tx, op).with_context(|| format!("Failed to apply {}", op.kind()))?;
        }
        tx.commit().context("Failed to commit catalog transaction")?;
        debug!("Committed {} operations to SQLite catalog", batch.len());
        Ok(())
    }

    fn updater(&mut self) -> Updater<'_> {
        Updater::new(self)
    }
}
