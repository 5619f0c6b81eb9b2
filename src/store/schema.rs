//! SQLite schema of the catalog database.
//!
//! Tags reference tag types and item-tag links reference both sides, so the
//! database itself keeps the catalog's referential integrity. The store
//! still performs its cascades explicitly before deleting.

use crate::sqlite_column;
use crate::sqlite_persistence::{ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema};

/// Catalog-wide values: `version` and `default_tag_type_color`.
const CATALOG_INFO_TABLE: Table = Table {
    name: "catalog_info",
    columns: &[
        sqlite_column!("key", &SqlType::Text, is_primary_key = true, non_null = true),
        sqlite_column!("value", &SqlType::Text, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[],
};

const TAG_TYPES_TABLE: Table = Table {
    name: "tag_types",
    columns: &[
        sqlite_column!("name", &SqlType::Text, is_primary_key = true, non_null = true),
        sqlite_column!("color", &SqlType::Integer, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[],
};

const TAG_TYPE_FK: ForeignKey = ForeignKey {
    foreign_table: "tag_types",
    foreign_column: "name",
    on_delete: ForeignKeyOnChange::SetNull,
};

const TAGS_TABLE: Table = Table {
    name: "tags",
    columns: &[
        sqlite_column!("name", &SqlType::Text, is_primary_key = true, non_null = true),
        sqlite_column!("tag_type", &SqlType::Text, foreign_key = Some(&TAG_TYPE_FK)),
        sqlite_column!("description", &SqlType::Text),
    ],
    indices: &[("idx_tags_tag_type", "tag_type")],
    unique_constraints: &[],
};

const MEDIA_ITEMS_TABLE: Table = Table {
    name: "media_items",
    columns: &[
        sqlite_column!("key", &SqlType::Text, is_primary_key = true, non_null = true), // file name
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("artist", &SqlType::Text),
        sqlite_column!("album", &SqlType::Text),
        sqlite_column!("track_number", &SqlType::Integer),
        sqlite_column!("year", &SqlType::Integer),
        sqlite_column!("duration_ms", &SqlType::Integer, non_null = true),
        sqlite_column!("last_modified", &SqlType::Text, non_null = true), // RFC 3339
        sqlite_column!("play_count", &SqlType::Integer, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[],
};

const ITEM_FK: ForeignKey = ForeignKey {
    foreign_table: "media_items",
    foreign_column: "key",
    on_delete: ForeignKeyOnChange::Cascade,
};

const TAG_FK: ForeignKey = ForeignKey {
    foreign_table: "tags",
    foreign_column: "name",
    on_delete: ForeignKeyOnChange::Cascade,
};

/// Media item <-> tag relationship
const MEDIA_ITEM_TAGS_TABLE: Table = Table {
    name: "media_item_tags",
    columns: &[
        sqlite_column!(
            "item_key",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&ITEM_FK)
        ),
        sqlite_column!(
            "tag_name",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&TAG_FK)
        ),
    ],
    indices: &[("idx_media_item_tags_tag", "tag_name")],
    unique_constraints: &[&["item_key", "tag_name"]],
};

const EXTRA_DATA_TABLE: Table = Table {
    name: "extra_data",
    columns: &[
        sqlite_column!("key", &SqlType::Text, is_primary_key = true, non_null = true),
        sqlite_column!("value", &SqlType::Text, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[],
};

pub const CATALOG_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        CATALOG_INFO_TABLE,
        TAG_TYPES_TABLE,
        TAGS_TABLE,
        MEDIA_ITEMS_TABLE,
        MEDIA_ITEM_TAGS_TABLE,
        EXTRA_DATA_TABLE,
    ],
    migration: None,
}];
