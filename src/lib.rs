//! Tagged media library.
//!
//! A catalog of media items, tags and tag types kept consistent across its
//! three maps, persisted through pluggable backing stores, optionally held in
//! a write-back cache, plus a byte-budgeted local cache for media payloads.

pub mod catalog;
pub mod config;
pub mod payload;
pub mod sqlite_persistence;
pub mod store;

// Re-export commonly used types for convenience
pub use catalog::{CachedCatalog, Catalog, CatalogConfig, CatalogEvent, StoreCatalog};
pub use payload::{BoundedPayloadCache, DirectoryPayloadSource, PayloadSource};
pub use store::{open_store, BackingStore, JsonFileStore, MemoryStore, SqliteStore, StoreKind};
