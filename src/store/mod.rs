mod json_file_store;
mod memory_store;
mod schema;
mod sqlite_store;
mod trait_def;
mod update;

pub use json_file_store::JsonFileStore;
pub use memory_store::MemoryStore;
pub use schema::CATALOG_VERSIONED_SCHEMAS;
pub use sqlite_store::SqliteStore;
pub use trait_def::BackingStore;
pub use update::{UpdateBatch, UpdateOp, Updater};

use crate::catalog::CatalogConfig;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which backend a catalog is persisted with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Json,
    Sqlite,
    /// Nothing is persisted, the path is ignored.
    Memory,
}

pub fn open_store(
    kind: StoreKind,
    path: &Path,
    config: &CatalogConfig,
) -> Result<Box<dyn BackingStore>> {
    Ok(match kind {
        StoreKind::Json => Box::new(JsonFileStore::open(path, config)?),
        StoreKind::Sqlite => Box::new(SqliteStore::open(path, config)?),
        StoreKind::Memory => Box::new(MemoryStore::new(config)),
    })
}
