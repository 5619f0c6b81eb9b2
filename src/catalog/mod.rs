mod cached;
mod events;
mod models;
mod state;
mod store_catalog;
mod trait_def;

pub use cached::CachedCatalog;
pub use events::{CatalogEvent, CatalogListener, EventBus};
pub use models::*;
pub use state::{filter_items_by_tags, CatalogState};
pub use store_catalog::StoreCatalog;
pub use trait_def::Catalog;

pub(crate) use state::{normalize_item, normalize_tag};

use tracing::warn;

/// Version marker written into newly created catalogs.
pub const CATALOG_VERSION: &str = "1";

/// Color of the default tag type of newly created catalogs (mid grey).
pub const DEFAULT_TAG_TYPE_COLOR: i32 = 0x808080;

/// Settings a catalog and its stores are constructed with.
#[derive(Clone, Debug, PartialEq)]
pub struct CatalogConfig {
    /// Version marker the loaded catalog is expected to carry. Also written
    /// into stores created from scratch.
    pub expected_version: String,
    /// Default tag type of stores created from scratch.
    pub default_tag_type: TagType,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            expected_version: CATALOG_VERSION.to_string(),
            default_tag_type: TagType::new(DEFAULT_TAG_TYPE_COLOR),
        }
    }
}

/// Blank keys are treated as absent by every catalog operation.
pub fn is_blank(key: &str) -> bool {
    key.trim().is_empty()
}

pub(crate) fn warn_on_version_mismatch(found: &str, config: &CatalogConfig) {
    if found != config.expected_version {
        warn!(
            "Catalog version mismatch: expected {}, found {}. Continuing anyway.",
            config.expected_version, found
        );
    }
}
