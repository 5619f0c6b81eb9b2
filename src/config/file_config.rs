use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Catalog settings (can override CLI)
    pub store_path: Option<String>,
    pub store_kind: Option<String>,
    pub expected_version: Option<String>,
    pub default_tag_type_color: Option<i32>,

    pub payload_cache: Option<PayloadCacheConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct PayloadCacheConfig {
    /// Directory holding the payloads, no payload access when unset.
    pub source_dir: Option<String>,
    pub cache_dir: Option<String>,
    /// Human readable size, e.g. "512 MiB".
    pub max_size: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
