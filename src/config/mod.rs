mod file_config;

pub use file_config::{FileConfig, PayloadCacheConfig};

use crate::catalog::{CatalogConfig, TagType, CATALOG_VERSION, DEFAULT_TAG_TYPE_COLOR};
use crate::store::StoreKind;
use anyhow::{anyhow, bail, Context, Result};
use byte_unit::Byte;
use clap::ValueEnum;
use std::path::{Path, PathBuf};

pub const DEFAULT_MAX_CACHE_SIZE: &str = "1 GiB";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub store_path: Option<PathBuf>,
    pub store_kind: StoreKind,
    pub expected_version: Option<String>,
    pub default_tag_type_color: Option<i32>,
    pub payload_dir: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub max_cache_size: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store_path: PathBuf,
    pub store_kind: StoreKind,
    pub expected_version: String,
    pub default_tag_type_color: i32,

    /// Present only when a payload source directory is configured.
    pub payload_cache: Option<PayloadCacheSettings>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PayloadCacheSettings {
    pub source_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub max_bytes: u64,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let store_path = file
            .store_path
            .map(PathBuf::from)
            .or_else(|| cli.store_path.clone())
            .ok_or_else(|| {
                anyhow!("store_path must be specified via --store-path or in config file")
            })?;

        let store_kind = match file.store_kind {
            Some(s) => parse_store_kind(&s)?,
            None => cli.store_kind,
        };
        if store_kind != StoreKind::Memory {
            if let Some(parent) = store_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                if !parent.is_dir() {
                    bail!("Store directory does not exist: {:?}", parent);
                }
            }
        }

        let expected_version = file
            .expected_version
            .or_else(|| cli.expected_version.clone())
            .unwrap_or_else(|| CATALOG_VERSION.to_string());
        let default_tag_type_color = file
            .default_tag_type_color
            .or(cli.default_tag_type_color)
            .unwrap_or(DEFAULT_TAG_TYPE_COLOR);

        // Payload cache settings - merge file section with CLI
        let pc_file = file.payload_cache.unwrap_or_default();
        let source_dir = pc_file
            .source_dir
            .map(PathBuf::from)
            .or_else(|| cli.payload_dir.clone());
        let payload_cache = match source_dir {
            Some(source_dir) => {
                let cache_dir = pc_file
                    .cache_dir
                    .map(PathBuf::from)
                    .or_else(|| cli.cache_dir.clone())
                    .unwrap_or_else(|| default_cache_dir(&store_path));
                let max_size = pc_file
                    .max_size
                    .or_else(|| cli.max_cache_size.clone())
                    .unwrap_or_else(|| DEFAULT_MAX_CACHE_SIZE.to_string());
                Some(PayloadCacheSettings {
                    source_dir,
                    cache_dir,
                    max_bytes: parse_byte_size(&max_size)?,
                })
            }
            None => None,
        };

        Ok(Self {
            store_path,
            store_kind,
            expected_version,
            default_tag_type_color,
            payload_cache,
        })
    }

    pub fn catalog_config(&self) -> CatalogConfig {
        CatalogConfig {
            expected_version: self.expected_version.clone(),
            default_tag_type: TagType::new(self.default_tag_type_color),
        }
    }
}

fn default_cache_dir(store_path: &Path) -> PathBuf {
    match store_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join("payload-cache"),
        _ => PathBuf::from("payload-cache"),
    }
}

/// Parses a store kind, case insensitive.
/// Uses clap's ValueEnum trait for parsing.
fn parse_store_kind(s: &str) -> Result<StoreKind> {
    StoreKind::from_str(s, true).map_err(|_| anyhow!("Unknown store kind: {}", s))
}

/// Parses sizes like "1 GiB", "500MB" or "4096" into bytes.
pub fn parse_byte_size(s: &str) -> Result<u64> {
    let byte = Byte::parse_str(s, true).with_context(|| format!("Invalid byte size: {:?}", s))?;
    Ok(byte.as_u64())
}

/// Parses a color given as decimal, `0x` hex or `#RRGGBB`.
pub fn parse_color(s: &str) -> Result<i32> {
    let s = s.trim();
    let parsed = if let Some(hex) = s.strip_prefix('#').or_else(|| s.strip_prefix("0x")) {
        u32::from_str_radix(hex, 16).map(|v| v as i32)
    } else {
        s.parse::<i32>()
    };
    parsed.with_context(|| format!("Invalid color: {:?}", s))
}
