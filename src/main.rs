use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{debug, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pezzottify_library::catalog::{
    CachedCatalog, Catalog, CatalogEvent, MediaItem, MediaItemChange, Tag, TagChange, TagType,
};
use pezzottify_library::config::{parse_color, AppConfig, CliConfig, FileConfig};
use pezzottify_library::payload::{BoundedPayloadCache, DirectoryPayloadSource, PayloadSource};
use pezzottify_library::store::{open_store, StoreKind};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML config file. Its values take precedence over CLI args.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Path to the catalog file (JSON) or database (SQLite).
    #[clap(long, value_parser = parse_path)]
    pub store_path: Option<PathBuf>,

    /// Backend the catalog is persisted with.
    #[clap(long, default_value = "json")]
    pub store_kind: StoreKind,

    /// Version marker the catalog is expected to carry.
    #[clap(long)]
    pub expected_version: Option<String>,

    /// Color of the default tag type of a newly created catalog.
    #[clap(long, value_parser = parse_color)]
    pub default_tag_type_color: Option<i32>,

    /// Directory holding the media payloads.
    #[clap(long, value_parser = parse_path)]
    pub payload_dir: Option<PathBuf>,

    /// Local directory for cached payloads.
    #[clap(long, value_parser = parse_path)]
    pub cache_dir: Option<PathBuf>,

    /// Byte budget of the payload cache, e.g. "512 MiB".
    #[clap(long)]
    pub max_cache_size: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Shows catalog version, default tag type and entry counts.
    Info,

    /// Lists items, optionally filtered by tags.
    Items {
        /// Only items holding this tag (repeatable).
        #[clap(long)]
        include: Vec<String>,
        /// Only items not holding this tag (repeatable).
        #[clap(long)]
        exclude: Vec<String>,
    },

    /// Adds an item, replacing any item with the same key.
    AddItem {
        key: String,
        #[clap(long)]
        title: Option<String>,
        #[clap(long)]
        artist: Option<String>,
        #[clap(long)]
        album: Option<String>,
        #[clap(long)]
        track: Option<u32>,
        #[clap(long)]
        year: Option<i32>,
        #[clap(long, default_value_t = 0)]
        duration_ms: u64,
        /// Tag to attach, created if missing (repeatable).
        #[clap(long)]
        tag: Vec<String>,
    },

    RemoveItem {
        key: String,
    },

    /// Adds or replaces a tag.
    PutTag {
        name: String,
        #[clap(long)]
        tag_type: Option<String>,
        #[clap(long)]
        description: Option<String>,
    },

    /// Removes a tag and detaches it from every item.
    RemoveTag {
        name: String,
    },

    PutTagType {
        name: String,
        #[clap(value_parser = parse_color)]
        color: i32,
    },

    /// Removes a tag type and clears it from every tag.
    RemoveTagType {
        name: String,
    },

    SetDefaultTagType {
        #[clap(value_parser = parse_color)]
        color: i32,
    },

    SetExtra {
        key: String,
        value: String,
    },

    RemoveExtra {
        key: String,
    },

    /// Counts a play of the item and fetches its payload through the cache.
    Play {
        key: String,
    },

    /// Lists tags.
    Tags,

    /// Lists tag types.
    TagTypes,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            store_path: self.store_path.clone(),
            store_kind: self.store_kind,
            expected_version: self.expected_version.clone(),
            default_tag_type_color: self.default_tag_type_color,
            payload_dir: self.payload_dir.clone(),
            cache_dir: self.cache_dir.clone(),
            max_cache_size: self.max_cache_size.clone(),
        }
    }
}

fn format_color(color: i32) -> String {
    format!("#{:06x}", color as u32 & 0xffffff)
}

fn print_item(key: &str, item: &MediaItem) {
    let tags: Vec<&str> = item.tags.iter().map(String::as_str).collect();
    println!(
        "{}\t{}\t{}\t{}ms\tplays={}\t[{}]",
        key,
        item.title,
        item.artist.as_deref().unwrap_or("-"),
        item.duration_ms,
        item.play_count,
        tags.join(", ")
    );
}

fn open_payload_cache(
    app_config: &AppConfig,
) -> Result<Option<BoundedPayloadCache<DirectoryPayloadSource>>> {
    let Some(settings) = &app_config.payload_cache else {
        return Ok(None);
    };
    let source = DirectoryPayloadSource::new(&settings.source_dir)?;
    let cache = BoundedPayloadCache::open(source, &settings.cache_dir, settings.max_bytes)?;
    Ok(Some(cache))
}

fn run(command: Command, catalog: &mut CachedCatalog, app_config: &AppConfig) -> Result<()> {
    match command {
        Command::Info => {
            println!("Store: {:?} ({:?})", app_config.store_path, app_config.store_kind);
            println!("Version: {}", catalog.version()?);
            println!(
                "Default tag type: {}",
                format_color(catalog.default_tag_type()?.color)
            );
            println!("Items: {}", catalog.get_all_items()?.len());
            println!("Tags: {}", catalog.get_all_tags()?.len());
            println!("Tag types: {}", catalog.get_all_tag_types()?.len());
            for (key, value) in catalog.get_all_extra()? {
                println!("Extra {}: {}", key, value);
            }
            if let Some(cache) = open_payload_cache(app_config)? {
                println!(
                    "Payload cache: {} payloads, {} of {} bytes",
                    cache.cached_names().len(),
                    cache.cached_bytes(),
                    cache.max_space()
                );
            }
        }
        Command::Items { include, exclude } => {
            let include: BTreeSet<String> = include.into_iter().collect();
            let exclude: BTreeSet<String> = exclude.into_iter().collect();
            for (key, item) in catalog.get_items_by_tags(&include, &exclude)? {
                print_item(&key, &item);
            }
        }
        Command::AddItem {
            key,
            title,
            artist,
            album,
            track,
            year,
            duration_ms,
            tag,
        } => {
            let mut change = MediaItemChange::default()
                .artist(artist)
                .album(album)
                .track_number(track)
                .year(year)
                .tags(tag);
            if let Some(title) = title {
                change = change.title(title);
            }
            let item = MediaItem::new(&key, duration_ms).mutate(change);
            catalog.put_item(&key, item)?;
        }
        Command::RemoveItem { key } => catalog.remove_item(&key)?,
        Command::PutTag {
            name,
            tag_type,
            description,
        } => {
            let tag = Tag::new().mutate(
                TagChange::default()
                    .tag_type(tag_type)
                    .description(description),
            );
            catalog.put_tag(&name, tag)?;
        }
        Command::RemoveTag { name } => catalog.remove_tag(&name)?,
        Command::PutTagType { name, color } => catalog.put_tag_type(&name, TagType::new(color))?,
        Command::RemoveTagType { name } => catalog.remove_tag_type(&name)?,
        Command::SetDefaultTagType { color } => {
            catalog.set_default_tag_type(TagType::new(color))?
        }
        Command::SetExtra { key, value } => catalog.put_extra(&key, &value)?,
        Command::RemoveExtra { key } => catalog.remove_extra(&key)?,
        Command::Play { key } => {
            let Some(item) = catalog.get_item(&key)? else {
                bail!("No item with key {:?}", key);
            };
            // a play only counts once the payload is at hand
            if let Some(mut cache) = open_payload_cache(app_config)? {
                let Some(path) = cache.pull_payload(&key) else {
                    bail!("Payload {:?} is not available", key);
                };
                println!("{}", path.display());
            }
            catalog.put_item(&key, item.record_play())?;
        }
        Command::Tags => {
            for (name, tag) in catalog.get_all_tags()? {
                println!(
                    "{}\t{}\t{}",
                    name,
                    tag.tag_type.as_deref().unwrap_or("-"),
                    tag.description.as_deref().unwrap_or("")
                );
            }
        }
        Command::TagTypes => {
            for (name, tag_type) in catalog.get_all_tag_types()? {
                println!("{}\t{}", name, format_color(tag_type.color));
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let app_config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;
    let catalog_config = app_config.catalog_config();

    info!(
        "Opening {:?} catalog at {:?}...",
        app_config.store_kind, app_config.store_path
    );
    let store = open_store(app_config.store_kind, &app_config.store_path, &catalog_config)?;
    let mut catalog = CachedCatalog::load(store, catalog_config)?;
    catalog.subscribe(Box::new(|event: &CatalogEvent| debug!("{:?}", event)));

    run(cli_args.command, &mut catalog, &app_config)?;
    catalog.commit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pezzottify_library::config::PayloadCacheSettings;
    use pezzottify_library::store::MemoryStore;
    use pezzottify_library::CatalogConfig;
    use tempfile::TempDir;

    fn app_config(temp_dir: &TempDir) -> AppConfig {
        let source_dir = temp_dir.path().join("payloads");
        std::fs::create_dir(&source_dir).unwrap();
        AppConfig {
            store_path: temp_dir.path().join("catalog.json"),
            store_kind: StoreKind::Memory,
            expected_version: CatalogConfig::default().expected_version,
            default_tag_type_color: 0,
            payload_cache: Some(PayloadCacheSettings {
                source_dir,
                cache_dir: temp_dir.path().join("cache"),
                max_bytes: 1024,
            }),
        }
    }

    fn catalog_with(key: &str) -> CachedCatalog {
        let config = CatalogConfig::default();
        let mut catalog = CachedCatalog::load(Box::new(MemoryStore::new(&config)), config).unwrap();
        catalog.put_item(key, MediaItem::new(key, 1000)).unwrap();
        catalog.commit().unwrap();
        catalog
    }

    fn play_count(catalog: &CachedCatalog, key: &str) -> u64 {
        catalog.get_item(key).unwrap().unwrap().play_count
    }

    #[test]
    fn test_play_counts_after_payload_pull() {
        let temp_dir = TempDir::new().unwrap();
        let app_config = app_config(&temp_dir);
        let source_dir = &app_config.payload_cache.as_ref().unwrap().source_dir;
        std::fs::write(source_dir.join("song.ogg"), b"ogg").unwrap();
        let mut catalog = catalog_with("song.ogg");

        let command = Command::Play {
            key: "song.ogg".to_string(),
        };
        run(command, &mut catalog, &app_config).unwrap();
        assert_eq!(play_count(&catalog, "song.ogg"), 1);
        assert!(temp_dir.path().join("cache").join("song.ogg").exists());
    }

    #[test]
    fn test_unavailable_payload_does_not_count_a_play() {
        let temp_dir = TempDir::new().unwrap();
        let app_config = app_config(&temp_dir);
        let mut catalog = catalog_with("song.ogg");

        let command = Command::Play {
            key: "song.ogg".to_string(),
        };
        let err = run(command, &mut catalog, &app_config).unwrap_err();
        assert!(err.to_string().contains("is not available"));
        assert_eq!(play_count(&catalog, "song.ogg"), 0);
        assert_eq!(catalog.pending_operations(), 0);
    }
}
