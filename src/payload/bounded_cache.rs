//! Byte-budgeted LRU cache of payloads in a local directory.
//!
//! Only pulled payloads become residents. A local hit is trusted without
//! asking the source again, until the entry is evicted or removed. The entry
//! just pulled is never evicted, so a single payload larger than the budget
//! is still cached and the budget is exceeded until the next pull.

use super::trait_def::PayloadSource;
use super::{check_payload_name, copy_into};
use anyhow::{Context, Result};
use lru::LruCache;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};

#[derive(Debug)]
struct CachedPayload {
    path: PathBuf,
    size: u64,
}

pub struct BoundedPayloadCache<S: PayloadSource> {
    source: S,
    cache_dir: PathBuf,
    max_space: u64,
    entries: LruCache<String, CachedPayload>,
    total_bytes: u64,
}

impl<S: PayloadSource> BoundedPayloadCache<S> {
    /// Opens the cache in `cache_dir`. Files already there are adopted as
    /// residents, least recently modified first, and the budget is enforced.
    pub fn open(source: S, cache_dir: impl Into<PathBuf>, max_space: u64) -> Result<Self> {
        let cache_dir = cache_dir.into();
        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create payload cache directory {:?}", cache_dir))?;

        let mut cache = Self {
            source,
            cache_dir,
            max_space,
            entries: LruCache::unbounded(),
            total_bytes: 0,
        };
        cache.adopt_existing()?;
        cache.evict_over_budget(None);
        info!(
            "Opened payload cache {:?}: {} payloads, {} of {} bytes",
            cache.cache_dir,
            cache.entries.len(),
            cache.total_bytes,
            cache.max_space
        );
        Ok(cache)
    }

    fn adopt_existing(&mut self) -> Result<()> {
        let mut found: Vec<(SystemTime, String, PathBuf, u64)> = Vec::new();
        let dir_entries = std::fs::read_dir(&self.cache_dir)
            .with_context(|| format!("Failed to list {:?}", self.cache_dir))?;
        for dir_entry in dir_entries {
            let dir_entry = dir_entry?;
            let metadata = dir_entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }
            let Some(name) = dir_entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            // leftovers of interrupted copies start with '.'
            if check_payload_name(&name).is_err() {
                continue;
            }
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            found.push((modified, name, dir_entry.path(), metadata.len()));
        }
        found.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

        for (_, name, path, size) in found {
            self.total_bytes += size;
            self.entries.put(name, CachedPayload { path, size });
        }
        Ok(())
    }

    /// Evicts least recently used entries until the budget holds, or until
    /// only `keep` is left.
    fn evict_over_budget(&mut self, keep: Option<&str>) {
        while self.total_bytes > self.max_space {
            match self.entries.peek_lru() {
                Some((name, _)) if Some(name.as_str()) != keep => {}
                _ => break,
            }
            let Some((name, entry)) = self.entries.pop_lru() else {
                break;
            };
            self.total_bytes -= entry.size;
            Self::delete_local(&entry.path);
            debug!("Evicted payload {} ({} bytes)", name, entry.size);
        }
    }

    fn delete_local(path: &Path) {
        if let Err(e) = std::fs::remove_file(path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to delete cached payload {:?}: {}", path, e);
            }
        }
    }

    /// Bumps the modification time, which orders residents adopted on open.
    fn touch(path: &Path) {
        let touched = std::fs::File::options()
            .write(true)
            .open(path)
            .and_then(|file| file.set_modified(SystemTime::now()));
        if let Err(e) = touched {
            warn!("Failed to refresh modification time of {:?}: {}", path, e);
        }
    }

    fn drop_local(&mut self, name: &str) {
        if let Some(entry) = self.entries.pop(name) {
            self.total_bytes -= entry.size;
            Self::delete_local(&entry.path);
        }
    }

    /// Total size of the resident payloads.
    pub fn cached_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Resident payload names, least recently used first.
    pub fn cached_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.iter().map(|(name, _)| name.clone()).collect();
        names.reverse();
        names
    }

    pub fn max_space(&self) -> u64 {
        self.max_space
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<S: PayloadSource> PayloadSource for BoundedPayloadCache<S> {
    fn has_payload(&self, name: &str) -> bool {
        self.entries.contains(name) || self.source.has_payload(name)
    }

    fn push_payload(&mut self, local_path: &Path, name: &str) -> bool {
        let pushed = self.source.push_payload(local_path, name);
        if pushed {
            self.drop_local(name);
        }
        pushed
    }

    fn pull_payload(&mut self, name: &str) -> Option<PathBuf> {
        if let Err(e) = check_payload_name(name) {
            warn!("Refusing to pull payload: {}", e);
            return None;
        }
        if let Some(entry) = self.entries.get(name) {
            Self::touch(&entry.path);
            return Some(entry.path.clone());
        }

        let source_path = self.source.pull_payload(name)?;
        let (path, size) = match copy_into(&source_path, &self.cache_dir, name) {
            Ok(copied) => copied,
            Err(e) => {
                warn!("Failed to stage payload {} in {:?}: {}", name, self.cache_dir, e);
                return None;
            }
        };

        self.total_bytes += size;
        let replaced = self.entries.put(
            name.to_string(),
            CachedPayload {
                path: path.clone(),
                size,
            },
        );
        if let Some(old) = replaced {
            self.total_bytes -= old.size;
        }
        if size > self.max_space {
            warn!(
                "Payload {} ({} bytes) alone exceeds the cache budget of {} bytes",
                name, size, self.max_space
            );
        }
        self.evict_over_budget(Some(name));
        Some(path)
    }

    fn remove_payload(&mut self, name: &str) -> bool {
        self.drop_local(name);
        self.source.remove_payload(name)
    }
}
