//! Payload source backed by a plain directory.

use super::trait_def::PayloadSource;
use super::{check_payload_name, copy_into, PayloadError};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Stores each payload as `root/<name>`.
pub struct DirectoryPayloadSource {
    root: PathBuf,
}

impl DirectoryPayloadSource {
    /// Opens the source, creating `root` if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create payload directory {:?}", root))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn existing_path(&self, name: &str) -> Result<PathBuf, PayloadError> {
        check_payload_name(name)?;
        let path = self.root.join(name);
        if !path.is_file() {
            return Err(PayloadError::NotFound(name.to_string()));
        }
        Ok(path)
    }

    fn try_push(&self, local_path: &Path, name: &str) -> Result<u64, PayloadError> {
        check_payload_name(name)?;
        let (_, size) = copy_into(local_path, &self.root, name)?;
        Ok(size)
    }

    fn try_remove(&self, name: &str) -> Result<(), PayloadError> {
        let path = self.existing_path(name)?;
        std::fs::remove_file(path)?;
        Ok(())
    }
}

impl PayloadSource for DirectoryPayloadSource {
    fn has_payload(&self, name: &str) -> bool {
        self.existing_path(name).is_ok()
    }

    fn push_payload(&mut self, local_path: &Path, name: &str) -> bool {
        match self.try_push(local_path, name) {
            Ok(size) => {
                debug!("Stored payload {} ({} bytes)", name, size);
                true
            }
            Err(e) => {
                warn!("Failed to push payload {} from {:?}: {}", name, local_path, e);
                false
            }
        }
    }

    fn pull_payload(&mut self, name: &str) -> Option<PathBuf> {
        match self.existing_path(name) {
            Ok(path) => Some(path),
            Err(PayloadError::NotFound(_)) => None,
            Err(e) => {
                warn!("Failed to pull payload {}: {}", name, e);
                None
            }
        }
    }

    fn remove_payload(&mut self, name: &str) -> bool {
        match self.try_remove(name) {
            Ok(()) => true,
            Err(PayloadError::NotFound(_)) => false,
            Err(e) => {
                warn!("Failed to remove payload {}: {}", name, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_push_pull_remove() {
        let temp_dir = TempDir::new().unwrap();
        let local = temp_dir.path().join("upload.mp3");
        std::fs::write(&local, b"ID3 data").unwrap();
        let mut source = DirectoryPayloadSource::new(temp_dir.path().join("remote")).unwrap();

        assert!(!source.has_payload("song.mp3"));
        assert!(source.push_payload(&local, "song.mp3"));
        assert!(source.has_payload("song.mp3"));

        let pulled = source.pull_payload("song.mp3").unwrap();
        assert_eq!(std::fs::read(pulled).unwrap(), b"ID3 data");

        assert!(source.remove_payload("song.mp3"));
        assert!(!source.remove_payload("song.mp3"));
        assert!(source.pull_payload("song.mp3").is_none());
    }

    #[test]
    fn test_push_over_directory_fails() {
        let temp_dir = TempDir::new().unwrap();
        let local = temp_dir.path().join("upload.mp3");
        std::fs::write(&local, b"x").unwrap();
        let mut source = DirectoryPayloadSource::new(temp_dir.path().join("remote")).unwrap();

        let blocker = source.root().join("taken");
        std::fs::create_dir(&blocker).unwrap();
        std::fs::write(blocker.join("child"), b"y").unwrap();

        assert!(!source.push_payload(&local, "taken"));
        assert!(!source.has_payload("taken"));
    }

    #[test]
    fn test_invalid_names_are_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let local = temp_dir.path().join("upload.mp3");
        std::fs::write(&local, b"x").unwrap();
        let mut source = DirectoryPayloadSource::new(temp_dir.path().join("remote")).unwrap();

        assert!(!source.push_payload(&local, "../escape.mp3"));
        assert!(!temp_dir.path().join("escape.mp3").exists());
        assert!(source.pull_payload("..").is_none());
        assert!(!source.remove_payload("/upload.mp3"));
    }

    #[test]
    fn test_push_missing_local_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        let mut source = DirectoryPayloadSource::new(temp_dir.path().join("remote")).unwrap();
        assert!(!source.push_payload(&temp_dir.path().join("nope"), "nope.mp3"));
    }
}
