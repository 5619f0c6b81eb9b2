mod bounded_cache;
mod directory_source;
mod trait_def;

pub use bounded_cache::BoundedPayloadCache;
pub use directory_source::DirectoryPayloadSource;
pub use trait_def::PayloadSource;

use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Errors raised inside payload sources. They never cross the
/// [`PayloadSource`] boundary.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid payload name: {0:?}")]
    InvalidName(String),

    #[error("Payload not found: {0}")]
    NotFound(String),
}

/// Payload names are plain file names: no separators, no parent or current
/// directory components, no hidden files.
pub(crate) fn check_payload_name(name: &str) -> Result<(), PayloadError> {
    let invalid = name.trim().is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\', '\0'])
        || Path::new(name).file_name().and_then(|n| n.to_str()) != Some(name);
    if invalid {
        return Err(PayloadError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Copies `src` to `dir/name` through a temporary file in `dir`, returning
/// the final path and the number of bytes written.
pub(crate) fn copy_into(src: &Path, dir: &Path, name: &str) -> Result<(PathBuf, u64), PayloadError> {
    let target = dir.join(name);
    let mut input = std::fs::File::open(src)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    let size = std::io::copy(&mut input, &mut tmp)?;
    tmp.as_file().sync_all()?;
    tmp.persist(&target).map_err(|e| e.error)?;
    Ok((target, size))
}
