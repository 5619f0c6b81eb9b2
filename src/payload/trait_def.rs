//! PayloadSource trait definition.

use std::path::{Path, PathBuf};

/// Named binary payloads (audio files) kept somewhere outside the catalog.
///
/// Implementations catch their own I/O failures, log them, and report them
/// as `false`/`None`. Nothing here returns an error to the caller.
pub trait PayloadSource: Send {
    fn has_payload(&self, name: &str) -> bool;

    /// Uploads the file at `local_path` under `name`, replacing any previous
    /// payload with that name.
    fn push_payload(&mut self, local_path: &Path, name: &str) -> bool;

    /// Returns a local path the payload can be read from.
    fn pull_payload(&mut self, name: &str) -> Option<PathBuf>;

    fn remove_payload(&mut self, name: &str) -> bool;
}
