//! Locating the provider executable inside an extracted package.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

/// First regular entry directly under `directory` whose file name starts with `prefix`.
///
/// Entries are visited in lexical order; subdirectories are neither matched nor
/// descended into. Returns `Ok(None)` when nothing matches.
pub fn find_entry_with_prefix(directory: &Path, prefix: &str) -> io::Result<Option<PathBuf>> {
    let mut entries = fs::read_dir(directory)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        if entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        if name.to_string_lossy().starts_with(prefix) {
            debug!(path = %entry.path().display(), "found entry matching prefix");
            return Ok(Some(entry.path()));
        }
    }
    Ok(None)
}
