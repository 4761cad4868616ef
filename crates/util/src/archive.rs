//! Zip archive extraction for downloaded provider packages.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

const DEFAULT_FILE_MODE: u32 = 0o644;
const DEFAULT_DIR_MODE: u32 = 0o755;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("i/o error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("archive entry '{0}' escapes the destination directory")]
    UnsafeEntry(String),
}

impl ArchiveError {
    fn io(path: &Path, source: io::Error) -> Self {
        ArchiveError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Extract every entry of the zip file at `archive` into `destination`.
///
/// Entry names are sanitized: absolute paths and `..` components are rejected.
/// Unix permission bits recorded in the archive are restored; entries without
/// them get `0644` (files) or `0755` (directories).
pub fn extract_zip(archive: &Path, destination: &Path) -> Result<(), ArchiveError> {
    let file = File::open(archive).map_err(|e| ArchiveError::io(archive, e))?;
    let mut zip = zip::ZipArchive::new(file)?;
    fs::create_dir_all(destination).map_err(|e| ArchiveError::io(destination, e))?;

    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;
        let Some(relative) = entry.enclosed_name() else {
            return Err(ArchiveError::UnsafeEntry(entry.name().to_string()));
        };
        let target = destination.join(relative);
        let mode = entry.unix_mode().map(|mode| mode & 0o777).filter(|mode| *mode != 0);

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|e| ArchiveError::io(&target, e))?;
            set_mode(&target, mode.unwrap_or(DEFAULT_DIR_MODE))?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| ArchiveError::io(parent, e))?;
        }
        let mut out = File::create(&target).map_err(|e| ArchiveError::io(&target, e))?;
        io::copy(&mut entry, &mut out).map_err(|e| ArchiveError::io(&target, e))?;
        set_mode(&target, mode.unwrap_or(DEFAULT_FILE_MODE))?;
        debug!(entry = %target.display(), "extracted archive entry");
    }
    Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<(), ArchiveError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|e| ArchiveError::io(path, e))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<(), ArchiveError> {
    Ok(())
}
