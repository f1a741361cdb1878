//! File identity and content fingerprints.

use std::fs::{self, Metadata};
use std::io;
use std::path::Path;
use std::time::UNIX_EPOCH;

use crate::hash;

/// Everything the incremental cache knows about one file.
///
/// `volume_id`/`file_id` name the cache record; only `size`,
/// `last_modification` and `hash` take part in [`FileInfo::matches`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileInfo {
    /// Device id on unix.
    pub volume_id: u64,
    /// Inode on unix.
    pub file_id: u64,
    pub size: u64,
    /// Nanoseconds since the Unix epoch; real resolution is filesystem
    /// dependent.
    pub last_modification: u64,
    /// FNV-1a 64 of the content.
    pub hash: u64,
}

impl FileInfo {
    /// Queries identity, size, modification time and content hash.
    pub fn query(path: &Path) -> io::Result<FileInfo> {
        let metadata = fs::metadata(path)?;
        let (volume_id, file_id) = identity_of(path, &metadata)?;
        Ok(FileInfo {
            volume_id,
            file_id,
            size: metadata.len(),
            last_modification: modification_of(&metadata),
            hash: hash::hash_64_file(path)?,
        })
    }

    /// Queries only the identity pair, leaving the rest zeroed.
    pub fn identity(path: &Path) -> io::Result<FileInfo> {
        let metadata = fs::metadata(path)?;
        let (volume_id, file_id) = identity_of(path, &metadata)?;
        Ok(FileInfo {
            volume_id,
            file_id,
            ..FileInfo::default()
        })
    }

    /// Whether size, modification time and content hash are all equal.
    pub fn matches(&self, other: &FileInfo) -> bool {
        self.size == other.size
            && self.last_modification == other.last_modification
            && self.hash == other.hash
    }
}

fn modification_of(metadata: &Metadata) -> u64 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

#[cfg(unix)]
fn identity_of(_path: &Path, metadata: &Metadata) -> io::Result<(u64, u64)> {
    use std::os::unix::fs::MetadataExt;
    Ok((metadata.dev(), metadata.ino()))
}

// No stable volume/index query outside unix: key by the canonical path.
#[cfg(not(unix))]
fn identity_of(path: &Path, _metadata: &Metadata) -> io::Result<(u64, u64)> {
    let canonical = fs::canonicalize(path)?;
    let id = hash::hash_64(canonical.to_string_lossy().as_bytes());
    Ok((0, id))
}
