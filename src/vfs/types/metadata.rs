/*!
 * VFS Metadata
 * Listing and stat records produced by adapters
 */

use super::file_type::FileType;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Metadata for one entry below an adapter root
///
/// `path` is relative to the adapter root and never carries the base path.
/// `size` is only present for files. `filesystem` is filled in by the
/// manager with the prefix the entry was listed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FileMetadata {
    #[serde(rename = "type")]
    pub file_type: FileType,
    pub path: String,
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub filesystem: Option<String>,
}

impl FileMetadata {
    #[must_use]
    pub fn file(path: impl Into<String>, timestamp: i64, size: u64) -> Self {
        Self {
            file_type: FileType::File,
            path: path.into(),
            timestamp,
            size: Some(size),
            filesystem: None,
        }
    }

    #[must_use]
    pub fn dir(path: impl Into<String>, timestamp: i64) -> Self {
        Self {
            file_type: FileType::Dir,
            path: path.into(),
            timestamp,
            size: None,
            filesystem: None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_dir(&self) -> bool {
        matches!(self.file_type, FileType::Dir)
    }

    #[inline]
    #[must_use]
    pub const fn is_file(&self) -> bool {
        matches!(self.file_type, FileType::File)
    }

    /// Parent path, empty for entries directly under the root
    #[must_use]
    pub fn dirname(&self) -> &str {
        self.path.rsplit_once('/').map_or("", |(parent, _)| parent)
    }

    /// Last path segment
    #[must_use]
    pub fn basename(&self) -> &str {
        self.path.rsplit_once('/').map_or(self.path.as_str(), |(_, name)| name)
    }
}

/// Seconds since the UNIX epoch, clamped to zero for pre-epoch times
pub(crate) fn unix_timestamp(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
