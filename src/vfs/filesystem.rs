/*!
 * Filesystem
 * Path normalization, preconditions and config defaults over one adapter
 */

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, instrument};

use super::paths::{self, is_under};
use super::traits::Adapter;
use super::types::*;

/// Result of [`Filesystem::read_and_delete`]
///
/// The contents are always returned once read; `deleted` reports whether the
/// adapter actually removed the file afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drained {
    pub contents: Vec<u8>,
    pub deleted: bool,
}

/// Front end over a single adapter
///
/// Every path is normalized before it reaches the adapter, presence and
/// absence are checked up front, and per-call config is layered over the
/// filesystem defaults.
#[derive(Clone)]
pub struct Filesystem {
    adapter: Arc<dyn Adapter>,
    config: FsConfig,
}

impl Filesystem {
    pub fn new<A: Adapter + 'static>(adapter: A) -> Self {
        Self::from_shared(Arc::new(adapter))
    }

    /// Wrap an adapter that may already back other filesystems
    pub fn from_shared(adapter: Arc<dyn Adapter>) -> Self {
        Self {
            adapter,
            config: FsConfig::default(),
        }
    }

    /// Attach default config applied to every write, update, put and create_dir
    #[must_use]
    pub fn with_config(mut self, config: FsConfig) -> Self {
        self.config = config;
        self
    }

    pub fn adapter(&self) -> &Arc<dyn Adapter> {
        &self.adapter
    }

    pub fn config(&self) -> &FsConfig {
        &self.config
    }

    /// Whether a file or directory exists; the root itself never does
    pub fn exists(&self, path: &str) -> VfsResult<bool> {
        let path = paths::normalize(path)?;
        Ok(self.exists_normalized(&path))
    }

    pub fn read(&self, path: &str) -> VfsResult<Vec<u8>> {
        let path = self.present(path)?;
        self.adapter.read(&path)
    }

    pub fn read_stream(&self, path: &str) -> VfsResult<Stream> {
        let path = self.present(path)?;
        self.adapter.read_stream(&path)
    }

    /// Read a file, then delete it
    pub fn read_and_delete(&self, path: &str) -> VfsResult<Drained> {
        let path = self.present(path)?;
        let contents = self.adapter.read(&path)?;
        let deleted = self.adapter.delete(&path)?;

        if !deleted {
            debug!(adapter = self.adapter.name(), path = %path, "read but not deleted");
        }

        Ok(Drained { contents, deleted })
    }

    /// Entries below `directory`, sorted by path
    ///
    /// Directories only implied by deeper entries are filled in, and anything
    /// an adapter returns outside the requested scope is dropped.
    pub fn list_contents(&self, directory: &str, recursive: bool) -> VfsResult<Vec<FileMetadata>> {
        let directory = paths::normalize(directory)?;
        let listing = self.adapter.list_contents(&directory, recursive)?;
        Ok(format_listing(&directory, recursive, listing))
    }

    /// Create a new file; fails if it already exists
    #[instrument(skip(self, contents, config), fields(adapter = self.adapter.name(), len = contents.len()))]
    pub fn write(&self, path: &str, contents: &[u8], config: &FsConfig) -> VfsResult<bool> {
        let path = self.absent(path)?;
        self.adapter.write(&path, contents, &self.config.merged(config))
    }

    pub fn write_stream(&self, path: &str, stream: &mut Stream, config: &FsConfig) -> VfsResult<bool> {
        let path = self.absent(path)?;
        let config = self.config.merged(config);
        self.rewind_stream(stream)?;
        self.adapter.write_stream(&path, stream, &config)
    }

    /// Replace the contents of an existing file
    #[instrument(skip(self, contents, config), fields(adapter = self.adapter.name(), len = contents.len()))]
    pub fn update(&self, path: &str, contents: &[u8], config: &FsConfig) -> VfsResult<bool> {
        let path = self.present(path)?;
        self.adapter.update(&path, contents, &self.config.merged(config))
    }

    pub fn update_stream(&self, path: &str, stream: &mut Stream, config: &FsConfig) -> VfsResult<bool> {
        let path = self.present(path)?;
        let config = self.config.merged(config);
        self.rewind_stream(stream)?;
        self.adapter.update_stream(&path, stream, &config)
    }

    /// Write or update, whichever applies
    pub fn put(&self, path: &str, contents: &[u8], config: &FsConfig) -> VfsResult<bool> {
        let path = paths::normalize(path)?;
        let config = self.config.merged(config);

        if self.exists_normalized(&path) {
            self.adapter.update(&path, contents, &config)
        } else {
            self.adapter.write(&path, contents, &config)
        }
    }

    pub fn put_stream(&self, path: &str, stream: &mut Stream, config: &FsConfig) -> VfsResult<bool> {
        let path = paths::normalize(path)?;
        let config = self.config.merged(config);
        self.rewind_stream(stream)?;

        if self.exists_normalized(&path) {
            self.adapter.update_stream(&path, stream, &config)
        } else {
            self.adapter.write_stream(&path, stream, &config)
        }
    }

    /// Move a file; the destination must not exist
    pub fn rename(&self, path: &str, new_path: &str) -> VfsResult<bool> {
        let path = self.present(path)?;
        let new_path = self.absent(new_path)?;
        debug!(adapter = self.adapter.name(), from = %path, to = %new_path, "rename");
        self.adapter.rename(&path, &new_path)
    }

    pub fn delete(&self, path: &str) -> VfsResult<bool> {
        let path = self.present(path)?;
        self.adapter.delete(&path)
    }

    pub fn create_dir(&self, dirname: &str, config: &FsConfig) -> VfsResult<bool> {
        let dirname = paths::normalize(dirname)?;
        self.adapter.create_dir(&dirname, &self.config.merged(config))
    }

    /// Remove a directory recursively; the root cannot be deleted
    pub fn delete_dir(&self, dirname: &str) -> VfsResult<bool> {
        let dirname = paths::normalize(dirname)?;

        if dirname.is_empty() {
            return Err(VfsError::directory_not_exists(self.adapter.name(), &dirname));
        }

        self.adapter.delete_dir(&dirname)
    }

    pub fn get_mime_type(&self, path: &str) -> VfsResult<String> {
        let path = self.present(path)?;
        self.adapter.get_mime_type(&path)
    }

    /// Metadata for one entry; `None` for symbolic links
    pub fn get_metadata(&self, path: &str) -> VfsResult<Option<FileMetadata>> {
        let path = self.present(path)?;
        self.adapter.get_metadata(&path)
    }

    pub fn get_visibility(&self, path: &str) -> VfsResult<Visibility> {
        let path = self.present(path)?;
        self.adapter.get_visibility(&path)
    }

    pub fn set_visibility(&self, path: &str, visibility: Visibility) -> VfsResult<bool> {
        let path = self.present(path)?;
        self.adapter.set_visibility(&path, visibility)
    }

    /// Rewind a seekable stream that has already been read from
    ///
    /// Pipes are handed on untouched; whatever is left in them is what gets
    /// written.
    pub fn rewind_stream(&self, stream: &mut Stream) -> VfsResult<()> {
        match stream.rewind() {
            Ok(true) => Ok(()),
            Ok(false) => {
                debug!(adapter = self.adapter.name(), "stream is not rewindable, passing through");
                Ok(())
            }
            Err(e) => Err(VfsError::Io {
                adapter: self.adapter.name().to_string(),
                message: format!("failed to rewind stream: {}", e),
            }),
        }
    }

    fn exists_normalized(&self, path: &str) -> bool {
        !path.is_empty() && self.adapter.exists(path)
    }

    fn present(&self, path: &str) -> VfsResult<String> {
        let path = paths::normalize(path)?;
        if !self.exists_normalized(&path) {
            return Err(VfsError::file_not_exists(self.adapter.name(), &path));
        }
        Ok(path)
    }

    fn absent(&self, path: &str) -> VfsResult<String> {
        let path = paths::normalize(path)?;
        if self.exists_normalized(&path) {
            return Err(VfsError::file_exists(self.adapter.name(), &path));
        }
        Ok(path)
    }
}

impl std::fmt::Debug for Filesystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Filesystem")
            .field("adapter", &self.adapter.name())
            .field("config", &self.config)
            .finish()
    }
}

/// Scope, fill in and sort an adapter listing
fn format_listing(directory: &str, recursive: bool, listing: Vec<FileMetadata>) -> Vec<FileMetadata> {
    let mut entries: BTreeMap<String, FileMetadata> = BTreeMap::new();

    for entry in listing {
        if !is_under(&entry.path, directory) {
            continue;
        }

        // Parents between the listed directory and the entry
        let mut parent = paths::parent(&entry.path);
        while let Some(dir) = parent {
            if !is_under(dir, directory) {
                break;
            }
            entries
                .entry(dir.to_string())
                .or_insert_with(|| FileMetadata::dir(dir, entry.timestamp));
            parent = paths::parent(dir);
        }

        entries.insert(entry.path.clone(), entry);
    }

    entries
        .into_values()
        .filter(|entry| recursive || entry.dirname() == directory)
        .collect()
}
