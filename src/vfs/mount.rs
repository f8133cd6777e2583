/*!
 * Mount Manager
 * Routes prefix://path URIs to mounted filesystems
 */

use ahash::RandomState;
use dashmap::DashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::filesystem::{Drained, Filesystem};
use super::types::*;
use crate::monitoring::span_operation;

const PREFIX_SEPARATOR: &str = "://";

/// Prefix to filesystem routing table
///
/// Clones share the same mount table, so a manager can be handed to several
/// threads and mounts made through one handle are visible to all of them.
#[derive(Clone)]
pub struct Manager {
    filesystems: Arc<DashMap<String, Arc<Filesystem>, RandomState>>,
}

impl Manager {
    pub fn new() -> Self {
        Self {
            filesystems: Arc::new(DashMap::with_hasher(RandomState::new())),
        }
    }

    /// Build a manager with a set of filesystems already mounted
    pub fn with_filesystems<I, P, F>(filesystems: I) -> VfsResult<Self>
    where
        I: IntoIterator<Item = (P, F)>,
        P: AsRef<str>,
        F: Into<Arc<Filesystem>>,
    {
        let manager = Self::new();
        manager.mount_filesystems(filesystems)?;
        Ok(manager)
    }

    pub fn mount_filesystems<I, P, F>(&self, filesystems: I) -> VfsResult<&Self>
    where
        I: IntoIterator<Item = (P, F)>,
        P: AsRef<str>,
        F: Into<Arc<Filesystem>>,
    {
        for (prefix, filesystem) in filesystems {
            self.mount_filesystem(prefix.as_ref(), filesystem)?;
        }
        Ok(self)
    }

    /// Mount a filesystem under `prefix`, replacing any previous mount
    pub fn mount_filesystem(
        &self,
        prefix: &str,
        filesystem: impl Into<Arc<Filesystem>>,
    ) -> VfsResult<&Self> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return Err(VfsError::PrefixTypeError);
        }

        let filesystem = filesystem.into();
        info!(prefix = %prefix, adapter = filesystem.adapter().name(), "filesystem mounted");

        if self.filesystems.insert(prefix.to_string(), filesystem).is_some() {
            debug!(prefix = %prefix, "previous mount replaced");
        }
        Ok(self)
    }

    /// Remove a mount, returning the filesystem that was under it
    pub fn unmount(&self, prefix: &str) -> Option<Arc<Filesystem>> {
        let removed = self.filesystems.remove(prefix.trim()).map(|(_, fs)| fs);
        if removed.is_some() {
            info!(prefix = %prefix, "filesystem unmounted");
        }
        removed
    }

    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.filesystems.contains_key(prefix.trim())
    }

    /// Mounted prefixes in sorted order
    pub fn prefixes(&self) -> Vec<String> {
        let mut prefixes: Vec<String> = self
            .filesystems
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        prefixes.sort();
        prefixes
    }

    /// Filesystem mounted under `prefix`; surrounding whitespace is ignored
    /// here as it is when mounting
    pub fn get_filesystem(&self, prefix: &str) -> VfsResult<Arc<Filesystem>> {
        let prefix = prefix.trim();
        self.filesystems
            .get(prefix)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| VfsError::PrefixUndefined {
                prefix: prefix.to_string(),
            })
    }

    /// Split `prefix://path` at the first separator, trimming the prefix
    pub fn get_prefix_and_path(uri: &str) -> VfsResult<(&str, &str)> {
        uri.split_once(PREFIX_SEPARATOR)
            .map(|(prefix, path)| (prefix.trim(), path))
            .ok_or(VfsError::PrefixTypeError)
    }

    /// Resolve a URI to its prefix, mounted filesystem and inner path
    fn resolve<'a>(&self, uri: &'a str) -> VfsResult<(&'a str, Arc<Filesystem>, &'a str)> {
        let (prefix, path) = Self::get_prefix_and_path(uri)?;
        let filesystem = self.get_filesystem(prefix)?;
        Ok((prefix, filesystem, path))
    }

    /// List a directory, tagging each entry with the prefix it came from
    pub fn list_contents(&self, uri: &str, recursive: bool) -> VfsResult<Vec<FileMetadata>> {
        let (prefix, fs, directory) = self.resolve(uri)?;
        let mut listing = fs.list_contents(directory, recursive)?;

        for entry in &mut listing {
            entry.filesystem = Some(prefix.to_string());
        }
        Ok(listing)
    }

    /// Stream a file from one URI into a new file at another
    ///
    /// Returns `Ok(false)` when the destination adapter declines the write.
    pub fn copy(&self, from: &str, to: &str, config: &FsConfig) -> VfsResult<bool> {
        let span = span_operation("copy");
        let _guard = span.enter();

        let result = self.copy_streamed(from, to, config);
        span.record_outcome(&result);
        result
    }

    fn copy_streamed(&self, from: &str, to: &str, config: &FsConfig) -> VfsResult<bool> {
        let (_, source, from_path) = self.resolve(from)?;
        let (_, destination, to_path) = self.resolve(to)?;

        let mut stream = source.read_stream(from_path)?;
        let copied = destination.write_stream(to_path, &mut stream, config)?;

        if !copied {
            warn!(from = %from, to = %to, "copy declined by destination");
        }
        Ok(copied)
    }

    /// Move a file between URIs
    ///
    /// Within one prefix this is a rename, and a `visibility` in `config` is
    /// applied afterwards. Across prefixes the file is copied and the source
    /// deleted; a failure between the two steps leaves both copies in place.
    pub fn move_file(&self, from: &str, to: &str, config: &FsConfig) -> VfsResult<bool> {
        let span = span_operation("move");
        let _guard = span.enter();

        let result = self.move_between(from, to, config);
        span.record_outcome(&result);
        result
    }

    fn move_between(&self, from: &str, to: &str, config: &FsConfig) -> VfsResult<bool> {
        let (prefix_from, source, path_from) = self.resolve(from)?;
        let (prefix_to, _, path_to) = self.resolve(to)?;

        if prefix_from == prefix_to {
            let renamed = source.rename(path_from, path_to)?;
            return match config.visibility {
                Some(visibility) if renamed => source.set_visibility(path_to, visibility),
                _ => Ok(renamed),
            };
        }

        if self.copy(from, to, config)? {
            source.delete(path_from)
        } else {
            Ok(false)
        }
    }

    pub fn exists(&self, uri: &str) -> VfsResult<bool> {
        let (_, fs, path) = self.resolve(uri)?;
        fs.exists(path)
    }

    pub fn read(&self, uri: &str) -> VfsResult<Vec<u8>> {
        let (_, fs, path) = self.resolve(uri)?;
        fs.read(path)
    }

    pub fn read_stream(&self, uri: &str) -> VfsResult<Stream> {
        let (_, fs, path) = self.resolve(uri)?;
        fs.read_stream(path)
    }

    pub fn read_and_delete(&self, uri: &str) -> VfsResult<Drained> {
        let (_, fs, path) = self.resolve(uri)?;
        fs.read_and_delete(path)
    }

    pub fn write(&self, uri: &str, contents: &[u8], config: &FsConfig) -> VfsResult<bool> {
        let (_, fs, path) = self.resolve(uri)?;
        fs.write(path, contents, config)
    }

    pub fn write_stream(&self, uri: &str, stream: &mut Stream, config: &FsConfig) -> VfsResult<bool> {
        let (_, fs, path) = self.resolve(uri)?;
        fs.write_stream(path, stream, config)
    }

    pub fn update(&self, uri: &str, contents: &[u8], config: &FsConfig) -> VfsResult<bool> {
        let (_, fs, path) = self.resolve(uri)?;
        fs.update(path, contents, config)
    }

    pub fn update_stream(&self, uri: &str, stream: &mut Stream, config: &FsConfig) -> VfsResult<bool> {
        let (_, fs, path) = self.resolve(uri)?;
        fs.update_stream(path, stream, config)
    }

    pub fn put(&self, uri: &str, contents: &[u8], config: &FsConfig) -> VfsResult<bool> {
        let (_, fs, path) = self.resolve(uri)?;
        fs.put(path, contents, config)
    }

    pub fn put_stream(&self, uri: &str, stream: &mut Stream, config: &FsConfig) -> VfsResult<bool> {
        let (_, fs, path) = self.resolve(uri)?;
        fs.put_stream(path, stream, config)
    }

    /// Rename within the filesystem of `uri`; `new_path` carries no prefix
    pub fn rename(&self, uri: &str, new_path: &str) -> VfsResult<bool> {
        let (_, fs, path) = self.resolve(uri)?;
        fs.rename(path, new_path)
    }

    pub fn delete(&self, uri: &str) -> VfsResult<bool> {
        let (_, fs, path) = self.resolve(uri)?;
        fs.delete(path)
    }

    pub fn create_dir(&self, uri: &str, config: &FsConfig) -> VfsResult<bool> {
        let (_, fs, path) = self.resolve(uri)?;
        fs.create_dir(path, config)
    }

    pub fn delete_dir(&self, uri: &str) -> VfsResult<bool> {
        let (_, fs, path) = self.resolve(uri)?;
        fs.delete_dir(path)
    }

    pub fn get_mime_type(&self, uri: &str) -> VfsResult<String> {
        let (_, fs, path) = self.resolve(uri)?;
        fs.get_mime_type(path)
    }

    pub fn get_metadata(&self, uri: &str) -> VfsResult<Option<FileMetadata>> {
        let (_, fs, path) = self.resolve(uri)?;
        fs.get_metadata(path)
    }

    pub fn get_visibility(&self, uri: &str) -> VfsResult<Visibility> {
        let (_, fs, path) = self.resolve(uri)?;
        fs.get_visibility(path)
    }

    pub fn set_visibility(&self, uri: &str, visibility: Visibility) -> VfsResult<bool> {
        let (_, fs, path) = self.resolve(uri)?;
        fs.set_visibility(path, visibility)
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("prefixes", &self.prefixes())
            .finish()
    }
}
