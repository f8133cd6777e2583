/*!
 * In-Memory Adapter
 * Fast, volatile storage for testing and temporary files
 */

use ahash::RandomState;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::SystemTime;

use tracing::warn;

use super::mime;
use super::paths::{is_under, parent};
use super::traits::Adapter;
use super::types::*;

const ADAPTER_NAME: &str = "memory";

/// In-memory filesystem node
#[derive(Debug, Clone)]
enum Node {
    File {
        data: Vec<u8>,
        mode: u32,
        modified: SystemTime,
    },
    Directory {
        mode: u32,
        modified: SystemTime,
    },
}

impl Node {
    fn is_dir(&self) -> bool {
        matches!(self, Node::Directory { .. })
    }

    fn mode(&self) -> u32 {
        match self {
            Node::File { mode, .. } | Node::Directory { mode, .. } => *mode,
        }
    }

    fn set_mode(&mut self, new_mode: u32) {
        match self {
            Node::File { mode, .. } | Node::Directory { mode, .. } => *mode = new_mode,
        }
    }

    fn metadata(&self, path: &str) -> FileMetadata {
        match self {
            Node::File { data, modified, .. } => {
                FileMetadata::file(path, unix_timestamp(*modified), data.len() as u64)
            }
            Node::Directory { modified, .. } => FileMetadata::dir(path, unix_timestamp(*modified)),
        }
    }
}

/// Volatile adapter keeping every entry in a concurrent map
///
/// The root (empty path) always exists and is not stored. Clones share the
/// same storage, so one instance can back several mounts.
#[derive(Debug, Clone)]
pub struct MemoryAdapter {
    nodes: Arc<DashMap<String, Node, RandomState>>,
    permissions: PermissionMap,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::with_permissions(PermissionMap::default())
    }

    pub fn with_permissions(permissions: PermissionMap) -> Self {
        Self {
            nodes: Arc::new(DashMap::with_hasher(RandomState::new())),
            permissions,
        }
    }

    fn not_exists(path: &str) -> VfsError {
        VfsError::file_not_exists(ADAPTER_NAME, path)
    }

    fn is_dir(&self, path: &str) -> bool {
        path.is_empty() || self.nodes.get(path).map_or(false, |node| node.is_dir())
    }

    /// Create every missing ancestor directory of `path`
    fn ensure_parents(&self, path: &str) -> VfsResult<()> {
        let Some(parent_path) = parent(path) else {
            return Ok(());
        };

        let mut current = String::with_capacity(parent_path.len());
        for segment in parent_path.split('/') {
            if !current.is_empty() {
                current.push('/');
            }
            current.push_str(segment);

            let entry = self.nodes.entry(current.clone()).or_insert_with(|| Node::Directory {
                mode: self.permissions.dir_mode(Visibility::Public),
                modified: SystemTime::now(),
            });

            if !entry.is_dir() {
                return Err(VfsError::DirectoryCreateFailure {
                    adapter: ADAPTER_NAME.to_string(),
                    path: current,
                });
            }
        }

        Ok(())
    }

    fn file_mode(&self, config: &FsConfig) -> u32 {
        self.permissions
            .file_mode(config.visibility.unwrap_or_default())
    }

    fn store_new(&self, path: &str, data: Vec<u8>, config: &FsConfig) -> VfsResult<bool> {
        self.ensure_parents(path)?;

        match self.nodes.entry(path.to_string()) {
            Entry::Occupied(_) => Err(VfsError::file_exists(ADAPTER_NAME, path)),
            Entry::Vacant(slot) => {
                slot.insert(Node::File {
                    data,
                    mode: self.file_mode(config),
                    modified: SystemTime::now(),
                });
                Ok(true)
            }
        }
    }

    fn replace(&self, path: &str, data: Vec<u8>, config: &FsConfig) -> VfsResult<bool> {
        let mut node = self.nodes.get_mut(path).ok_or_else(|| Self::not_exists(path))?;

        match node.value_mut() {
            Node::File {
                data: old,
                mode,
                modified,
            } => {
                *old = data;
                *modified = SystemTime::now();
                if let Some(visibility) = config.visibility {
                    *mode = self.permissions.file_mode(visibility);
                }
                Ok(true)
            }
            Node::Directory { .. } => Ok(false),
        }
    }

    fn drain(path: &str, stream: &mut Stream) -> Option<Vec<u8>> {
        match stream.read_all() {
            Ok(data) => Some(data),
            Err(e) => {
                warn!(adapter = ADAPTER_NAME, path = %path, error = %e, "stream read failed");
                None
            }
        }
    }
}

impl Default for MemoryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Adapter for MemoryAdapter {
    fn name(&self) -> &str {
        ADAPTER_NAME
    }

    fn exists(&self, path: &str) -> bool {
        path.is_empty() || self.nodes.contains_key(path)
    }

    fn read(&self, path: &str) -> VfsResult<Vec<u8>> {
        match self.nodes.get(path).map(|n| n.value().clone()) {
            Some(Node::File { data, .. }) => Ok(data),
            Some(Node::Directory { .. }) => Err(VfsError::FileReadFailure {
                adapter: ADAPTER_NAME.to_string(),
                path: path.to_string(),
            }),
            None => Err(Self::not_exists(path)),
        }
    }

    fn read_stream(&self, path: &str) -> VfsResult<Stream> {
        self.read(path).map(Stream::from_bytes)
    }

    fn list_contents(&self, directory: &str, recursive: bool) -> VfsResult<Vec<FileMetadata>> {
        if !self.is_dir(directory) {
            return Ok(Vec::new());
        }

        let mut list: Vec<FileMetadata> = self
            .nodes
            .iter()
            .filter(|entry| {
                let path = entry.key();
                is_under(path, directory)
                    && (recursive || parent(path).unwrap_or("") == directory)
            })
            .map(|entry| entry.value().metadata(entry.key()))
            .collect();

        list.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(list)
    }

    fn write(&self, path: &str, contents: &[u8], config: &FsConfig) -> VfsResult<bool> {
        if self.exists(path) {
            return Err(VfsError::file_exists(ADAPTER_NAME, path));
        }
        self.store_new(path, contents.to_vec(), config)
    }

    fn write_stream(&self, path: &str, stream: &mut Stream, config: &FsConfig) -> VfsResult<bool> {
        if self.exists(path) {
            return Err(VfsError::file_exists(ADAPTER_NAME, path));
        }
        match Self::drain(path, stream) {
            Some(data) => self.store_new(path, data, config),
            None => Ok(false),
        }
    }

    fn update(&self, path: &str, contents: &[u8], config: &FsConfig) -> VfsResult<bool> {
        if !self.exists(path) {
            return Err(Self::not_exists(path));
        }
        self.replace(path, contents.to_vec(), config)
    }

    fn update_stream(
        &self,
        path: &str,
        stream: &mut Stream,
        config: &FsConfig,
    ) -> VfsResult<bool> {
        if !self.exists(path) {
            return Err(Self::not_exists(path));
        }
        match Self::drain(path, stream) {
            Some(data) => self.replace(path, data, config),
            None => Ok(false),
        }
    }

    fn get_metadata(&self, path: &str) -> VfsResult<Option<FileMetadata>> {
        if path.is_empty() {
            return Ok(Some(FileMetadata::dir("", 0)));
        }
        self.nodes
            .get(path)
            .map(|node| Some(node.metadata(path)))
            .ok_or_else(|| Self::not_exists(path))
    }

    fn get_mime_type(&self, path: &str) -> VfsResult<String> {
        if self.is_dir(path) {
            return Ok("directory".to_string());
        }

        let data = self.read(path)?;
        let head = &data[..data.len().min(8192)];
        Ok(mime::detect(path, head).to_string())
    }

    fn rename(&self, path: &str, new_path: &str) -> VfsResult<bool> {
        let node = match self.nodes.remove(path) {
            Some((_, node)) => node,
            None => return Err(Self::not_exists(path)),
        };

        if let Err(e) = self.ensure_parents(new_path) {
            self.nodes.insert(path.to_string(), node);
            return Err(e);
        }

        if node.is_dir() {
            let children: Vec<String> = self
                .nodes
                .iter()
                .filter(|entry| is_under(entry.key(), path))
                .map(|entry| entry.key().clone())
                .collect();

            for child in children {
                if let Some((_, moved)) = self.nodes.remove(&child) {
                    let suffix = &child[path.len()..];
                    self.nodes.insert(format!("{}{}", new_path, suffix), moved);
                }
            }
        }

        self.nodes.insert(new_path.to_string(), node);
        Ok(true)
    }

    fn delete(&self, path: &str) -> VfsResult<bool> {
        match self.nodes.get(path).map(|node| node.is_dir()) {
            None => Err(Self::not_exists(path)),
            Some(true) => Ok(false),
            Some(false) => Ok(self.nodes.remove(path).is_some()),
        }
    }

    fn create_dir(&self, dirname: &str, config: &FsConfig) -> VfsResult<bool> {
        if self.is_dir(dirname) {
            return Err(VfsError::directory_exists(ADAPTER_NAME, dirname));
        }
        if self.nodes.contains_key(dirname) {
            return Ok(false);
        }

        self.ensure_parents(dirname)?;
        let visibility = config.visibility.unwrap_or_default();
        self.nodes.insert(
            dirname.to_string(),
            Node::Directory {
                mode: self.permissions.dir_mode(visibility),
                modified: SystemTime::now(),
            },
        );
        Ok(true)
    }

    fn delete_dir(&self, dirname: &str) -> VfsResult<bool> {
        if !self.is_dir(dirname) {
            return Err(VfsError::directory_not_exists(ADAPTER_NAME, dirname));
        }

        self.nodes.retain(|key, _| !is_under(key, dirname));
        if !dirname.is_empty() {
            self.nodes.remove(dirname);
        }
        Ok(true)
    }

    fn get_visibility(&self, path: &str) -> VfsResult<Visibility> {
        if path.is_empty() {
            return Ok(Visibility::from_mode(
                self.permissions.dir_mode(Visibility::Public),
            ));
        }
        self.nodes
            .get(path)
            .map(|node| Visibility::from_mode(node.mode()))
            .ok_or_else(|| Self::not_exists(path))
    }

    fn set_visibility(&self, path: &str, visibility: Visibility) -> VfsResult<bool> {
        let mut node = self.nodes.get_mut(path).ok_or_else(|| Self::not_exists(path))?;
        let mode = if node.is_dir() {
            self.permissions.dir_mode(visibility)
        } else {
            self.permissions.file_mode(visibility)
        };
        node.set_mode(mode);
        Ok(true)
    }
}
