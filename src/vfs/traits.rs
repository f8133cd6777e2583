/*!
 * VFS Traits
 * Contract every storage adapter implements
 */

use super::types::*;

/// Storage adapter contract
///
/// Paths handed to an adapter are already normalized by [`Filesystem`]:
/// slash separated, relative to the adapter root, with no `.` or `..`
/// segments. Adapters still check their own preconditions so that they
/// are safe to use directly.
///
/// Error conventions:
/// - precondition violations (missing or existing target) are typed errors
/// - I/O failures of mutating calls return `Ok(false)`
/// - read and stream-open failures are errors, there is no useful
///   non-error value to return
///
/// [`Filesystem`]: super::Filesystem
pub trait Adapter: Send + Sync {
    /// Short adapter name used in error messages and logs
    fn name(&self) -> &str;

    /// Check if file/directory exists
    fn exists(&self, path: &str) -> bool;

    /// Read entire file contents
    fn read(&self, path: &str) -> VfsResult<Vec<u8>>;

    /// Open a readable stream over the file
    fn read_stream(&self, path: &str) -> VfsResult<Stream>;

    /// Metadata for the entries below `directory`
    ///
    /// A missing directory lists as empty. Symbolic links are left out.
    fn list_contents(&self, directory: &str, recursive: bool) -> VfsResult<Vec<FileMetadata>>;

    /// Create a new file; never overwrites
    fn write(&self, path: &str, contents: &[u8], config: &FsConfig) -> VfsResult<bool>;

    /// Create a new file from a stream; never overwrites
    fn write_stream(&self, path: &str, stream: &mut Stream, config: &FsConfig) -> VfsResult<bool>;

    /// Replace the contents of an existing file
    fn update(&self, path: &str, contents: &[u8], config: &FsConfig) -> VfsResult<bool>;

    /// Replace the contents of an existing file from a stream
    fn update_stream(&self, path: &str, stream: &mut Stream, config: &FsConfig)
        -> VfsResult<bool>;

    /// Metadata for one entry; `None` when the entry is a symbolic link
    fn get_metadata(&self, path: &str) -> VfsResult<Option<FileMetadata>>;

    fn get_mime_type(&self, path: &str) -> VfsResult<String>;

    /// Move a file; the destination is not checked and may be overwritten
    fn rename(&self, path: &str, new_path: &str) -> VfsResult<bool>;

    fn delete(&self, path: &str) -> VfsResult<bool>;

    fn create_dir(&self, dirname: &str, config: &FsConfig) -> VfsResult<bool>;

    /// Remove a directory and everything below it
    fn delete_dir(&self, dirname: &str) -> VfsResult<bool>;

    fn get_visibility(&self, path: &str) -> VfsResult<Visibility>;

    fn set_visibility(&self, path: &str, visibility: Visibility) -> VfsResult<bool>;
}
