/*!
 * VFS Error Types
 * Structured, type-safe error handling for filesystem operations
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// VFS operation result
///
/// # Must Use
/// VFS operations can fail and must be handled to prevent data loss
#[must_use = "VFS operations can fail and must be handled"]
pub type VfsResult<T> = Result<T, VfsError>;

/// VFS errors with structured, type-safe error handling
///
/// Precondition violations (missing or existing targets) carry the name of the
/// adapter that was asked and the normalized path. Low-level I/O failures of
/// mutating calls are not errors at all: they come back as `Ok(false)`.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(rename_all = "snake_case", tag = "error", content = "details")]
pub enum VfsError {
    #[error("Path out of range: {path}")]
    #[diagnostic(
        code(vfs::path_out_of_range),
        help("The path climbs above the filesystem root with '..'. Remove the extra parent segments.")
    )]
    PathOutOfRange { path: String },

    #[error("Adapter {adapter}: file {path} does not exist")]
    #[diagnostic(
        code(vfs::file_not_exists),
        help("Create the file first with write() or use put() to upsert.")
    )]
    FileNotExists { adapter: String, path: String },

    #[error("Adapter {adapter}: file {path} already exists")]
    #[diagnostic(
        code(vfs::file_exists),
        help("write() never overwrites. Use update() or put() instead.")
    )]
    FileExists { adapter: String, path: String },

    #[error("Adapter {adapter}: failed to read file {path}")]
    #[diagnostic(
        code(vfs::file_read_failure),
        help("The file exists but could not be opened or read. Check permissions.")
    )]
    FileReadFailure { adapter: String, path: String },

    #[error("Adapter {adapter}: directory {path} does not exist")]
    #[diagnostic(code(vfs::directory_not_exists))]
    DirectoryNotExists { adapter: String, path: String },

    #[error("Adapter {adapter}: directory {path} already exists")]
    #[diagnostic(code(vfs::directory_exists))]
    DirectoryExists { adapter: String, path: String },

    #[error("Adapter {adapter}: failed to create directory {path}")]
    #[diagnostic(
        code(vfs::directory_create_failure),
        help("Check that the parent directory is writable.")
    )]
    DirectoryCreateFailure { adapter: String, path: String },

    #[error("Adapter {adapter}: directory {path} is not readable")]
    #[diagnostic(code(vfs::directory_unreadable))]
    DirectoryUnreadable { adapter: String, path: String },

    #[error("Adapter {adapter}: {message}")]
    #[diagnostic(code(vfs::io))]
    Io { adapter: String, message: String },

    #[error("Filesystem prefix {prefix} is not mounted")]
    #[diagnostic(
        code(vfs::prefix_undefined),
        help("Mount a filesystem under this prefix with mount_filesystem() first.")
    )]
    PrefixUndefined { prefix: String },

    #[error("Filesystem prefix must be a non-empty string and paths must look like prefix://path")]
    #[diagnostic(code(vfs::prefix_type_error))]
    PrefixTypeError,

    #[error("Filesystem path must be a non-empty string")]
    #[diagnostic(code(vfs::path_type_error))]
    PathTypeError,

    #[error("Method {method} was called without arguments")]
    #[diagnostic(
        code(vfs::method_arguments_undefined),
        help("The first argument must be a prefix://path URI.")
    )]
    MethodArgumentsUndefined { method: String },

    #[error("Method {method} expects {expected} as argument {position}")]
    #[diagnostic(code(vfs::argument_type_error))]
    ArgumentTypeError {
        method: String,
        position: usize,
        expected: String,
    },

    #[error("Filesystem {prefix} has no method {method}")]
    #[diagnostic(code(vfs::bad_method_call))]
    BadMethodCall { prefix: String, method: String },

    #[error("Only stream handles can be rewound")]
    #[diagnostic(code(vfs::rewind_resource_type_error))]
    RewindResourceTypeError,

    #[error("Invalid visibility: {value}")]
    #[diagnostic(code(vfs::invalid_visibility), help("Use \"public\" or \"private\"."))]
    InvalidVisibility { value: String },

    #[error("Finder needs at least one directory to search, call in_dir() first")]
    #[diagnostic(code(vfs::find_in_path_undefined))]
    FindInPathUndefined,

    #[error("Invalid mount configuration: {message}")]
    #[diagnostic(
        code(vfs::invalid_config),
        help("Each mount needs an adapter (local or memory); local mounts also need a root.")
    )]
    InvalidConfig { message: String },

    #[error("Invalid name pattern {pattern}: {message}")]
    #[diagnostic(code(vfs::invalid_pattern))]
    InvalidPattern { pattern: String, message: String },
}

impl VfsError {
    pub(crate) fn file_not_exists(adapter: &str, path: &str) -> Self {
        Self::FileNotExists {
            adapter: adapter.to_string(),
            path: path.to_string(),
        }
    }

    pub(crate) fn file_exists(adapter: &str, path: &str) -> Self {
        Self::FileExists {
            adapter: adapter.to_string(),
            path: path.to_string(),
        }
    }

    pub(crate) fn directory_not_exists(adapter: &str, path: &str) -> Self {
        Self::DirectoryNotExists {
            adapter: adapter.to_string(),
            path: path.to_string(),
        }
    }

    pub(crate) fn directory_exists(adapter: &str, path: &str) -> Self {
        Self::DirectoryExists {
            adapter: adapter.to_string(),
            path: path.to_string(),
        }
    }

    /// File-targeting precondition or read failure
    #[must_use]
    pub const fn is_file_error(&self) -> bool {
        matches!(
            self,
            Self::FileNotExists { .. } | Self::FileExists { .. } | Self::FileReadFailure { .. }
        )
    }

    /// Directory-targeting precondition or setup failure
    #[must_use]
    pub const fn is_directory_error(&self) -> bool {
        matches!(
            self,
            Self::DirectoryNotExists { .. }
                | Self::DirectoryExists { .. }
                | Self::DirectoryCreateFailure { .. }
                | Self::DirectoryUnreadable { .. }
        )
    }

    /// Manager-level mount, lookup or dispatch failure
    #[must_use]
    pub const fn is_manager_error(&self) -> bool {
        matches!(
            self,
            Self::PrefixUndefined { .. }
                | Self::PrefixTypeError
                | Self::PathTypeError
                | Self::MethodArgumentsUndefined { .. }
                | Self::ArgumentTypeError { .. }
                | Self::BadMethodCall { .. }
        )
    }

    /// Name of the adapter that raised the error, when known
    #[must_use]
    pub fn adapter(&self) -> Option<&str> {
        match self {
            Self::FileNotExists { adapter, .. }
            | Self::FileExists { adapter, .. }
            | Self::FileReadFailure { adapter, .. }
            | Self::DirectoryNotExists { adapter, .. }
            | Self::DirectoryExists { adapter, .. }
            | Self::DirectoryCreateFailure { adapter, .. }
            | Self::DirectoryUnreadable { adapter, .. }
            | Self::Io { adapter, .. } => Some(adapter),
            _ => None,
        }
    }

    /// Path the error refers to, when there is one
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::PathOutOfRange { path }
            | Self::FileNotExists { path, .. }
            | Self::FileExists { path, .. }
            | Self::FileReadFailure { path, .. }
            | Self::DirectoryNotExists { path, .. }
            | Self::DirectoryExists { path, .. }
            | Self::DirectoryCreateFailure { path, .. }
            | Self::DirectoryUnreadable { path, .. } => Some(path),
            _ => None,
        }
    }
}
