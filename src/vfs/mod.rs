/*!
 * Virtual File System Module
 * Prefix-mounted filesystems over pluggable storage adapters
 */

pub mod dispatch;
pub mod filesystem;
pub mod finder;
pub mod init;
pub mod local;
pub mod memory;
pub mod mime;
pub mod mount;
pub mod paths;
pub mod traits;
pub mod types;

// Re-exports
pub use dispatch::{CallArg, CallOutput, CALLABLE_METHODS};
pub use filesystem::{Drained, Filesystem};
pub use finder::{Finder, FoundEntry};
pub use init::{init_manager, AdapterSpec, MountConfig, MountSpec};
pub use local::Local;
pub use memory::MemoryAdapter;
pub use mount::Manager;
pub use paths::normalize;
pub use traits::Adapter;
pub use types::{
    FileMetadata, FileType, FsConfig, PermissionMap, Stream, VfsError, VfsResult, Visibility,
    VisibilityModes,
};
