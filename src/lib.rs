/*!
 * prefixfs
 * Virtual filesystem layer: prefix://path routing, path sanitizing and
 * interchangeable storage adapters
 */

pub mod monitoring;
pub mod vfs;

// Re-exports
pub use monitoring::{init_tracing, span_operation};
pub use vfs::{
    init_manager, Adapter, CallArg, CallOutput, Drained, FileMetadata, FileType, Filesystem,
    Finder, FoundEntry, FsConfig, Local, Manager, MemoryAdapter, MountConfig, MountSpec,
    PermissionMap, Stream, VfsError, VfsResult, Visibility,
};
