/*!
 * VFS Types
 * Shared types for filesystem operations
 */

mod config;
mod errors;
mod file_type;
mod metadata;
mod permissions;
mod stream;

pub use config::FsConfig;
pub use errors::{VfsError, VfsResult};
pub use file_type::FileType;
pub use metadata::FileMetadata;
pub use permissions::{PermissionMap, Visibility, VisibilityModes, PUBLIC_READ_BITS};
pub use stream::Stream;

pub(crate) use metadata::unix_timestamp;
