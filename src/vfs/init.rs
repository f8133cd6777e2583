/*!
 * VFS Initialization
 * Builds a mount manager from a declarative mount table
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use super::filesystem::Filesystem;
use super::mount::Manager;
use super::traits::Adapter;
use super::types::*;
use super::{Local, MemoryAdapter};

/// Path of a JSON mount table
pub const CONFIG_ENV: &str = "PREFIXFS_CONFIG";
/// Root of the default `local` mount when no mount table is given
pub const ROOT_ENV: &str = "PREFIXFS_ROOT";

/// Backend selection for one mount
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "adapter", rename_all = "snake_case")]
pub enum AdapterSpec {
    Local {
        root: PathBuf,
        #[serde(default)]
        permissions: PermissionMap,
    },
    Memory {
        #[serde(default)]
        permissions: PermissionMap,
    },
}

/// One entry of the mount table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountSpec {
    #[serde(flatten)]
    pub adapter: AdapterSpec,
    /// Default visibility for writes through this mount
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
}

impl MountSpec {
    pub fn local(root: impl Into<PathBuf>) -> Self {
        Self {
            adapter: AdapterSpec::Local {
                root: root.into(),
                permissions: PermissionMap::default(),
            },
            visibility: None,
        }
    }

    pub fn memory() -> Self {
        Self {
            adapter: AdapterSpec::Memory {
                permissions: PermissionMap::default(),
            },
            visibility: None,
        }
    }

    fn build(&self) -> VfsResult<Filesystem> {
        let adapter: Arc<dyn Adapter> = match &self.adapter {
            AdapterSpec::Local { root, permissions } => {
                Arc::new(Local::with_permissions(root, *permissions)?)
            }
            AdapterSpec::Memory { permissions } => {
                Arc::new(MemoryAdapter::with_permissions(*permissions))
            }
        };

        let defaults = match self.visibility {
            Some(visibility) => FsConfig::with_visibility(visibility),
            None => FsConfig::default(),
        };
        Ok(Filesystem::from_shared(adapter).with_config(defaults))
    }
}

/// Prefix to backend table
///
/// ```json
/// {"mounts": {"local": {"adapter": "local", "root": "/srv/files", "visibility": "private"},
///             "scratch": {"adapter": "memory"}}}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountConfig {
    #[serde(default)]
    pub mounts: BTreeMap<String, MountSpec>,
}

impl MountConfig {
    pub fn from_json_str(json: &str) -> VfsResult<Self> {
        serde_json::from_str(json).map_err(|e| VfsError::InvalidConfig {
            message: e.to_string(),
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> VfsResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| VfsError::InvalidConfig {
            message: format!("{}: {}", path.display(), e),
        })?;
        Self::from_json_str(&json)
    }

    /// Load the table named by `PREFIXFS_CONFIG`
    ///
    /// Without it a single `local` mount is created at `PREFIXFS_ROOT`, or
    /// under the system temp directory.
    pub fn from_env() -> VfsResult<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::from_file(path);
        }

        let root = std::env::var_os(ROOT_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join("prefixfs"));

        Ok(Self::default().mount("local", MountSpec::local(root)))
    }

    #[must_use]
    pub fn mount(mut self, prefix: impl Into<String>, spec: MountSpec) -> Self {
        self.mounts.insert(prefix.into(), spec);
        self
    }
}

/// Build a manager with every filesystem of the table mounted
pub fn init_manager(config: &MountConfig) -> VfsResult<Manager> {
    info!(mounts = config.mounts.len(), "Initializing filesystem manager");

    let manager = Manager::new();
    for (prefix, spec) in &config.mounts {
        manager.mount_filesystem(prefix, spec.build()?)?;
    }

    info!(prefixes = ?manager.prefixes(), "Filesystem manager ready");
    Ok(manager)
}
