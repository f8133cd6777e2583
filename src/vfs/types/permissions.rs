/*!
 * VFS Visibility and Permissions
 * Public/private classification and the permission table behind it
 */

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::VfsError;

/// Group/world read bits that make an entry public
pub const PUBLIC_READ_BITS: u32 = 0o044;

/// Coarse permission classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

impl Visibility {
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }

    /// Classify a permission mode by its group/world read bits
    #[inline]
    #[must_use]
    pub const fn from_mode(mode: u32) -> Self {
        if mode & PUBLIC_READ_BITS != 0 {
            Visibility::Public
        } else {
            Visibility::Private
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = VfsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            other => Err(VfsError::InvalidVisibility {
                value: other.to_string(),
            }),
        }
    }
}

/// Permission modes for one entry kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityModes {
    #[serde(deserialize_with = "deserialize_permission_mode")]
    pub public: u32,
    #[serde(deserialize_with = "deserialize_permission_mode")]
    pub private: u32,
}

impl VisibilityModes {
    #[inline]
    #[must_use]
    pub const fn mode(&self, visibility: Visibility) -> u32 {
        match visibility {
            Visibility::Public => self.public,
            Visibility::Private => self.private,
        }
    }
}

/// File and directory permission table
///
/// Defaults: file public=0o664 private=0o600, dir public=0o755 private=0o700.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionMap {
    pub file: VisibilityModes,
    pub dir: VisibilityModes,
}

impl PermissionMap {
    #[inline]
    #[must_use]
    pub const fn file_mode(&self, visibility: Visibility) -> u32 {
        self.file.mode(visibility)
    }

    #[inline]
    #[must_use]
    pub const fn dir_mode(&self, visibility: Visibility) -> u32 {
        self.dir.mode(visibility)
    }
}

impl Default for PermissionMap {
    fn default() -> Self {
        Self {
            file: VisibilityModes {
                public: 0o664,
                private: 0o600,
            },
            dir: VisibilityModes {
                public: 0o755,
                private: 0o700,
            },
        }
    }
}

/// Deserialize and validate permission mode (must be <= 0o7777)
fn deserialize_permission_mode<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let mode = u32::deserialize(deserializer)?;
    if mode > 0o7777 {
        return Err(serde::de::Error::custom(format!(
            "invalid permission mode: 0o{:o} exceeds maximum 0o7777",
            mode
        )));
    }
    Ok(mode)
}
