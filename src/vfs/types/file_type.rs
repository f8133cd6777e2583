/*!
 * VFS File Type Enum
 * Kinds of entries an adapter reports
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Entry type as it appears in listings and metadata (`"file"` or `"dir"`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    File,
    Dir,
}

impl FileType {
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            FileType::File => "file",
            FileType::Dir => "dir",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
