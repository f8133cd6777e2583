/*!
 * Path Normalization
 * Canonical, traversal-safe relative paths
 */

use std::sync::OnceLock;

use regex::Regex;

use super::types::{VfsError, VfsResult};

/// Unicode "other" characters (control, format, private use, unassigned)
/// and a leading `./`
static UNPRINTABLE: OnceLock<Regex> = OnceLock::new();

/// Canonicalize a raw path relative to a filesystem root
///
/// Backslashes become slashes, unprintable characters and leading `./` are
/// stripped, empty and `.` segments vanish and `..` pops the previous segment.
/// A `..` with nothing left to pop would leave the root and fails with
/// [`VfsError::PathOutOfRange`]. The empty string is the root itself.
pub fn normalize(raw: &str) -> VfsResult<String> {
    let path = raw.replace('\\', "/");
    let path = strip_unprintable(path);

    let mut parts: Vec<&str> = Vec::with_capacity(8);

    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(VfsError::PathOutOfRange { path });
                }
            }
            segment => parts.push(segment),
        }
    }

    Ok(parts.join("/"))
}

/// Remove unprintable characters and any leading `./` until neither remains
fn strip_unprintable(mut path: String) -> String {
    let pattern = UNPRINTABLE
        .get_or_init(|| Regex::new(r"\p{C}+|^\./").expect("unprintable pattern is valid"));

    loop {
        let stripped = pattern.replace_all(&path, "").into_owned();
        if stripped == path {
            return path;
        }
        path = stripped;
    }
}

/// Parent of a normalized path, `None` for entries directly under the root
pub(crate) fn parent(path: &str) -> Option<&str> {
    path.rsplit_once('/').map(|(parent, _)| parent)
}

/// Whether `path` lies strictly below the normalized directory `dir`
pub(crate) fn is_under(path: &str, dir: &str) -> bool {
    if dir.is_empty() {
        return !path.is_empty();
    }
    path.len() > dir.len() && path.starts_with(dir) && path.as_bytes()[dir.len()] == b'/'
}
