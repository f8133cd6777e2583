/*!
 * Finder
 * Pattern-based search over host directories
 */

use ignore::overrides::{Override, OverrideBuilder};
use ignore::{DirEntry, WalkBuilder};
use regex::RegexBuilder;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use super::types::*;

const FINDER_NAME: &str = "finder";

/// Version control directories skipped unless the caller clears them
pub const VCS_DIRECTORIES: &[&str] = &[
    ".svn",
    "_svn",
    "CVS",
    "_darcs",
    ".arch-params",
    ".monotone",
    ".bzr",
    ".git",
    ".hg",
    ".composer",
];

const REGEX_FLAGS: &str = "imsxuADU";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Files,
    Dirs,
}

#[derive(Debug, Clone)]
enum Matcher {
    /// Delimited `/regex/flags` pattern
    Regex(regex::Regex),
    /// Gitignore-style glob, matched against the bare file name
    Glob(Override),
}

/// Compiled file name pattern
#[derive(Debug, Clone)]
struct NamePattern {
    matcher: Matcher,
    /// Globs not starting with `.` never match hidden names
    hidden: bool,
}

impl NamePattern {
    fn compile(pattern: &str) -> VfsResult<Self> {
        if let Some((body, flags)) = split_regex(pattern) {
            let mut builder = RegexBuilder::new(body);
            for flag in flags.chars() {
                match flag {
                    'i' => builder.case_insensitive(true),
                    'm' => builder.multi_line(true),
                    's' => builder.dot_matches_new_line(true),
                    'x' => builder.ignore_whitespace(true),
                    'U' => builder.swap_greed(true),
                    _ => &mut builder,
                };
            }
            let regex = builder.build().map_err(|e| invalid_pattern(pattern, e))?;
            return Ok(Self {
                matcher: Matcher::Regex(regex),
                hidden: true,
            });
        }

        let mut globs = OverrideBuilder::new("/");
        globs.add(pattern).map_err(|e| invalid_pattern(pattern, e))?;
        let globs = globs.build().map_err(|e| invalid_pattern(pattern, e))?;

        Ok(Self {
            matcher: Matcher::Glob(globs),
            hidden: pattern.starts_with('.'),
        })
    }

    fn is_match(&self, name: &str, is_dir: bool) -> bool {
        if !self.hidden && name.starts_with('.') {
            return false;
        }

        match &self.matcher {
            Matcher::Regex(regex) => regex.is_match(name),
            Matcher::Glob(globs) => globs.matched(name, is_dir).is_whitelist(),
        }
    }
}

fn invalid_pattern(pattern: &str, error: impl fmt::Display) -> VfsError {
    VfsError::InvalidPattern {
        pattern: pattern.to_string(),
        message: error.to_string(),
    }
}

/// Split a delimited regex such as `/^a.*$/i` into body and flags
///
/// Returns `None` for anything that should be treated as a glob.
fn split_regex(pattern: &str) -> Option<(&str, &str)> {
    let (head, flags) = pattern
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(pattern.len()))
        .filter(|&end| pattern[..end].chars().count() >= 3)
        .map(|end| pattern.split_at(end))
        .find(|(_, flags)| flags.chars().all(|c| REGEX_FLAGS.contains(c)))?;

    let mut chars = head.chars();
    let start = chars.next()?;
    let end = chars.next_back()?;
    let body = chars.as_str();

    let delimited = if start == end {
        !(start.is_alphanumeric() || matches!(start, '*' | '?' | ' ' | '\\'))
    } else {
        matches!((start, end), ('{', '}') | ('(', ')') | ('[', ']') | ('<', '>'))
    };

    delimited.then_some((body, flags))
}

/// One match produced by a [`Finder`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundEntry {
    path: PathBuf,
    relative_path: String,
    relative_pathname: String,
    file_type: FileType,
}

impl FoundEntry {
    /// Full host path of the entry
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory of the entry relative to the searched directory
    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    /// Entry path relative to the searched directory
    pub fn relative_pathname(&self) -> &str {
        &self.relative_pathname
    }

    pub fn file_name(&self) -> &str {
        self.relative_pathname
            .rsplit_once('/')
            .map_or(self.relative_pathname.as_str(), |(_, name)| name)
    }

    /// File name without its last extension
    pub fn stem(&self) -> &str {
        let name = self.file_name();
        match name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => name,
        }
    }

    pub fn is_file(&self) -> bool {
        self.file_type == FileType::File
    }

    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Dir
    }

    pub fn contents(&self) -> VfsResult<Vec<u8>> {
        fs::read(&self.path).map_err(|e| {
            warn!(path = %self.path.display(), error = %e, "failed to read found entry");
            VfsError::FileReadFailure {
                adapter: FINDER_NAME.to_string(),
                path: self.path.display().to_string(),
            }
        })
    }
}

type Filter = Box<dyn Fn(&FoundEntry) -> bool + Send + Sync>;

/// Builder-style search over one or more host directories
///
/// Directories are walked children-first and symbolic links are never
/// descended into.
pub struct Finder {
    mode: Option<Mode>,
    names: Vec<NamePattern>,
    not_names: Vec<NamePattern>,
    filters: Vec<Filter>,
    dirs: Vec<PathBuf>,
    excludes: Vec<String>,
}

impl Finder {
    pub fn new() -> Self {
        Self {
            mode: None,
            names: Vec::new(),
            not_names: Vec::new(),
            filters: Vec::new(),
            dirs: Vec::new(),
            excludes: VCS_DIRECTORIES.iter().map(|d| d.to_string()).collect(),
        }
    }

    /// Only yield files
    #[must_use]
    pub fn files(mut self) -> Self {
        self.mode = Some(Mode::Files);
        self
    }

    /// Only yield directories
    #[must_use]
    pub fn dirs(mut self) -> Self {
        self.mode = Some(Mode::Dirs);
        self
    }

    /// Keep entries whose name matches a glob or a delimited regex
    pub fn name(mut self, pattern: &str) -> VfsResult<Self> {
        self.names.push(NamePattern::compile(pattern)?);
        Ok(self)
    }

    /// Drop entries whose name matches a glob or a delimited regex
    pub fn not_name(mut self, pattern: &str) -> VfsResult<Self> {
        self.not_names.push(NamePattern::compile(pattern)?);
        Ok(self)
    }

    #[must_use]
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&FoundEntry) -> bool + Send + Sync + 'static,
    {
        self.filters.push(Box::new(filter));
        self
    }

    /// Add a directory to search, or a glob resolving to directories
    pub fn in_dir(mut self, dir: impl AsRef<Path>) -> VfsResult<Self> {
        let dir = dir.as_ref();

        if dir.is_dir() {
            self.dirs.push(trim_dir(dir));
            return Ok(self);
        }

        let raw = dir.to_string_lossy();
        let mut matched = expand_glob(&raw)?;
        if matched.is_empty() {
            return Err(VfsError::directory_not_exists(FINDER_NAME, &raw));
        }

        matched.sort();
        debug!(pattern = %raw, count = matched.len(), "directory glob expanded");
        self.dirs.extend(matched);
        Ok(self)
    }

    /// Prune directories with this name or relative path
    #[must_use]
    pub fn exclude(mut self, dir: &str) -> Self {
        self.excludes.push(dir.trim_end_matches('/').to_string());
        self
    }

    /// Stop pruning version control directories
    #[must_use]
    pub fn include_vcs(mut self) -> Self {
        self.excludes.retain(|dir| !VCS_DIRECTORIES.contains(&dir.as_str()));
        self
    }

    /// Run the search
    pub fn find(&self) -> VfsResult<Vec<FoundEntry>> {
        if self.dirs.is_empty() {
            return Err(VfsError::FindInPathUndefined);
        }

        let excludes: Arc<[String]> = self.excludes.clone().into();
        let mut found = Vec::new();
        for dir in &self.dirs {
            found.extend(
                search(dir, Arc::clone(&excludes))
                    .into_iter()
                    .filter(|entry| self.accepts(entry)),
            );
        }
        Ok(found)
    }

    pub fn iter(&self) -> VfsResult<std::vec::IntoIter<FoundEntry>> {
        Ok(self.find()?.into_iter())
    }

    pub fn count(&self) -> VfsResult<usize> {
        Ok(self.find()?.len())
    }

    fn accepts(&self, entry: &FoundEntry) -> bool {
        match self.mode {
            Some(Mode::Files) if !entry.is_file() => return false,
            Some(Mode::Dirs) if !entry.is_dir() => return false,
            _ => {}
        }

        let name = entry.file_name();
        let is_dir = entry.is_dir();
        if self.not_names.iter().any(|p| p.is_match(name, is_dir)) {
            return false;
        }
        if !self.names.is_empty() && !self.names.iter().any(|p| p.is_match(name, is_dir)) {
            return false;
        }

        self.filters.iter().all(|filter| filter(entry))
    }
}

impl Default for Finder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Finder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Finder")
            .field("mode", &self.mode)
            .field("names", &self.names.len())
            .field("not_names", &self.not_names.len())
            .field("filters", &self.filters.len())
            .field("dirs", &self.dirs)
            .field("excludes", &self.excludes)
            .finish()
    }
}

fn trim_dir(dir: &Path) -> PathBuf {
    let raw = dir.to_string_lossy();
    let trimmed = raw.trim_end_matches('/');
    if trimmed.is_empty() {
        PathBuf::from("/")
    } else {
        PathBuf::from(trimmed)
    }
}

fn relative_to(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Whether a directory entry is pruned by name or by path below `root`
fn is_excluded(root: &Path, entry: &DirEntry, excludes: &[String]) -> bool {
    // Classification follows links, descent never does
    if !entry.path().is_dir() {
        return false;
    }

    let name = entry.file_name().to_string_lossy();
    let relative = relative_to(root, entry.path());
    excludes
        .iter()
        .any(|dir| *dir == name || *dir == relative)
}

/// Walk `root` and return every entry below it, children before parents
fn search(root: &Path, excludes: Arc<[String]>) -> Vec<FoundEntry> {
    let prune_root = root.to_path_buf();
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry| !is_excluded(&prune_root, entry, &excludes))
        .build();

    // The walk is parents-first; each entry waits on `pending` until the
    // walk leaves its subtree.
    let mut ordered = Vec::new();
    let mut pending: Vec<(usize, FoundEntry)> = Vec::new();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(root = %root.display(), error = %e, "skipping unreadable entry");
                continue;
            }
        };
        let depth = entry.depth();
        if depth == 0 {
            continue;
        }

        while pending.last().map_or(false, |(level, _)| *level >= depth) {
            if let Some((_, done)) = pending.pop() {
                ordered.push(done);
            }
        }
        pending.push((depth, found_entry(root, entry.path())));
    }

    while let Some((_, done)) = pending.pop() {
        ordered.push(done);
    }

    debug!(root = %root.display(), entries = ordered.len(), "directory walked");
    ordered
}

fn found_entry(root: &Path, path: &Path) -> FoundEntry {
    let relative_pathname = relative_to(root, path);
    FoundEntry {
        relative_path: relative_pathname
            .rsplit_once('/')
            .map_or(String::new(), |(parent, _)| parent.to_string()),
        relative_pathname,
        path: path.to_path_buf(),
        file_type: if path.is_dir() { FileType::Dir } else { FileType::File },
    }
}

fn has_glob_chars(segment: &str) -> bool {
    segment.contains(&['*', '?', '[', '{'][..])
}

/// Directories directly inside `base` whose name matches `matcher`
fn matching_children(base: &Path, matcher: &NamePattern) -> Vec<PathBuf> {
    let listed = if base.as_os_str().is_empty() {
        Path::new(".")
    } else {
        base
    };

    WalkBuilder::new(listed)
        .standard_filters(false)
        .follow_links(false)
        .max_depth(Some(1))
        .build()
        .filter_map(Result::ok)
        .filter(|entry| entry.depth() == 1)
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            let path = base.join(&name);
            (path.is_dir() && matcher.is_match(&name, true)).then_some(path)
        })
        .collect()
}

/// Resolve a glob to the existing directories it names
fn expand_glob(pattern: &str) -> VfsResult<Vec<PathBuf>> {
    let (mut candidates, rest) = match pattern.strip_prefix('/') {
        Some(rest) => (vec![PathBuf::from("/")], rest),
        None => (vec![PathBuf::new()], pattern),
    };

    for segment in rest.split('/').filter(|s| !s.is_empty()) {
        if !has_glob_chars(segment) {
            candidates = candidates
                .into_iter()
                .map(|base| base.join(segment))
                .filter(|path| path.is_dir())
                .collect();
            continue;
        }

        let matcher = NamePattern::compile(segment)?;
        candidates = candidates
            .iter()
            .flat_map(|base| matching_children(base, &matcher))
            .collect();
    }

    Ok(candidates
        .into_iter()
        .filter(|path| !path.as_os_str().is_empty())
        .collect())
}
