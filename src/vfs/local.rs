/*!
 * Local Filesystem Adapter
 * Wraps std::fs for host filesystem access below a fixed base directory
 */

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf, MAIN_SEPARATOR};

use tracing::{debug, warn};

use super::mime;
use super::traits::Adapter;
use super::types::*;

const ADAPTER_NAME: &str = "local";

/// Bytes read from the head of a file for MIME sniffing
const SNIFF_LEN: u64 = 8192;

/// Local disk adapter rooted at a base directory
///
/// Symlinked base directories are resolved to their real path at
/// construction. The base directory is created if missing and must be
/// readable.
#[derive(Debug, Clone)]
pub struct Local {
    root: PathBuf,
    base_path: String,
    permissions: PermissionMap,
}

impl Local {
    /// Create adapter rooted at `base` with the default permission table
    pub fn new<P: AsRef<Path>>(base: P) -> VfsResult<Self> {
        Self::with_permissions(base, PermissionMap::default())
    }

    /// Create adapter rooted at `base` with a custom permission table
    pub fn with_permissions<P: AsRef<Path>>(base: P, permissions: PermissionMap) -> VfsResult<Self> {
        let base = base.as_ref();
        let is_link = fs::symlink_metadata(base)
            .map(|md| md.file_type().is_symlink())
            .unwrap_or(false);

        let root = if is_link {
            fs::canonicalize(base).map_err(|_| VfsError::DirectoryUnreadable {
                adapter: ADAPTER_NAME.to_string(),
                path: base.display().to_string(),
            })?
        } else {
            base.to_path_buf()
        };

        ensure_directory(&root, permissions.dir_mode(Visibility::Public))?;

        let trimmed = root
            .to_string_lossy()
            .trim_end_matches(&['/', '\\'][..])
            .to_string();
        let base_path = format!("{}{}", trimmed, MAIN_SEPARATOR);

        debug!(base_path = %base_path, "local adapter ready");

        Ok(Self {
            root,
            base_path,
            permissions,
        })
    }

    /// Base directory, always ending with exactly one separator
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    #[must_use]
    pub fn permissions(&self) -> &PermissionMap {
        &self.permissions
    }

    /// Absolute location of a relative path
    #[must_use]
    pub fn apply_base_path(&self, path: &str) -> PathBuf {
        PathBuf::from(format!(
            "{}{}",
            self.base_path,
            path.trim_start_matches(&['/', '\\'][..])
        ))
    }

    /// Relative, slash-separated path of an absolute location
    #[must_use]
    pub fn remove_base_path(&self, location: &Path) -> String {
        let relative = location.strip_prefix(&self.root).unwrap_or(location);
        relative
            .to_string_lossy()
            .replace('\\', "/")
            .trim_matches('/')
            .to_string()
    }

    fn not_exists(path: &str) -> VfsError {
        VfsError::file_not_exists(ADAPTER_NAME, path)
    }

    fn read_failure(path: &str, e: io::Error) -> VfsError {
        warn!(adapter = ADAPTER_NAME, path = %path, error = %e, "read failed");
        VfsError::FileReadFailure {
            adapter: ADAPTER_NAME.to_string(),
            path: path.to_string(),
        }
    }

    /// Log an I/O failure of a mutating call and turn it into `false`
    fn declined(op: &str, path: &str, e: io::Error) -> bool {
        warn!(adapter = ADAPTER_NAME, op, path = %path, error = %e, "operation failed");
        false
    }

    fn ensure_parent(&self, location: &Path) -> VfsResult<()> {
        match location.parent() {
            Some(parent) => ensure_directory(parent, self.permissions.dir_mode(Visibility::Public)),
            None => Ok(()),
        }
    }

    fn apply_config_visibility(&self, path: &str, config: &FsConfig) {
        if let Some(visibility) = config.visibility {
            if let Err(e) = self.chmod(path, visibility) {
                warn!(adapter = ADAPTER_NAME, path = %path, error = %e, "could not apply visibility");
            }
        }
    }

    fn chmod(&self, path: &str, visibility: Visibility) -> io::Result<()> {
        let location = self.apply_base_path(path);
        let mode = if location.is_dir() {
            self.permissions.dir_mode(visibility)
        } else {
            self.permissions.file_mode(visibility)
        };
        set_mode(&location, mode)
    }

    /// Metadata for one location; `None` for symbolic links
    fn normalize_file_info(&self, location: &Path) -> Option<FileMetadata> {
        let md = fs::symlink_metadata(location).ok()?;
        if md.file_type().is_symlink() {
            return None;
        }

        let path = self.remove_base_path(location);
        let timestamp = md.modified().map(unix_timestamp).unwrap_or(0);

        if md.is_dir() {
            Some(FileMetadata::dir(path, timestamp))
        } else {
            Some(FileMetadata::file(path, timestamp, md.len()))
        }
    }

    fn walk(&self, location: &Path, recursive: bool, out: &mut Vec<FileMetadata>) -> VfsResult<()> {
        let entries = fs::read_dir(location).map_err(|e| VfsError::Io {
            adapter: ADAPTER_NAME.to_string(),
            message: format!("list {}: {}", location.display(), e),
        })?;

        for entry in entries {
            let entry = entry.map_err(|e| VfsError::Io {
                adapter: ADAPTER_NAME.to_string(),
                message: format!("read dir entry in {}: {}", location.display(), e),
            })?;
            let child = entry.path();

            // Links are neither reported nor followed
            let Some(info) = self.normalize_file_info(&child) else {
                continue;
            };
            let descend = recursive && info.is_dir();
            out.push(info);

            if descend {
                self.walk(&child, recursive, out)?;
            }
        }

        Ok(())
    }

    fn write_contents(&self, path: &str, contents: &[u8], create: bool) -> VfsResult<bool> {
        let location = self.apply_base_path(path);
        self.ensure_parent(&location)?;
        let mode = self.permissions.file_mode(Visibility::Public);

        let mut file = match open_for_write(&location, create, mode) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(VfsError::file_exists(ADAPTER_NAME, path));
            }
            Err(e) => return Ok(Self::declined("open", path, e)),
        };

        if let Err(e) = file.write_all(contents) {
            return Ok(Self::declined("write", path, e));
        }

        Ok(true)
    }

    fn write_from_stream(&self, path: &str, stream: &mut Stream, create: bool) -> VfsResult<bool> {
        let location = self.apply_base_path(path);
        self.ensure_parent(&location)?;
        let mode = self.permissions.file_mode(Visibility::Public);

        let file = match open_for_write(&location, create, mode) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(VfsError::file_exists(ADAPTER_NAME, path));
            }
            Err(e) => return Ok(Self::declined("open", path, e)),
        };

        match copy_and_close(stream, file) {
            Ok(bytes) => {
                debug!(adapter = ADAPTER_NAME, path = %path, bytes, "stream copied");
                Ok(true)
            }
            Err(e) => Ok(Self::declined("stream copy", path, e)),
        }
    }
}

impl Adapter for Local {
    fn name(&self) -> &str {
        ADAPTER_NAME
    }

    fn exists(&self, path: &str) -> bool {
        self.apply_base_path(path).exists()
    }

    fn read(&self, path: &str) -> VfsResult<Vec<u8>> {
        if !self.exists(path) {
            return Err(Self::not_exists(path));
        }

        fs::read(self.apply_base_path(path)).map_err(|e| Self::read_failure(path, e))
    }

    fn read_stream(&self, path: &str) -> VfsResult<Stream> {
        if !self.exists(path) {
            return Err(Self::not_exists(path));
        }

        let file = File::open(self.apply_base_path(path)).map_err(|e| Self::read_failure(path, e))?;
        Ok(Stream::seekable(file))
    }

    fn list_contents(&self, directory: &str, recursive: bool) -> VfsResult<Vec<FileMetadata>> {
        let location = self.apply_base_path(directory);
        let mut list = Vec::new();

        if !location.is_dir() {
            return Ok(list);
        }

        self.walk(&location, recursive, &mut list)?;
        Ok(list)
    }

    fn write(&self, path: &str, contents: &[u8], config: &FsConfig) -> VfsResult<bool> {
        if self.exists(path) {
            return Err(VfsError::file_exists(ADAPTER_NAME, path));
        }

        if !self.write_contents(path, contents, true)? {
            return Ok(false);
        }

        self.apply_config_visibility(path, config);
        Ok(true)
    }

    fn write_stream(&self, path: &str, stream: &mut Stream, config: &FsConfig) -> VfsResult<bool> {
        if self.exists(path) {
            return Err(VfsError::file_exists(ADAPTER_NAME, path));
        }

        if !self.write_from_stream(path, stream, true)? {
            return Ok(false);
        }

        self.apply_config_visibility(path, config);
        Ok(true)
    }

    fn update(&self, path: &str, contents: &[u8], config: &FsConfig) -> VfsResult<bool> {
        if !self.exists(path) {
            return Err(Self::not_exists(path));
        }

        if !self.write_contents(path, contents, false)? {
            return Ok(false);
        }

        self.apply_config_visibility(path, config);
        Ok(true)
    }

    fn update_stream(
        &self,
        path: &str,
        stream: &mut Stream,
        config: &FsConfig,
    ) -> VfsResult<bool> {
        if !self.exists(path) {
            return Err(Self::not_exists(path));
        }

        if !self.write_from_stream(path, stream, false)? {
            return Ok(false);
        }

        self.apply_config_visibility(path, config);
        Ok(true)
    }

    fn get_metadata(&self, path: &str) -> VfsResult<Option<FileMetadata>> {
        if !self.exists(path) {
            return Err(Self::not_exists(path));
        }

        Ok(self.normalize_file_info(&self.apply_base_path(path)))
    }

    fn get_mime_type(&self, path: &str) -> VfsResult<String> {
        if !self.exists(path) {
            return Err(Self::not_exists(path));
        }

        let location = self.apply_base_path(path);
        if location.is_dir() {
            return Ok("directory".to_string());
        }

        let mut head = Vec::new();
        File::open(&location)
            .and_then(|file| file.take(SNIFF_LEN).read_to_end(&mut head))
            .map_err(|e| Self::read_failure(path, e))?;

        Ok(mime::detect(path, &head).to_string())
    }

    fn rename(&self, path: &str, new_path: &str) -> VfsResult<bool> {
        if !self.exists(path) {
            return Err(Self::not_exists(path));
        }

        let location = self.apply_base_path(path);
        let destination = self.apply_base_path(new_path);
        self.ensure_parent(&destination)?;

        match fs::rename(&location, &destination) {
            Ok(()) => Ok(true),
            Err(e) => Ok(Self::declined("rename", path, e)),
        }
    }

    fn delete(&self, path: &str) -> VfsResult<bool> {
        if !self.exists(path) {
            return Err(Self::not_exists(path));
        }

        match fs::remove_file(self.apply_base_path(path)) {
            Ok(()) => Ok(true),
            Err(e) => Ok(Self::declined("delete", path, e)),
        }
    }

    fn create_dir(&self, dirname: &str, config: &FsConfig) -> VfsResult<bool> {
        let location = self.apply_base_path(dirname);

        if location.is_dir() {
            return Err(VfsError::directory_exists(ADAPTER_NAME, dirname));
        }

        let visibility = config.visibility.unwrap_or_default();
        let mode = self.permissions.dir_mode(visibility);

        match create_dir_with_mode(&location, mode) {
            Ok(()) => Ok(true),
            Err(e) => Ok(Self::declined("create_dir", dirname, e)),
        }
    }

    fn delete_dir(&self, dirname: &str) -> VfsResult<bool> {
        let location = self.apply_base_path(dirname);

        if !location.is_dir() {
            return Err(VfsError::directory_not_exists(ADAPTER_NAME, dirname));
        }

        remove_children(&location);

        match fs::remove_dir(&location) {
            Ok(()) => Ok(true),
            Err(e) => Ok(Self::declined("delete_dir", dirname, e)),
        }
    }

    fn get_visibility(&self, path: &str) -> VfsResult<Visibility> {
        let location = self.apply_base_path(path);

        if !location.is_dir() && !self.exists(path) {
            return Err(Self::not_exists(path));
        }

        let mode = read_mode(&location).map_err(|e| Self::read_failure(path, e))?;
        Ok(Visibility::from_mode(mode))
    }

    fn set_visibility(&self, path: &str, visibility: Visibility) -> VfsResult<bool> {
        let location = self.apply_base_path(path);

        if !location.is_dir() && !self.exists(path) {
            return Err(Self::not_exists(path));
        }

        match self.chmod(path, visibility) {
            Ok(()) => Ok(true),
            Err(e) => Ok(Self::declined("set_visibility", path, e)),
        }
    }
}

/// Make sure `path` is an existing, readable directory
fn ensure_directory(path: &Path, mode: u32) -> VfsResult<()> {
    if !path.is_dir() {
        if let Err(e) = create_dir_with_mode(path, mode) {
            debug!(path = %path.display(), error = %e, "directory creation reported an error");
        }

        if !path.is_dir() {
            return Err(VfsError::DirectoryCreateFailure {
                adapter: ADAPTER_NAME.to_string(),
                path: path.display().to_string(),
            });
        }
    }

    if fs::read_dir(path).is_err() {
        return Err(VfsError::DirectoryUnreadable {
            adapter: ADAPTER_NAME.to_string(),
            path: path.display().to_string(),
        });
    }

    Ok(())
}

/// Open `location` for writing; new files are created with `mode`
fn open_for_write(location: &Path, create: bool, mode: u32) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true);
    if create {
        options.create_new(true);
        set_create_mode(&mut options, mode);
    } else {
        options.truncate(true);
    }
    options.open(location)
}

/// Copy a stream into `file`, then flush and sync it
///
/// Dropping a `File` swallows close errors, so the data is synced explicitly
/// and a failure there counts as a failed write.
fn copy_and_close(stream: &mut Stream, file: File) -> io::Result<u64> {
    let mut writer = BufWriter::new(file);
    let bytes = io::copy(stream, &mut writer)?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(bytes)
}

/// Remove everything below `location`, children before parents
///
/// Links are unlinked, never followed. Failures are logged and skipped; the
/// final directory removal decides the outcome.
fn remove_children(location: &Path) {
    let entries = match fs::read_dir(location) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = %location.display(), error = %e, "cannot read directory for removal");
            return;
        }
    };

    for entry in entries.flatten() {
        let child = entry.path();
        let result = match fs::symlink_metadata(&child) {
            Ok(md) if md.is_dir() => {
                remove_children(&child);
                fs::remove_dir(&child)
            }
            Ok(_) => fs::remove_file(&child),
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            warn!(path = %child.display(), error = %e, "failed to remove entry");
        }
    }
}

#[cfg(unix)]
mod unix {
    use std::fs::{self, DirBuilder, OpenOptions};
    use std::io;
    use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt, PermissionsExt};
    use std::path::Path;

    /// Create `path` and its missing ancestors, each with exactly `mode`
    ///
    /// mkdir is subject to the umask, so every directory created here is
    /// chmodded afterwards. Existing ancestors keep their mode.
    pub(super) fn create_dir_with_mode(path: &Path, mode: u32) -> io::Result<()> {
        let missing: Vec<&Path> = path
            .ancestors()
            .take_while(|dir| !dir.as_os_str().is_empty() && !dir.is_dir())
            .collect();

        for dir in missing.into_iter().rev() {
            match DirBuilder::new().mode(mode).create(dir) {
                Ok(()) => set_mode(dir, mode)?,
                // Lost a race with another creator
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => {}
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }

    pub(super) fn set_create_mode(options: &mut OpenOptions, mode: u32) {
        options.mode(mode);
    }

    pub(super) fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
    }

    pub(super) fn read_mode(path: &Path) -> io::Result<u32> {
        Ok(fs::metadata(path)?.permissions().mode() & 0o7777)
    }
}

#[cfg(not(unix))]
mod portable {
    use std::fs::{self, OpenOptions};
    use std::io;
    use std::path::Path;

    use super::PUBLIC_READ_BITS;

    pub(super) fn create_dir_with_mode(path: &Path, _mode: u32) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    pub(super) fn set_create_mode(_options: &mut OpenOptions, _mode: u32) {}

    pub(super) fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
        let mut perms = fs::metadata(path)?.permissions();
        perms.set_readonly(mode & 0o200 == 0);
        fs::set_permissions(path, perms)
    }

    pub(super) fn read_mode(path: &Path) -> io::Result<u32> {
        let readonly = fs::metadata(path)?.permissions().readonly();
        Ok(if readonly { 0o444 } else { 0o600 | PUBLIC_READ_BITS })
    }
}

#[cfg(unix)]
use unix::{create_dir_with_mode, read_mode, set_create_mode, set_mode};

#[cfg(not(unix))]
use portable::{create_dir_with_mode, read_mode, set_create_mode, set_mode};
