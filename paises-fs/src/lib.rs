//! Filesystem helpers for the catalogue data directory, built on `cap-std`
//! and `camino`.
//!
//! Flags are exchanged between the fetch and convert stages through files
//! guarded by advisory exclusive locks: the writer holds the lock for as long
//! as it writes and [`is_locked`] reports whether a reader should wait.
#![forbid(unsafe_code)]

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use fs2::FileExt;
use std::fs::File;
use std::io::{self, Write};
use std::path::Component;

/// Paths of every artefact kept under the data directory.
///
/// ```text
/// <root>/countries.db
/// <root>/flags/<key>.svg
/// <root>/flags/<key>.jpg
/// <root>/flags/<key>.unconvertible
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    root: Utf8PathBuf,
}

impl DataLayout {
    /// File name of the country database.
    pub const DATABASE_FILE: &'static str = "countries.db";
    /// Directory holding flag assets.
    pub const FLAGS_DIR: &'static str = "flags";

    /// Describe the layout rooted at `root`. Nothing is created yet.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Data directory root.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Location of the SQLite country database.
    #[must_use]
    pub fn database_path(&self) -> Utf8PathBuf {
        self.root.join(Self::DATABASE_FILE)
    }

    /// Directory holding flag assets.
    #[must_use]
    pub fn flags_dir(&self) -> Utf8PathBuf {
        self.root.join(Self::FLAGS_DIR)
    }

    /// Downloaded vector flag for `stem`.
    #[must_use]
    pub fn svg_path(&self, stem: &str) -> Utf8PathBuf {
        self.flags_dir().join(format!("{stem}.svg"))
    }

    /// Rasterised flag for `stem`.
    #[must_use]
    pub fn jpg_path(&self, stem: &str) -> Utf8PathBuf {
        self.flags_dir().join(format!("{stem}.jpg"))
    }

    /// Marker recording that `stem` cannot be rasterised.
    #[must_use]
    pub fn unconvertible_marker(&self, stem: &str) -> Utf8PathBuf {
        self.flags_dir().join(format!("{stem}.unconvertible"))
    }

    /// Create the root and flag directories if they are missing.
    pub fn ensure_dirs(&self) -> io::Result<()> {
        ensure_dir(&self.flags_dir())
    }
}

/// Resolve an ambient directory for the given path and return the directory with the file name.
pub fn open_dir_and_file(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, String)> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::other("target should include a file name"))?
        .to_owned();
    let dir = fs_utf8::Dir::open_ambient_dir(parent, ambient_authority())?;
    Ok((dir, file_name))
}

/// Create `path` and every missing ancestor.
pub fn ensure_dir(path: &Utf8Path) -> io::Result<()> {
    if path.as_str().is_empty() || path == Utf8Path::new("/") {
        return Ok(());
    }
    let (base_dir, relative) = base_dir_and_relative(path)?;
    if relative.as_str().is_empty() {
        return Ok(());
    }
    base_dir.create_dir_all(&relative)
}

/// Ensure the parent directory for `path` exists.
pub fn ensure_parent_dir(path: &Utf8Path) -> io::Result<()> {
    path.parent().map_or(Ok(()), ensure_dir)
}

/// Return whether `path` is a regular file holding at least one byte.
///
/// A missing file or parent directory is reported as `Ok(false)`.
pub fn is_non_empty_file(path: &Utf8Path) -> io::Result<bool> {
    let (dir, name) = match open_dir_and_file(path) {
        Ok(found) => found,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };
    match dir.metadata(name.as_str()) {
        Ok(meta) => Ok(meta.is_file() && meta.len() > 0),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// Return whether a reader must wait before opening `path`.
///
/// The file counts as locked when it does not exist yet, cannot be opened,
/// or another handle holds an exclusive lock on it.
#[must_use]
pub fn is_locked(path: &Utf8Path) -> bool {
    let Ok(file) = open_std(path, fs_utf8::OpenOptions::new().read(true)) else {
        return true;
    };
    // A shared lock only conflicts with an exclusive holder.
    match FileExt::try_lock_shared(&file) {
        Ok(()) => {
            let _ = FileExt::unlock(&file);
            false
        }
        Err(_) => true,
    }
}

/// Write `contents` to `path`, replacing any existing file.
pub fn write_file(path: &Utf8Path, contents: &[u8]) -> io::Result<()> {
    ensure_parent_dir(path)?;
    let (dir, name) = open_dir_and_file(path)?;
    dir.write(name.as_str(), contents)
}

/// Read the whole of `path`.
pub fn read_file(path: &Utf8Path) -> io::Result<Vec<u8>> {
    let (dir, name) = open_dir_and_file(path)?;
    dir.read(name.as_str())
}

/// Remove `path`. A file that is already gone is not an error.
pub fn remove_file(path: &Utf8Path) -> io::Result<()> {
    let result = open_dir_and_file(path).and_then(|(dir, name)| dir.remove_file(name.as_str()));
    match result {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

fn open_std(path: &Utf8Path, options: &fs_utf8::OpenOptions) -> io::Result<File> {
    let (dir, name) = open_dir_and_file(path)?;
    dir.open_with(name.as_str(), options)
        .map(fs_utf8::File::into_std)
}

/// A file held under an exclusive advisory lock until dropped or finished.
///
/// The lock is taken before the file is truncated, so readers polling
/// [`is_locked`] never observe a partially written file as ready.
#[derive(Debug)]
pub struct LockedFile {
    file: File,
    path: Utf8PathBuf,
    written: u64,
}

impl LockedFile {
    /// Create or truncate `path` and lock it exclusively.
    ///
    /// Fails with [`io::ErrorKind::WouldBlock`] when another handle already
    /// holds the lock.
    pub fn create(path: &Utf8Path) -> io::Result<Self> {
        ensure_parent_dir(path)?;
        let file = open_std(
            path,
            fs_utf8::OpenOptions::new().write(true).create(true),
        )?;
        FileExt::try_lock_exclusive(&file)?;
        file.set_len(0)?;
        Ok(Self {
            file,
            path: path.to_owned(),
            written: 0,
        })
    }

    /// Path of the locked file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Flush to disk, release the lock and return the number of bytes written.
    pub fn finish(mut self) -> io::Result<u64> {
        self.file.flush()?;
        self.file.sync_all()?;
        FileExt::unlock(&self.file)?;
        Ok(self.written)
    }
}

impl Write for LockedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let count = self.file.write(buf)?;
        self.written = self
            .written
            .saturating_add(u64::try_from(count).unwrap_or(u64::MAX));
        Ok(count)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Split an absolute or relative path into an ambient base directory and a relative suffix.
pub fn base_dir_and_relative(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, Utf8PathBuf)> {
    let std_path = path.as_std_path();

    let (base, relative) = match std_path.components().next() {
        // Windows absolute path with a drive or UNC prefix.
        Some(Component::Prefix(prefix)) => {
            let prefix_str = prefix
                .as_os_str()
                .to_str()
                .ok_or_else(|| io::Error::other("non-UTF-8 path prefix"))?;

            let base = Utf8PathBuf::from(prefix_str).join(std::path::MAIN_SEPARATOR.to_string());
            let relative = std_path
                .strip_prefix(base.as_std_path())
                .or_else(|_| std_path.strip_prefix(prefix.as_os_str()))
                .map_err(|_| io::Error::other("failed to strip prefix from path"))?
                .to_path_buf();
            (base, relative)
        }
        Some(Component::RootDir) => {
            let base = Utf8PathBuf::from(std::path::MAIN_SEPARATOR.to_string());
            let relative = std_path
                .strip_prefix(base.as_std_path())
                .map_err(|_| io::Error::other("failed to strip root from absolute path"))?
                .to_path_buf();
            (base, relative)
        }
        _ => (Utf8PathBuf::from("."), std_path.to_path_buf()),
    };

    let dir = fs_utf8::Dir::open_ambient_dir(&base, ambient_authority())?;
    let relative =
        Utf8PathBuf::from_path_buf(relative).map_err(|_| io::Error::other("non-UTF-8 path"))?;

    Ok((dir, relative))
}
