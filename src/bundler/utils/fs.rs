//! File system helpers for staging and packaging.
//!
//! Every helper creates missing parent directories and reports failures with
//! the offending path.

use crate::error::{Error, ErrorExt, Result};
use std::{
    fs::{self, File, OpenOptions},
    io,
    path::Path,
    time::SystemTime,
};

/// Creates (truncating) a file, creating any parent directories as needed.
///
/// `mode` applies to newly created files on Unix.
pub fn create_file(path: &Path, mode: Option<u32>) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).fs_context("creating output directory", parent)?;
    }
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        if let Some(mode) = mode {
            options.mode(mode);
        }
    }
    #[cfg(not(unix))]
    let _ = mode;
    options.open(path).fs_context("creating output file", path)
}

/// Copies a regular file, creating the destination's parent directories.
///
/// Fails if the source is a directory or doesn't exist.
pub fn copy_file(from: &Path, to: &Path) -> Result<()> {
    let meta = fs::metadata(from).fs_context("inspecting source file", from)?;
    if meta.is_dir() {
        return Err(Error::GenericError(format!("{from:?} is not a file")));
    }
    if let Some(dest_dir) = to.parent() {
        fs::create_dir_all(dest_dir).fs_context("creating destination directory", dest_dir)?;
    }
    fs::copy(from, to).fs_context("copying file", from)?;
    Ok(())
}

/// Sets Unix permission bits; a no-op elsewhere.
pub fn set_mode(path: &Path, mode: u32) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
            .fs_context("setting permissions", path)?;
    }
    #[cfg(not(unix))]
    let _ = (path, mode);
    Ok(())
}

/// Modification time, following symlinks.
pub fn modified(path: &Path) -> Result<SystemTime> {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .fs_context("reading modification time", path)
}

/// Removes a file or symlink. Returns `false` when nothing was there.
pub fn remove_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(error) => Err(Error::Fs {
            context: "removing file",
            path: path.to_path_buf(),
            error,
        }),
    }
}
