//! Archive entries built from filesystem sources.
//!
//! Sources are inspected with `symlink_metadata`, so a symlink becomes a
//! symlink entry carrying its target rather than a copy of what it points at.

use crate::error::{ErrorExt, Result};
use crate::naming;
use std::{
    fs::File,
    io::{self, Read},
    path::{Path, PathBuf},
    time::SystemTime,
};

/// Mode bits ORed into regular files marked executable.
pub const EXECUTABLE_BITS: u32 = 0o755;

const SYMLINK_MODE: u32 = 0o777;

/// Entry kind after inspecting the source with `lstat`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file with content.
    Regular,
    /// Directory; never walked, never has content.
    Directory,
    /// Symbolic link with its raw target.
    Symlink(String),
}

#[derive(Debug, Clone)]
enum EntryData {
    Empty,
    File(PathBuf),
    Bytes(Vec<u8>),
}

/// Backend-agnostic archive entry.
///
/// Names are cleaned, forward-slash and relative. Directory names end with
/// `/`.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    name: String,
    kind: EntryKind,
    mode: u32,
    size: u64,
    mtime: SystemTime,
    data: EntryData,
}

impl ArchiveEntry {
    /// Inspects `source` without following symlinks.
    pub fn from_path(source: &Path, name: &str) -> Result<Self> {
        let meta = std::fs::symlink_metadata(source).fs_context("inspecting archive source", source)?;
        let mtime = meta.modified().unwrap_or_else(|_| SystemTime::now());
        let file_type = meta.file_type();

        if file_type.is_symlink() {
            let target = std::fs::read_link(source).fs_context("reading symlink", source)?;
            return Ok(Self {
                name: naming::as_relative_path(name),
                kind: EntryKind::Symlink(target.to_string_lossy().into_owned()),
                mode: SYMLINK_MODE,
                size: 0,
                mtime,
                data: EntryData::Empty,
            });
        }

        if file_type.is_dir() {
            return Ok(Self::directory(name, mode_of(&meta)).with_mtime(mtime));
        }

        Ok(Self {
            name: naming::as_relative_path(name),
            kind: EntryKind::Regular,
            mode: mode_of(&meta),
            size: meta.len(),
            mtime,
            data: EntryData::File(source.to_path_buf()),
        })
    }

    /// Regular entry backed by in-memory bytes.
    pub fn bytes(name: &str, bytes: Vec<u8>, mode: u32) -> Self {
        Self {
            name: naming::as_relative_path(name),
            kind: EntryKind::Regular,
            mode,
            size: bytes.len() as u64,
            mtime: SystemTime::now(),
            data: EntryData::Bytes(bytes),
        }
    }

    /// Symlink entry pointing at `target`.
    pub fn symlink(name: &str, target: &str) -> Self {
        Self {
            name: naming::as_relative_path(name),
            kind: EntryKind::Symlink(target.to_string()),
            mode: SYMLINK_MODE,
            size: 0,
            mtime: SystemTime::now(),
            data: EntryData::Empty,
        }
    }

    /// Directory entry.
    pub fn directory(name: &str, mode: u32) -> Self {
        Self {
            name: format!("{}/", naming::as_relative_path(name)),
            kind: EntryKind::Directory,
            mode,
            size: 0,
            mtime: SystemTime::now(),
            data: EntryData::Empty,
        }
    }

    /// Applies the executable hint and an explicit override.
    ///
    /// The hint ORs [`EXECUTABLE_BITS`] into regular files; an override
    /// replaces the mode of anything but a symlink.
    pub fn with_mode(mut self, executable: bool, mode: Option<u32>) -> Self {
        if matches!(self.kind, EntryKind::Symlink(_)) {
            return self;
        }
        if executable && self.kind == EntryKind::Regular {
            self.mode |= EXECUTABLE_BITS;
        }
        if let Some(mode) = mode {
            self.mode = mode;
        }
        self
    }

    /// Replaces the modification time.
    pub fn with_mtime(mut self, mtime: SystemTime) -> Self {
        self.mtime = mtime;
        self
    }

    /// Name inside the archive.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entry kind.
    pub fn kind(&self) -> &EntryKind {
        &self.kind
    }

    /// Permission bits.
    pub fn mode(&self) -> u32 {
        self.mode
    }

    /// Content length for regular entries.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Modification time.
    pub fn mtime(&self) -> SystemTime {
        self.mtime
    }

    /// Modification time as Unix seconds, clamped at the epoch.
    pub fn mtime_secs(&self) -> u64 {
        self.mtime
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    /// Opens the content stream. Non-regular entries read as empty.
    pub fn open(&self) -> Result<Box<dyn Read + '_>> {
        match &self.data {
            EntryData::Empty => Ok(Box::new(io::empty())),
            EntryData::Bytes(bytes) => Ok(Box::new(bytes.as_slice())),
            EntryData::File(path) => {
                let file = File::open(path).fs_context("opening archive source", path)?;
                Ok(Box::new(file))
            }
        }
    }
}

#[cfg(unix)]
fn mode_of(meta: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn mode_of(meta: &std::fs::Metadata) -> u32 {
    match (meta.is_dir(), meta.permissions().readonly()) {
        (true, _) => 0o755,
        (false, true) => 0o444,
        (false, false) => 0o644,
    }
}
