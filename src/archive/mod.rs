//! Archive backends.
//!
//! Every container format implements [`EntrySink`]: regular files,
//! directories and symlinks go in as [`ArchiveEntry`] values and are written
//! in call order. [`ArchiveBackend`] is the closed set of backends the
//! packager dispatches over.
//!
//! # Example
//!
//! ```no_run
//! use relpack::archive::{ArchiveBackend, BackendKind, DigestTee, EntrySink, TarCompression};
//! use std::path::Path;
//!
//! let file = std::fs::File::create("demo-1.2.0-linux-amd64.tar.gz")?;
//! let mut backend = ArchiveBackend::open(
//!     BackendKind::Tar(TarCompression::Gzip),
//!     DigestTee::new(file),
//!     "",
//! )?;
//! backend.add_file(Path::new("target/demo"), "demo-1.2.0-linux-amd64/bin/demo", true)?;
//! let (_, digest) = backend.close()?.finish()?;
//! println!("{digest}");
//! # Ok::<(), relpack::error::Error>(())
//! ```

mod compress;
mod digest;
mod entry;
mod tarball;
mod zipfile;

pub use compress::{Compressor, Passthrough, TarCompression};
pub use digest::{DigestReport, DigestTee, Sha256Digest, sha256_file};
pub use entry::{ArchiveEntry, EXECUTABLE_BITS, EntryKind};
pub use tarball::TarArchive;
pub use zipfile::{ZipArchive, ZipMethod};

use crate::error::Result;
use std::io::Write;
use std::path::Path;

/// Uniform write contract shared by all archive backends.
pub trait EntrySink {
    /// Writes one prepared entry.
    fn write_entry(&mut self, entry: ArchiveEntry) -> Result<()>;

    /// Adds the file, directory or symlink at `source` under `name`.
    fn add_file(&mut self, source: &Path, name: &str, executable: bool) -> Result<()> {
        self.add_file_with_mode(source, name, executable, None)
    }

    /// Like [`add_file`](Self::add_file) with an explicit mode override.
    fn add_file_with_mode(
        &mut self,
        source: &Path,
        name: &str,
        executable: bool,
        mode: Option<u32>,
    ) -> Result<()> {
        let entry = ArchiveEntry::from_path(source, name)?.with_mode(executable, mode);
        log::debug!("archive entry {} ({:o})", entry.name(), entry.mode());
        self.write_entry(entry)
    }

    /// Adds a symlink entry.
    fn add_symlink(&mut self, name: &str, target: &str) -> Result<()> {
        log::debug!("archive link {name} -> {target}");
        self.write_entry(ArchiveEntry::symlink(name, target))
    }

    /// Adds a regular entry from memory.
    fn add_bytes(&mut self, name: &str, bytes: Vec<u8>, mode: u32) -> Result<()> {
        self.write_entry(ArchiveEntry::bytes(name, bytes, mode))
    }
}

/// Container plus codec selection for [`ArchiveBackend::open`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum BackendKind {
    /// Zip with an archive-global method.
    Zip(ZipMethod),
    /// Tar through a stream compressor.
    Tar(TarCompression),
}

/// The archive writers the packager can drive.
pub enum ArchiveBackend<W: Write + 'static> {
    /// Zip archive.
    Zip(ZipArchive<W>),
    /// Tar archive.
    Tar(TarArchive<W>),
}

impl<W: Write + 'static> ArchiveBackend<W> {
    /// Opens the backend for `kind` on `writer`. `comment` is stored by
    /// containers that have one.
    ///
    /// Unsupported configurations fail here, before anything is written.
    pub fn open(kind: BackendKind, writer: W, comment: &str) -> Result<Self> {
        match kind {
            BackendKind::Zip(method) => Ok(Self::Zip(ZipArchive::new(writer, method, comment)?)),
            BackendKind::Tar(compression) => Ok(Self::Tar(TarArchive::new(writer, compression)?)),
        }
    }

    /// Finishes the container and returns the writer.
    pub fn close(self) -> Result<W> {
        match self {
            Self::Zip(zip) => zip.close(),
            Self::Tar(tar) => tar.close(),
        }
    }
}

impl<W: Write + 'static> EntrySink for ArchiveBackend<W> {
    fn write_entry(&mut self, entry: ArchiveEntry) -> Result<()> {
        match self {
            Self::Zip(zip) => zip.write_entry(entry),
            Self::Tar(tar) => tar.write_entry(entry),
        }
    }
}
