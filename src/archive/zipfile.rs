//! Zip backend. Entries are spooled and the finished archive is copied to
//! the output writer.

use super::entry::{ArchiveEntry, EntryKind};
use super::EntrySink;
use crate::error::{Context, Error, Result};
use chrono::{Datelike, Timelike};
use std::{
    fmt,
    io::{self, Seek, SeekFrom, Write},
    time::SystemTime,
};
use tempfile::SpooledTempFile;
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

/// Entries are assembled in memory up to this size before spilling to disk.
const SPOOL_LIMIT: usize = 16 * 1024 * 1024;

/// Archive-global zip compression method.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum ZipMethod {
    /// No compression (method 0).
    Store,
    /// Deflate (method 8), the default.
    #[default]
    Deflate,
    /// bzip2 (method 12).
    Bzip2,
    /// Zstandard (method 93).
    Zstd,
    /// xz (method 95).
    Xz,
    /// Brotli (private method 121). Recognised but not writable.
    Brotli,
}

impl ZipMethod {
    /// Resolves a method name. The empty string and `gzip` select deflate.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "" | "deflate" | "gzip" | "gz" => Ok(Self::Deflate),
            "store" | "none" => Ok(Self::Store),
            "bzip2" | "bz2" => Ok(Self::Bzip2),
            "zstd" | "zst" => Ok(Self::Zstd),
            "xz" => Ok(Self::Xz),
            "brotli" | "br" => Ok(Self::Brotli),
            other => Err(Error::UnsupportedCompression {
                method: other.to_string(),
                format: "zip",
            }),
        }
    }

    /// Method code written into zip headers.
    pub fn code(&self) -> u16 {
        match self {
            Self::Store => 0,
            Self::Deflate => 8,
            Self::Bzip2 => 12,
            Self::Zstd => 93,
            Self::Xz => 95,
            Self::Brotli => 121,
        }
    }

    /// Canonical method name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Store => "store",
            Self::Deflate => "deflate",
            Self::Bzip2 => "bzip2",
            Self::Zstd => "zstd",
            Self::Xz => "xz",
            Self::Brotli => "brotli",
        }
    }

    /// The writer's method, or an unsupported-configuration error.
    pub fn compression_method(&self) -> Result<CompressionMethod> {
        match self {
            Self::Store => Ok(CompressionMethod::Stored),
            Self::Deflate => Ok(CompressionMethod::Deflated),
            Self::Bzip2 => Ok(CompressionMethod::Bzip2),
            Self::Zstd => Ok(CompressionMethod::Zstd),
            Self::Xz => Ok(CompressionMethod::Xz),
            Self::Brotli => Err(Error::UnsupportedCompression {
                method: self.name().to_string(),
                format: "zip",
            }),
        }
    }
}

impl fmt::Display for ZipMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Zip writer whose output is streamed to a non-seekable sink on close.
pub struct ZipArchive<W: Write> {
    zip: ZipWriter<SpooledTempFile>,
    method: CompressionMethod,
    sink: W,
}

impl<W: Write> ZipArchive<W> {
    /// Starts an archive using `method` for every regular entry.
    pub fn new(sink: W, method: ZipMethod, comment: &str) -> Result<Self> {
        let method = method.compression_method()?;
        let mut zip = ZipWriter::new(SpooledTempFile::new(SPOOL_LIMIT));
        if !comment.is_empty() {
            zip.set_comment(comment.to_string());
        }
        Ok(Self { zip, method, sink })
    }

    /// Writes the central directory and copies the archive into the sink.
    pub fn close(self) -> Result<W> {
        let Self { zip, mut sink, .. } = self;
        let mut spool = zip.finish()?;
        spool.seek(SeekFrom::Start(0))?;
        io::copy(&mut spool, &mut sink)?;
        sink.flush()?;
        Ok(sink)
    }
}

impl<W: Write> EntrySink for ZipArchive<W> {
    fn write_entry(&mut self, entry: ArchiveEntry) -> Result<()> {
        let options = SimpleFileOptions::default()
            .last_modified_time(dos_time(entry.mtime()))
            .unix_permissions(entry.mode());

        match entry.kind() {
            EntryKind::Directory => {
                let options = options.compression_method(CompressionMethod::Stored);
                self.zip.add_directory(entry.name(), options)?;
            }
            EntryKind::Symlink(target) => {
                let options = options.compression_method(CompressionMethod::Stored);
                self.zip.add_symlink(entry.name(), target.as_str(), options)?;
            }
            EntryKind::Regular => {
                let options = options
                    .compression_method(self.method)
                    .large_file(entry.size() >= u64::from(u32::MAX));
                self.zip.start_file(entry.name(), options)?;
                let mut reader = entry.open()?;
                io::copy(&mut reader, &mut self.zip)
                    .map_err(Error::from)
                    .with_context(|| format!("adding {} to zip", entry.name()))?;
            }
        }
        Ok(())
    }
}

fn dos_time(mtime: SystemTime) -> zip::DateTime {
    let local: chrono::DateTime<chrono::Local> = mtime.into();
    zip::DateTime::from_date_and_time(
        u16::try_from(local.year()).unwrap_or(1980),
        local.month() as u8,
        local.day() as u8,
        local.hour() as u8,
        local.minute() as u8,
        local.second() as u8,
    )
    .unwrap_or_default()
}
