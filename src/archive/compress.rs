//! Stream compressors for tar payloads.
//!
//! The table is fixed: each [`TarCompression`] maps to one stream wrapper and
//! one file name suffix. Codecs come from their crates; nothing here
//! implements compression itself.

use crate::error::{Error, Result};
use std::fmt;
use std::io::{self, Write};

/// A compressing writer that can hand back its sink once the stream is
/// terminated.
pub trait Compressor<W: Write>: Write {
    /// Writes the codec trailer and returns the inner writer.
    fn finish(self: Box<Self>) -> io::Result<W>;
}

impl<W: Write> Compressor<W> for flate2::write::GzEncoder<W> {
    fn finish(self: Box<Self>) -> io::Result<W> {
        flate2::write::GzEncoder::finish(*self)
    }
}

impl<W: Write> Compressor<W> for xz2::write::XzEncoder<W> {
    fn finish(self: Box<Self>) -> io::Result<W> {
        xz2::write::XzEncoder::finish(*self)
    }
}

impl<W: Write> Compressor<W> for bzip2::write::BzEncoder<W> {
    fn finish(self: Box<Self>) -> io::Result<W> {
        bzip2::write::BzEncoder::finish(*self)
    }
}

impl<W: Write> Compressor<W> for zstd::stream::write::Encoder<'static, W> {
    fn finish(self: Box<Self>) -> io::Result<W> {
        zstd::stream::write::Encoder::finish(*self)
    }
}

impl<W: Write> Compressor<W> for brotli::CompressorWriter<W> {
    fn finish(self: Box<Self>) -> io::Result<W> {
        let mut writer = *self;
        writer.flush()?;
        Ok(writer.into_inner())
    }
}

/// Identity wrapper for uncompressed tar.
pub struct Passthrough<W: Write>(W);

impl<W: Write> Write for Passthrough<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl<W: Write> Compressor<W> for Passthrough<W> {
    fn finish(self: Box<Self>) -> io::Result<W> {
        let Passthrough(mut inner) = *self;
        inner.flush()?;
        Ok(inner)
    }
}

const BROTLI_BUFFER: usize = 64 * 1024;
const BROTLI_QUALITY: u32 = 9;
const BROTLI_WINDOW: u32 = 22;
const ZSTD_LEVEL: i32 = 19;
const XZ_LEVEL: u32 = 6;

/// Compression applied to a tar stream.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum TarCompression {
    /// gzip, the default.
    #[default]
    Gzip,
    /// xz / LZMA2.
    Xz,
    /// bzip2.
    Bzip2,
    /// brotli.
    Brotli,
    /// Zstandard.
    Zstd,
    /// Plain tar.
    Plain,
}

impl TarCompression {
    /// Every supported method, in table order.
    pub const ALL: [TarCompression; 6] = [
        TarCompression::Gzip,
        TarCompression::Xz,
        TarCompression::Bzip2,
        TarCompression::Brotli,
        TarCompression::Zstd,
        TarCompression::Plain,
    ];

    /// Resolves a method name. The empty string selects gzip.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "" | "gzip" | "gz" | "deflate" => Ok(Self::Gzip),
            "xz" | "lzma" => Ok(Self::Xz),
            "bzip2" | "bz2" => Ok(Self::Bzip2),
            "brotli" | "br" => Ok(Self::Brotli),
            "zstd" | "zst" => Ok(Self::Zstd),
            "none" | "store" => Ok(Self::Plain),
            other => Err(Error::UnsupportedCompression {
                method: other.to_string(),
                format: "tar",
            }),
        }
    }

    /// Canonical method name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Xz => "xz",
            Self::Bzip2 => "bzip2",
            Self::Brotli => "brotli",
            Self::Zstd => "zstd",
            Self::Plain => "none",
        }
    }

    /// Archive file name suffix, including the leading dot.
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Gzip => ".tar.gz",
            Self::Xz => ".tar.xz",
            Self::Bzip2 => ".tar.bz2",
            Self::Brotli => ".tar.br",
            Self::Zstd => ".tar.zst",
            Self::Plain => ".tar",
        }
    }

    /// Options that make `tar` extract this payload from stdin, or `None`
    /// when `tar` cannot decode it.
    pub fn tar_extract_args(&self) -> Option<&'static str> {
        match self {
            Self::Gzip => Some("-xz"),
            Self::Xz => Some("-xJ"),
            Self::Bzip2 => Some("-xj"),
            Self::Zstd => Some("--zstd -x"),
            Self::Plain => Some("-x"),
            Self::Brotli => None,
        }
    }

    /// Wraps `writer` in this method's compressor.
    pub fn wrap<W: Write + 'static>(&self, writer: W) -> io::Result<Box<dyn Compressor<W>>> {
        Ok(match self {
            Self::Gzip => Box::new(flate2::write::GzEncoder::new(
                writer,
                flate2::Compression::default(),
            )),
            Self::Xz => Box::new(xz2::write::XzEncoder::new(writer, XZ_LEVEL)),
            Self::Bzip2 => Box::new(bzip2::write::BzEncoder::new(
                writer,
                bzip2::Compression::best(),
            )),
            Self::Brotli => Box::new(brotli::CompressorWriter::new(
                writer,
                BROTLI_BUFFER,
                BROTLI_QUALITY,
                BROTLI_WINDOW,
            )),
            Self::Zstd => Box::new(zstd::stream::write::Encoder::new(writer, ZSTD_LEVEL)?),
            Self::Plain => Box::new(Passthrough(writer)),
        })
    }
}

impl fmt::Display for TarCompression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
