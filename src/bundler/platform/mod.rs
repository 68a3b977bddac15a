//! Output formats.
//!
//! Archives (zip, tar, self-extracting sh) are written by the backends in
//! [`crate::archive`] and [`crate::installer`]; system packages (rpm, deb) by
//! the consumers in [`linux`].
//!
//! | Format | Names on the command line | Extension |
//! |--------|---------------------------|-----------|
//! | zip | `zip` | `.zip` |
//! | tar | `tar`, `tar.gz`, `tgz`, `tar.xz`, ... | `.tar.*` |
//! | sh | `sh`, `stgz` | `.sh` |
//! | rpm | `rpm` | `.rpm` |
//! | deb | `deb` | `.deb` |

pub mod linux;

use crate::archive::{TarCompression, ZipMethod};
use crate::error::{Error, Result};
use std::fmt;

/// One output format with its codec.
///
/// # Examples
///
/// ```
/// use relpack::bundler::PackFormat;
/// use relpack::archive::TarCompression;
///
/// let format = PackFormat::parse("tgz", "")?;
/// assert_eq!(format, PackFormat::Tar(TarCompression::Gzip));
/// assert_eq!(format.extension(), ".tar.gz");
/// # Ok::<(), relpack::error::Error>(())
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum PackFormat {
    /// Zip archive.
    Zip(ZipMethod),
    /// Tar archive through a stream compressor.
    Tar(TarCompression),
    /// Self-extracting shell installer with a tar payload.
    Sh(TarCompression),
    /// RPM package.
    Rpm,
    /// Debian package.
    Deb,
}

impl PackFormat {
    /// Resolves a format name. `compression` selects the codec for `zip`,
    /// `tar` and `sh`; names that fix the codec (`tgz`, `tar.xz`, `stgz`)
    /// ignore it.
    pub fn parse(name: &str, compression: &str) -> Result<Self> {
        let format = match name.trim().to_ascii_lowercase().as_str() {
            "zip" => PackFormat::Zip(ZipMethod::from_name(compression)?),
            "tar" => PackFormat::Tar(TarCompression::from_name(compression)?),
            "tar.gz" | "tgz" => PackFormat::Tar(TarCompression::Gzip),
            "tar.xz" | "txz" => PackFormat::Tar(TarCompression::Xz),
            "tar.bz2" | "tbz2" => PackFormat::Tar(TarCompression::Bzip2),
            "tar.zst" | "tzst" => PackFormat::Tar(TarCompression::Zstd),
            "tar.br" => PackFormat::Tar(TarCompression::Brotli),
            "sh" => PackFormat::Sh(TarCompression::from_name(compression)?),
            "stgz" => PackFormat::Sh(TarCompression::Gzip),
            "rpm" => PackFormat::Rpm,
            "deb" => PackFormat::Deb,
            other => return Err(Error::UnsupportedFormat(other.to_string())),
        };
        Ok(format)
    }

    /// Returns the short name used in logs.
    pub fn short_name(&self) -> &'static str {
        match self {
            PackFormat::Zip(_) => "zip",
            PackFormat::Tar(_) => "tar",
            PackFormat::Sh(_) => "sh",
            PackFormat::Rpm => "rpm",
            PackFormat::Deb => "deb",
        }
    }

    /// File name extension including the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            PackFormat::Zip(_) => ".zip",
            PackFormat::Tar(compression) => compression.suffix(),
            PackFormat::Sh(_) => ".sh",
            PackFormat::Rpm => ".rpm",
            PackFormat::Deb => ".deb",
        }
    }

    /// Rejects codec combinations the format cannot carry.
    pub fn validate(&self) -> Result<()> {
        match self {
            PackFormat::Zip(method) => method.compression_method().map(|_| ()),
            PackFormat::Sh(compression) => crate::installer::check(*compression).map(|_| ()),
            PackFormat::Tar(_) | PackFormat::Rpm | PackFormat::Deb => Ok(()),
        }
    }
}

impl fmt::Display for PackFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackFormat::Zip(method) => write!(f, "zip ({method})"),
            PackFormat::Tar(compression) | PackFormat::Sh(compression) => {
                write!(f, "{} ({compression})", self.short_name())
            }
            PackFormat::Rpm | PackFormat::Deb => f.write_str(self.short_name()),
        }
    }
}
