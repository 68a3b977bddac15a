//! SHA-256 over the exact bytes written to an archive.

use crate::error::{ErrorExt, Result};
use sha2::{Digest, Sha256};
use std::{
    fmt,
    fs::File,
    io::{self, Write},
    path::Path,
};

/// A SHA-256 digest.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Sha256Digest([u8; 32]);

impl Sha256Digest {
    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    fn from_hasher(hasher: Sha256) -> Self {
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hasher.finalize());
        Self(bytes)
    }
}

impl fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Writer adapter that hashes everything the inner writer accepts.
///
/// Only the byte count returned by the inner `write` is hashed, so short
/// writes never desynchronize the digest from the file.
#[derive(Debug)]
pub struct DigestTee<W> {
    inner: W,
    hasher: Sha256,
    written: u64,
}

impl<W: Write> DigestTee<W> {
    /// Wraps `inner`.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            written: 0,
        }
    }

    /// Bytes hashed so far.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Flushes and returns the inner writer with the digest of all bytes.
    pub fn finish(mut self) -> io::Result<(W, Sha256Digest)> {
        self.inner.flush()?;
        Ok((self.inner, Sha256Digest::from_hasher(self.hasher)))
    }
}

impl<W: Write> Write for DigestTee<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// The `<hex>  <file name>` line printed after a successful build.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DigestReport {
    /// Digest of the archive.
    pub digest: Sha256Digest,
    /// Archive file name without directories.
    pub file_name: String,
}

impl fmt::Display for DigestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}  {}", self.digest, self.file_name)
    }
}

/// Hashes a file on disk.
pub fn sha256_file(path: &Path) -> Result<Sha256Digest> {
    let mut file = File::open(path).fs_context("opening file for hashing", path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).fs_context("reading file for hash calculation", path)?;
    Ok(Sha256Digest::from_hasher(hasher))
}
