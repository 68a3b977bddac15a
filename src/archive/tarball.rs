//! Tar backend.

use super::compress::{Compressor, TarCompression};
use super::entry::{ArchiveEntry, EntryKind};
use super::EntrySink;
use crate::error::{Context, Error, Result};
use std::io::{self, Write};
use tar::{EntryType, Header};

/// Tar writer over a pluggable compressor.
pub struct TarArchive<W: Write + 'static> {
    builder: tar::Builder<Box<dyn Compressor<W>>>,
    compression: TarCompression,
}

impl<W: Write + 'static> TarArchive<W> {
    /// Starts a tar stream on `writer` compressed with `compression`.
    pub fn new(writer: W, compression: TarCompression) -> Result<Self> {
        let encoder = compression
            .wrap(writer)
            .map_err(Error::from)
            .with_context(|| format!("starting {compression} stream"))?;
        let builder = tar::Builder::new(encoder);
        Ok(Self {
            builder,
            compression,
        })
    }

    /// Compression in use.
    pub fn compression(&self) -> TarCompression {
        self.compression
    }

    /// Writes the tar trailer, terminates the codec and returns the sink.
    pub fn close(self) -> Result<W> {
        let encoder = self.builder.into_inner()?;
        Ok(encoder.finish()?)
    }
}

impl<W: Write + 'static> EntrySink for TarArchive<W> {
    fn write_entry(&mut self, entry: ArchiveEntry) -> Result<()> {
        let mut header = Header::new_gnu();
        header.set_mode(entry.mode());
        header.set_mtime(entry.mtime_secs());
        header.set_uid(0);
        header.set_gid(0);

        let appended = match entry.kind() {
            EntryKind::Directory => {
                header.set_entry_type(EntryType::Directory);
                header.set_size(0);
                self.builder.append_data(&mut header, entry.name(), io::empty())
            }
            EntryKind::Symlink(target) => {
                header.set_entry_type(EntryType::Symlink);
                header.set_size(0);
                self.builder.append_link(&mut header, entry.name(), target)
            }
            EntryKind::Regular => {
                header.set_entry_type(EntryType::Regular);
                header.set_size(entry.size());
                let reader = entry.open()?;
                self.builder.append_data(&mut header, entry.name(), reader)
            }
        };

        appended
            .map_err(Error::from)
            .with_context(|| format!("adding {} to tar", entry.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn unpack(data: Vec<u8>) -> Vec<(String, EntryType, u32, Vec<u8>, Option<String>)> {
        let decoder = flate2::read::GzDecoder::new(data.as_slice());
        let mut archive = tar::Archive::new(decoder);
        let mut out = Vec::new();
        for entry in archive.entries().unwrap() {
            let mut entry = entry.unwrap();
            let path = entry.path().unwrap().to_string_lossy().into_owned();
            let kind = entry.header().entry_type();
            let mode = entry.header().mode().unwrap();
            let link = entry
                .link_name()
                .unwrap()
                .map(|l| l.to_string_lossy().into_owned());
            let mut body = Vec::new();
            entry.read_to_end(&mut body).unwrap();
            out.push((path, kind, mode, body, link));
        }
        out
    }

    #[test]
    fn writes_files_links_and_directories() {
        let mut tar = TarArchive::new(Vec::new(), TarCompression::Gzip).unwrap();
        tar.write_entry(ArchiveEntry::bytes("pkg/bin/demo", b"ELF".to_vec(), 0o644).with_mode(true, None))
            .unwrap();
        tar.add_symlink("pkg/bin/dm", "demo").unwrap();
        tar.write_entry(ArchiveEntry::directory("pkg/share", 0o755)).unwrap();
        let entries = unpack(tar.close().unwrap());

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].0, "pkg/bin/demo");
        assert_eq!(entries[0].2, 0o755);
        assert_eq!(entries[0].3, b"ELF");
        assert_eq!(entries[1].1, EntryType::Symlink);
        assert_eq!(entries[1].4.as_deref(), Some("demo"));
        assert_eq!(entries[2].1, EntryType::Directory);
        assert!(entries[2].3.is_empty());
    }
}
