//! System packages (.rpm and .deb).
//!
//! Both consumers work from the same flattened file list: every planned
//! entry becomes a [`FileTuple`] with an absolute destination under the
//! package's install prefix, owned by `root:root`. Modes follow the archive
//! rules (binaries executable, include overrides win, symlinks kept as
//! links).
//!
//! | Format | Output name |
//! |--------|-------------|
//! | .rpm | `<name>-<version>-<release>.<arch>.rpm` |
//! | .deb | `<name>_<version>_<arch>.deb` |

pub mod debian;
pub mod rpm;

use crate::archive::{ArchiveEntry, EntryKind};
use crate::bundler::contents::{ContentKind, ContentPlan};
use crate::error::Result;
use crate::naming::PathLayout;
use std::path::PathBuf;

const OWNER: &str = "root";

/// Kind of a flattened entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TupleKind {
    /// Regular file read from `source`.
    Regular,
    /// Symlink with its target.
    Symlink(String),
}

/// One file of a system package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTuple {
    /// Content on disk; `None` for symlinks.
    pub source: Option<PathBuf>,
    /// Absolute install path.
    pub destination: String,
    /// Permission bits.
    pub mode: u32,
    /// Owning user.
    pub owner: String,
    /// Owning group.
    pub group: String,
    /// Modification time, Unix seconds.
    pub mtime: u64,
    /// Entry kind.
    pub kind: TupleKind,
}

impl FileTuple {
    fn new(destination: String, source: Option<PathBuf>, entry: &ArchiveEntry, kind: TupleKind) -> Self {
        Self {
            source,
            destination,
            mode: entry.mode(),
            owner: OWNER.to_string(),
            group: OWNER.to_string(),
            mtime: entry.mtime_secs(),
            kind,
        }
    }

    /// File size for regular entries.
    pub fn size(&self) -> u64 {
        self.source
            .as_deref()
            .and_then(|p| std::fs::metadata(p).ok())
            .map(|m| m.len())
            .unwrap_or(0)
    }
}

/// Flattens `plan` into system-package entries installed below
/// `install_prefix`. Directory includes carry no files and are skipped.
pub fn file_tuples(plan: &ContentPlan, install_prefix: &str) -> Result<Vec<FileTuple>> {
    let layout = PathLayout::rooted(install_prefix);
    let mut tuples = Vec::with_capacity(plan.entries().len());

    for planned in plan.entries() {
        let destination = layout.path_in_archive(planned.rel());
        let (executable, mode) = match planned.kind() {
            ContentKind::Binary => (true, None),
            ContentKind::Include { mode, .. } => (false, *mode),
            ContentKind::Alias(target) => {
                let entry = ArchiveEntry::symlink(&destination, target);
                tuples.push(FileTuple::new(
                    destination,
                    None,
                    &entry,
                    TupleKind::Symlink(target.clone()),
                ));
                continue;
            }
        };

        let Some(source) = planned.source() else {
            continue;
        };
        let entry = ArchiveEntry::from_path(source, &destination)?.with_mode(executable, mode);
        let tuple = match entry.kind() {
            EntryKind::Regular => {
                FileTuple::new(destination, Some(source.to_path_buf()), &entry, TupleKind::Regular)
            }
            EntryKind::Symlink(target) => {
                let kind = TupleKind::Symlink(target.clone());
                FileTuple::new(destination, None, &entry, kind)
            }
            EntryKind::Directory => {
                log::debug!("skipping directory {destination} in system package");
                continue;
            }
        };
        tuples.push(tuple);
    }

    Ok(tuples)
}
