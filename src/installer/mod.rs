//! Self-extracting shell installers.
//!
//! An installer is a POSIX shell header followed by a compressed tar payload.
//! Binaries travel under a staged `.new` name and configuration files under
//! `.template`; the respond script, always the last payload entry, moves them
//! into place on the target machine (see [`apply`] for the same protocol in
//! Rust).

pub mod apply;
pub mod respond;
mod templates;

use crate::archive::{ArchiveEntry, EXECUTABLE_BITS, EntrySink, TarArchive, TarCompression};
use crate::error::{Error, Result};
use respond::{RespondDirective, RespondScript};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Name of the generated post-install script inside the payload.
pub const RESPOND_SCRIPT_NAME: &str = "relpack_post_install.sh";

/// Line that separates the shell header from the payload.
pub const ARCHIVE_MARKER: &str = "__ARCHIVE_BELOW__";

/// Suffix of binaries waiting to be swapped into place.
pub const STAGED_BINARY_SUFFIX: &str = ".new";

/// Suffix of configuration files waiting to be installed.
pub const STAGED_PROFILE_SUFFIX: &str = ".template";

/// Directory, next to each binary, holding rotated backups.
pub const BACKUP_DIR: &str = "old";

/// Number of numbered backups kept in [`BACKUP_DIR`].
pub const BACKUP_DEPTH: usize = 3;

#[derive(Serialize)]
struct HeaderData<'a> {
    file_name: String,
    marker: &'a str,
    tar_args: &'a str,
    respond: String,
}

/// Fails unless the shell header can extract a payload compressed with
/// `compression`.
pub fn check(compression: TarCompression) -> Result<&'static str> {
    compression
        .tar_extract_args()
        .ok_or_else(|| Error::UnsupportedCompression {
            method: compression.name().to_string(),
            format: "sh",
        })
}

/// Renders the shell header for an installer named `file_name`. The text ends
/// with the marker line; the payload starts right after it.
pub fn render_header(compression: TarCompression, file_name: &str) -> Result<String> {
    let tar_args = check(compression)?;
    let data = HeaderData {
        file_name: respond::escape_double_quoted(file_name),
        marker: ARCHIVE_MARKER,
        tar_args,
        respond: respond::escape_double_quoted(RESPOND_SCRIPT_NAME),
    };
    Ok(templates::registry()?.render(templates::HEADER, &data)?)
}

/// Streams a self-extracting installer into `W`.
///
/// Output is append-only: header, then tar entries in call order, then the
/// respond script.
pub struct ShellInstaller<W: Write + 'static> {
    payload: TarArchive<W>,
    respond: RespondScript,
}

impl<W: Write + 'static> ShellInstaller<W> {
    /// Writes the header and opens the payload stream.
    pub fn new(mut writer: W, compression: TarCompression, file_name: &str) -> Result<Self> {
        let header = render_header(compression, file_name)?;
        writer.write_all(header.as_bytes())?;
        Ok(Self {
            payload: TarArchive::new(writer, compression)?,
            respond: RespondScript::new(),
        })
    }

    /// Adds a binary as `final_name.new` and schedules its swap.
    pub fn add_target(&mut self, source: &Path, final_name: &str, mode: Option<u32>) -> Result<()> {
        let staged = format!("{final_name}{STAGED_BINARY_SUFFIX}");
        self.payload.add_file_with_mode(source, &staged, true, mode)?;
        self.respond.push(RespondDirective::ApplyTarget(staged));
        Ok(())
    }

    /// Adds a configuration file as `final_name.template` and schedules its
    /// non-destructive install.
    pub fn add_profile(&mut self, source: &Path, final_name: &str, mode: Option<u32>) -> Result<()> {
        let staged = format!("{final_name}{STAGED_PROFILE_SUFFIX}");
        self.payload.add_file_with_mode(source, &staged, false, mode)?;
        self.respond.push(RespondDirective::ApplyProfile(staged));
        Ok(())
    }

    /// Adds a file under its final name; no directive is recorded.
    pub fn add_verbatim(&mut self, source: &Path, name: &str, mode: Option<u32>) -> Result<()> {
        self.payload.add_file_with_mode(source, name, false, mode)
    }

    /// Directives recorded so far.
    pub fn directives(&self) -> &[RespondDirective] {
        self.respond.directives()
    }

    /// Appends the respond script and terminates the payload.
    pub fn close(mut self) -> Result<W> {
        let script = self.respond.render()?;
        log::debug!(
            "respond script with {} directive(s)",
            self.respond.directives().len()
        );
        self.payload.write_entry(ArchiveEntry::bytes(
            RESPOND_SCRIPT_NAME,
            script.into_bytes(),
            EXECUTABLE_BITS,
        ))?;
        self.payload.close()
    }
}

impl<W: Write + 'static> EntrySink for ShellInstaller<W> {
    fn write_entry(&mut self, entry: ArchiveEntry) -> Result<()> {
        self.payload.write_entry(entry)
    }
}
