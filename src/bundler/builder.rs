//! Packaging orchestration.
//!
//! [`Packager`] runs the configured formats in order over one resolved
//! [`ContentPlan`]:
//! 1. Validates every format and resolves the contents
//! 2. Checks the cancellation token before each format
//! 3. Streams the output through a [`DigestTee`]
//! 4. Deletes the partial output if the build fails
//! 5. Returns one [`PackedArtifact`] per format
//!
//! # Example
//!
//! ```no_run
//! use relpack::bundler::{PackFormat, Packager, SettingsBuilder};
//! use relpack::env::EnvOverlay;
//! use relpack::model::{Crate, Package};
//! use tokio_util::sync::CancellationToken;
//!
//! # fn example() -> relpack::error::Result<()> {
//! let settings = SettingsBuilder::new()
//!     .project_dir(".")
//!     .formats(vec![PackFormat::parse("tgz", "")?, PackFormat::parse("sh", "gzip")?])
//!     .build()?;
//! let package = Package::load(settings.project_dir(), settings.env())?;
//! let crates = vec![Crate::load(settings.project_dir(), "cmd/demo", settings.env())?];
//!
//! let packager = Packager::new(settings);
//! for artifact in packager.pack(&package, &crates, &CancellationToken::new())? {
//!     eprintln!("{}", artifact.report());
//! }
//! # Ok(())
//! # }
//! ```

use crate::archive::{ArchiveBackend, BackendKind, DigestReport, DigestTee, Sha256Digest};
use crate::bundler::{
    contents::ContentPlan,
    platform::{
        PackFormat,
        linux::{debian, file_tuples, rpm},
    },
    settings::Settings,
    utils::fs,
};
use crate::error::{Context, Error, ErrorExt, Result};
use crate::installer::ShellInstaller;
use crate::model::{Crate, Package};
use crate::naming::{self, PathLayout};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
};
use tokio_util::sync::CancellationToken;

type OutputSink = DigestTee<BufWriter<File>>;

/// One package written to the destination directory.
#[derive(Debug, Clone)]
pub struct PackedArtifact {
    /// Format that produced it.
    pub format: PackFormat,
    /// Output file.
    pub path: PathBuf,
    /// SHA-256 of every byte written.
    pub digest: Sha256Digest,
    /// Size in bytes.
    pub size: u64,
}

impl PackedArtifact {
    /// The `<hex>  <file name>` line for this artifact.
    pub fn report(&self) -> DigestReport {
        DigestReport {
            digest: self.digest,
            file_name: self
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }
}

/// Builds every configured format for one package.
#[derive(Debug, Clone)]
pub struct Packager {
    settings: Settings,
}

impl Packager {
    /// Creates a packager for `settings`.
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Settings this packager was created with.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Top-level directory of plain archives.
    pub fn prefix(&self, package: &Package) -> String {
        naming::package_prefix(
            package.file_name(),
            &package.version,
            self.settings.target(),
            self.settings.arch(),
            self.settings.versioned(),
        )
    }

    /// File name `format` produces for `package`.
    pub fn output_name(&self, format: PackFormat, package: &Package) -> Result<String> {
        match format {
            PackFormat::Rpm => rpm::file_name(package, &self.settings),
            PackFormat::Deb => debian::file_name(package, &self.settings),
            PackFormat::Zip(_) | PackFormat::Tar(_) | PackFormat::Sh(_) => Ok(
                naming::archive_file_name(&self.prefix(package), format.extension()),
            ),
        }
    }

    /// Packs every configured format in order.
    ///
    /// Unsupported configurations, missing inputs and duplicate names fail
    /// before any output exists. `cancel` is checked before each format; a
    /// format that already started runs to completion.
    pub fn pack(
        &self,
        package: &Package,
        crates: &[Crate],
        cancel: &CancellationToken,
    ) -> Result<Vec<PackedArtifact>> {
        let formats = self.settings.formats();
        if formats.is_empty() {
            log::warn!("no package formats requested");
            return Ok(Vec::new());
        }
        for format in formats {
            format.validate()?;
            if matches!(format, PackFormat::Rpm | PackFormat::Deb) {
                self.settings.binary_arch()?;
            }
        }
        let plan = ContentPlan::new(package, crates, &self.settings)?;

        let mut artifacts = Vec::with_capacity(formats.len());
        for &format in formats {
            if cancel.is_cancelled() {
                log::warn!("cancelled before {format}");
                return Err(Error::Cancelled);
            }
            artifacts.push(self.pack_format(format, package, &plan)?);
        }
        Ok(artifacts)
    }

    fn pack_format(
        &self,
        format: PackFormat,
        package: &Package,
        plan: &ContentPlan,
    ) -> Result<PackedArtifact> {
        let name = self.output_name(format, package)?;
        let path = self.settings.destination().join(&name);
        let mode = matches!(format, PackFormat::Sh(_)).then_some(0o755);

        log::info!("packing {} ({format})", path.display());
        let file = fs::create_file(&path, mode)?;
        let sink = DigestTee::new(BufWriter::new(file));

        let result = self
            .write_format(format, package, plan, &name, sink)
            .and_then(|sink| finish(sink, &path));
        match result {
            Ok((digest, size)) => {
                log::debug!("{} bytes written to {}", size, path.display());
                Ok(PackedArtifact {
                    format,
                    path,
                    digest,
                    size,
                })
            }
            Err(error) => {
                if let Err(cleanup) = fs::remove_if_exists(&path) {
                    log::warn!("failed to remove partial output: {cleanup}");
                }
                Err(error).with_context(|| format!("packing {name}"))
            }
        }
    }

    fn write_format(
        &self,
        format: PackFormat,
        package: &Package,
        plan: &ContentPlan,
        name: &str,
        sink: OutputSink,
    ) -> Result<OutputSink> {
        match format {
            PackFormat::Zip(method) => {
                self.write_archive(BackendKind::Zip(method), package, plan, sink)
            }
            PackFormat::Tar(compression) => {
                self.write_archive(BackendKind::Tar(compression), package, plan, sink)
            }
            PackFormat::Sh(compression) => {
                let mut installer = ShellInstaller::new(sink, compression, name)?;
                plan.write_installer(&mut installer)?;
                installer.close()
            }
            PackFormat::Rpm => {
                let files = file_tuples(plan, package.install_prefix())?;
                let mut sink = sink;
                rpm::write_package(package, &self.settings, &files, &mut sink)?;
                Ok(sink)
            }
            PackFormat::Deb => {
                let files = file_tuples(plan, package.install_prefix())?;
                debian::write_package(package, &self.settings, &files, sink)
            }
        }
    }

    fn write_archive(
        &self,
        kind: BackendKind,
        package: &Package,
        plan: &ContentPlan,
        sink: OutputSink,
    ) -> Result<OutputSink> {
        let mut backend = ArchiveBackend::open(kind, sink, package.summary.trim())?;
        plan.write_plain(&mut backend, &PathLayout::plain(self.prefix(package)))?;
        backend.close()
    }
}

fn finish(mut sink: OutputSink, path: &std::path::Path) -> Result<(Sha256Digest, u64)> {
    sink.flush().fs_context("flushing output", path)?;
    let size = sink.bytes_written();
    let (writer, digest) = sink.finish().fs_context("flushing output", path)?;
    let file = writer
        .into_inner()
        .map_err(|e| e.into_error())
        .fs_context("flushing output", path)?;
    file.sync_all().fs_context("syncing output", path)?;
    Ok((digest, size))
}
