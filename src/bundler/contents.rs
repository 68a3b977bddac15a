//! Package contents, resolved once per run and replayed into every format.

use crate::archive::EntrySink;
use crate::bundler::Settings;
use crate::error::{Error, ErrorExt, Result};
use crate::installer::ShellInstaller;
use crate::model::{Crate, Package};
use crate::naming::{self, PathLayout};
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

/// What a planned entry is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentKind {
    /// Compiled binary.
    Binary,
    /// Symlink to a binary; holds the relative link target.
    Alias(String),
    /// Auxiliary file with its permission override.
    Include {
        /// Explicit mode
        mode: Option<u32>,
        /// Shipped under its final name by installers
        verbatim: bool,
    },
}

/// One entry, named relative to the package root.
#[derive(Debug, Clone)]
pub struct PlannedEntry {
    rel: String,
    source: Option<PathBuf>,
    kind: ContentKind,
}

impl PlannedEntry {
    /// Path relative to the package root.
    pub fn rel(&self) -> &str {
        &self.rel
    }

    /// File on disk; `None` for aliases.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Entry kind.
    pub fn kind(&self) -> &ContentKind {
        &self.kind
    }

    fn source_or_err(&self) -> Result<&Path> {
        self.source().ok_or_else(|| {
            Error::GenericError(format!("entry {} has no source file", self.rel))
        })
    }
}

/// Ordered, duplicate-free list of everything a package ships: each crate's
/// binary followed by its aliases, then the include files.
#[derive(Debug, Clone, Default)]
pub struct ContentPlan {
    entries: Vec<PlannedEntry>,
}

impl ContentPlan {
    /// Resolves the contents of `package`.
    ///
    /// Every input error (missing artifact or include, bad permissions,
    /// duplicate names) is raised here, before any output exists.
    pub fn new(package: &Package, crates: &[Crate], settings: &Settings) -> Result<Self> {
        package.validate()?;
        let target = settings.target();
        let mut plan = ContentPlan::default();
        let mut seen = HashSet::new();

        for krate in crates {
            let source = match krate.artifact() {
                Some(path) => path.to_path_buf(),
                None => krate.default_artifact_path(settings.out_dir(), target),
            };
            if std::fs::symlink_metadata(&source).is_err() {
                return Err(Error::MissingArtifact {
                    name: krate.name.clone(),
                    path: source,
                });
            }
            let rel = krate.relative_path(target);
            plan.push(&mut seen, rel.clone(), Some(source), ContentKind::Binary)?;

            for alias in krate.aliases(target) {
                let link = naming::relative_link(&naming::dirname(&alias), &rel);
                plan.push(&mut seen, alias, None, ContentKind::Alias(link))?;
            }
        }

        for item in &package.include {
            let source = item.source(settings.project_dir());
            std::fs::symlink_metadata(&source).fs_context("inspecting include", &source)?;
            let kind = ContentKind::Include {
                mode: item.mode()?,
                verbatim: item.verbatim,
            };
            plan.push(&mut seen, item.relative_path(), Some(source), kind)?;
        }

        Ok(plan)
    }

    fn push(
        &mut self,
        seen: &mut HashSet<String>,
        rel: String,
        source: Option<PathBuf>,
        kind: ContentKind,
    ) -> Result<()> {
        if !seen.insert(rel.clone()) {
            return Err(Error::DuplicateEntry(rel));
        }
        self.entries.push(PlannedEntry { rel, source, kind });
        Ok(())
    }

    /// Entries in write order.
    pub fn entries(&self) -> &[PlannedEntry] {
        &self.entries
    }

    /// Writes every entry into a zip or tar backend under `layout`.
    pub fn write_plain<S: EntrySink>(&self, sink: &mut S, layout: &PathLayout) -> Result<()> {
        for entry in &self.entries {
            let name = layout.path_in_archive(&entry.rel);
            match &entry.kind {
                ContentKind::Binary => sink.add_file(entry.source_or_err()?, &name, true)?,
                ContentKind::Alias(target) => sink.add_symlink(&name, target)?,
                ContentKind::Include { mode, .. } => {
                    sink.add_file_with_mode(entry.source_or_err()?, &name, false, *mode)?
                }
            }
        }
        Ok(())
    }

    /// Writes every entry into a self-extracting installer, staging binaries
    /// and profiles.
    pub fn write_installer<W: Write + 'static>(
        &self,
        installer: &mut ShellInstaller<W>,
    ) -> Result<()> {
        let layout = PathLayout::installer();
        for entry in &self.entries {
            let name = layout.path_in_archive(&entry.rel);
            match &entry.kind {
                ContentKind::Binary => installer.add_target(entry.source_or_err()?, &name, None)?,
                ContentKind::Alias(target) => installer.add_symlink(&name, target)?,
                ContentKind::Include {
                    mode,
                    verbatim: true,
                } => installer.add_verbatim(entry.source_or_err()?, &name, *mode)?,
                ContentKind::Include {
                    mode,
                    verbatim: false,
                } => installer.add_profile(entry.source_or_err()?, &name, *mode)?,
            }
        }
        Ok(())
    }
}
