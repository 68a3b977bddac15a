//! Removal of previously produced outputs.
//!
//! There is no manifest of earlier runs. Staged includes are judged by
//! comparing their modification time with the source; compiled artifacts and
//! packages have no source to compare against and are always removed.

use crate::bundler::{Settings, include::staged_path, utils::fs};
use crate::error::{Error, Result};
use crate::model::{Crate, FileItem, Package};
use std::path::{Path, PathBuf};

/// What a cleanup pass did.
#[derive(Debug, Default)]
pub struct CleanupReport {
    /// Removed files.
    pub removed: Vec<PathBuf>,
    /// Staged copies left alone because they are newer than their source.
    pub kept: Vec<PathBuf>,
    /// Files that could not be inspected or removed.
    pub failed: Vec<(PathBuf, Error)>,
}

impl CleanupReport {
    /// True when every removal succeeded.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, path: PathBuf, outcome: Result<bool>) {
        match outcome {
            Ok(true) => {
                log::info!("rm: {}", path.display());
                self.removed.push(path);
            }
            Ok(false) => {}
            Err(error) => {
                log::error!("cleanup {} error: {error}", path.display());
                self.failed.push((path, error));
            }
        }
    }
}

/// Cleanup policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cleanup {
    force: bool,
}

impl Cleanup {
    /// `force` removes staged includes regardless of their modification time.
    pub fn new(force: bool) -> Self {
        Self { force }
    }

    /// Removes staged includes, compiled artifacts and packages.
    ///
    /// Failures are collected per file; one failure never stops the rest.
    pub fn run(&self, package: &Package, crates: &[Crate], settings: &Settings) -> CleanupReport {
        let mut report = CleanupReport::default();

        for item in &package.include {
            self.clean_item(item, settings, &mut report);
        }
        for krate in crates {
            let base = settings.out_dir().join(&krate.destination).join(&krate.name);
            let exe = base.with_file_name(format!("{}.exe", krate.name));
            for path in [base, exe] {
                let outcome = fs::remove_if_exists(&path);
                report.record(path, outcome);
            }
        }
        clean_packages(settings.destination(), &mut report);

        report
    }

    fn clean_item(&self, item: &FileItem, settings: &Settings, report: &mut CleanupReport) {
        let staged = staged_path(item, settings.out_dir());
        let Ok(staged_time) = fs::modified(&staged) else {
            return;
        };

        if !self.force {
            let source = item.source(settings.project_dir());
            match fs::modified(&source) {
                Ok(source_time) if staged_time > source_time => {
                    log::debug!("keeping {}", staged.display());
                    report.kept.push(staged);
                    return;
                }
                Ok(_) => {}
                Err(error) => {
                    report.record(staged, Err(error));
                    return;
                }
            }
        }

        let outcome = fs::remove_if_exists(&staged);
        report.record(staged, outcome);
    }
}

fn clean_packages(destination: &Path, report: &mut CleanupReport) {
    let pattern = format!(
        "{}/*",
        glob::Pattern::escape(&destination.to_string_lossy())
    );
    let paths = match glob::glob(&pattern) {
        Ok(paths) => paths,
        Err(error) => {
            report.record(destination.to_path_buf(), Err(error.into()));
            return;
        }
    };

    for entry in paths {
        match entry {
            Ok(path) if path.is_dir() => {}
            Ok(path) => {
                let outcome = fs::remove_if_exists(&path);
                report.record(path, outcome);
            }
            Err(error) => {
                let path = error.path().to_path_buf();
                report.record(path, Err(Error::IoError(error.into())));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::{SettingsBuilder, stage_includes};
    use crate::env::EnvOverlay;
    use std::time::{Duration, SystemTime};

    fn setup() -> (tempfile::TempDir, Settings, Package, Vec<Crate>) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("README.md"), b"# demo").unwrap();
        std::fs::create_dir_all(dir.path().join("build/bin")).unwrap();
        std::fs::write(dir.path().join("build/bin/demo"), b"ELF").unwrap();
        std::fs::create_dir_all(dir.path().join("out")).unwrap();
        std::fs::write(dir.path().join("out/demo-1.0.0-linux-amd64.tar.gz"), b"gz").unwrap();

        let settings = SettingsBuilder::new()
            .project_dir(dir.path())
            .out_dir("build")
            .build()
            .unwrap();
        let package = Package {
            name: "demo".into(),
            version: "1.0.0".into(),
            include: vec![FileItem {
                path: "README.md".into(),
                destination: "share/doc".into(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let crates = vec![Crate::new("cmd/demo", &EnvOverlay::new()).unwrap()];
        stage_includes(&package, &settings).unwrap();
        (dir, settings, package, crates)
    }

    fn age_source(dir: &Path) {
        let earlier = SystemTime::now() - Duration::from_secs(3600);
        std::fs::File::options()
            .write(true)
            .open(dir.join("README.md"))
            .unwrap()
            .set_modified(earlier)
            .unwrap();
    }

    #[test]
    fn newer_copy_survives_without_force() {
        let (dir, settings, package, crates) = setup();
        age_source(dir.path());

        let report = Cleanup::new(false).run(&package, &crates, &settings);
        assert!(report.is_clean());
        assert_eq!(report.kept, vec![dir.path().join("build/share/doc/README.md")]);
        assert!(dir.path().join("build/share/doc/README.md").exists());
        assert!(!dir.path().join("build/bin/demo").exists());
        assert!(!dir.path().join("out/demo-1.0.0-linux-amd64.tar.gz").exists());
    }

    #[test]
    fn force_removes_everything() {
        let (dir, settings, package, crates) = setup();
        age_source(dir.path());

        let report = Cleanup::new(true).run(&package, &crates, &settings);
        assert!(report.kept.is_empty());
        assert_eq!(report.removed.len(), 3);
        assert!(!dir.path().join("build/share/doc/README.md").exists());
    }

    #[test]
    fn missing_outputs_are_not_errors() {
        let dir = tempfile::tempdir().unwrap();
        let settings = SettingsBuilder::new().project_dir(dir.path()).build().unwrap();
        let crates = vec![Crate::new("cmd/demo", &EnvOverlay::new()).unwrap()];
        let report = Cleanup::new(true).run(&Package::default(), &crates, &settings);
        assert!(report.is_clean());
        assert!(report.removed.is_empty());
    }
}
