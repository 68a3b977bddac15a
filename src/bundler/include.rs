//! Staging of include files into the build output directory.

use crate::bundler::{Settings, utils::fs};
use crate::error::{Error, Result};
use crate::model::{FileItem, Package};
use path_absolutize::Absolutize;
use std::path::{Path, PathBuf};

/// Result of staging one include.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedInclude {
    /// Source path as written in the manifest.
    pub item: String,
    /// Copy inside the build output directory.
    pub staged: PathBuf,
    /// False when the copy was already newer than its source.
    pub copied: bool,
}

/// Location of an include's copy inside `out_dir`.
pub fn staged_path(item: &FileItem, out_dir: &Path) -> PathBuf {
    out_dir.join(item.relative_path())
}

/// Copies every include into `<out>/<destination>/<name>`.
///
/// A copy newer than its source is left alone. Permission overrides apply to
/// the copy. Directory sources are rejected.
pub fn stage_includes(package: &Package, settings: &Settings) -> Result<Vec<StagedInclude>> {
    let mut staged = Vec::with_capacity(package.include.len());
    for item in &package.include {
        staged.push(stage(item, settings)?);
    }
    Ok(staged)
}

fn stage(item: &FileItem, settings: &Settings) -> Result<StagedInclude> {
    let source = item.source(settings.project_dir()).absolutize()?.into_owned();
    let dest = staged_path(item, settings.out_dir()).absolutize()?.into_owned();
    let mode = item.mode()?;

    if source == dest {
        log::debug!("{} is already in place", dest.display());
        return Ok(StagedInclude {
            item: item.path.clone(),
            staged: dest,
            copied: false,
        });
    }

    let source_time = fs::modified(&source)?;
    if let Ok(staged_time) = fs::modified(&dest)
        && staged_time > source_time
    {
        log::debug!("{} is up to date", dest.display());
        return Ok(StagedInclude {
            item: item.path.clone(),
            staged: dest,
            copied: false,
        });
    }

    fs::copy_file(&source, &dest)
        .map_err(|e| Error::Context(format!("install {}", item.path), Box::new(e)))?;
    if let Some(mode) = mode {
        fs::set_mode(&dest, mode)?;
    }
    log::info!("install {} --> {}", item.path, item.relative_path());

    Ok(StagedInclude {
        item: item.path.clone(),
        staged: dest,
        copied: true,
    })
}
