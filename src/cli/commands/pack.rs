//! Pack command implementation.
//!
//! Stages includes, then writes every requested format and prints one
//! digest line per package.

use super::{load_project, settings_builder};
use crate::bundler::{PackFormat, Packager, stage_includes};
use crate::cli::{Args, OutputManager, PackArgs};
use crate::env::{BUILD_VERSION, EnvOverlay};
use crate::error::Result;
use tokio_util::sync::CancellationToken;

/// Execute pack command
pub(super) fn execute_pack(args: &Args, pack: &PackArgs, output: &OutputManager) -> Result<i32> {
    let formats = pack
        .formats
        .iter()
        .filter(|f| !f.trim().is_empty())
        .map(|f| PackFormat::parse(f, &pack.compression))
        .collect::<Result<Vec<_>>>()?;

    let mut env = EnvOverlay::new();
    if let Some(version) = &pack.version_override {
        env = env.with(BUILD_VERSION, version.as_str());
    }

    let mut builder = settings_builder(args, env)
        .destination(&pack.destination)
        .formats(formats)
        .release(pack.release.trim())
        .without_version(pack.without_version);
    if let Some(target) = &pack.target {
        builder = builder.target(target.as_str());
    }
    if let Some(arch) = &pack.arch {
        builder = builder.arch(arch.as_str());
    }
    let settings = builder.build()?;

    let (package, crates) = load_project(&settings)?;
    let _ = output.verbose(&format!(
        "{} {} for {}/{}",
        package.file_name(),
        package.version,
        settings.target(),
        settings.arch()
    ));

    for staged in stage_includes(&package, &settings)? {
        if staged.copied {
            let _ = output.verbose(&format!("staged {}", staged.staged.display()));
        }
    }

    let packager = Packager::new(settings);
    let artifacts = packager.pack(&package, &crates, &CancellationToken::new())?;

    for artifact in &artifacts {
        let _ = output.success(&format!(
            "{}: {} ({} bytes)",
            artifact.format,
            artifact.path.display(),
            artifact.size
        ));
        output.digest(&artifact.report())?;
    }
    Ok(0)
}
