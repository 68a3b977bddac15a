//! Clean command implementation.
//!
//! Removes staged includes, compiled binaries and packages left by `pack`.

use super::{load_project, settings_builder};
use crate::bundler::Cleanup;
use crate::cli::{Args, CleanArgs, OutputManager};
use crate::env::EnvOverlay;
use crate::error::Result;

/// Execute clean command
pub(super) fn execute_clean(args: &Args, clean: &CleanArgs, output: &OutputManager) -> Result<i32> {
    let settings = settings_builder(args, EnvOverlay::new())
        .destination(&clean.destination)
        .build()?;
    let (package, crates) = load_project(&settings)?;

    let report = Cleanup::new(clean.force).run(&package, &crates, &settings);

    for path in &report.kept {
        let _ = output.verbose(&format!("kept {}", path.display()));
    }
    for (path, error) in &report.failed {
        output.error(&format!("{}: {}", path.display(), error));
    }

    if report.is_clean() {
        let _ = output.success(&format!("removed {} file(s)", report.removed.len()));
        Ok(0)
    } else {
        let _ = output.warn(&format!(
            "removed {} file(s), {} failed",
            report.removed.len(),
            report.failed.len()
        ));
        Ok(1)
    }
}
