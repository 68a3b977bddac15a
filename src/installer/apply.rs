//! The apply protocol, executed in-process.
//!
//! The generated respond script performs these same steps on the target
//! machine. Planning reads the directory state once and yields the ordered
//! [`ApplyStep`]s; [`execute`] carries them out with same-filesystem renames,
//! so the live name always refers to a complete file.

use super::respond::RespondDirective;
use super::{BACKUP_DEPTH, BACKUP_DIR, STAGED_BINARY_SUFFIX, STAGED_PROFILE_SUFFIX};
use crate::env::EnvOverlay;
use crate::error::{Error, ErrorExt, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// One filesystem action of the apply protocol.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ApplyStep {
    /// Create a directory and its parents.
    CreateDir(PathBuf),
    /// Delete a file.
    Remove(PathBuf),
    /// Rename `from` to `to`, replacing `to`.
    Rename {
        /// Current name
        from: PathBuf,
        /// New name
        to: PathBuf,
    },
    /// Report differences between an installed profile and the shipped one.
    ShowDiff {
        /// Profile already on disk; left untouched
        existing: PathBuf,
        /// Shipped profile
        staged: PathBuf,
    },
}

/// What applying one directive did.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ApplyOutcome {
    /// A binary was installed where none existed.
    Installed(PathBuf),
    /// A binary replaced an existing one, which moved to `backup`.
    Upgraded {
        /// Live binary
        target: PathBuf,
        /// Previous binary
        backup: PathBuf,
    },
    /// A profile was installed where none existed.
    ProfileInstalled(PathBuf),
    /// An existing profile was kept and the shipped one discarded.
    ProfileKept {
        /// Existing profile
        existing: PathBuf,
        /// Whether the shipped profile differed
        differs: bool,
    },
}

/// Plans `directive` against the current state under `root`.
pub fn plan(directive: &RespondDirective, root: &Path) -> Result<Vec<ApplyStep>> {
    let staged = root.join(directive.staged_path());
    if !staged.exists() {
        return Err(Error::Fs {
            context: "finding staged file",
            path: staged,
            error: std::io::ErrorKind::NotFound.into(),
        });
    }

    match directive {
        RespondDirective::ApplyTarget(_) => plan_target(staged),
        RespondDirective::ApplyProfile(_) => plan_profile(staged),
    }
}

fn strip_stage(staged: &Path, suffix: &str) -> Result<PathBuf> {
    let text = staged.to_string_lossy();
    match text.strip_suffix(suffix) {
        Some(target) if !target.is_empty() => Ok(PathBuf::from(target)),
        _ => Err(Error::GenericError(format!(
            "{} does not end with {suffix}",
            staged.display()
        ))),
    }
}

fn plan_target(staged: PathBuf) -> Result<Vec<ApplyStep>> {
    let target = strip_stage(&staged, STAGED_BINARY_SUFFIX)?;
    let name = file_name(&target)?;
    let dir = target.parent().map(Path::to_path_buf).unwrap_or_default();
    let old_dir = dir.join(BACKUP_DIR);
    let backup = |n: usize| old_dir.join(format!("{name}.{n}"));

    let mut steps = vec![ApplyStep::CreateDir(old_dir.clone())];

    if present(&backup(BACKUP_DEPTH)) {
        steps.push(ApplyStep::Remove(backup(BACKUP_DEPTH)));
    }
    for n in (1..BACKUP_DEPTH).rev() {
        if present(&backup(n)) {
            steps.push(ApplyStep::Rename {
                from: backup(n),
                to: backup(n + 1),
            });
        }
    }

    let previous = dir.join(format!("{name}.old"));
    if present(&previous) {
        steps.push(ApplyStep::Rename {
            from: previous.clone(),
            to: backup(1),
        });
    }
    if present(&target) {
        steps.push(ApplyStep::Rename {
            from: target.clone(),
            to: previous,
        });
    }
    steps.push(ApplyStep::Rename {
        from: staged,
        to: target,
    });
    Ok(steps)
}

fn plan_profile(staged: PathBuf) -> Result<Vec<ApplyStep>> {
    let target = strip_stage(&staged, STAGED_PROFILE_SUFFIX)?;
    let dir = target.parent().map(Path::to_path_buf).unwrap_or_default();

    let mut steps = vec![ApplyStep::CreateDir(dir)];
    if present(&target) {
        steps.push(ApplyStep::ShowDiff {
            existing: target,
            staged: staged.clone(),
        });
        steps.push(ApplyStep::Remove(staged));
    } else {
        steps.push(ApplyStep::Rename {
            from: staged,
            to: target,
        });
    }
    Ok(steps)
}

/// Dangling symlinks count as present.
fn present(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::GenericError(format!("{} has no file name", path.display())))
}

/// Runs planned steps in order. Stops at the first failure; completed steps
/// are not rolled back. Diff tools run with `env` as their environment.
pub fn execute(steps: &[ApplyStep], env: &EnvOverlay) -> Result<()> {
    for step in steps {
        log::debug!("apply: {step:?}");
        match step {
            ApplyStep::CreateDir(dir) => {
                std::fs::create_dir_all(dir).fs_context("creating directory", dir)?;
            }
            ApplyStep::Remove(path) => {
                std::fs::remove_file(path).fs_context("removing file", path)?;
            }
            ApplyStep::Rename { from, to } => {
                std::fs::rename(from, to).fs_context("renaming file", from)?;
            }
            ApplyStep::ShowDiff { existing, staged } => show_diff(existing, staged, env)?,
        }
    }
    Ok(())
}

fn show_diff(existing: &Path, staged: &Path, env: &EnvOverlay) -> Result<()> {
    if !profiles_differ(existing, staged)? {
        return Ok(());
    }
    log::warn!(
        "{} differs from the shipped profile; keeping the installed file",
        existing.display()
    );
    if let Ok(git) = which::which_in("git", env.lookup("PATH"), ".") {
        // `git diff --no-index` exits 1 when the files differ.
        let status = Command::new(&git)
            .env_clear()
            .envs(env.environ())
            .args(["--no-pager", "diff", "--no-index", "--"])
            .arg(existing)
            .arg(staged)
            .status();
        if let Err(error) = status {
            return Err(Error::CommandFailed {
                command: format!("{} diff", git.display()),
                error,
            });
        }
    }
    Ok(())
}

fn profiles_differ(existing: &Path, staged: &Path) -> Result<bool> {
    let current = std::fs::read(existing).fs_context("reading installed profile", existing)?;
    let shipped = std::fs::read(staged).fs_context("reading shipped profile", staged)?;
    Ok(current != shipped)
}

/// Plans and executes one directive.
pub fn apply(
    directive: &RespondDirective,
    root: &Path,
    env: &EnvOverlay,
) -> Result<ApplyOutcome> {
    let steps = plan(directive, root)?;
    let differs = match steps.iter().find_map(|s| match s {
        ApplyStep::ShowDiff { existing, staged } => Some((existing, staged)),
        _ => None,
    }) {
        Some((existing, staged)) => Some(profiles_differ(existing, staged)?),
        None => None,
    };
    execute(&steps, env)?;

    let target = root.join(directive.final_path());
    let outcome = match directive {
        RespondDirective::ApplyTarget(_) => {
            let backup = steps.iter().find_map(|s| match s {
                ApplyStep::Rename { from, to } if *from == target => Some(to.clone()),
                _ => None,
            });
            match backup {
                Some(backup) => ApplyOutcome::Upgraded { target, backup },
                None => ApplyOutcome::Installed(target),
            }
        }
        RespondDirective::ApplyProfile(_) => match differs {
            Some(differs) => ApplyOutcome::ProfileKept {
                existing: target,
                differs,
            },
            None => ApplyOutcome::ProfileInstalled(target),
        },
    };
    Ok(outcome)
}

/// Applies every directive independently, in order. A failure affects only
/// its own directive.
pub fn apply_all(
    directives: &[RespondDirective],
    root: &Path,
    env: &EnvOverlay,
) -> Vec<(RespondDirective, Result<ApplyOutcome>)> {
    directives
        .iter()
        .map(|d| (d.clone(), apply(d, root, env)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn stage(root: &Path, name: &str, content: &str) {
        let path = root.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn backups(root: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(root.join("bin/old"))
            .map(|rd| {
                rd.map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }

    #[test]
    fn fresh_install_does_not_rotate() {
        let dir = tempfile::tempdir().unwrap();
        stage(dir.path(), "bin/myapp.new", "v1");
        let directive = RespondDirective::ApplyTarget("bin/myapp.new".into());

        let outcome = apply(&directive, dir.path(), &EnvOverlay::new()).unwrap();
        assert_eq!(outcome, ApplyOutcome::Installed(dir.path().join("bin/myapp")));
        assert_eq!(fs::read_to_string(dir.path().join("bin/myapp")).unwrap(), "v1");
        assert!(!dir.path().join("bin/myapp.new").exists());
        assert!(!dir.path().join("bin/myapp.old").exists());
        assert!(backups(dir.path()).is_empty());
    }

    #[test]
    fn four_upgrades_keep_three_backups() {
        let dir = tempfile::tempdir().unwrap();
        stage(dir.path(), "bin/myapp", "v0");
        let directive = RespondDirective::ApplyTarget("bin/myapp.new".into());

        for (k, version) in ["v1", "v2", "v3", "v4"].iter().enumerate() {
            stage(dir.path(), "bin/myapp.new", version);
            apply(&directive, dir.path(), &EnvOverlay::new()).unwrap();
            assert_eq!(backups(dir.path()).len(), k.min(3));
        }

        assert_eq!(fs::read_to_string(dir.path().join("bin/myapp")).unwrap(), "v4");
        assert_eq!(fs::read_to_string(dir.path().join("bin/myapp.old")).unwrap(), "v3");
        assert_eq!(backups(dir.path()), vec!["myapp.1", "myapp.2", "myapp.3"]);
        assert_eq!(fs::read_to_string(dir.path().join("bin/old/myapp.1")).unwrap(), "v2");
        assert_eq!(fs::read_to_string(dir.path().join("bin/old/myapp.3")).unwrap(), "v0");
    }

    #[test]
    fn ring_never_grows_past_depth() {
        let dir = tempfile::tempdir().unwrap();
        stage(dir.path(), "bin/myapp", "v0");
        let directive = RespondDirective::ApplyTarget("bin/myapp.new".into());
        for n in 1..=7 {
            stage(dir.path(), "bin/myapp.new", &format!("v{n}"));
            apply(&directive, dir.path(), &EnvOverlay::new()).unwrap();
            assert!(backups(dir.path()).len() <= BACKUP_DEPTH);
        }
        assert_eq!(fs::read_to_string(dir.path().join("bin/old/myapp.3")).unwrap(), "v3");
    }

    #[test]
    fn profile_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        stage(dir.path(), "etc/demo.toml", "edited by user");
        stage(dir.path(), "etc/demo.toml.template", "shipped default");
        let directive = RespondDirective::ApplyProfile("etc/demo.toml.template".into());

        let steps = plan(&directive, dir.path()).unwrap();
        assert!(matches!(steps[1], ApplyStep::ShowDiff { .. }));

        let outcome = apply(&directive, dir.path(), &EnvOverlay::new()).unwrap();
        assert_eq!(
            outcome,
            ApplyOutcome::ProfileKept {
                existing: dir.path().join("etc/demo.toml"),
                differs: true
            }
        );
        assert_eq!(fs::read_to_string(dir.path().join("etc/demo.toml")).unwrap(), "edited by user");
        assert!(!dir.path().join("etc/demo.toml.template").exists());
    }

    #[test]
    fn profile_kept_without_git_on_overlay_path() {
        let dir = tempfile::tempdir().unwrap();
        stage(dir.path(), "etc/demo.toml", "edited by user");
        stage(dir.path(), "etc/demo.toml.template", "shipped default");
        let directive = RespondDirective::ApplyProfile("etc/demo.toml.template".into());
        let env = EnvOverlay::new().with("PATH", dir.path().join("empty").to_string_lossy());

        let outcome = apply(&directive, dir.path(), &env).unwrap();
        assert!(matches!(outcome, ApplyOutcome::ProfileKept { differs: true, .. }));
        assert_eq!(fs::read_to_string(dir.path().join("etc/demo.toml")).unwrap(), "edited by user");
    }

    #[test]
    fn profile_installs_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        stage(dir.path(), "etc/demo.toml.template", "shipped default");
        let directive = RespondDirective::ApplyProfile("etc/demo.toml.template".into());
        let outcome = apply(&directive, dir.path(), &EnvOverlay::new()).unwrap();
        assert_eq!(outcome, ApplyOutcome::ProfileInstalled(dir.path().join("etc/demo.toml")));
        assert_eq!(fs::read_to_string(dir.path().join("etc/demo.toml")).unwrap(), "shipped default");
    }

    #[cfg(unix)]
    #[test]
    fn dangling_live_symlink_is_rotated() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("bin")).unwrap();
        std::os::unix::fs::symlink("gone", dir.path().join("bin/myapp")).unwrap();
        stage(dir.path(), "bin/myapp.new", "v1");
        let directive = RespondDirective::ApplyTarget("bin/myapp.new".into());

        let outcome = apply(&directive, dir.path(), &EnvOverlay::new()).unwrap();
        assert_eq!(
            outcome,
            ApplyOutcome::Upgraded {
                target: dir.path().join("bin/myapp"),
                backup: dir.path().join("bin/myapp.old"),
            }
        );
        let old = fs::symlink_metadata(dir.path().join("bin/myapp.old")).unwrap();
        assert!(old.file_type().is_symlink());
        assert_eq!(fs::read_to_string(dir.path().join("bin/myapp")).unwrap(), "v1");
    }

    #[test]
    fn failures_are_per_directive() {
        let dir = tempfile::tempdir().unwrap();
        stage(dir.path(), "bin/b.new", "b");
        let results = apply_all(
            &[
                RespondDirective::ApplyTarget("bin/a.new".into()),
                RespondDirective::ApplyTarget("bin/b.new".into()),
            ],
            dir.path(),
            &EnvOverlay::new(),
        );
        assert!(results[0].1.is_err());
        assert!(results[1].1.is_ok());
        assert!(dir.path().join("bin/b").exists());
    }
}
