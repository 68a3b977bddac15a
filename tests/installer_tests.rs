//! Runs generated shell installers when a POSIX toolchain is available.

mod common;

use relpack::bundler::{PackFormat, Packager, SettingsBuilder};
use relpack::installer::RESPOND_SCRIPT_NAME;
use relpack::model::{Crate, Package};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use tokio_util::sync::CancellationToken;

fn have_shell_tools() -> bool {
    ["sh", "tar", "awk", "tail", "gzip"]
        .iter()
        .all(|tool| which::which(tool).is_ok())
}

fn build_installer(project: &Path) -> PathBuf {
    let settings = SettingsBuilder::new()
        .project_dir(project)
        .target("linux")
        .arch("amd64")
        .formats(vec![PackFormat::parse("stgz", "").unwrap()])
        .build()
        .unwrap();
    let package = Package::load(settings.project_dir(), settings.env()).unwrap();
    let crates = vec![Crate::load(settings.project_dir(), "cmd/demo", settings.env()).unwrap()];
    let artifacts = Packager::new(settings)
        .pack(&package, &crates, &CancellationToken::new())
        .unwrap();
    artifacts[0].path.clone()
}

fn install(installer: &Path, prefix: &Path) -> ExitStatus {
    Command::new("sh")
        .arg(installer)
        .arg(format!("--prefix={}", prefix.display()))
        .status()
        .unwrap()
}

fn run(installer: &Path, prefix: &Path) {
    assert!(install(installer, prefix).success());
}

#[test]
fn installs_then_upgrades_without_touching_profiles() {
    if !have_shell_tools() {
        eprintln!("skipping: shell tools not available");
        return;
    }
    let project = common::demo_project();
    let prefix = tempfile::tempdir().unwrap();

    let first = build_installer(project.path());
    run(&first, prefix.path());
    let root = prefix.path();
    assert_eq!(std::fs::read(root.join("bin/demo")).unwrap(), common::BINARY);
    assert!(root.join("etc/demo.toml").is_file());
    assert!(root.join("share/doc/README.md").is_file());
    assert!(!root.join("bin/demo.new").exists());
    assert!(!root.join(RESPOND_SCRIPT_NAME).exists());

    std::fs::write(root.join("etc/demo.toml"), b"greeting = \"mine\"\n").unwrap();
    for round in 0..4 {
        common::write_binary(project.path(), format!("#!/bin/sh\necho v{round}\n").as_bytes());
        let installer = build_installer(project.path());
        run(&installer, root);
    }

    assert_eq!(std::fs::read(root.join("bin/demo")).unwrap(), b"#!/bin/sh\necho v3\n");
    assert_eq!(
        std::fs::read(root.join("etc/demo.toml")).unwrap(),
        b"greeting = \"mine\"\n"
    );
    assert!(!root.join("etc/demo.toml.template").exists());
    for n in 1..=3 {
        assert!(root.join(format!("bin/old/demo.{n}")).is_file(), "missing backup {n}");
    }
    assert!(!root.join("bin/old/demo.4").exists());
}

#[test]
fn failed_target_fails_the_installer_but_not_other_steps() {
    if !have_shell_tools() {
        eprintln!("skipping: shell tools not available");
        return;
    }
    let project = common::demo_project();
    let prefix = tempfile::tempdir().unwrap();
    let root = prefix.path();
    std::fs::create_dir_all(root.join("bin")).unwrap();
    // The backup directory cannot be created over a regular file.
    std::fs::write(root.join("bin/old"), b"in the way").unwrap();

    let installer = build_installer(project.path());
    let status = install(&installer, root);

    assert!(!status.success());
    assert!(!root.join("bin/demo").exists());
    assert!(root.join("bin/demo.new").is_file());
    assert!(root.join("etc/demo.toml").is_file());
    assert!(root.join("share/doc/README.md").is_file());
    assert!(!root.join(RESPOND_SCRIPT_NAME).exists());
}

#[cfg(unix)]
#[test]
fn dangling_live_symlink_is_kept_as_previous() {
    if !have_shell_tools() {
        eprintln!("skipping: shell tools not available");
        return;
    }
    let project = common::demo_project();
    let prefix = tempfile::tempdir().unwrap();
    let root = prefix.path();
    std::fs::create_dir_all(root.join("bin")).unwrap();
    std::os::unix::fs::symlink("gone", root.join("bin/demo")).unwrap();

    let installer = build_installer(project.path());
    run(&installer, root);

    assert_eq!(std::fs::read(root.join("bin/demo")).unwrap(), common::BINARY);
    let previous = std::fs::symlink_metadata(root.join("bin/demo.old")).unwrap();
    assert!(previous.file_type().is_symlink());
    assert_eq!(std::fs::read_link(root.join("bin/demo.old")).unwrap(), Path::new("gone"));
}
