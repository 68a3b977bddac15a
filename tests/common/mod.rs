#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

pub const BINARY: &[u8] = b"#!/bin/sh\necho hello from demo\n";

fn copy_tree(from: &Path, to: &Path) {
    fs::create_dir_all(to).unwrap();
    for entry in fs::read_dir(from).unwrap() {
        let entry = entry.unwrap();
        let dest = to.join(entry.file_name());
        if entry.file_type().unwrap().is_dir() {
            copy_tree(&entry.path(), &dest);
        } else {
            fs::copy(entry.path(), &dest).unwrap();
        }
    }
}

/// Copies the demo fixture into a scratch directory and drops a compiled
/// binary at its default location.
pub fn demo_project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let fixture = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/demo");
    copy_tree(&fixture, dir.path());
    write_binary(dir.path(), BINARY);
    dir
}

pub fn write_binary(project: &Path, content: &[u8]) {
    let bin = project.join("bin");
    fs::create_dir_all(&bin).unwrap();
    fs::write(bin.join("demo"), content).unwrap();
}

/// Adds `share/doc/NOTES.md`, shipped from a project symlink to `README.md`.
#[cfg(unix)]
pub fn add_symlinked_include(project: &Path) {
    std::os::unix::fs::symlink("README.md", project.join("NOTES.md")).unwrap();
    let manifest = project.join("relpack.toml");
    let mut text = fs::read_to_string(&manifest).unwrap();
    text.push_str("\n[[include]]\npath = \"NOTES.md\"\ndestination = \"share/doc\"\n");
    fs::write(manifest, text).unwrap();
}
