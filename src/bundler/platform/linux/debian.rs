//! Debian package (.deb) writer.
//!
//! A .deb file is an ar archive containing:
//! - debian-binary: Format version (2.0)
//! - control.tar.gz: Package metadata (control, md5sums)
//! - data.tar.gz: Files to install
//!
//! Both tarballs are assembled in memory from the flattened file list.

use super::{FileTuple, TupleKind};
use crate::bundler::settings::{Arch, Settings};
use crate::error::{Context, ErrorExt, Result};
use crate::model::Package;
use flate2::{Compression, write::GzEncoder};
use std::{
    collections::BTreeSet,
    fmt::Write as _,
    fs::File,
    io::{self, Write},
    path::Path,
    time::{SystemTime, UNIX_EPOCH},
};
use tar::{EntryType, Header};

/// Maps an architecture to its Debian name.
pub fn deb_arch(arch: Arch) -> &'static str {
    match arch {
        Arch::X86_64 => "amd64",
        Arch::X86 => "i386",
        Arch::AArch64 => "arm64",
        Arch::Armhf => "armhf",
        Arch::Riscv64 => "riscv64",
    }
}

/// `<name>_<version>_<arch>.deb`
pub fn file_name(package: &Package, settings: &Settings) -> Result<String> {
    let arch = deb_arch(settings.binary_arch()?);
    Ok(format!(
        "{}_{}_{}.deb",
        package.file_name(),
        package.version,
        arch
    ))
}

/// Writes a .deb containing `files` to `writer` and returns the writer.
pub fn write_package<W: Write>(
    package: &Package,
    settings: &Settings,
    files: &[FileTuple],
    writer: W,
) -> Result<W> {
    let arch = deb_arch(settings.binary_arch()?);
    log::info!("Bundling {} for {}", package.file_name(), arch);

    let (data_tar_gz, md5sums, installed_size) =
        build_data(files).context("failed to build data archive")?;
    let control = generate_control(package, arch, installed_size);
    let control_tar_gz = build_control(&control, &md5sums).context("failed to build control archive")?;

    let mtime = now_secs();
    let mut builder = ar::Builder::new(writer);
    for (name, data) in [
        ("debian-binary", b"2.0\n".as_slice()),
        ("control.tar.gz", control_tar_gz.as_slice()),
        ("data.tar.gz", data_tar_gz.as_slice()),
    ] {
        let mut header = ar::Header::new(name.as_bytes().to_vec(), data.len() as u64);
        header.set_mode(0o100644);
        header.set_mtime(mtime);
        builder
            .append(&header, data)
            .map_err(crate::error::Error::from)
            .with_context(|| format!("adding {name} to ar archive"))?;
    }
    Ok(builder.into_inner()?)
}

/// Control file with package metadata.
fn generate_control(package: &Package, arch: &str, installed_size: u64) -> String {
    let mut control = String::new();
    let name = package.file_name().to_lowercase().replace(' ', "-");
    let _ = writeln!(control, "Package: {name}");
    let _ = writeln!(control, "Version: {}", package.version);
    let _ = writeln!(control, "Architecture: {arch}");
    let _ = writeln!(control, "Installed-Size: {}", installed_size.div_ceil(1024));
    let _ = writeln!(control, "Maintainer: {}", package.maintainer_or_default());
    let _ = writeln!(control, "Priority: optional");
    if !package.homepage.trim().is_empty() {
        let _ = writeln!(control, "Homepage: {}", package.homepage.trim());
    }

    let short = [&package.summary, &package.description]
        .into_iter()
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
        .unwrap_or("(no description)");
    let short = short.lines().next().unwrap_or(short);
    let _ = writeln!(control, "Description: {short}");
    if !package.summary.trim().is_empty() {
        for line in package.description.lines() {
            if line.trim().is_empty() {
                let _ = writeln!(control, " .");
            } else {
                let _ = writeln!(control, " {}", line.trim());
            }
        }
    }
    control
}

/// data.tar.gz, md5sums text and total installed bytes.
fn build_data(files: &[FileTuple]) -> Result<(Vec<u8>, String, u64)> {
    let mut tar = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    let mut md5sums = String::new();
    let mut dirs = BTreeSet::new();
    let mut total = 0u64;

    for file in files {
        let rel = file.destination.trim_start_matches('/');
        add_parent_dirs(&mut tar, &mut dirs, rel, file.mtime)?;

        let mut header = Header::new_gnu();
        header.set_mode(file.mode);
        header.set_mtime(file.mtime);
        header.set_uid(0);
        header.set_gid(0);
        header.set_username(&file.owner)?;
        header.set_groupname(&file.group)?;

        match (&file.kind, file.source.as_deref()) {
            (TupleKind::Symlink(target), _) => {
                header.set_entry_type(EntryType::Symlink);
                header.set_size(0);
                tar.append_link(&mut header, rel, target)?;
            }
            (TupleKind::Regular, Some(source)) => {
                let len = std::fs::metadata(source)
                    .fs_context("reading file metadata", source)?
                    .len();
                header.set_entry_type(EntryType::Regular);
                header.set_size(len);
                let content = File::open(source).fs_context("opening package file", source)?;
                tar.append_data(&mut header, rel, content)?;
                let _ = writeln!(md5sums, "{}  {rel}", md5_file(source)?);
                total += len;
            }
            (TupleKind::Regular, None) => {}
        }
    }

    let data = tar.into_inner()?.finish()?;
    Ok((data, md5sums, total))
}

fn add_parent_dirs<W: Write>(
    tar: &mut tar::Builder<W>,
    dirs: &mut BTreeSet<String>,
    rel: &str,
    mtime: u64,
) -> Result<()> {
    let mut prefix = String::new();
    let parts: Vec<&str> = rel.split('/').collect();
    for part in &parts[..parts.len().saturating_sub(1)] {
        prefix.push_str(part);
        prefix.push('/');
        if dirs.insert(prefix.clone()) {
            let mut header = Header::new_gnu();
            header.set_entry_type(EntryType::Directory);
            header.set_mode(0o755);
            header.set_mtime(mtime);
            header.set_size(0);
            tar.append_data(&mut header, &prefix, io::empty())?;
        }
    }
    Ok(())
}

/// control.tar.gz with the control and md5sums files.
fn build_control(control: &str, md5sums: &str) -> Result<Vec<u8>> {
    let mut tar = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    let mtime = now_secs();
    for (name, content) in [("control", control), ("md5sums", md5sums)] {
        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Regular);
        header.set_mode(0o644);
        header.set_mtime(mtime);
        header.set_size(content.len() as u64);
        tar.append_data(&mut header, name, content.as_bytes())?;
    }
    Ok(tar.into_inner()?.finish()?)
}

fn md5_file(path: &Path) -> Result<String> {
    let mut src = File::open(path).fs_context("opening file for MD5", path)?;
    let mut context = md5::Context::new();
    io::copy(&mut src, &mut context).fs_context("reading file for MD5", path)?;
    Ok(format!("{:x}", context.finalize()))
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
