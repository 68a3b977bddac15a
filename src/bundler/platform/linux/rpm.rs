//! RPM package (.rpm) writer for Red Hat-based distributions.
//!
//! Builds the package in memory with the `rpm` crate from the flattened file
//! list and writes it to the caller's stream.

use super::{FileTuple, TupleKind};
use crate::bundler::settings::{Arch, Settings};
use crate::error::{ErrorExt, Result};
use crate::model::Package;
use std::io::Write;

/// Maps an architecture to its RPM name.
pub fn rpm_arch(arch: Arch) -> &'static str {
    match arch {
        Arch::X86_64 => "x86_64",
        Arch::X86 => "i686",
        Arch::AArch64 => "aarch64",
        Arch::Armhf => "armhfp",
        Arch::Riscv64 => "riscv64",
    }
}

/// `<name>-<version>-<release>.<arch>.rpm`
pub fn file_name(package: &Package, settings: &Settings) -> Result<String> {
    let arch = rpm_arch(settings.binary_arch()?);
    Ok(format!(
        "{}-{}-{}.{}.rpm",
        package.file_name(),
        package.version,
        settings.release(),
        arch
    ))
}

/// Writes an RPM containing `files` to `writer`.
pub fn write_package<W: Write>(
    package: &Package,
    settings: &Settings,
    files: &[FileTuple],
    writer: &mut W,
) -> Result<()> {
    let arch = rpm_arch(settings.binary_arch()?);

    log::info!("Building RPM package for {}", package.file_name());

    let license = non_empty(&package.license).unwrap_or("Unknown");
    let summary = non_empty(&package.summary)
        .or_else(|| non_empty(&package.description))
        .unwrap_or("(no description)");

    let build_config = rpm::BuildConfig::default().compression(rpm::CompressionType::Gzip);

    let mut builder = rpm::PackageBuilder::new(
        package.file_name(),
        &package.version,
        license,
        arch,
        summary,
    )
    .using_config(build_config)
    .release(settings.release());

    if let Some(description) = non_empty(&package.description) {
        builder = builder.description(description);
    }
    if let Some(homepage) = non_empty(&package.homepage) {
        builder = builder.url(homepage);
    }
    if let Some(vendor) = non_empty(&package.vendor) {
        builder = builder.vendor(vendor);
    }

    for file in files {
        let options = rpm::FileOptions::new(file.destination.as_str());
        builder = match (&file.kind, file.source.as_deref()) {
            (TupleKind::Symlink(target), _) => {
                log::debug!("Adding link: {} -> {}", file.destination, target);
                builder.with_file_contents(
                    Vec::new(),
                    options
                        .symlink(target.as_str())
                        .user(file.owner.as_str())
                        .group(file.group.as_str()),
                )?
            }
            (TupleKind::Regular, Some(source)) => {
                log::debug!("Adding file: {} -> {}", source.display(), file.destination);
                let content = std::fs::read(source).fs_context("reading package file", source)?;
                builder.with_file_contents(
                    content,
                    options
                        .mode(rpm::FileMode::regular(file.mode as u16))
                        .user(file.owner.as_str())
                        .group(file.group.as_str()),
                )?
            }
            (TupleKind::Regular, None) => continue,
        };
    }

    let pkg = builder.build()?;
    pkg.write(writer)?;
    Ok(())
}

fn non_empty(value: &str) -> Option<&str> {
    Some(value.trim()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::SettingsBuilder;

    #[test]
    fn file_name_uses_release_and_rpm_arch() {
        let dir = tempfile::tempdir().unwrap();
        let settings = SettingsBuilder::new()
            .project_dir(dir.path())
            .arch("amd64")
            .release("3")
            .build()
            .unwrap();
        let package = Package {
            name: "demo".into(),
            version: "1.2.0".into(),
            ..Default::default()
        };
        assert_eq!(file_name(&package, &settings).unwrap(), "demo-1.2.0-3.x86_64.rpm");
    }

    #[test]
    fn writes_a_parseable_package() {
        let dir = tempfile::tempdir().unwrap();
        let binary = dir.path().join("demo");
        std::fs::write(&binary, b"ELF").unwrap();
        let settings = SettingsBuilder::new()
            .project_dir(dir.path())
            .arch("arm64")
            .build()
            .unwrap();
        let package = Package {
            name: "demo".into(),
            version: "1.2.0".into(),
            summary: "demo tools".into(),
            ..Default::default()
        };
        let files = vec![FileTuple {
            source: Some(binary),
            destination: "/usr/local/bin/demo".into(),
            mode: 0o755,
            owner: "root".into(),
            group: "root".into(),
            mtime: 0,
            kind: TupleKind::Regular,
        }];

        let mut out = Vec::new();
        write_package(&package, &settings, &files, &mut out).unwrap();
        let parsed = rpm::Package::parse(&mut out.as_slice()).unwrap();
        assert_eq!(parsed.metadata.get_name().unwrap(), "demo");
        assert_eq!(parsed.metadata.get_arch().unwrap(), "aarch64");
    }
}
