mod common;

use relpack::archive::{TarCompression, sha256_file};
use relpack::bundler::{PackFormat, Packager, Settings, SettingsBuilder, stage_includes};
use relpack::installer::{ARCHIVE_MARKER, RESPOND_SCRIPT_NAME};
use relpack::model::{Crate, Package};
use relpack::Error;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use tokio_util::sync::CancellationToken;

fn settings(project: &Path, formats: &[&str], compression: &str) -> Settings {
    let formats = formats
        .iter()
        .map(|f| PackFormat::parse(f, compression).unwrap())
        .collect();
    SettingsBuilder::new()
        .project_dir(project)
        .target("linux")
        .arch("amd64")
        .formats(formats)
        .build()
        .unwrap()
}

fn load(settings: &Settings) -> (Package, Vec<Crate>) {
    let package = Package::load(settings.project_dir(), settings.env()).unwrap();
    let crates = package
        .crates
        .iter()
        .map(|c| Crate::load(settings.project_dir(), c, settings.env()).unwrap())
        .collect();
    (package, crates)
}

/// name -> (mode, body or link target)
fn tar_entries<R: Read>(reader: R) -> BTreeMap<String, (u32, Vec<u8>)> {
    let mut archive = tar::Archive::new(reader);
    let mut out = BTreeMap::new();
    for entry in archive.entries().unwrap() {
        let mut entry = entry.unwrap();
        let name = entry.path().unwrap().to_string_lossy().into_owned();
        let mode = entry.header().mode().unwrap();
        let body = match entry.link_name().unwrap() {
            Some(target) => target.to_string_lossy().into_owned().into_bytes(),
            None => {
                let mut body = Vec::new();
                entry.read_to_end(&mut body).unwrap();
                body
            }
        };
        out.insert(name, (mode, body));
    }
    out
}

#[test]
fn demo_tar_gz_end_to_end() {
    let project = common::demo_project();
    let settings = settings(project.path(), &["tar.gz"], "");
    let (package, crates) = load(&settings);

    let artifacts = Packager::new(settings)
        .pack(&package, &crates, &CancellationToken::new())
        .unwrap();
    assert_eq!(artifacts.len(), 1);
    let path = &artifacts[0].path;
    assert_eq!(path, &project.path().join("out/demo-1.2.0-linux-amd64.tar.gz"));

    let file = std::fs::File::open(path).unwrap();
    let entries = tar_entries(flate2::read::GzDecoder::new(file));

    let (mode, body) = &entries["demo-1.2.0-linux-amd64/bin/demo"];
    assert_eq!(mode & 0o111, 0o111);
    assert_eq!(body.as_slice(), common::BINARY);
    let (_, readme) = &entries["demo-1.2.0-linux-amd64/share/doc/README.md"];
    assert!(readme.starts_with(b"# demo"));
    let (mode, _) = &entries["demo-1.2.0-linux-amd64/etc/demo.toml"];
    assert_eq!(mode & 0o777, 0o640);
    let (_, link) = &entries["demo-1.2.0-linux-amd64/bin/dm"];
    assert_eq!(link.as_slice(), b"demo");
}

fn tar_reader(path: &Path, compression: TarCompression) -> Box<dyn Read> {
    let file = std::fs::File::open(path).unwrap();
    match compression {
        TarCompression::Gzip => Box::new(flate2::read::GzDecoder::new(file)),
        TarCompression::Xz => Box::new(xz2::read::XzDecoder::new(file)),
        TarCompression::Bzip2 => Box::new(bzip2::read::BzDecoder::new(file)),
        TarCompression::Brotli => Box::new(brotli::Decompressor::new(file, 4096)),
        TarCompression::Zstd => Box::new(zstd::stream::read::Decoder::new(file).unwrap()),
        TarCompression::Plain => Box::new(file),
    }
}

/// name -> (is symlink, body or link target)
fn zip_entries(path: &Path) -> BTreeMap<String, (bool, Vec<u8>)> {
    let mut zip = zip::ZipArchive::new(std::fs::File::open(path).unwrap()).unwrap();
    let mut out = BTreeMap::new();
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).unwrap();
        let link = entry.unix_mode().is_some_and(|m| m & 0o170000 == 0o120000);
        let mut body = Vec::new();
        entry.read_to_end(&mut body).unwrap();
        out.insert(entry.name().to_string(), (link, body));
    }
    out
}

#[cfg(unix)]
#[test]
fn every_tar_codec_round_trips() {
    let project = common::demo_project();
    common::add_symlinked_include(project.path());
    let readme = std::fs::read(project.path().join("README.md")).unwrap();

    for compression in TarCompression::ALL {
        let settings = settings(project.path(), &["tar"], compression.name());
        let (package, crates) = load(&settings);
        let artifacts = Packager::new(settings)
            .pack(&package, &crates, &CancellationToken::new())
            .unwrap();
        let artifact = &artifacts[0];
        assert_eq!(
            artifact.digest,
            sha256_file(&artifact.path).unwrap(),
            "digest mismatch for {compression}"
        );
        assert_eq!(artifact.size, std::fs::metadata(&artifact.path).unwrap().len());

        let mut archive = tar::Archive::new(tar_reader(&artifact.path, compression));
        let mut links = BTreeMap::new();
        let mut bodies = BTreeMap::new();
        for entry in archive.entries().unwrap() {
            let mut entry = entry.unwrap();
            let name = entry.path().unwrap().to_string_lossy().into_owned();
            if entry.header().entry_type().is_symlink() {
                let target = entry.link_name().unwrap().unwrap();
                links.insert(name, target.to_string_lossy().into_owned());
            } else {
                let mut body = Vec::new();
                entry.read_to_end(&mut body).unwrap();
                bodies.insert(name, body);
            }
        }

        let prefix = "demo-1.2.0-linux-amd64";
        assert_eq!(bodies[&format!("{prefix}/bin/demo")], common::BINARY, "{compression}");
        assert_eq!(bodies[&format!("{prefix}/share/doc/README.md")], readme, "{compression}");
        assert_eq!(links[&format!("{prefix}/bin/dm")], "demo", "{compression}");
        assert_eq!(links[&format!("{prefix}/share/doc/NOTES.md")], "README.md", "{compression}");
    }
}

#[cfg(unix)]
#[test]
fn every_writable_zip_method_round_trips() {
    let project = common::demo_project();
    common::add_symlinked_include(project.path());
    let readme = std::fs::read(project.path().join("README.md")).unwrap();

    for method in ["store", "deflate", "bzip2", "zstd", "xz"] {
        let settings = settings(project.path(), &["zip"], method);
        let (package, crates) = load(&settings);
        let artifacts = Packager::new(settings)
            .pack(&package, &crates, &CancellationToken::new())
            .unwrap();
        let artifact = &artifacts[0];
        assert_eq!(artifact.digest, sha256_file(&artifact.path).unwrap(), "{method}");

        let entries = zip_entries(&artifact.path);
        let prefix = "demo-1.2.0-linux-amd64";
        assert_eq!(
            entries[&format!("{prefix}/bin/demo")],
            (false, common::BINARY.to_vec()),
            "{method}"
        );
        assert_eq!(entries[&format!("{prefix}/share/doc/README.md")], (false, readme.clone()));
        assert_eq!(entries[&format!("{prefix}/bin/dm")], (true, b"demo".to_vec()), "{method}");
        assert_eq!(
            entries[&format!("{prefix}/share/doc/NOTES.md")],
            (true, b"README.md".to_vec()),
            "{method}"
        );
    }
}

#[test]
fn uncompressed_tar_round_trips() {
    let project = common::demo_project();
    let settings = settings(project.path(), &["tar"], "none");
    let (package, crates) = load(&settings);
    let artifacts = Packager::new(settings)
        .pack(&package, &crates, &CancellationToken::new())
        .unwrap();
    assert!(artifacts[0].path.to_string_lossy().ends_with("demo-1.2.0-linux-amd64.tar"));

    let entries = tar_entries(std::fs::File::open(&artifacts[0].path).unwrap());
    assert_eq!(entries["demo-1.2.0-linux-amd64/bin/demo"].1.as_slice(), common::BINARY);
}

#[test]
fn zip_keeps_symlinks_and_comment() {
    let project = common::demo_project();
    let settings = settings(project.path(), &["zip"], "deflate");
    let (package, crates) = load(&settings);
    let artifacts = Packager::new(settings)
        .pack(&package, &crates, &CancellationToken::new())
        .unwrap();
    let artifact = &artifacts[0];
    assert_eq!(artifact.digest, sha256_file(&artifact.path).unwrap());

    let mut zip = zip::ZipArchive::new(std::fs::File::open(&artifact.path).unwrap()).unwrap();
    assert_eq!(zip.comment(), b"Demo tools");

    let mut demo = zip.by_name("demo-1.2.0-linux-amd64/bin/demo").unwrap();
    assert_eq!(demo.unix_mode().unwrap() & 0o111, 0o111);
    let mut body = Vec::new();
    demo.read_to_end(&mut body).unwrap();
    assert_eq!(body.as_slice(), common::BINARY);
    drop(demo);

    let mut link = zip.by_name("demo-1.2.0-linux-amd64/bin/dm").unwrap();
    assert_eq!(link.unix_mode().unwrap() & 0o170000, 0o120000);
    let mut target = String::new();
    link.read_to_string(&mut target).unwrap();
    assert_eq!(target, "demo");
}

#[test]
fn sh_installer_layout() {
    let project = common::demo_project();
    let settings = settings(project.path(), &["sh"], "gzip");
    let (package, crates) = load(&settings);
    let artifacts = Packager::new(settings)
        .pack(&package, &crates, &CancellationToken::new())
        .unwrap();
    let path = &artifacts[0].path;
    assert_eq!(path, &project.path().join("out/demo-1.2.0-linux-amd64.sh"));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(path).unwrap().permissions().mode();
        assert_eq!(mode & 0o755, 0o755);
    }

    let bytes = std::fs::read(path).unwrap();
    assert!(bytes.starts_with(b"#!/bin/sh\n"));
    let marker = format!("\n{ARCHIVE_MARKER}\n");
    let at = bytes
        .windows(marker.len())
        .position(|w| w == marker.as_bytes())
        .expect("marker line");
    let payload = &bytes[at + marker.len()..];

    let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(payload));
    let names: Vec<String> = archive
        .entries()
        .unwrap()
        .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec![
            "bin/demo.new",
            "bin/dm",
            "share/doc/README.md.template",
            "etc/demo.toml.template",
            RESPOND_SCRIPT_NAME,
        ]
    );
}

#[test]
fn brotli_sh_is_rejected_before_output() {
    let project = common::demo_project();
    let settings = settings(project.path(), &["sh"], "brotli");
    let (package, crates) = load(&settings);
    let err = Packager::new(settings)
        .pack(&package, &crates, &CancellationToken::new())
        .unwrap_err();
    assert!(err.is_unsupported());
    assert!(!project.path().join("out").exists());
}

#[test]
fn duplicate_names_are_rejected_before_output() {
    let project = common::demo_project();
    std::fs::write(
        project.path().join("cmd/demo/crate.toml"),
        "alias = [\"share/doc/README.md\"]\n",
    )
    .unwrap();
    let settings = settings(project.path(), &["zip"], "");
    let (package, crates) = load(&settings);
    let err = Packager::new(settings)
        .pack(&package, &crates, &CancellationToken::new())
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateEntry(name) if name == "share/doc/README.md"));
    assert!(!project.path().join("out").exists());
}

#[test]
fn cancellation_is_checked_between_formats() {
    let project = common::demo_project();
    let settings = settings(project.path(), &["tgz", "zip"], "");
    let (package, crates) = load(&settings);
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = Packager::new(settings)
        .pack(&package, &crates, &cancel)
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert!(!project.path().join("out/demo-1.2.0-linux-amd64.tar.gz").exists());
}

#[test]
fn system_packages_are_named_per_distribution() {
    let project = common::demo_project();
    let settings = settings(project.path(), &["rpm", "deb"], "");
    let (package, crates) = load(&settings);
    let artifacts = Packager::new(settings)
        .pack(&package, &crates, &CancellationToken::new())
        .unwrap();
    let names: Vec<String> = artifacts
        .iter()
        .map(|a| a.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["demo-1.2.0-1.x86_64.rpm", "demo_1.2.0_amd64.deb"]);
    for artifact in &artifacts {
        assert_eq!(artifact.digest, sha256_file(&artifact.path).unwrap());
    }
}

#[test]
fn staged_includes_land_in_out_dir() {
    let project = common::demo_project();
    let settings = SettingsBuilder::new()
        .project_dir(project.path())
        .out_dir("build")
        .build()
        .unwrap();
    let (package, _) = load(&settings);
    let staged = stage_includes(&package, &settings).unwrap();
    assert_eq!(staged.len(), 2);
    assert!(project.path().join("build/share/doc/README.md").is_file());
    assert!(project.path().join("build/etc/demo.toml").is_file());
}

#[test]
fn unversioned_names_and_tar_codec_table() {
    let project = common::demo_project();
    let formats = vec![PackFormat::Tar(TarCompression::Xz)];
    let settings = SettingsBuilder::new()
        .project_dir(project.path())
        .target("darwin")
        .arch("arm64")
        .without_version(true)
        .formats(formats)
        .build()
        .unwrap();
    let (package, crates) = load(&settings);
    let artifacts = Packager::new(settings)
        .pack(&package, &crates, &CancellationToken::new())
        .unwrap();
    assert_eq!(artifacts[0].path, project.path().join("out/demo-darwin-arm64.tar.xz"));
}
