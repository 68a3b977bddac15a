//! Archive path normalization and artifact naming.
//!
//! Every name handed to an archive backend goes through this module, so
//! backends only ever see cleaned, forward-slash paths with no leading slash.

/// Cleans a host path and converts it to forward slashes.
///
/// Handles `.` and `..` components, repeated separators and `\`
/// separators. A leading `/` is kept; `..` never climbs above the root of an
/// absolute path. An empty result becomes `.`.
///
/// # Examples
///
/// ```
/// use relpack::naming::to_nix_path;
///
/// assert_eq!(to_nix_path("bin\\..\\share//doc/./README.md"), "share/doc/README.md");
/// assert_eq!(to_nix_path("/usr/local/../bin"), "/usr/bin");
/// ```
pub fn to_nix_path(path: &str) -> String {
    let absolute = path.starts_with('/') || path.starts_with('\\');
    let mut parts: Vec<&str> = Vec::new();

    for part in path.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    match (absolute, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Cleans `path` and strips any leading slash.
pub fn as_relative_path(path: &str) -> String {
    let clean = to_nix_path(path);
    match clean.trim_start_matches('/') {
        "" => ".".to_string(),
        rel => rel.to_string(),
    }
}

/// Joins archive path fragments and cleans the result.
pub fn join(parts: &[&str]) -> String {
    let joined = parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/");
    to_nix_path(&joined)
}

/// Final path component of a slash-separated name.
pub fn basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Everything before the final path component, or `.` when there is none.
pub fn dirname(path: &str) -> String {
    let clean = to_nix_path(path);
    match clean.rfind('/') {
        Some(0) => "/".to_string(),
        Some(idx) => clean[..idx].to_string(),
        None => ".".to_string(),
    }
}

/// Relative link target from directory `from_dir` to `target` (both archive
/// paths relative to the same root).
///
/// # Examples
///
/// ```
/// use relpack::naming::relative_link;
///
/// assert_eq!(relative_link("bin", "bin/demo"), "demo");
/// assert_eq!(relative_link("sbin", "bin/demo"), "../bin/demo");
/// ```
pub fn relative_link(from_dir: &str, target: &str) -> String {
    let from = as_relative_path(from_dir);
    let to = as_relative_path(target);
    let from_parts: Vec<&str> = from.split('/').filter(|p| *p != ".").collect();
    let to_parts: Vec<&str> = to.split('/').filter(|p| *p != ".").collect();

    let common = from_parts
        .iter()
        .zip(&to_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut link: Vec<&str> = vec![".."; from_parts.len() - common];
    link.extend(&to_parts[common..]);
    link.join("/")
}

/// Name of the top-level directory inside plain archives, also the stem of
/// every archive file name.
///
/// `<name>-<version>-<target>-<arch>` or, when `versioned` is false,
/// `<name>-<target>-<arch>`.
pub fn package_prefix(name: &str, version: &str, target: &str, arch: &str, versioned: bool) -> String {
    if versioned && !version.is_empty() {
        format!("{name}-{version}-{target}-{arch}")
    } else {
        format!("{name}-{target}-{arch}")
    }
}

/// Archive file name for a prefix and a dotted extension such as `.tar.gz`.
pub fn archive_file_name(prefix: &str, extension: &str) -> String {
    format!("{prefix}{extension}")
}

/// Binary name with the target's executable suffix.
pub fn binary_name(name: &str, target: &str) -> String {
    if target == "windows" && !name.ends_with(".exe") {
        format!("{name}.exe")
    } else {
        name.to_string()
    }
}

/// How package-relative paths map to names inside one archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathLayout {
    /// Everything lives under one top-level directory.
    Plain(String),
    /// Names are relative to the extraction root (self-extracting installers).
    Installer,
    /// Absolute paths under an install prefix (system packages).
    Rooted(String),
}

impl PathLayout {
    /// Layout for zip and tar archives.
    pub fn plain(prefix: impl Into<String>) -> Self {
        Self::Plain(prefix.into())
    }

    /// Layout for self-extracting installers.
    pub fn installer() -> Self {
        Self::Installer
    }

    /// Layout for system packages installed below `install_prefix`.
    pub fn rooted(install_prefix: &str) -> Self {
        let prefix = to_nix_path(&format!("/{install_prefix}"));
        Self::Rooted(prefix)
    }

    /// Maps a package-relative path to its name in the archive.
    pub fn path_in_archive(&self, rel: &str) -> String {
        let rel = as_relative_path(rel);
        match self {
            Self::Plain(prefix) => as_relative_path(&join(&[prefix.as_str(), rel.as_str()])),
            Self::Installer => rel,
            Self::Rooted(prefix) => join(&[prefix.as_str(), rel.as_str()]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nix_path_cleaning() {
        assert_eq!(to_nix_path(""), ".");
        assert_eq!(to_nix_path("./"), ".");
        assert_eq!(to_nix_path("a/b/../../.."), "..");
        assert_eq!(to_nix_path("/../etc"), "/etc");
        assert_eq!(to_nix_path("C:\\tools\\bin"), "C:/tools/bin");
        assert_eq!(as_relative_path("/usr/local/bin/"), "usr/local/bin");
    }

    #[test]
    fn prefixes_and_file_names() {
        let prefix = package_prefix("demo", "1.2.0", "linux", "amd64", true);
        assert_eq!(prefix, "demo-1.2.0-linux-amd64");
        assert_eq!(archive_file_name(&prefix, ".tar.gz"), "demo-1.2.0-linux-amd64.tar.gz");
        assert_eq!(package_prefix("demo", "1.2.0", "linux", "amd64", false), "demo-linux-amd64");
    }

    #[test]
    fn layouts() {
        let plain = PathLayout::plain("demo-1.2.0-linux-amd64");
        assert_eq!(plain.path_in_archive("bin/demo"), "demo-1.2.0-linux-amd64/bin/demo");
        assert_eq!(plain.path_in_archive("/share\\doc/./README.md"), "demo-1.2.0-linux-amd64/share/doc/README.md");
        assert_eq!(PathLayout::installer().path_in_archive("./bin/demo"), "bin/demo");
        assert_eq!(PathLayout::rooted("usr/local").path_in_archive("bin/demo"), "/usr/local/bin/demo");
    }

    #[test]
    fn links_and_names() {
        assert_eq!(relative_link(".", "bin/demo"), "bin/demo");
        assert_eq!(relative_link("a/b", "a/c/d"), "../c/d");
        assert_eq!(binary_name("demo", "windows"), "demo.exe");
        assert_eq!(binary_name("demo", "linux"), "demo");
        assert_eq!(basename("share/doc/"), "doc");
        assert_eq!(dirname("bin/demo"), "bin");
        assert_eq!(dirname("demo"), ".");
    }
}
