//! Package manifest (`relpack.toml`) and include items.

use crate::env::{BUILD_VERSION, EnvOverlay, PACKAGE_NAME};
use crate::error::{Error, Result};
use crate::naming;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// File name of the project manifest.
pub const PACKAGE_MANIFEST: &str = "relpack.toml";

const DEFAULT_PREFIX: &str = "/usr/local";
const DEFAULT_MAINTAINER: &str = "Unset Maintainer <unset@localhost>";

/// Release metadata plus the ordered content of one package.
///
/// # Examples
///
/// ```
/// use relpack::model::Package;
///
/// let package = Package::from_toml_str(r#"
///     name = "demo"
///     version = "1.2.0"
///     crates = ["cmd/demo"]
///
///     [[include]]
///     path = "README.md"
///     destination = "share/doc"
/// "#)?;
///
/// assert_eq!(package.file_name(), "demo");
/// assert_eq!(package.include[0].relative_path(), "share/doc/README.md");
/// # Ok::<(), relpack::error::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Package {
    /// Package name.
    pub name: String,
    /// Overrides `name` in artifact file names.
    pub package_name: Option<String>,
    /// One-line summary; also used as the zip comment.
    pub summary: String,
    /// Long description.
    pub description: String,
    /// Release version.
    pub version: String,
    /// Package authors.
    pub authors: Vec<String>,
    /// Vendor for system packages.
    pub vendor: String,
    /// Maintainer for system packages.
    pub maintainer: String,
    /// Project homepage.
    pub homepage: String,
    /// License identifier.
    pub license: String,
    /// Install root for system packages.
    pub prefix: String,
    /// Crate locations relative to the project directory.
    pub crates: Vec<String>,
    /// Auxiliary files.
    pub include: Vec<FileItem>,
}

impl Package {
    /// Loads `relpack.toml` from `project_dir` and applies overlay overrides.
    pub fn load(project_dir: &Path, env: &EnvOverlay) -> Result<Self> {
        let path = project_dir.join(PACKAGE_MANIFEST);
        let package: Package = super::read_manifest(&path)?;
        log::debug!("loaded package manifest {}", path.display());
        Ok(package.with_env(env))
    }

    /// Parses a manifest from a string without overrides.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Applies `PACKAGE_NAME` and `BUILD_VERSION` from the overlay.
    pub fn with_env(mut self, env: &EnvOverlay) -> Self {
        if let Some(name) = env.get(PACKAGE_NAME) {
            self.package_name = Some(name);
        }
        if let Some(version) = env.get(BUILD_VERSION) {
            self.version = version;
        }
        self
    }

    /// Name used for artifact file names.
    pub fn file_name(&self) -> &str {
        self.package_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.name)
    }

    /// Install root for system packages, `/usr/local` when unset.
    pub fn install_prefix(&self) -> &str {
        if self.prefix.is_empty() {
            DEFAULT_PREFIX
        } else {
            &self.prefix
        }
    }

    /// Maintainer line for system packages.
    pub fn maintainer_or_default(&self) -> String {
        if !self.maintainer.is_empty() {
            self.maintainer.clone()
        } else if !self.authors.is_empty() {
            self.authors.join(", ")
        } else {
            DEFAULT_MAINTAINER.to_string()
        }
    }

    /// Checks the fields every archive build depends on.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::MissingField("name"));
        }
        if self.version.trim().is_empty() {
            return Err(Error::MissingField("version"));
        }
        for item in &self.include {
            item.mode()?;
        }
        Ok(())
    }
}

/// An auxiliary file shipped with the package (documentation, config files).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FileItem {
    /// Source path relative to the project directory.
    pub path: String,
    /// Destination subdirectory inside the package.
    #[serde(default)]
    pub destination: String,
    /// Name to install under instead of the source basename.
    #[serde(default)]
    pub rename: Option<String>,
    /// Octal permission override such as `"0644"`.
    #[serde(default)]
    pub permissions: Option<String>,
    /// Installers ship this file under its final name instead of staging it
    /// as a `.template` profile.
    #[serde(default)]
    pub verbatim: bool,
}

impl FileItem {
    /// Installed file name.
    pub fn base_name(&self) -> String {
        match self.rename.as_deref().filter(|r| !r.is_empty()) {
            Some(rename) => rename.to_string(),
            None => naming::basename(&naming::to_nix_path(&self.path)).to_string(),
        }
    }

    /// `destination/name`, cleaned and relative.
    pub fn relative_path(&self) -> String {
        naming::as_relative_path(&naming::join(&[self.destination.as_str(), self.base_name().as_str()]))
    }

    /// Source location on disk.
    pub fn source(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.path)
    }

    /// Parsed permission override.
    pub fn mode(&self) -> Result<Option<u32>> {
        match self.permissions.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => parse_permissions(value).map(Some).ok_or_else(|| Error::InvalidPermissions {
                item: self.path.clone(),
                value: value.to_string(),
            }),
        }
    }
}

/// Parses an octal mode string (`"755"`, `"0644"`, `"0o600"`).
pub fn parse_permissions(value: &str) -> Option<u32> {
    let digits = value.strip_prefix("0o").unwrap_or(value);
    if digits.is_empty() || !digits.bytes().all(|b| (b'0'..=b'7').contains(&b)) {
        return None;
    }
    u32::from_str_radix(digits, 8).ok().filter(|mode| *mode <= 0o7777)
}
