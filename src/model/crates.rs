//! Per-crate manifest (`crate.toml`): binary name, artifact and aliases.

use crate::env::{BUILD_VERSION, EnvOverlay};
use crate::error::{Error, Result};
use crate::naming;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// File name of the per-crate manifest, read from the crate location.
pub const CRATE_MANIFEST: &str = "crate.toml";

const DEFAULT_DESTINATION: &str = "bin";

/// A compiled binary shipped by the package.
///
/// Loaded once per build, given its artifact path after compilation, then
/// read by every archive backend without further mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Crate {
    /// Binary name; defaults to the basename of the crate location.
    pub name: String,
    /// Short description.
    pub description: String,
    /// Destination subdirectory, `bin` when unset.
    pub destination: String,
    /// Crate version; defaults to `BUILD_VERSION`.
    pub version: String,
    /// Alias paths relative to the package root, `$VAR` expanded.
    pub alias: Vec<String>,
    #[serde(skip)]
    location: String,
    #[serde(skip)]
    artifact: Option<PathBuf>,
}

impl Crate {
    /// Loads `<location>/crate.toml` if it exists and fills in defaults.
    pub fn load(project_dir: &Path, location: &str, env: &EnvOverlay) -> Result<Self> {
        let manifest = project_dir.join(location).join(CRATE_MANIFEST);
        let krate: Crate = if manifest.is_file() {
            super::read_manifest(&manifest)?
        } else {
            log::debug!("{} not found, using defaults", manifest.display());
            Crate::default()
        };
        krate.resolve(location, env)
    }

    /// Builds a crate from explicit values, applying the same defaults as [`load`](Self::load).
    pub fn new(location: &str, env: &EnvOverlay) -> Result<Self> {
        Crate::default().resolve(location, env)
    }

    fn resolve(mut self, location: &str, env: &EnvOverlay) -> Result<Self> {
        let location = naming::to_nix_path(location);
        if self.name.is_empty() {
            self.name = naming::basename(&location).to_string();
        }
        if self.name.is_empty() || self.name == "." || self.name == ".." || self.name == "/" {
            return Err(Error::GenericError(format!(
                "crate at {location:?} needs an explicit name"
            )));
        }
        if self.destination.is_empty() {
            self.destination = DEFAULT_DESTINATION.to_string();
        }
        if self.version.is_empty() {
            self.version = env.get(BUILD_VERSION).unwrap_or_default();
        }
        self.alias = self.alias.iter().map(|a| env.expand(a)).collect();
        self.location = location;
        Ok(self)
    }

    /// Adds an alias path after loading.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias.push(alias.into());
        self
    }

    /// Sets the destination subdirectory.
    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = destination.into();
        self
    }

    /// Records where the compiled binary lives.
    pub fn attach_artifact(mut self, path: impl Into<PathBuf>) -> Self {
        self.artifact = Some(path.into());
        self
    }

    /// Compiled binary, once attached.
    pub fn artifact(&self) -> Option<&Path> {
        self.artifact.as_deref()
    }

    /// Crate location relative to the project directory.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Binary name for `target`.
    pub fn binary_name(&self, target: &str) -> String {
        naming::binary_name(&self.name, target)
    }

    /// `destination/binary`, relative to the package root.
    pub fn relative_path(&self, target: &str) -> String {
        naming::as_relative_path(&naming::join(&[
            self.destination.as_str(),
            self.binary_name(target).as_str(),
        ]))
    }

    /// Default artifact location inside the build output directory.
    pub fn default_artifact_path(&self, out_dir: &Path, target: &str) -> PathBuf {
        out_dir.join(self.relative_path(target))
    }

    /// Alias paths with the target's executable suffix.
    pub fn aliases(&self, target: &str) -> Vec<String> {
        self.alias
            .iter()
            .map(|a| naming::as_relative_path(&naming::binary_name(a, target)))
            .collect()
    }
}
