//! Configuration for packaging runs.
//!
//! [`Settings`] collects everything a [`Packager`](super::Packager) needs that
//! is not part of the package manifest: directories, target platform, output
//! formats and the environment overlay.

use crate::bundler::platform::PackFormat;
use crate::env::{BUILD_ARCH, BUILD_RELEASE, BUILD_TARGET, BUILD_TIME, EnvOverlay};
use crate::error::{Context, Error, Result};
use path_absolutize::Absolutize;
use std::path::{Path, PathBuf};

const DEFAULT_RELEASE: &str = "1";
const DEFAULT_DESTINATION: &str = "out";

/// CPU architecture, as needed by system package formats.
///
/// Archive names use Go-style names (`amd64`, `arm64`, `386`); rpm and deb
/// have their own vocabularies, mapped by the consumers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Arch {
    /// x86_64 / AMD64 (64-bit)
    X86_64,
    /// x86 / i686 (32-bit)
    X86,
    /// AArch64 / ARM64 (64-bit)
    AArch64,
    /// ARM with hard-float (32-bit)
    Armhf,
    /// RISC-V (64-bit)
    Riscv64,
}

impl Arch {
    /// Parses a Go-style or Rust-style architecture name.
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "amd64" | "x86_64" => Ok(Arch::X86_64),
            "386" | "i386" | "i686" | "x86" => Ok(Arch::X86),
            "arm64" | "aarch64" => Ok(Arch::AArch64),
            "arm" | "armhf" | "armv7" => Ok(Arch::Armhf),
            "riscv64" => Ok(Arch::Riscv64),
            other => Err(Error::ArchError(other.to_string())),
        }
    }
}

/// Go-style name of the host operating system.
pub fn host_target() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}

/// Go-style name of the host architecture.
pub fn host_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        other => other,
    }
}

/// Settings for one packaging run, constructed via [`SettingsBuilder`].
///
/// # Examples
///
/// ```no_run
/// use relpack::bundler::{PackFormat, SettingsBuilder};
///
/// # fn example() -> relpack::error::Result<()> {
/// let settings = SettingsBuilder::new()
///     .project_dir(".")
///     .out_dir("build")
///     .target("linux")
///     .arch("amd64")
///     .formats(vec![PackFormat::parse("tar.gz", "")?])
///     .build()?;
/// assert_eq!(settings.target(), "linux");
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Settings {
    project_dir: PathBuf,
    out_dir: PathBuf,
    destination: PathBuf,
    target: String,
    arch: String,
    formats: Vec<PackFormat>,
    release: String,
    without_version: bool,
    env: EnvOverlay,
}

impl Settings {
    /// Project root holding `relpack.toml`.
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Build output directory with compiled artifacts and staged includes.
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Directory that receives finished packages.
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Target operating system (`linux`, `darwin`, `windows`).
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Target architecture, Go-style.
    pub fn arch(&self) -> &str {
        &self.arch
    }

    /// Architecture for system packages.
    pub fn binary_arch(&self) -> Result<Arch> {
        Arch::parse(&self.arch)
    }

    /// Formats to build, in order.
    pub fn formats(&self) -> &[PackFormat] {
        &self.formats
    }

    /// Release tag for rpm.
    pub fn release(&self) -> &str {
        &self.release
    }

    /// True when archive names carry the version.
    pub fn versioned(&self) -> bool {
        !self.without_version
    }

    /// Environment overlay, seeded with the build variables.
    pub fn env(&self) -> &EnvOverlay {
        &self.env
    }
}

/// Builder for [`Settings`].
///
/// `project_dir` is required. Relative `out_dir` and `destination` resolve
/// against it.
#[derive(Default)]
pub struct SettingsBuilder {
    project_dir: Option<PathBuf>,
    out_dir: Option<PathBuf>,
    destination: Option<PathBuf>,
    target: Option<String>,
    arch: Option<String>,
    formats: Vec<PackFormat>,
    release: Option<String>,
    without_version: bool,
    env: EnvOverlay,
}

impl SettingsBuilder {
    /// Creates a new settings builder.
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the project root.
    ///
    /// # Required
    ///
    /// This field is required for building.
    pub fn project_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.project_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the build output directory.
    ///
    /// Default: the project root
    pub fn out_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.out_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets where packages are written.
    ///
    /// Default: `out`
    pub fn destination<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.destination = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the target operating system.
    ///
    /// Default: the host
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Sets the target architecture.
    ///
    /// Default: the host
    pub fn arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = Some(arch.into());
        self
    }

    /// Sets the formats to build.
    pub fn formats(mut self, formats: Vec<PackFormat>) -> Self {
        self.formats = formats;
        self
    }

    /// Sets the rpm release tag.
    ///
    /// Default: `1`
    pub fn release(mut self, release: impl Into<String>) -> Self {
        self.release = Some(release.into());
        self
    }

    /// Drops the version from archive names.
    pub fn without_version(mut self, without_version: bool) -> Self {
        self.without_version = without_version;
        self
    }

    /// Sets the base environment overlay.
    pub fn env(mut self, env: EnvOverlay) -> Self {
        self.env = env;
        self
    }

    /// Builds the settings and seeds the overlay with `BUILD_TARGET`,
    /// `BUILD_ARCH`, `BUILD_RELEASE` and `BUILD_TIME`.
    ///
    /// # Errors
    ///
    /// Returns an error if `project_dir` is missing or cannot be made
    /// absolute.
    pub fn build(self) -> Result<Settings> {
        let project_dir = self.project_dir.context("project_dir is required")?;
        let project_dir = project_dir
            .absolutize()
            .map_err(Error::from)
            .context("resolving project directory")?
            .into_owned();

        let resolve = |path: Option<PathBuf>, default: &Path| -> Result<PathBuf> {
            let path = path.unwrap_or_else(|| default.to_path_buf());
            Ok(path
                .absolutize_from(&project_dir)
                .map_err(Error::from)
                .with_context(|| format!("resolving {}", path.display()))?
                .into_owned())
        };
        let out_dir = resolve(self.out_dir, &project_dir)?;
        let destination = resolve(self.destination, Path::new(DEFAULT_DESTINATION))?;

        let target = self.target.unwrap_or_else(|| host_target().to_string());
        let arch = self.arch.unwrap_or_else(|| host_arch().to_string());
        let release = self.release.unwrap_or_else(|| DEFAULT_RELEASE.to_string());

        let env = self
            .env
            .with(BUILD_TARGET, target.as_str())
            .with(BUILD_ARCH, arch.as_str())
            .with(BUILD_RELEASE, release.as_str())
            .with(BUILD_TIME, chrono::Utc::now().to_rfc3339());

        Ok(Settings {
            project_dir,
            out_dir,
            destination,
            target,
            arch,
            formats: self.formats,
            release,
            without_version: self.without_version,
            env,
        })
    }
}
