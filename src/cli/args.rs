//! Command line argument parsing and validation.

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// Package compiled binaries into release archives and installers
#[derive(Parser, Debug)]
#[command(
    name = "relpack",
    version,
    about = "Package compiled binaries into release archives and installers",
    long_about = "Package compiled binaries into zip and tar archives, self-extracting \
shell installers, rpm and deb packages.

Usage:
  relpack pack --pack tgz,sh
  relpack -C path/to/project pack --target linux --arch arm64 --pack deb
  relpack clean --force"
)]
pub struct Args {
    /// Project directory holding relpack.toml
    #[arg(short = 'C', long = "cwd", global = true, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Build output directory with compiled binaries and staged includes
    #[arg(short = 'B', long = "out", global = true, value_name = "DIR")]
    pub out: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Stage includes and write every requested package format
    Pack(PackArgs),
    /// Remove staged includes, compiled binaries and packages
    Clean(CleanArgs),
}

impl Command {
    /// Command name for messages.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Pack(_) => "pack",
            Command::Clean(_) => "clean",
        }
    }
}

/// Options of `relpack pack`
#[derive(ClapArgs, Debug, Clone)]
pub struct PackArgs {
    /// Target operating system (defaults to the host)
    #[arg(long, value_name = "OS")]
    pub target: Option<String>,

    /// Target architecture, e.g. amd64 or arm64 (defaults to the host)
    #[arg(long, value_name = "ARCH")]
    pub arch: Option<String>,

    /// Directory receiving the packages
    #[arg(short = 'D', long, default_value = "out", value_name = "DIR")]
    pub destination: PathBuf,

    /// Package formats: zip, tar, tar.gz, tgz, tar.xz, tar.bz2, tar.zst, sh, stgz, rpm, deb
    #[arg(long = "pack", value_delimiter = ',', default_value = "tgz", value_name = "FORMAT")]
    pub formats: Vec<String>,

    /// Codec for zip, tar and sh (gzip, xz, bzip2, zstd, brotli, none)
    #[arg(long, default_value = "", hide_default_value = true, value_name = "METHOD")]
    pub compression: String,

    /// Release number for system packages
    #[arg(long, default_value = "1")]
    pub release: String,

    /// Leave the version out of archive names
    #[arg(long)]
    pub without_version: bool,

    /// Version to stamp instead of the one in relpack.toml
    #[arg(long, env = "BUILD_VERSION", value_name = "VERSION")]
    pub version_override: Option<String>,
}

/// Options of `relpack clean`
#[derive(ClapArgs, Debug, Clone)]
pub struct CleanArgs {
    /// Remove staged includes even when newer than their source
    #[arg(long)]
    pub force: bool,

    /// Directory holding the packages
    #[arg(short = 'D', long, default_value = "out", value_name = "DIR")]
    pub destination: PathBuf,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        if let Command::Pack(pack) = &self.command {
            if pack.formats.iter().all(|f| f.trim().is_empty()) {
                return Err("at least one --pack format is required".to_string());
            }
            if pack.release.trim().is_empty() {
                return Err("--release must not be empty".to_string());
            }
        }
        Ok(())
    }

    /// Project directory, the current directory when unset.
    pub fn project_dir(&self) -> PathBuf {
        self.cwd.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}
