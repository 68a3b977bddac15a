//! # relpack
//!
//! Release packaging for compiled binaries.
//!
//! relpack takes a project description (`relpack.toml`), the binaries a build
//! produced and a list of auxiliary files, and writes distributable
//! artifacts for one target/architecture pair.
//!
//! ## Features
//!
//! - **Archives**: zip (store, deflate, bzip2, zstd, xz) and tar with gzip, xz,
//!   bzip2, zstd, brotli or no compression
//! - **Self-extracting installers**: a POSIX shell header followed by a tar
//!   payload, with staged binaries, backup rotation and never-overwritten
//!   configuration profiles
//! - **System packages**: rpm and deb from the same file list
//! - **Digests**: SHA-256 of every byte written, computed while streaming
//! - **Cleanup**: removal of staged includes, binaries and packages
//!
//! ## Usage
//!
//! ```bash
//! relpack pack --pack tgz,zip,sh    # Package for the host platform
//! relpack pack --target linux --arch arm64 --pack deb,rpm
//! relpack clean --force             # Remove everything pack produced
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Core modules
pub mod archive;
pub mod bundler;
pub mod cli;
pub mod env;
pub mod error;
pub mod installer;
pub mod model;
pub mod naming;

// Re-export main types for public API
pub use bundler::{PackFormat, PackedArtifact, Packager, Settings, SettingsBuilder};
pub use cli::Args;
pub use env::EnvOverlay;
pub use error::{Error, Result};
pub use model::{Crate, FileItem, Package};
