//! Release packaging for compiled binaries.
//!
//! This module turns a [`Package`](crate::model::Package) and its compiled
//! [`Crate`](crate::model::Crate)s into distributable artifacts: plain
//! archives, self-extracting shell installers and system packages.
//!
//! # Configuration
//!
//! Packages are described by `relpack.toml` in the project directory:
//!
//! ```toml
//! name = "demo"
//! summary = "Demo tools"
//! crates = ["cmd/demo"]
//!
//! [[include]]
//! path = "README.md"
//! destination = "share/doc"
//! ```
//!
//! # Supported Formats
//!
//! | Format | Output | Notes |
//! |--------|--------|-------|
//! | zip | `<prefix>.zip` | store, deflate, bzip2, zstd, xz |
//! | tar | `<prefix>.tar[.gz\|.xz\|.bz2\|.zst\|.br]` | one stream codec |
//! | sh | `<prefix>.sh` | staged binaries and profiles, respond script |
//! | rpm | `<name>-<version>-<release>.<arch>.rpm` | installed under the package prefix |
//! | deb | `<name>_<version>_<arch>.deb` | installed under the package prefix |
//!
//! where `<prefix>` is `<name>-<version>-<target>-<arch>`.
//!
//! # Workflow
//!
//! 1. [`stage_includes`] copies include files into the build output directory
//! 2. The binaries are compiled by the caller
//! 3. [`Packager::pack`] writes every format
//! 4. [`Cleanup`] removes what the previous steps produced

#![warn(missing_docs)]

mod builder;
mod cleanup;
mod contents;
mod include;
pub(crate) mod platform;
mod settings;
mod utils;

// Public re-exports
pub use builder::{PackedArtifact, Packager};
pub use cleanup::{Cleanup, CleanupReport};
pub use contents::{ContentKind, ContentPlan, PlannedEntry};
pub use include::{StagedInclude, stage_includes, staged_path};
pub use platform::{
    PackFormat,
    linux::{FileTuple, TupleKind, file_tuples},
};
pub use settings::{Arch, Settings, SettingsBuilder, host_arch, host_target};
