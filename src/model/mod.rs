//! Package content model.
//!
//! A [`Package`] is loaded from `relpack.toml` at the project root. It lists
//! the locations of its [`Crate`]s (each with an optional `crate.toml`) and
//! the auxiliary [`FileItem`]s shipped next to them. Environment overrides are
//! applied through an [`EnvOverlay`](crate::env::EnvOverlay) at load time.

mod crates;
mod package;

pub use crates::{CRATE_MANIFEST, Crate};
pub use package::{FileItem, PACKAGE_MANIFEST, Package, parse_permissions};

use crate::error::{Context, ErrorExt, Result};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Reads and deserializes a TOML manifest.
pub(crate) fn read_manifest<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).fs_context("reading manifest", path)?;
    toml::from_str(&text)
        .map_err(crate::error::Error::from)
        .with_context(|| format!("parsing {}", path.display()))
}
