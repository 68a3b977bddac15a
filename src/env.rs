//! Immutable environment overlay.
//!
//! Build steps read `BUILD_VERSION`, `PACKAGE_NAME` and friends through an
//! [`EnvOverlay`] instead of mutating the process environment. Each call to
//! [`EnvOverlay::with`] returns a new overlay; lookups fall back to the
//! process environment for keys the overlay does not define.

use std::collections::BTreeMap;

/// Version stamped into package and crate manifests.
pub const BUILD_VERSION: &str = "BUILD_VERSION";
/// Override for the package file name.
pub const PACKAGE_NAME: &str = "PACKAGE_NAME";
/// Target operating system of the build.
pub const BUILD_TARGET: &str = "BUILD_TARGET";
/// Target architecture of the build.
pub const BUILD_ARCH: &str = "BUILD_ARCH";
/// Release tag used by system packages.
pub const BUILD_RELEASE: &str = "BUILD_RELEASE";
/// RFC 3339 timestamp of the build.
pub const BUILD_TIME: &str = "BUILD_TIME";

/// Key/value layer consulted before the process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverlay {
    vars: BTreeMap<String, String>,
}

impl EnvOverlay {
    /// Creates an empty overlay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of this overlay with `key` set to `value`.
    pub fn with(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut vars = self.vars.clone();
        vars.insert(key.into(), value.into());
        Self { vars }
    }

    /// Looks `key` up in the overlay, then in the process environment.
    pub fn lookup(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .cloned()
            .or_else(|| std::env::var(key).ok())
    }

    /// Like [`lookup`](Self::lookup) but empty values count as unset.
    pub fn get(&self, key: &str) -> Option<String> {
        self.lookup(key).filter(|v| !v.is_empty())
    }

    /// Merged environment for child processes; overlay keys replace process keys.
    pub fn environ(&self) -> Vec<(String, String)> {
        let mut merged: BTreeMap<String, String> = std::env::vars().collect();
        for (k, v) in &self.vars {
            merged.insert(k.clone(), v.clone());
        }
        merged.into_iter().collect()
    }

    /// Substitutes `$VAR` and `${VAR}` references. Unknown variables expand
    /// to the empty string, and a `$` that does not start a reference is kept.
    pub fn expand(&self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;

        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];

            if let Some(braced) = after.strip_prefix('{') {
                if let Some(end) = braced.find('}') {
                    out.push_str(&self.lookup(&braced[..end]).unwrap_or_default());
                    rest = &braced[end + 1..];
                    continue;
                }
                out.push('$');
                rest = after;
                continue;
            }

            let len = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            if len == 0 {
                out.push('$');
            } else {
                out.push_str(&self.lookup(&after[..len]).unwrap_or_default());
            }
            rest = &after[len..];
        }

        out.push_str(rest);
        out
    }
}
