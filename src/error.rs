//! Error types for packaging operations.
//!
//! Provides contextual error chaining, filesystem errors that carry the
//! offending path, and variants for every configuration the packager refuses
//! to build.
//!
//! # Features
//!
//! - **Context trait**: Add context to errors similar to anyhow
//! - **ErrorExt trait**: Filesystem operations with automatic path context
//! - **bail! macro**: Early return with formatted error messages
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use relpack::error::{Context, ErrorExt, Result};
//!
//! fn read_manifest(path: &Path) -> Result<toml::Table> {
//!     let contents = std::fs::read_to_string(path)
//!         .fs_context("reading manifest", path)?;
//!
//!     let table: toml::Table = toml::from_str(&contents)
//!         .map_err(relpack::error::Error::from)
//!         .context("parsing manifest")?;
//!
//!     if !table.contains_key("name") {
//!         relpack::bail!("invalid manifest: missing required field 'name'");
//!     }
//!
//!     Ok(table)
//! }
//! ```

use std::{
    fmt::Display,
    io,
    path::PathBuf,
};
use thiserror::Error as DeriveError;

/// Errors returned by the packager.
///
/// Input errors and unsupported configurations are raised before any output
/// file is created. Streaming errors abort the build that raised them.
#[derive(Debug, DeriveError)]
#[non_exhaustive]
pub enum Error {
    /// Error with context. Created by the [`Context`] trait.
    #[error("{0}: {1}")]
    Context(String, Box<Self>),

    /// File system error with path context.
    ///
    /// Created by the [`ErrorExt`] trait's `fs_context` method.
    #[error("{context} {path}: {error}")]
    Fs {
        /// Context describing the operation (e.g., "reading manifest")
        context: &'static str,
        /// Path that was being accessed
        path: PathBuf,
        /// The underlying I/O error
        error: io::Error,
    },

    /// Child process execution error.
    #[error("failed to run command {command}: {error}")]
    CommandFailed {
        /// Command that failed to execute
        command: String,
        /// The underlying error
        error: io::Error,
    },

    /// Generic I/O error.
    #[error("{0}")]
    IoError(#[from] io::Error),

    /// ZIP archive creation error.
    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    /// Handlebars template rendering error.
    #[error("{0}")]
    HandleBarsError(#[from] handlebars::RenderError),

    /// Handlebars template parsing error.
    #[error("{0}")]
    Template(#[from] handlebars::TemplateError),

    /// Manifest parsing error.
    #[error("{0}")]
    TomlError(#[from] toml::de::Error),

    /// Invalid glob pattern built from the destination directory.
    #[error("{0}")]
    GlobPattern(#[from] glob::PatternError),

    /// RPM package creation error.
    #[error("{0}")]
    RpmError(#[from] rpm::Error),

    /// Compression method that the chosen container cannot carry.
    #[error("compression method {method:?} is not supported by {format}")]
    UnsupportedCompression {
        /// Requested compression method name
        method: String,
        /// Container format that rejected it
        format: &'static str,
    },

    /// Requested output format is unknown or not built by this packager.
    #[error("unsupported package format {0:?}")]
    UnsupportedFormat(String),

    /// Two entries resolve to the same name inside one archive.
    #[error("duplicate archive entry {0}")]
    DuplicateEntry(String),

    /// A permission override that is not an octal mode.
    #[error("invalid permissions {value:?} for {item}")]
    InvalidPermissions {
        /// Source path of the offending file item
        item: String,
        /// The rejected permission string
        value: String,
    },

    /// A package field required before packing is empty.
    #[error("package {0} must not be empty")]
    MissingField(&'static str),

    /// A crate has no compiled artifact at the expected location.
    #[error("compiled artifact for crate {name} not found at {path}")]
    MissingArtifact {
        /// Crate name
        name: String,
        /// Location that was checked
        path: PathBuf,
    },

    /// The build was cancelled before the next format started.
    #[error("packaging cancelled")]
    Cancelled,

    /// Unsupported CPU architecture.
    #[error("unsupported architecture: {0}")]
    ArchError(String),

    /// Generic error with custom message.
    #[error("{0}")]
    GenericError(String),
}

impl Error {
    /// True for errors raised because the requested configuration cannot be
    /// built, as opposed to bad input or I/O failures.
    pub fn is_unsupported(&self) -> bool {
        match self {
            Error::UnsupportedCompression { .. } | Error::UnsupportedFormat(_) => true,
            Error::ArchError(_) => true,
            Error::Context(_, inner) => inner.is_unsupported(),
            _ => false,
        }
    }
}

/// Convenient type alias for Result.
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for adding context to errors.
///
/// Similar to `anyhow::Context` but integrated with the packager's Error type.
/// Works with both `Result<T, E>` and `Option<T>`.
///
/// # Examples
///
/// ```
/// use relpack::error::{Context, Result};
///
/// fn first_crate(crates: &[String]) -> Result<&String> {
///     crates.first().context("no crates configured")
/// }
///
/// assert!(first_crate(&[]).is_err());
/// ```
pub trait Context<T> {
    /// Add context to an error.
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static;

    /// Add context to an error using a closure (lazy evaluation).
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T> Context<T> for Result<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.map_err(|e| Error::Context(context.to_string(), Box::new(e)))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| Error::Context(f().to_string(), Box::new(e)))
    }
}

impl<T> Context<T> for Option<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.ok_or_else(|| Error::GenericError(context.to_string()))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.ok_or_else(|| Error::GenericError(f().to_string()))
    }
}

/// Extension trait for filesystem operations with automatic path context.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use relpack::error::{ErrorExt, Result};
///
/// fn create_destination(path: &Path) -> Result<()> {
///     std::fs::create_dir_all(path)
///         .fs_context("creating destination directory", path)?;
///     Ok(())
/// }
/// ```
pub trait ErrorExt<T> {
    /// Add filesystem context to an I/O error.
    ///
    /// The `context` should be a present-tense verb phrase describing the operation,
    /// e.g., "reading file", "creating directory", "copying binary".
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, std::io::Error> {
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|error| Error::Fs {
            context,
            path: path.into(),
            error,
        })
    }
}

/// Macro for early return with error.
///
/// Converts the message into a [`Error::GenericError`] and returns immediately.
///
/// # Examples
///
/// ```ignore
/// bail!("operation failed");
/// bail!("invalid value: {}", value);
/// ```
#[macro_export]
macro_rules! bail {
    ($msg:literal $(,)?) => {
        return Err($crate::error::Error::GenericError(format!($msg)))
    };
    ($err:expr $(,)?) => {
        return Err($crate::error::Error::GenericError($err.to_string()))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::error::Error::GenericError(format!($fmt, $($arg)*)))
    };
}
