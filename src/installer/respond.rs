//! Respond script directives and their rendering.

use super::templates;
use super::{RESPOND_SCRIPT_NAME, STAGED_BINARY_SUFFIX, STAGED_PROFILE_SUFFIX};
use crate::error::Result;
use serde::Serialize;

/// One post-install action, keyed by the staged name inside the archive.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum RespondDirective {
    /// Rotate backups and move `NAME.new` into place.
    ApplyTarget(String),
    /// Install `NAME.template` unless `NAME` already exists.
    ApplyProfile(String),
}

impl RespondDirective {
    /// Staged name inside the archive.
    pub fn staged_path(&self) -> &str {
        match self {
            Self::ApplyTarget(path) | Self::ApplyProfile(path) => path,
        }
    }

    /// Final name once the directive has been applied.
    pub fn final_path(&self) -> &str {
        match self {
            Self::ApplyTarget(path) => path.strip_suffix(STAGED_BINARY_SUFFIX).unwrap_or(path),
            Self::ApplyProfile(path) => path.strip_suffix(STAGED_PROFILE_SUFFIX).unwrap_or(path),
        }
    }

    fn function(&self) -> &'static str {
        match self {
            Self::ApplyTarget(_) => "relpack_apply_target",
            Self::ApplyProfile(_) => "relpack_apply_profile",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::ApplyTarget(_) => "install target",
            Self::ApplyProfile(_) => "install profile",
        }
    }
}

/// Directives collected while the installer payload is written.
#[derive(Clone, Debug, Default)]
pub struct RespondScript {
    directives: Vec<RespondDirective>,
}

impl RespondScript {
    /// Empty directive list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a directive; order is preserved.
    pub fn push(&mut self, directive: RespondDirective) {
        self.directives.push(directive);
    }

    /// Directives in entry-write order.
    pub fn directives(&self) -> &[RespondDirective] {
        &self.directives
    }

    /// True when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    /// Renders the shell script.
    pub fn render(&self) -> Result<String> {
        render(&self.directives)
    }
}

#[derive(Serialize)]
struct DirectiveLine {
    label: &'static str,
    function: &'static str,
    path: String,
}

#[derive(Serialize)]
struct RespondData {
    respond: String,
    directives: Vec<DirectiveLine>,
}

/// Renders the respond script for `directives`. Pure: the same input always
/// yields the same text.
pub fn render(directives: &[RespondDirective]) -> Result<String> {
    let data = RespondData {
        respond: escape_double_quoted(RESPOND_SCRIPT_NAME),
        directives: directives
            .iter()
            .map(|d| DirectiveLine {
                label: d.label(),
                function: d.function(),
                path: escape_double_quoted(d.staged_path()),
            })
            .collect(),
    };
    Ok(templates::registry()?.render(templates::RESPOND, &data)?)
}

/// Escapes text for use inside a double-quoted shell word.
pub(crate) fn escape_double_quoted(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '"' | '$' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
