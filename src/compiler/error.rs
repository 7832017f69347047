//! Per-document compile errors.

use super::markdown::FrontMatterError;
use crate::utils::html::HtmlError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("no such document `{}`", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read `{}`", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse `{}`", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: HtmlError,
    },

    #[error("failed to render `{}`", .path.display())]
    Render {
        path: PathBuf,
        #[source]
        source: HtmlError,
    },

    #[error("invalid front matter in `{}`", .path.display())]
    FrontMatter {
        path: PathBuf,
        #[source]
        source: FrontMatterError,
    },
}

impl CompileError {
    /// True when a referenced document simply does not exist, which the
    /// compiler recovers from by leaving the reference in place.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
