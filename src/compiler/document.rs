//! Source documents and the storage they are read from.

use super::error::CompileError;
use super::markdown::{self, FrontMatter};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Storage the compiler reads sources from.
pub trait SourceReader: Sync {
    /// Read a document as UTF-8 text. Missing files map to
    /// [`CompileError::NotFound`].
    fn read(&self, path: &Path) -> Result<String, CompileError>;

    fn exists(&self, path: &Path) -> bool;
}

/// Reads sources straight from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsReader;

impl SourceReader for FsReader {
    fn read(&self, path: &Path) -> Result<String, CompileError> {
        fs::read_to_string(path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => CompileError::NotFound(path.to_path_buf()),
            _ => CompileError::Io {
                path: path.to_path_buf(),
                source,
            },
        })
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// Source flavour, decided from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Html,
    Markdown,
}

impl SourceKind {
    pub fn of(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("md") || ext.eq_ignore_ascii_case("markdown") => {
                Self::Markdown
            }
            _ => Self::Html,
        }
    }
}

/// A document ready for tree compilation. Markdown arrives pre-rendered.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    Html {
        path: PathBuf,
        content: String,
    },
    Markdown {
        path: PathBuf,
        metadata: FrontMatter,
        html: String,
    },
}

impl Document {
    /// Read `path` and convert it according to its [`SourceKind`].
    pub fn load(reader: &dyn SourceReader, path: &Path) -> Result<Self, CompileError> {
        let raw = reader.read(path)?;
        Self::from_source(path, raw)
    }

    pub fn from_source(path: &Path, raw: String) -> Result<Self, CompileError> {
        match SourceKind::of(path) {
            SourceKind::Html => Ok(Self::Html {
                path: path.to_path_buf(),
                content: raw,
            }),
            SourceKind::Markdown => {
                let ingested = markdown::ingest(&raw).map_err(|source| CompileError::FrontMatter {
                    path: path.to_path_buf(),
                    source,
                })?;
                Ok(Self::Markdown {
                    path: path.to_path_buf(),
                    metadata: ingested.metadata,
                    html: ingested.html,
                })
            }
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Html { path, .. } | Self::Markdown { path, .. } => path,
        }
    }

    /// HTML text to parse into a tree.
    pub fn html(&self) -> &str {
        match self {
            Self::Html { content, .. } => content,
            Self::Markdown { html, .. } => html,
        }
    }

    /// Front matter (empty for HTML documents).
    #[cfg(test)]
    pub fn metadata(&self) -> Option<&FrontMatter> {
        match self {
            Self::Html { .. } => None,
            Self::Markdown { metadata, .. } => Some(metadata),
        }
    }

    /// Directory relative references inside this document start from.
    pub fn dir(&self) -> &Path {
        self.path().parent().unwrap_or(Path::new(""))
    }
}

/// In-memory sources for tests.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemoryReader {
    files: rustc_hash::FxHashMap<PathBuf, String>,
}

#[cfg(test)]
impl MemoryReader {
    pub fn with(mut self, path: &str, content: &str) -> Self {
        self.files.insert(PathBuf::from(path), content.to_owned());
        self
    }
}

#[cfg(test)]
impl SourceReader for MemoryReader {
    fn read(&self, path: &Path) -> Result<String, CompileError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| CompileError::NotFound(path.to_path_buf()))
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }
}
