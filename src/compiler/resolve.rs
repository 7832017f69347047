//! Reference resolution for `src`/`href` values found in documents.
//!
//! | Reference            | Resolved against          |
//! |----------------------|---------------------------|
//! | `./x`, `../x`, `x`   | referencing directory     |
//! | `/x`                 | site base folder          |
//! | `https://..`, `//..` | not resolved (external)   |
//!
//! Resolution is purely lexical; nothing here touches the filesystem.

use std::path::{Component, Path, PathBuf};

/// Outcome of resolving a raw reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// Scheme-prefixed or protocol-relative URL; callers skip it.
    External,
    Local(PathBuf),
}

#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    /// `root` is the site base folder that root-relative references start from.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: normalize(&root.into()),
        }
    }

    pub fn resolve(&self, base_dir: &Path, raw: &str) -> Reference {
        let raw = raw.trim();
        if is_external_link(raw) {
            return Reference::External;
        }
        let joined = match raw.strip_prefix('/') {
            Some(rooted) => self.root.join(rooted),
            None => base_dir.join(raw),
        };
        Reference::Local(normalize(&joined))
    }
}

/// Check if a link is external (has a scheme like `http:`, `mailto:`, or is
/// protocol-relative `//host`).
#[inline]
pub fn is_external_link(link: &str) -> bool {
    if link.starts_with("//") {
        return true;
    }
    link.find(':').is_some_and(|pos| {
        pos > 0
            && link[..pos]
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

/// Lexically normalize a path: drop `.` and fold `..` into its parent.
/// Leading `..` on relative paths are kept.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out.iter().map(|c| c.as_os_str()).collect()
}
