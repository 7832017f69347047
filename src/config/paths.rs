//! Resolved source and output layout for one build run.
//!
//! # Architecture
//!
//! ```text
//! SiteConfig
//!     │
//!     └── build_info() → BuildInfo
//!                           │
//!                           ├── base_folder      → /abs/site/src
//!                           ├── pages_folder     → pages          (relative to base)
//!                           ├── output_folder    → /abs/site/dist
//!                           └── output_path_for(/abs/site/src/pages/blog/post.md)
//!                                                → /abs/site/dist/blog/post.html
//! ```

use std::path::{Path, PathBuf};

/// Immutable layout derived once from the configuration.
///
/// `pages_folder`, `static_folder` and `components_folder` are relative to
/// `base_folder`; the joined forms are available through accessors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    pub input_file: PathBuf,
    pub base_folder: PathBuf,
    pub pages_folder: PathBuf,
    pub output_folder: PathBuf,
    pub static_folder: PathBuf,
    pub components_folder: PathBuf,
}

impl BuildInfo {
    /// Absolute pages directory.
    #[inline]
    pub fn pages_dir(&self) -> PathBuf {
        self.base_folder.join(&self.pages_folder)
    }

    #[inline]
    pub fn static_dir(&self) -> PathBuf {
        self.base_folder.join(&self.static_folder)
    }

    #[inline]
    pub fn components_dir(&self) -> PathBuf {
        self.base_folder.join(&self.components_folder)
    }

    /// Where `<output>/<static>` lands.
    #[inline]
    pub fn static_output_dir(&self) -> PathBuf {
        self.output_folder.join(&self.static_folder)
    }

    /// Source path relative to the base folder with the pages segment
    /// stripped, e.g. `pages/blog/post.md` -> `blog/post.md`.
    pub fn page_relative<'a>(&self, source: &'a Path) -> &'a Path {
        let relative = source.strip_prefix(&self.base_folder).unwrap_or(source);
        relative.strip_prefix(&self.pages_folder).unwrap_or(relative)
    }

    /// Output file for a source document, always with an `.html` extension.
    pub fn output_path_for(&self, source: &Path) -> PathBuf {
        let relative = self.page_relative(source);
        let relative = if relative.is_absolute() {
            // Sources outside the base folder keep only their file name
            relative.file_name().map_or_else(PathBuf::new, PathBuf::from)
        } else {
            relative.to_path_buf()
        };
        self.output_folder.join(relative).with_extension("html")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> BuildInfo {
        BuildInfo {
            input_file: "/site/src/index.html".into(),
            base_folder: "/site/src".into(),
            pages_folder: "pages".into(),
            output_folder: "/site/dist".into(),
            static_folder: "static".into(),
            components_folder: "components".into(),
        }
    }

    #[test]
    fn test_output_layout() {
        let info = info();
        assert_eq!(info.output_path_for(Path::new("/site/src/pages/about.md")), PathBuf::from("/site/dist/about.html"));
        assert_eq!(info.output_path_for(Path::new("/site/src/index.html")), PathBuf::from("/site/dist/index.html"));
        assert_eq!(
            info.output_path_for(Path::new("/site/src/pages/blog/post.html")),
            PathBuf::from("/site/dist/blog/post.html")
        );
    }

    #[test]
    fn test_source_outside_base() {
        assert_eq!(info().output_path_for(Path::new("/elsewhere/x.md")), PathBuf::from("/site/dist/x.html"));
    }

    #[test]
    fn test_joined_dirs() {
        let info = info();
        assert_eq!(info.pages_dir(), PathBuf::from("/site/src/pages"));
        assert_eq!(info.static_dir(), PathBuf::from("/site/src/static"));
        assert_eq!(info.components_dir(), PathBuf::from("/site/src/components"));
        assert_eq!(info.static_output_dir(), PathBuf::from("/site/dist/static"));
    }
}
