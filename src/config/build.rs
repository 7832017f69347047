//! `[build]` section configuration.
//!
//! Contains source layout, output location and build behavior.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[build]` section in quilt.toml - build pipeline configuration.
///
/// # Example
/// ```toml
/// [build]
/// input = "src/index.html"   # Root page; its directory is the base folder
/// pages = "pages"            # Entry pages, relative to the base folder
/// output = "dist"            # Output directory
///
/// [build.reload]
/// enable = true
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Root input file (`.html` or `.md`).
    #[serde(default = "defaults::build::input")]
    #[educe(Default = defaults::build::input())]
    pub input: PathBuf,

    /// Pages directory, relative to the base folder.
    #[serde(default = "defaults::build::pages")]
    #[educe(Default = defaults::build::pages())]
    pub pages: PathBuf,

    /// Build output directory.
    #[serde(default = "defaults::build::output")]
    #[educe(Default = defaults::build::output())]
    pub output: PathBuf,

    /// Static assets directory, relative to the base folder.
    #[serde(rename = "static", default = "defaults::build::r#static")]
    #[educe(Default = defaults::build::r#static())]
    pub static_dir: PathBuf,

    /// Directory holding `<x-name>` component sources, relative to the base folder.
    #[serde(default = "defaults::build::components")]
    #[educe(Default = defaults::build::components())]
    pub components: PathBuf,

    /// Empty the output directory before each build.
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub clean: bool,

    /// Compile pages concurrently.
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub parallel: bool,

    /// Live-reload script injection.
    #[serde(default)]
    pub reload: ReloadConfig,
}

/// `[build.reload]` section - live-reload script injection.
///
/// # Example
/// ```toml
/// [build.reload]
/// enable = true
/// src = "/__quilt/reload.js"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct ReloadConfig {
    /// Inject the script into every page.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub enable: bool,

    /// URL of the injected script.
    #[serde(default = "defaults::build::reload::src")]
    #[educe(Default = defaults::build::reload::src())]
    pub src: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_config_defaults() {
        let config = BuildConfig::default();
        assert_eq!(config.input, PathBuf::from("src/index.html"));
        assert_eq!(config.pages, PathBuf::from("pages"));
        assert_eq!(config.output, PathBuf::from("dist"));
        assert_eq!(config.static_dir, PathBuf::from("static"));
        assert_eq!(config.components, PathBuf::from("components"));
        assert!(config.clean);
        assert!(config.parallel);
        assert!(!config.reload.enable);
        assert_eq!(config.reload.src, "/__quilt/reload.js");
    }

    #[test]
    fn test_static_key_renamed() {
        let config: BuildConfig = toml::from_str(r#"static = "public""#).unwrap();
        assert_eq!(config.static_dir, PathBuf::from("public"));
        assert_eq!(config.pages, PathBuf::from("pages"));
    }

    #[test]
    fn test_partial_reload_section() {
        let config: BuildConfig = toml::from_str("[reload]\nenable = true").unwrap();
        assert!(config.reload.enable);
        assert_eq!(config.reload.src, "/__quilt/reload.js");
    }

    #[test]
    fn test_unknown_build_field_rejected() {
        assert!(toml::from_str::<BuildConfig>("minify = true").is_err());
        assert!(toml::from_str::<BuildConfig>("[reload]\nport = 1").is_err());
    }
}
