//! Site configuration management for `quilt.toml`.
//!
//! # Sections
//!
//! | Section           | Purpose                                   |
//! |-------------------|-------------------------------------------|
//! | `[build]`         | Source layout, output, clean/parallel     |
//! | `[build.reload]`  | Live-reload script injection              |
//!
//! # Example
//!
//! ```toml
//! [build]
//! input = "src/index.html"
//! pages = "pages"
//! output = "dist"
//! static = "static"
//! components = "components"
//!
//! [build.reload]
//! enable = true
//! ```

mod build;
pub mod defaults;
mod error;
mod paths;

pub use build::{BuildConfig, ReloadConfig};
pub use error::ConfigError;
pub use paths::BuildInfo;

use crate::cli::Cli;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Component, Path, PathBuf},
};

/// Source extensions accepted for the root input file.
const INPUT_EXTENSIONS: &[&str] = &["html", "md"];

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing quilt.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory (set after loading)
    #[serde(skip)]
    #[educe(Default = PathBuf::from("./"))]
    pub root: PathBuf,

    /// Build settings
    #[serde(default)]
    pub build: BuildConfig,
}

impl SiteConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: SiteConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Load `<root>/<config>` and apply CLI overrides. A missing config
    /// file is an error.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let root = cli.root.as_deref().unwrap_or(Path::new("./"));
        let config_path = root.join(&cli.config);
        if !config_path.is_file() {
            return Err(ConfigError::Missing(config_path));
        }

        let mut config = Self::from_path(&config_path)?;
        config.update_with_cli(cli);
        config.validate()?;
        Ok(config)
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        &self.root
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &Cli) {
        let root = cli.root.clone().unwrap_or_else(|| self.root.clone());
        let args = cli.build_args();

        Self::update_option(&mut self.build.output, cli.output.as_ref());
        Self::update_option(&mut self.build.clean, args.clean.as_ref());
        self.build.parallel &= !args.sequential;
        self.build.reload.enable |= args.dev;

        self.update_path_with_root(&root, &cli.config);
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Make root-relative paths absolute. `~` in the input path is expanded.
    fn update_path_with_root(&mut self, root: &Path, config_name: &Path) {
        let root = Self::normalize_path(root);
        self.config_path = Self::normalize_path(&root.join(config_name));

        let input = shellexpand::tilde(&self.build.input.to_string_lossy()).into_owned();
        self.build.input = Self::normalize_path(&root.join(input));
        self.build.output = Self::normalize_path(&root.join(&self.build.output));
        self.root = root;
    }

    /// Normalize a path to absolute, using canonicalize if the path exists
    fn normalize_path(path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| {
            // For non-existent paths, manually make them absolute
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()
                    .map(|cwd| cwd.join(path))
                    .unwrap_or_else(|_| path.to_path_buf())
            }
        })
    }

    /// Validate configuration before a build
    pub fn validate(&self) -> Result<(), ConfigError> {
        let input = &self.build.input;
        if !input.exists() {
            return Err(ConfigError::Validation(format!(
                "[build.input] `{}` not found",
                input.display()
            )));
        }
        if !input.is_file() {
            return Err(ConfigError::Validation("[build.input] is not a file".into()));
        }
        let extension = input.extension().and_then(|ext| ext.to_str()).unwrap_or_default();
        if !INPUT_EXTENSIONS.contains(&extension) {
            return Err(ConfigError::Validation(
                "[build.input] must be an .html or .md file".into(),
            ));
        }

        Self::check_subdir("[build.pages]", &self.build.pages)?;
        Self::check_subdir("[build.static]", &self.build.static_dir)?;
        Self::check_subdir("[build.components]", &self.build.components)?;

        let base = self.base_folder();
        if base.starts_with(&self.build.output) {
            return Err(ConfigError::Validation(
                "[build.output] must not contain the source folder".into(),
            ));
        }

        Ok(())
    }

    /// Sub-directories of the base folder must stay inside it.
    fn check_subdir(field: &str, path: &Path) -> Result<(), ConfigError> {
        let escapes = path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(ConfigError::Validation(format!(
                "{field} must be a relative path inside the source folder"
            )));
        }
        Ok(())
    }

    /// Directory of the root input file.
    pub fn base_folder(&self) -> &Path {
        self.build.input.parent().unwrap_or(Path::new("./"))
    }

    /// Resolved layout for the build run.
    pub fn build_info(&self) -> BuildInfo {
        BuildInfo {
            input_file: self.build.input.clone(),
            base_folder: self.base_folder().to_path_buf(),
            pages_folder: self.build.pages.clone(),
            output_folder: self.build.output.clone(),
            static_folder: self.build.static_dir.clone(),
            components_folder: self.build.components.clone(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
