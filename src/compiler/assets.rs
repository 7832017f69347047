//! Static asset copying.

use super::pages::collect_all_files;
use crate::config::BuildInfo;
use crate::{debug, log};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

/// Copies `<base>/<static>` into `<output>/<static>` at most once per run.
#[derive(Debug, Default)]
pub struct AssetCopier {
    copied: AtomicBool,
}

impl AssetCopier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy the static folder on the first call. Later calls, including
    /// concurrent ones, return `Ok(None)` without touching the disk.
    pub fn copy_once(&self, info: &BuildInfo) -> Result<Option<usize>> {
        if self.copied.swap(true, Ordering::AcqRel) {
            return Ok(None);
        }
        copy_dir(&info.static_dir(), &info.static_output_dir()).map(Some)
    }

    #[cfg(test)]
    pub fn has_copied(&self) -> bool {
        self.copied.load(Ordering::Acquire)
    }
}

/// Copy every file under `source` to the same relative location under
/// `dest`. Returns the number of files copied.
pub fn copy_dir(source: &Path, dest: &Path) -> Result<usize> {
    if !source.is_dir() {
        debug!("assets"; "no static folder at {}", source.display());
        return Ok(0);
    }

    let files = collect_all_files(source);
    for file in &files {
        let relative = file.strip_prefix(source)?;
        let target = dest.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        fs::copy(file, &target).with_context(|| format!("Failed to copy: {}", file.display()))?;
    }

    log!("assets"; "copied {} files", files.len());
    Ok(files.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    fn site(root: &Path) -> BuildInfo {
        BuildInfo {
            input_file: root.join("src/index.html"),
            base_folder: root.join("src"),
            pages_folder: "pages".into(),
            output_folder: root.join("dist"),
            static_folder: "static".into(),
            components_folder: "components".into(),
        }
    }

    #[test]
    fn test_copy_once() {
        let dir = tempfile::tempdir().unwrap();
        let info = site(dir.path());
        fs::create_dir_all(info.static_dir().join("css")).unwrap();
        fs::write(info.static_dir().join("css/site.css"), "body{}").unwrap();
        fs::write(info.static_dir().join("logo.svg"), [0u8, 159, 146, 150]).unwrap();

        let copier = AssetCopier::new();
        assert_eq!(copier.copy_once(&info).unwrap(), Some(2));
        assert!(copier.has_copied());
        assert_eq!(fs::read(dir.path().join("dist/static/logo.svg")).unwrap(), [0u8, 159, 146, 150]);
        assert_eq!(fs::read_to_string(dir.path().join("dist/static/css/site.css")).unwrap(), "body{}");

        assert_eq!(copier.copy_once(&info).unwrap(), None);
    }

    #[test]
    fn test_concurrent_triggers_copy_once() {
        let dir = tempfile::tempdir().unwrap();
        let info = site(dir.path());
        fs::create_dir_all(info.static_dir()).unwrap();
        fs::write(info.static_dir().join("a.txt"), "a").unwrap();

        let copier = AssetCopier::new();
        let copies: usize = (0..16)
            .into_par_iter()
            .map(|_| copier.copy_once(&info).unwrap().map_or(0, |_| 1))
            .sum();
        assert_eq!(copies, 1);
    }

    #[test]
    fn test_missing_static_folder() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(copy_dir(&dir.path().join("none"), &dir.path().join("out")).unwrap(), 0);
    }
}
