//! Entry discovery and page output.

use crate::config::BuildInfo;
use crate::log;
use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Files to ignore during directory traversal
const IGNORED_FILES: &[&str] = &[".DS_Store"];

/// Extensions of documents compiled into pages.
const PAGE_EXTENSIONS: &[&str] = &["html", "md"];

/// Collect all files from a directory recursively, in a stable order.
/// A missing directory yields nothing.
pub fn collect_all_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_str().unwrap_or_default();
            !IGNORED_FILES.contains(&name)
        })
        .map(walkdir::DirEntry::into_path)
        .collect()
}

#[inline]
pub fn is_page_source(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| PAGE_EXTENSIONS.contains(&ext))
}

/// Top-level documents of a run: the root input file, then every page
/// source under `<base>/<pages>`.
///
/// Sources mapping to an output path already taken (`index.html` next to
/// `pages/index.md`) are dropped with a warning; the earlier entry wins.
pub fn collect_entries(info: &BuildInfo) -> Vec<PathBuf> {
    let candidates = std::iter::once(info.input_file.clone()).chain(
        collect_all_files(&info.pages_dir())
            .into_iter()
            .filter(|path| is_page_source(path) && *path != info.input_file),
    );

    let mut outputs: FxHashMap<PathBuf, PathBuf> = FxHashMap::default();
    let mut entries = Vec::new();
    for source in candidates {
        let output = info.output_path_for(&source);
        if let Some(first) = outputs.get(&output) {
            log!(
                "warn";
                "`{}` and `{}` both write `{}`, skipping the latter",
                first.display(),
                source.display(),
                output.display()
            );
            continue;
        }
        outputs.insert(output, source.clone());
        entries.push(source);
    }
    entries
}

/// Write a compiled page to its output location and return that path.
pub fn write_page(info: &BuildInfo, source: &Path, html: &str) -> Result<PathBuf> {
    let output = info.output_path_for(source);
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(&output, html).with_context(|| format!("Failed to write: {}", output.display()))?;
    Ok(output)
}
