//! Site building orchestration.
//!
//! Coordinates entry discovery, page compilation and output.
//!
//! # Architecture
//!
//! ```text
//! build_site()
//!     │
//!     ├── prepare_output()  ──► clean / create output dir (fatal on error)
//!     │
//!     ├── collect_entries() ──► root input + <base>/<pages>/**/*.{html,md}
//!     │
//!     └── per entry (rayon, one PageScope per worker)
//!             │
//!             ├── AssetCopier::copy_once()   first page only
//!             ├── TemplateCompiler::compile_tree()
//!             ├── LinkRewriter::rewrite()
//!             ├── reload::inject()           dev builds only
//!             ├── serialize + write_page()
//!             └── PageScope::reset()
//! ```
//!
//! A failing page becomes a [`PageOutcome::Skipped`]; only setup errors
//! abort the run.

use crate::{
    compiler::{
        PageScope, TemplateCompiler,
        assets::AssetCopier,
        document::FsReader,
        links::{LinkInventory, LinkRewriter},
        pages::{collect_entries, write_page},
        reload,
    },
    config::{BuildInfo, SiteConfig},
    debug, log,
    utils::html,
};
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Result of building one top-level document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    Written { source: PathBuf, output: PathBuf },
    Skipped { source: PathBuf, reason: String },
}

impl PageOutcome {
    #[cfg(test)]
    pub fn source(&self) -> &Path {
        match self {
            Self::Written { source, .. } | Self::Skipped { source, .. } => source,
        }
    }
}

#[derive(Debug, Default)]
pub struct BuildReport {
    pub outcomes: Vec<PageOutcome>,
}

impl BuildReport {
    pub fn written(&self) -> impl Iterator<Item = &PageOutcome> {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, PageOutcome::Written { .. }))
    }

    pub fn skipped(&self) -> impl Iterator<Item = &PageOutcome> {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, PageOutcome::Skipped { .. }))
    }
}

/// Shared, read-only state of one build run.
struct BuildContext<'a> {
    info: &'a BuildInfo,
    compiler: &'a TemplateCompiler,
    assets: &'a AssetCopier,
    /// Live-reload script to inject, if enabled
    reload: Option<&'a str>,
}

/// Build every entry page of the site.
///
/// If `config.build.clean` is true, clears the entire output directory first.
pub fn build_site(config: &SiteConfig) -> Result<BuildReport> {
    let info = config.build_info();
    prepare_output(&info.output_folder, config.build.clean)?;

    let compiler = TemplateCompiler::new(FsReader, &info.base_folder, &info.components_dir());
    let assets = AssetCopier::new();
    let ctx = BuildContext {
        info: &info,
        compiler: &compiler,
        assets: &assets,
        reload: config
            .build
            .reload
            .enable
            .then_some(config.build.reload.src.as_str()),
    };

    let entries = collect_entries(&info);
    log!("build"; "compiling {} pages...", entries.len());

    let outcomes: Vec<PageOutcome> = if config.build.parallel {
        entries
            .par_iter()
            .map_init(PageScope::new, |scope, source| build_page(&ctx, source, scope))
            .collect()
    } else {
        let mut scope = PageScope::new();
        entries
            .iter()
            .map(|source| build_page(&ctx, source, &mut scope))
            .collect()
    };

    let report = BuildReport { outcomes };
    log_build_result(&report, &compiler);
    Ok(report)
}

/// Ensure the output directory exists, emptying it first when `clean` is set.
fn prepare_output(output: &Path, clean: bool) -> Result<()> {
    if clean && output.exists() {
        fs::remove_dir_all(output)
            .with_context(|| format!("Failed to clear output directory: {}", output.display()))?;
    }
    fs::create_dir_all(output)
        .with_context(|| format!("Failed to create output directory: {}", output.display()))
}

fn build_page(ctx: &BuildContext<'_>, source: &Path, scope: &mut PageScope) -> PageOutcome {
    if let Err(e) = ctx.assets.copy_once(ctx.info) {
        log!("error"; "static assets: {:#}", e);
    }

    let relative = source.strip_prefix(&ctx.info.base_folder).unwrap_or(source);
    log!("compile"; "{}", relative.display());

    let result = compile_page(ctx, source, scope);
    scope.reset();

    match result {
        Ok(output) => PageOutcome::Written {
            source: source.to_path_buf(),
            output,
        },
        Err(e) => {
            log!("error"; "{}: {:#}", relative.display(), e);
            PageOutcome::Skipped {
                source: source.to_path_buf(),
                reason: format!("{e:#}"),
            }
        }
    }
}

fn compile_page(ctx: &BuildContext<'_>, source: &Path, scope: &mut PageScope) -> Result<PathBuf> {
    let info = ctx.info;
    let mut nodes = ctx.compiler.compile_tree(source, scope)?;

    let inventory = LinkRewriter::new(&info.base_folder, &info.pages_folder).rewrite(&mut nodes);
    report_dangling_links(source, &inventory);

    if let Some(src) = ctx.reload {
        reload::inject(&mut nodes, src);
    }

    let html = html::serialize(&nodes)?;
    write_page(info, source, &html)
}

/// Log internal links whose source document does not exist.
fn report_dangling_links(source: &Path, inventory: &LinkInventory) {
    for target in inventory {
        let exists = target.exists() || target.with_extension("md").exists();
        if !exists {
            debug!("links"; "{} links to missing {}", source.display(), target.display());
        }
    }
}

/// Log build result based on the page outcomes
fn log_build_result(report: &BuildReport, compiler: &TemplateCompiler) {
    let written = report.written().count();
    let skipped = report.skipped().count();
    debug!("cache"; "{} fragments compiled", compiler.cache().len());
    for outcome in &report.outcomes {
        match outcome {
            PageOutcome::Written { source, output } => {
                debug!("write"; "{} -> {}", source.display(), output.display());
            }
            PageOutcome::Skipped { source, reason } => {
                debug!("skip"; "{}: {}", source.display(), reason);
            }
        }
    }

    if written == 0 {
        log!("warn"; "no pages written, check [build.input] and [build.pages]");
    } else if skipped > 0 {
        log!("warn"; "{} pages written, {} skipped", written, skipped);
    } else {
        log!("build"; "done, {} pages written", written);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Write `files` under `<root>/src` and return a config pointing at them.
    fn site(root: &Path, files: &[(&str, &str)]) -> SiteConfig {
        for (path, content) in files {
            let path = root.join("src").join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        let mut config = SiteConfig::default();
        config.build.input = root.join("src/index.html");
        config.build.output = root.join("dist");
        config
    }

    fn read(root: &Path, path: &str) -> String {
        fs::read_to_string(root.join("dist").join(path)).unwrap()
    }

    #[test]
    fn test_build_site_layout() {
        let dir = tempfile::tempdir().unwrap();
        let config = site(
            dir.path(),
            &[
                ("index.html", r#"<body><x-nav></x-nav><h1>Home</h1></body>"#),
                ("pages/about.md", "---\ntitle: About\n---\n# About {{ site.name }}\n"),
                ("pages/blog/post.html", r#"<a href="pages/about.html">about</a><a href="https://x.y">x</a>"#),
                ("components/nav.html", "<nav><a href=\"pages/about.html\" class=\"nav\n  link\">About</a></nav>"),
                ("static/site.css", "body{}"),
            ],
        );

        let report = build_site(&config).unwrap();
        assert_eq!(report.written().count(), 3);
        assert_eq!(report.skipped().count(), 0);

        let root = dir.path();
        assert_eq!(
            read(root, "index.html"),
            r#"<body><nav><a href="/about.html" class="nav link">About</a></nav><h1>Home</h1></body>"#
        );
        assert_eq!(read(root, "about.html"), "<h1>About {{ site.name }}</h1>\n");
        assert_eq!(
            read(root, "blog/post.html"),
            r#"<a href="/about.html">about</a><a href="https://x.y">x</a>"#
        );
        assert_eq!(read(root, "static/site.css"), "body{}");
    }

    #[test]
    fn test_broken_reference_does_not_fail_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = site(
            dir.path(),
            &[
                ("index.html", "<main><x-missing></x-missing></main>"),
                ("pages/ok.html", "<p>ok</p>"),
            ],
        );

        let report = build_site(&config).unwrap();
        assert_eq!(report.written().count(), 2);
        assert_eq!(read(dir.path(), "index.html"), "<main><x-missing></x-missing></main>");
        assert_eq!(read(dir.path(), "ok.html"), "<p>ok</p>");
    }

    #[test]
    fn test_malformed_page_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let config = site(
            dir.path(),
            &[
                ("index.html", "<p>home</p>"),
                ("pages/bad.html", "<p>x</p></section>"),
                ("pages/good.html", "<p>good</p>"),
            ],
        );

        let report = build_site(&config).unwrap();
        let skipped: Vec<_> = report.skipped().collect();
        assert_eq!(skipped.len(), 1);
        assert!(skipped[0].source().ends_with("pages/bad.html"));
        assert!(!dir.path().join("dist/bad.html").exists());
        assert_eq!(read(dir.path(), "good.html"), "<p>good</p>");
    }

    #[test]
    fn test_script_scope_per_page() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = site(
            dir.path(),
            &[
                ("index.html", "<x-card></x-card><x-card></x-card>"),
                ("pages/a.html", "<x-card></x-card><x-card></x-card><x-card></x-card>"),
                ("pages/b.html", "<x-card></x-card>"),
                ("components/card.html", "<div>card</div><script>card()</script>"),
            ],
        );

        for parallel in [true, false] {
            config.build.parallel = parallel;
            build_site(&config).unwrap();
            for page in ["index.html", "a.html", "b.html"] {
                assert_eq!(read(dir.path(), page).matches("card()").count(), 1, "{page}");
            }
        }
    }

    #[test]
    fn test_live_reload_injected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = site(dir.path(), &[("index.html", "<html><body><p>x</p></body></html>")]);
        config.build.reload.enable = true;

        build_site(&config).unwrap();
        assert_eq!(
            read(dir.path(), "index.html"),
            r#"<html><body><p>x</p><script src="/__quilt/reload.js"></script></body></html>"#
        );
    }

    #[test]
    fn test_clean_output() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = site(dir.path(), &[("index.html", "<p>x</p>")]);
        fs::create_dir_all(dir.path().join("dist")).unwrap();
        fs::write(dir.path().join("dist/stale.html"), "old").unwrap();

        config.build.clean = false;
        build_site(&config).unwrap();
        assert!(dir.path().join("dist/stale.html").exists());

        config.build.clean = true;
        build_site(&config).unwrap();
        assert!(!dir.path().join("dist/stale.html").exists());
        assert!(dir.path().join("dist/index.html").exists());
    }

    #[test]
    fn test_output_dir_not_creatable() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = site(dir.path(), &[("index.html", "<p>x</p>")]);
        fs::write(dir.path().join("blocker"), "file").unwrap();
        config.build.output = dir.path().join("blocker/dist");
        assert!(build_site(&config).is_err());
    }
}
