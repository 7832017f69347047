//! Template compilation for static pages.
//!
//! This module turns source documents into fully resolved HTML trees:
//!
//! - **resolve**: Map `src`/`href` references to source paths
//! - **markdown**: Front matter + Markdown rendering that keeps `{{ }}` intact
//! - **cache**: Run-wide cache of compiled component fragments
//! - **scripts**: Per-page component script de-duplication
//! - **links**: Rewrite hyperlinks for the output layout
//! - **pages / assets / reload**: Entry discovery, output, static files, live reload
//!
//! # Compile Flow
//!
//! ```text
//! page.html ──parse──► tree ──expand──► resolved tree ──dedupe scripts──► Vec<Node>
//!                                │
//!             <include src=..>   │   <x-card ..>
//!                                ▼
//!                      fragment(path) ◄──► CompilationCache
//!                      (recursive, cycle-guarded)
//! ```
//!
//! # References
//!
//! | Markup                          | Target                              |
//! |---------------------------------|-------------------------------------|
//! | `<include src="nav.html">`      | resolved against the document's dir |
//! | `<include src="/parts/x.md">`   | resolved against the base folder    |
//! | `<x-card title="..">..</x-card>`| `<components>/card.html` or `.md`   |
//!
//! Instance attributes become `data-prop-*` attributes on the fragment's
//! top-level elements, and instance children replace `<slot>` elements.

pub mod assets;
pub mod cache;
pub mod document;
pub mod error;
pub mod links;
pub mod markdown;
pub mod pages;
pub mod reload;
pub mod resolve;
pub mod scripts;

use crate::debug;
use crate::log;
use crate::utils::html::{self, Element, Node, walk_elements};
use cache::{Claim, CompilationCache, Fragment};
use document::{Document, FsReader, SourceReader};
use error::CompileError;
use markdown::FrontMatter;
use quick_xml::escape::escape;
use resolve::{PathResolver, Reference};
use scripts::{ComponentScriptRegistry, stamp_instance, strip_component_scripts, tag_scripts};
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Prefix of custom-element component tags.
const COMPONENT_PREFIX: &str = "x-";
/// Prefix of attributes carrying instance properties.
const PROP_PREFIX: &str = "data-prop-";

// ============================================================================
// Page scope
// ============================================================================

/// State owned by one top-level page compile.
#[derive(Debug, Default)]
pub struct PageScope {
    /// Documents currently being compiled, outermost first
    ancestors: Vec<PathBuf>,
    pub scripts: ComponentScriptRegistry,
    next_instance: u32,
    /// References dropped by the cycle guard so far
    cycle_cuts: usize,
}

impl PageScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear per-page state. Call once the page has been serialized.
    pub fn reset(&mut self) {
        self.ancestors.clear();
        self.scripts.reset();
        self.next_instance = 0;
        self.cycle_cuts = 0;
    }

    fn is_ancestor(&self, path: &Path) -> bool {
        self.ancestors.iter().any(|ancestor| ancestor == path)
    }

    fn next_instance(&mut self) -> u32 {
        self.next_instance += 1;
        self.next_instance
    }
}

// ============================================================================
// Compiler
// ============================================================================

/// Recursive template compiler shared by every page of a build run.
pub struct TemplateCompiler<R = FsReader> {
    reader: R,
    resolver: PathResolver,
    components: PathBuf,
    cache: CompilationCache,
}

impl<R: SourceReader> TemplateCompiler<R> {
    /// `base` anchors root-relative references, `components` holds the
    /// sources of `<x-name>` tags.
    pub fn new(reader: R, base: &Path, components: &Path) -> Self {
        Self {
            reader,
            resolver: PathResolver::new(base),
            components: components.to_path_buf(),
            cache: CompilationCache::new(),
        }
    }

    pub fn cache(&self) -> &CompilationCache {
        &self.cache
    }

    /// Compile a top-level document to HTML (links not rewritten yet).
    #[allow(dead_code)] // Tree-level entry points are used by the build
    pub fn compile(&self, path: &Path, scope: &mut PageScope) -> Result<String, CompileError> {
        let nodes = self.compile_tree(path, scope)?;
        html::serialize(&nodes).map_err(|source| CompileError::Render {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Compile a top-level document into its resolved tree.
    pub fn compile_tree(&self, path: &Path, scope: &mut PageScope) -> Result<Vec<Node>, CompileError> {
        let doc = Document::load(&self.reader, path)?;
        let mut nodes = self.expand_document(&doc, scope)?;
        scope.scripts.retain_first_instances(&mut nodes);
        Ok(nodes)
    }

    /// Compile HTML that was already read, resolving references against `base_dir`.
    #[allow(dead_code)]
    pub fn compile_content(
        &self,
        content: &str,
        base_dir: &Path,
        scope: &mut PageScope,
    ) -> Result<Vec<Node>, CompileError> {
        let mut nodes = self.expand_source(content, base_dir, base_dir, scope)?;
        scope.scripts.retain_first_instances(&mut nodes);
        Ok(nodes)
    }

    fn expand_document(&self, doc: &Document, scope: &mut PageScope) -> Result<Vec<Node>, CompileError> {
        let path = doc.path();
        scope.ancestors.push(path.to_path_buf());
        let result = self.expand_source(doc.html(), doc.dir(), path, scope);
        scope.ancestors.pop();
        result
    }

    fn expand_source(
        &self,
        content: &str,
        dir: &Path,
        path: &Path,
        scope: &mut PageScope,
    ) -> Result<Vec<Node>, CompileError> {
        let nodes = html::parse(content).map_err(|source| CompileError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        self.expand(nodes, dir, scope)
    }

    /// Replace every reference in `nodes` with its compiled fragment.
    fn expand(&self, nodes: Vec<Node>, dir: &Path, scope: &mut PageScope) -> Result<Vec<Node>, CompileError> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            let Node::Element(mut elem) = node else {
                out.push(node);
                continue;
            };
            match self.target_of(&elem, dir) {
                Some(target) => out.extend(self.instantiate(elem, &target, dir, scope)?),
                None => {
                    elem.children = self.expand(mem::take(&mut elem.children), dir, scope)?;
                    out.push(Node::Element(elem));
                }
            }
        }
        Ok(out)
    }

    /// Source path an element refers to, if it is a reference at all.
    fn target_of(&self, elem: &Element, dir: &Path) -> Option<PathBuf> {
        if elem.is("include") {
            let Some(src) = elem.attr("src") else {
                log!("warn"; "<include> without `src` in `{}`", dir.display());
                return None;
            };
            return match self.resolver.resolve(dir, src) {
                Reference::Local(path) => Some(path),
                Reference::External => {
                    log!("warn"; "cannot include external `{src}`, left unresolved");
                    None
                }
            };
        }
        component_name(&elem.name).map(|name| self.component_path(name))
    }

    /// `<components>/NAME.html`, falling back to `NAME.md`.
    fn component_path(&self, name: &str) -> PathBuf {
        let html = self.components.join(format!("{name}.html"));
        if self.reader.exists(&html) {
            return html;
        }
        let md = self.components.join(format!("{name}.md"));
        if self.reader.exists(&md) { md } else { html }
    }

    /// Splice one component instance.
    fn instantiate(
        &self,
        mut elem: Element,
        target: &Path,
        dir: &Path,
        scope: &mut PageScope,
    ) -> Result<Vec<Node>, CompileError> {
        let fragment = match self.fragment(target, scope) {
            Ok(Some(fragment)) => fragment,
            Ok(None) => return Ok(Vec::new()),
            Err(err) if err.is_not_found() => {
                log!("warn"; "missing `{}` referenced in `{}`, left unresolved", target.display(), dir.display());
                elem.children = self.expand(mem::take(&mut elem.children), dir, scope)?;
                return Ok(vec![Node::Element(elem)]);
            }
            Err(err) => return Err(err),
        };

        let mut nodes = fragment.nodes.clone();
        stamp_instance(&mut nodes, scope.next_instance());
        apply_props(&mut nodes, &fragment.metadata, &elem);

        if has_slot(&nodes) {
            let children = self.expand(mem::take(&mut elem.children), dir, scope)?;
            let fill = if children.iter().all(Node::is_blank) { None } else { Some(children.as_slice()) };
            fill_slots(&mut nodes, fill, &mut true);
        } else if !elem.children.iter().all(Node::is_blank) {
            debug!("compile"; "`{}` has no <slot>, instance content dropped", target.display());
        }
        Ok(nodes)
    }

    /// Compiled fragment for `path`, or `None` when it is already being
    /// compiled further up this page (a cycle).
    ///
    /// A fragment whose compile hit the cycle guard is shaped by the page it
    /// was reached from, so it is never cached.
    fn fragment(&self, path: &Path, scope: &mut PageScope) -> Result<Option<Arc<Fragment>>, CompileError> {
        if scope.is_ancestor(path) {
            debug!("cycle"; "`{}` includes itself, substituted nothing", path.display());
            scope.cycle_cuts += 1;
            return Ok(None);
        }

        let cacheable = match self.cache.claim(path) {
            Claim::Cached(fragment) => {
                debug!("cache"; "reusing {}", path.display());
                return Ok(Some(fragment));
            }
            Claim::Busy => false,
            Claim::Claimed => true,
        };

        let cuts_before = scope.cycle_cuts;
        match self.compile_fragment(path, scope) {
            Ok(fragment) => {
                let fragment = Arc::new(fragment);
                if cacheable && scope.cycle_cuts == cuts_before {
                    self.cache.finish(path, Arc::clone(&fragment));
                } else if cacheable {
                    self.cache.abandon(path);
                }
                Ok(Some(fragment))
            }
            Err(err) => {
                if cacheable {
                    self.cache.abandon(path);
                }
                Err(err)
            }
        }
    }

    fn compile_fragment(&self, path: &Path, scope: &mut PageScope) -> Result<Fragment, CompileError> {
        debug!("compile"; "{}", path.display());
        let doc = Document::load(&self.reader, path)?;
        let mut nodes = self.expand_document(&doc, scope)?;

        // Nested instances are deduplicated inside the fragment; the
        // fragment's own scripts are attributed to it afterwards.
        ComponentScriptRegistry::new().retain_first_instances(&mut nodes);
        tag_scripts(&mut nodes, &Arc::from(path));

        let metadata = match doc {
            Document::Markdown { metadata, .. } => metadata,
            Document::Html { .. } => FrontMatter::new(),
        };
        Ok(Fragment { nodes, metadata })
    }
}

// ============================================================================
// Instance helpers
// ============================================================================

/// `x-card` -> `card`
fn component_name(tag: &str) -> Option<&str> {
    let prefix = tag.get(..COMPONENT_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(COMPONENT_PREFIX) {
        return None;
    }
    Some(&tag[COMPONENT_PREFIX.len()..]).filter(|name| !name.is_empty())
}

fn is_attr_name(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
}

/// Carry front matter and instance attributes onto the fragment's
/// top-level elements. Instance attributes win over front matter.
fn apply_props(nodes: &mut [Node], metadata: &FrontMatter, instance: &Element) {
    let from_metadata = metadata
        .iter()
        .filter(|(key, _)| is_attr_name(key))
        .map(|(key, value)| (key.as_str(), escape(value.as_str()).into_owned()));
    let from_instance = instance
        .attrs
        .iter()
        .filter(|(key, _)| !(instance.is("include") && key.eq_ignore_ascii_case("src")))
        .map(|(key, value)| (key.as_str(), value.clone()));
    let props: Vec<(String, String)> = from_metadata
        .chain(from_instance)
        .map(|(key, value)| (format!("{PROP_PREFIX}{key}"), value))
        .collect();

    if props.is_empty() {
        return;
    }
    for elem in nodes.iter_mut().filter_map(Node::as_element_mut) {
        for (key, value) in &props {
            elem.set_attr(key, value.clone());
        }
    }
}

fn has_slot(nodes: &[Node]) -> bool {
    let mut found = false;
    walk_elements(nodes, &mut |elem| found |= elem.is("slot"));
    found
}

/// Replace `<slot>` elements with instance content, or with their own
/// fallback content when the instance has none. Only the first slot keeps
/// component scripts from the instance content.
fn fill_slots(nodes: &mut Vec<Node>, content: Option<&[Node]>, first: &mut bool) {
    for node in mem::take(nodes) {
        match node {
            Node::Element(slot) if slot.is("slot") => match content {
                Some(content) => {
                    let mut copy = content.to_vec();
                    if !mem::replace(first, false) {
                        strip_component_scripts(&mut copy);
                    }
                    nodes.extend(copy);
                }
                None => nodes.extend(slot.children),
            },
            Node::Element(mut elem) => {
                fill_slots(&mut elem.children, content, first);
                nodes.push(Node::Element(elem));
            }
            other => nodes.push(other),
        }
    }
}
