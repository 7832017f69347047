//! Hyperlink rewriting for the output layout.
//!
//! # Link Type Detection
//!
//! | Input `href`            | Output                | Note                       |
//! |-------------------------|-----------------------|----------------------------|
//! | `pages/about.html`      | `/about.html`         | pages segment stripped     |
//! | `blog/post.html?x#top`  | `/blog/post.html?x#top` | query/fragment kept      |
//! | `/about.html`           | `/about.html`         | already root-relative      |
//! | `#team`                 | `#team`               | same-page fragment         |
//! | `https://example.com`   | `https://example.com` | external                   |
//! | `{{ post.url }}`        | `{{ post.url }}`      | templating expression      |
//!
//! Every anchor except fragment and external links also gets its `class`
//! whitespace collapsed, whether or not its `href` changed.

use super::resolve::{is_external_link, normalize};
use crate::utils::html::{Element, Node, walk_elements_mut};
use crate::log;
use regex::Regex;
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static RE_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Source paths of the internal links found while rewriting one page.
pub type LinkInventory = FxHashSet<PathBuf>;

#[derive(Debug, Clone, Copy)]
pub struct LinkRewriter<'a> {
    base: &'a Path,
    pages: &'a Path,
}

impl<'a> LinkRewriter<'a> {
    /// `base` is the source base folder; `pages` is the pages directory
    /// relative to it.
    pub fn new(base: &'a Path, pages: &'a Path) -> Self {
        Self { base, pages }
    }

    /// Rewrite every `<a href>` in `nodes` in place.
    pub fn rewrite(&self, nodes: &mut [Node]) -> LinkInventory {
        let mut inventory = LinkInventory::default();
        walk_elements_mut(nodes, &mut |elem| {
            if elem.is("a") {
                self.rewrite_anchor(elem, &mut inventory);
            }
        });
        inventory
    }

    fn rewrite_anchor(&self, elem: &mut Element, inventory: &mut LinkInventory) {
        let Some(href) = elem.attr("href") else {
            return;
        };
        let href = href.trim();
        if href.starts_with('#') || is_external_link(href) {
            return;
        }

        if let Some((url, target)) = self.rewrite_href(href) {
            elem.set_attr("href", url);
            inventory.insert(target);
        }
        if let Some(class) = elem.attr("class") {
            let class = normalize_class(class);
            elem.set_attr("class", class);
        }
    }

    /// Output URL and decoded source path for `href`, or `None` to keep it.
    pub fn rewrite_href(&self, href: &str) -> Option<(String, PathBuf)> {
        let href = href.trim();
        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with('/')
            || href.contains("{{")
            || is_external_link(href)
        {
            return None;
        }

        let split = href.find(['?', '#']).unwrap_or(href.len());
        let (path, suffix) = href.split_at(split);

        let resolved = normalize(&self.base.join(path));
        let Ok(relative) = resolved.strip_prefix(self.base) else {
            log!("warn"; "link `{href}` points outside `{}`, left unchanged", self.base.display());
            return None;
        };
        let relative = relative.strip_prefix(self.pages).unwrap_or(relative);

        let mut url = String::with_capacity(href.len() + 1);
        url.push('/');
        url.push_str(&relative.to_string_lossy().replace('\\', "/"));
        url.push_str(suffix);

        let decoded = urlencoding::decode(path).map_or_else(|_| path.into(), |d| d);
        let target = normalize(&self.base.join(decoded.as_ref()));
        Some((url, target))
    }
}

/// Collapse whitespace runs in a class list into single spaces.
#[inline]
pub fn normalize_class(class: &str) -> String {
    RE_WHITESPACE.replace_all(class, " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::html::{parse, serialize};

    fn rewrite_html(html: &str) -> (String, LinkInventory) {
        let base = Path::new("/site/src");
        let pages = Path::new("pages");
        let mut nodes = parse(html).unwrap();
        let inventory = LinkRewriter::new(base, pages).rewrite(&mut nodes);
        (serialize(&nodes).unwrap(), inventory)
    }

    #[test]
    fn test_pages_segment_stripped_and_class_normalized() {
        let (html, inventory) = rewrite_html("<a href=\"pages/about.html\" class=\"a\n  b\n c\">About</a>");
        assert_eq!(html, r#"<a href="/about.html" class="a b c">About</a>"#);
        assert!(inventory.contains(Path::new("/site/src/pages/about.html")));
    }

    #[test]
    fn test_rewriting_is_idempotent() {
        let (once, _) = rewrite_html(r#"<a href="pages/blog/post.html">x</a>"#);
        let (twice, inventory) = rewrite_html(&once);
        assert_eq!(once, twice);
        assert!(inventory.is_empty());
    }

    #[test]
    fn test_fragment_and_external_links_untouched() {
        for href in ["#", "#top", "https://example.com/a", "//cdn.example.com/x", "mailto:a@b.c"] {
            let src = format!("<a href=\"{href}\" class=\"x\n  y\">l</a>");
            let (html, inventory) = rewrite_html(&src);
            assert_eq!(html, src, "{href}");
            assert!(inventory.is_empty());
        }
    }

    #[test]
    fn test_kept_href_still_normalizes_class() {
        for href in ["/about.html", "", "{{ post.url }}"] {
            let (html, inventory) = rewrite_html(&format!("<a href=\"{href}\" class=\"a\n  b\n c\">x</a>"));
            assert_eq!(html, format!(r#"<a href="{href}" class="a b c">x</a>"#), "{href}");
            assert!(inventory.is_empty());
        }
    }

    #[test]
    fn test_query_and_fragment_kept() {
        let rewriter = LinkRewriter::new(Path::new("/site/src"), Path::new("pages"));
        let (url, target) = rewriter.rewrite_href("pages/post.html?ref=1#intro").unwrap();
        assert_eq!(url, "/post.html?ref=1#intro");
        assert_eq!(target, PathBuf::from("/site/src/pages/post.html"));
    }

    #[test]
    fn test_non_page_links_keep_their_path() {
        let rewriter = LinkRewriter::new(Path::new("/site/src"), Path::new("pages"));
        let (url, _) = rewriter.rewrite_href("./static/doc.pdf").unwrap();
        assert_eq!(url, "/static/doc.pdf");
    }

    #[test]
    fn test_percent_encoded_target_decoded() {
        let rewriter = LinkRewriter::new(Path::new("/site/src"), Path::new("pages"));
        let (url, target) = rewriter.rewrite_href("pages/my%20notes.html").unwrap();
        assert_eq!(url, "/my%20notes.html");
        assert_eq!(target, PathBuf::from("/site/src/pages/my notes.html"));
    }

    #[test]
    fn test_escaping_link_left_unchanged() {
        let rewriter = LinkRewriter::new(Path::new("/site/src"), Path::new("pages"));
        assert!(rewriter.rewrite_href("../../etc/passwd").is_none());
    }

    #[test]
    fn test_normalize_class() {
        assert_eq!(normalize_class("a\n\t b"), "a b");
        assert_eq!(normalize_class(" a "), " a ");
    }
}
