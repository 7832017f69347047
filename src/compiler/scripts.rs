//! Per-page component script de-duplication.
//!
//! Scripts inside a component fragment carry an [`Origin`]: the component
//! they came from and the instance that spliced them. When a tree is fully
//! resolved, the registry walks it in document order and keeps only the
//! scripts of the first instance of each component. Scripts without an
//! origin belong to the page itself and are always kept.

use crate::utils::html::{Node, Origin, walk_elements_mut};
use rustc_hash::FxHashMap;
use std::path::Path;
use std::sync::Arc;

/// Tracks which component scripts a page already emits.
///
/// One registry belongs to one top-level page compile. It must be
/// [`reset`](Self::reset) once that page is serialized and never shared
/// between pages compiled concurrently.
#[derive(Debug, Default)]
pub struct ComponentScriptRegistry {
    /// component -> instance whose scripts are emitted
    emitted: FxHashMap<Arc<Path>, u32>,
}

impl ComponentScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_emitted(&self, component: &Path) -> bool {
        self.emitted.contains_key(component)
    }

    /// Record `origin` as the emitting instance unless one is recorded already.
    pub fn mark_emitted(&mut self, origin: &Origin) {
        self.emitted
            .entry(Arc::clone(&origin.component))
            .or_insert(origin.instance);
    }

    pub fn reset(&mut self) {
        self.emitted.clear();
    }

    /// Whether a script from `origin` should be kept.
    fn admits(&mut self, origin: &Origin) -> bool {
        if !self.has_emitted(&origin.component) {
            self.mark_emitted(origin);
        }
        self.emitted.get(&*origin.component) == Some(&origin.instance)
    }

    /// Drop component scripts of every instance but the first, in document order.
    pub fn retain_first_instances(&mut self, nodes: &mut Vec<Node>) {
        nodes.retain_mut(|node| {
            let Node::Element(elem) = node else {
                return true;
            };
            if elem.is("script") {
                return elem.origin.as_ref().is_none_or(|origin| self.admits(origin));
            }
            self.retain_first_instances(&mut elem.children);
            true
        });
    }
}

/// Mark scripts authored in `component` itself as belonging to it.
pub fn tag_scripts(nodes: &mut [Node], component: &Arc<Path>) {
    walk_elements_mut(nodes, &mut |elem| {
        if elem.is("script") && elem.origin.is_none() {
            elem.origin = Some(Origin {
                component: Arc::clone(component),
                instance: 0,
            });
        }
    });
}

/// Attribute every component script in a freshly spliced copy to `instance`.
pub fn stamp_instance(nodes: &mut [Node], instance: u32) {
    walk_elements_mut(nodes, &mut |elem| {
        if let Some(origin) = elem.origin.as_mut() {
            origin.instance = instance;
        }
    });
}

/// Remove every component script, keeping page-authored ones.
pub fn strip_component_scripts(nodes: &mut Vec<Node>) {
    nodes.retain_mut(|node| match node {
        Node::Element(elem) if elem.is("script") => elem.origin.is_none(),
        Node::Element(elem) => {
            strip_component_scripts(&mut elem.children);
            true
        }
        _ => true,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::html::{Element, walk_elements};

    fn script(component: &str, instance: u32, body: &str) -> Node {
        let mut elem = Element::new("script");
        elem.children.push(Node::Text(body.into()));
        elem.origin = Some(Origin {
            component: Arc::from(Path::new(component)),
            instance,
        });
        Node::Element(elem)
    }

    fn wrap(children: Vec<Node>) -> Node {
        let mut div = Element::new("div");
        div.children = children;
        Node::Element(div)
    }

    fn script_bodies(nodes: &[Node]) -> Vec<String> {
        let mut bodies = Vec::new();
        walk_elements(nodes, &mut |elem| {
            if elem.is("script")
                && let Some(Node::Text(text)) = elem.children.first()
            {
                bodies.push(text.clone());
            }
        });
        bodies
    }

    #[test]
    fn test_three_instances_emit_once() {
        let mut nodes = vec![
            wrap(vec![script("/c/card.html", 1, "card")]),
            wrap(vec![script("/c/card.html", 2, "card")]),
            wrap(vec![script("/c/card.html", 3, "card")]),
        ];
        let mut registry = ComponentScriptRegistry::new();
        registry.retain_first_instances(&mut nodes);
        assert_eq!(script_bodies(&nodes), ["card"]);
        assert!(registry.has_emitted(Path::new("/c/card.html")));
    }

    #[test]
    fn test_distinct_components_emit_each() {
        let mut nodes = vec![
            script("/c/card.html", 1, "card"),
            script("/c/nav.html", 2, "nav"),
            script("/c/card.html", 3, "card"),
        ];
        ComponentScriptRegistry::new().retain_first_instances(&mut nodes);
        assert_eq!(script_bodies(&nodes), ["card", "nav"]);
    }

    #[test]
    fn test_first_instance_keeps_all_its_scripts() {
        let mut nodes = vec![
            wrap(vec![script("/c/chart.html", 1, "lib"), script("/c/chart.html", 1, "init")]),
            wrap(vec![script("/c/chart.html", 2, "lib"), script("/c/chart.html", 2, "init")]),
        ];
        ComponentScriptRegistry::new().retain_first_instances(&mut nodes);
        assert_eq!(script_bodies(&nodes), ["lib", "init"]);
    }

    #[test]
    fn test_page_scripts_never_deduplicated() {
        let mut page = Element::new("script");
        page.children.push(Node::Text("page".into()));
        let mut nodes = vec![Node::Element(page.clone()), Node::Element(page)];
        ComponentScriptRegistry::new().retain_first_instances(&mut nodes);
        assert_eq!(script_bodies(&nodes), ["page", "page"]);
    }

    #[test]
    fn test_reset_between_pages() {
        let mut registry = ComponentScriptRegistry::new();

        let mut first = vec![script("/c/card.html", 1, "card")];
        registry.retain_first_instances(&mut first);
        registry.reset();
        assert!(!registry.has_emitted(Path::new("/c/card.html")));

        let mut second = vec![script("/c/card.html", 1, "card")];
        registry.retain_first_instances(&mut second);
        assert_eq!(script_bodies(&second), ["card"]);
    }

    #[test]
    fn test_tag_and_stamp() {
        let component: Arc<Path> = Arc::from(Path::new("/c/x.html"));
        let mut nodes = vec![wrap(vec![Node::Element(Element::new("script"))])];
        tag_scripts(&mut nodes, &component);
        stamp_instance(&mut nodes, 7);

        let mut origins = Vec::new();
        walk_elements(&nodes, &mut |elem| origins.extend(elem.origin.clone()));
        assert_eq!(origins, [Origin { component, instance: 7 }]);

        strip_component_scripts(&mut nodes);
        assert_eq!(nodes.len(), 1);
        assert!(nodes[0].as_element().unwrap().children.is_empty());
    }
}
