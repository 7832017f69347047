//! Live-reload script injection for development builds.

use crate::utils::html::{Element, Node, walk_elements};
use quick_xml::escape::escape;

/// Append `<script src="SRC"></script>` to the last `<body>`, or to the end
/// of the document when there is none. Returns `false` if a script with the
/// same `src` is already present.
pub fn inject(nodes: &mut Vec<Node>, src: &str) -> bool {
    let src = escape(src);
    let mut present = false;
    walk_elements(nodes, &mut |elem| {
        present |= elem.is("script") && elem.attr("src") == Some(src.as_ref());
    });
    if present {
        return false;
    }

    let mut script = Element::new("script");
    script.set_attr("src", src.into_owned());

    let script = Node::Element(script);
    match last_body_path(nodes).and_then(|path| element_at(nodes, &path)) {
        Some(body) => body.children.push(script),
        None => nodes.push(script),
    }
    true
}

/// Child indices leading to the last `<body>` in document order.
fn last_body_path(nodes: &[Node]) -> Option<Vec<usize>> {
    nodes.iter().enumerate().rev().find_map(|(index, node)| {
        let elem = node.as_element()?;
        if let Some(mut path) = last_body_path(&elem.children) {
            path.insert(0, index);
            return Some(path);
        }
        elem.is("body").then(|| vec![index])
    })
}

fn element_at<'a>(nodes: &'a mut [Node], path: &[usize]) -> Option<&'a mut Element> {
    let (first, rest) = path.split_first()?;
    let elem = nodes.get_mut(*first)?.as_element_mut()?;
    if rest.is_empty() { Some(elem) } else { element_at(&mut elem.children, rest) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::html::{parse, serialize};

    fn injected(html: &str) -> String {
        let mut nodes = parse(html).unwrap();
        inject(&mut nodes, "/__quilt/reload.js");
        serialize(&nodes).unwrap()
    }

    #[test]
    fn test_appended_to_body() {
        assert_eq!(
            injected("<html><body><p>x</p></body></html>"),
            r#"<html><body><p>x</p><script src="/__quilt/reload.js"></script></body></html>"#
        );
    }

    #[test]
    fn test_appended_to_document_without_body() {
        assert_eq!(injected("<p>x</p>"), r#"<p>x</p><script src="/__quilt/reload.js"></script>"#);
    }

    #[test]
    fn test_last_body_wins() {
        let html = injected("<body>a</body><div><body>b</body></div>");
        assert_eq!(html, r#"<body>a</body><div><body>b<script src="/__quilt/reload.js"></script></body></div>"#);
    }

    #[test]
    fn test_not_injected_twice() {
        let once = injected("<body></body>");
        assert_eq!(injected(&once), once);
    }
}
