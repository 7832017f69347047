use std::path::Path;
use std::sync::Arc;

/// Elements that never have children or an end tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose content is raw text, not markup.
pub const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

#[inline]
pub fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name))
}

#[inline]
pub fn is_raw_text(name: &str) -> bool {
    RAW_TEXT_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name))
}

/// A node of a parsed HTML document.
///
/// Text, comment and attribute payloads are stored in their raw source form
/// (entities still escaped), so serializing an untouched tree reproduces the
/// input markup.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
    Doctype(String),
    /// `<?...?>` declarations and processing instructions
    Instruction(String),
    CData(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    /// `(key, raw value)` pairs in source order
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
    /// Written as `<name/>` in the source
    pub self_closing: bool,
    /// Component instance the element was spliced in from. Never serialized.
    pub origin: Option<Origin>,
}

/// Identifies which component, and which instance of it, produced an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub component: Arc<Path>,
    pub instance: u32,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
            self_closing: false,
            origin: None,
        }
    }

    #[inline]
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Raw value of the first attribute named `key`.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Set a raw (already escaped) attribute value, replacing any existing one.
    pub fn set_attr(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(key)) {
            Some((_, v)) => *v = value,
            None => self.attrs.push((key.to_owned(), value)),
        }
    }
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(elem) => Some(elem),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(elem) => Some(elem),
            _ => None,
        }
    }

    /// True for text nodes made only of whitespace.
    pub fn is_blank(&self) -> bool {
        matches!(self, Node::Text(text) if text.trim().is_empty())
    }
}

/// Visit every element in document order (parents before children).
pub fn walk_elements<'a>(nodes: &'a [Node], f: &mut impl FnMut(&'a Element)) {
    for node in nodes {
        if let Node::Element(elem) = node {
            f(elem);
            walk_elements(&elem.children, f);
        }
    }
}

/// Mutable counterpart of [`walk_elements`].
pub fn walk_elements_mut(nodes: &mut [Node], f: &mut impl FnMut(&mut Element)) {
    for node in nodes {
        if let Node::Element(elem) = node {
            f(elem);
            walk_elements_mut(&mut elem.children, f);
        }
    }
}
