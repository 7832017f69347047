use super::HtmlError;
use super::node::{Element, Node, is_raw_text, is_void};
use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};
use std::borrow::Cow;

/// Lenient reader: HTML does not close void elements and may contain bare
/// `&` in text, so end-name and reference checks are relaxed.
#[inline]
fn create_html_reader(content: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(content);
    let config = reader.config_mut();
    config.trim_text(false);
    config.enable_all_checks(false);
    config.allow_dangling_amp = true;
    config.allow_unmatched_ends = true;
    reader
}

#[inline]
fn decode(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

/// Parse HTML source into a list of top-level nodes.
pub fn parse(src: &str) -> Result<Vec<Node>, HtmlError> {
    let mut builder = TreeBuilder::default();
    // Byte offset of the current reader inside `src`. The reader is restarted
    // after every raw-text element, since quick-xml would tokenize its body,
    // and after every `<` that does not open a tag.
    let mut offset = 0usize;

    'restart: loop {
        let mut reader = create_html_reader(&src[offset..]);

        loop {
            // Before a markup event the reader sits on its `<`
            let position = offset + reader.buffer_position() as usize;
            if is_bare_lt(src, position) {
                builder.push_text("<");
                offset = position + 1;
                continue 'restart;
            }

            let event = reader.read_event().map_err(|err| HtmlError::Syntax {
                position: offset + reader.error_position() as usize,
                message: err.to_string(),
            })?;

            match event {
                Event::Start(start) => {
                    let elem = element_from(&start);
                    if is_void(&elem.name) {
                        builder.push_node(Node::Element(elem));
                    } else if is_raw_text(&elem.name) {
                        let body_start = offset + reader.buffer_position() as usize;
                        offset = builder.push_raw_text_element(src, body_start, elem);
                        continue 'restart;
                    } else {
                        builder.open(elem);
                    }
                }
                Event::Empty(start) => {
                    let mut elem = element_from(&start);
                    elem.self_closing = true;
                    builder.push_node(Node::Element(elem));
                }
                Event::End(end) => {
                    let name = decode(end.name().as_ref()).into_owned();
                    if !is_void(&name) {
                        let position = offset + reader.buffer_position() as usize;
                        builder.close(&name, position)?;
                    }
                }
                Event::Text(text) => builder.push_text(&decode(&text)),
                Event::GeneralRef(reference) => {
                    builder.push_text(&format!("&{};", decode(&reference)));
                }
                Event::Comment(text) => builder.push_node(Node::Comment(decode(&text).into_owned())),
                Event::CData(text) => builder.push_node(Node::CData(decode(&text).into_owned())),
                Event::DocType(text) => builder.push_node(Node::Doctype(decode(&text).into_owned())),
                Event::Decl(decl) => {
                    builder.push_node(Node::Instruction(decode(&decl).into_owned()));
                }
                Event::PI(pi) => builder.push_node(Node::Instruction(decode(&pi).into_owned())),
                Event::Eof => break 'restart,
            }
        }
    }

    Ok(builder.finish())
}

/// A `<` that cannot open a tag is text, as in the HTML tokenizer
/// (`1 < 2`, `a <= b`, `<3`).
fn is_bare_lt(src: &str, position: usize) -> bool {
    let bytes = src.as_bytes();
    bytes.get(position) == Some(&b'<')
        && !bytes
            .get(position + 1)
            .is_some_and(|&next| next.is_ascii_alphabetic() || matches!(next, b'/' | b'!' | b'?'))
}

fn element_from(start: &BytesStart<'_>) -> Element {
    let mut elem = Element::new(decode(start.name().as_ref()).into_owned());
    elem.attrs = start
        .html_attributes()
        .flatten()
        .map(|attr| {
            (
                decode(attr.key.as_ref()).into_owned(),
                decode(attr.value.as_ref()).into_owned(),
            )
        })
        .collect();
    elem
}

/// Builds the owned tree from the flat event stream.
#[derive(Default)]
struct TreeBuilder {
    root: Vec<Node>,
    open: Vec<Element>,
}

impl TreeBuilder {
    fn push_node(&mut self, node: Node) {
        match self.open.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.root.push(node),
        }
    }

    /// Adjacent text events (split around entity references) are merged.
    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let siblings = match self.open.last_mut() {
            Some(parent) => &mut parent.children,
            None => &mut self.root,
        };
        match siblings.last_mut() {
            Some(Node::Text(prev)) => prev.push_str(text),
            _ => siblings.push(Node::Text(text.to_owned())),
        }
    }

    fn open(&mut self, elem: Element) {
        self.open.push(elem);
    }

    /// Close the innermost open element named `name`, implicitly closing
    /// anything opened after it (`<p><b>text</p>`).
    fn close(&mut self, name: &str, position: usize) -> Result<(), HtmlError> {
        let Some(index) = self.open.iter().rposition(|elem| elem.is(name)) else {
            return Err(HtmlError::UnmatchedEnd {
                name: name.to_owned(),
                position,
            });
        };
        while self.open.len() > index {
            if let Some(elem) = self.open.pop() {
                self.push_node(Node::Element(elem));
            }
        }
        Ok(())
    }

    /// Consume the body of a `<script>`/`<style>` verbatim up to its end tag.
    /// Returns the offset right after the end tag (or EOF if it is missing).
    fn push_raw_text_element(&mut self, src: &str, body_start: usize, mut elem: Element) -> usize {
        let rest = &src[body_start..];
        // ASCII lowercasing keeps byte offsets intact
        let needle = format!("</{}", elem.name.to_ascii_lowercase());
        let (body, resume) = match rest.to_ascii_lowercase().find(&needle) {
            Some(end) => {
                let after = rest[end..].find('>').map_or(rest.len(), |gt| end + gt + 1);
                (&rest[..end], body_start + after)
            }
            None => (rest, src.len()),
        };
        if !body.is_empty() {
            elem.children.push(Node::Text(body.to_owned()));
        }
        self.push_node(Node::Element(elem));
        resume
    }

    /// Elements still open at EOF are closed implicitly.
    fn finish(mut self) -> Vec<Node> {
        while let Some(elem) = self.open.pop() {
            self.push_node(Node::Element(elem));
        }
        self.root
    }
}
