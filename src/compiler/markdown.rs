//! Markdown ingestion: front matter + body rendering.
//!
//! Templating expressions (`{{ ... }}`) must reach the output untouched, so
//! rendering tracks how many expressions are open over the event stream and
//! emits events verbatim while any is open.
//!
//! ```text
//! ---
//! title: Hello        ──► metadata { "title": "Hello" }
//! ---
//! Some *body*         ──► <p>Some <em>body</em></p>
//! ```

use pulldown_cmark::{Event, Options, Parser, Tag, html};
use serde_yaml::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Flat front matter: keys to scalar values rendered as strings.
pub type FrontMatter = BTreeMap<String, String>;

const OPEN_MARKER: &str = "{{";
const CLOSE_MARKER: &str = "}}";

#[derive(Debug, Error)]
pub enum FrontMatterError {
    #[error("front matter is not valid yaml")]
    Yaml(#[from] serde_yaml::Error),

    #[error("front matter must be a key/value mapping")]
    NotAMapping,
}

/// A converted Markdown document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ingested {
    pub metadata: FrontMatter,
    pub html: String,
}

/// Split front matter from the body and render the body to HTML.
pub fn ingest(raw: &str) -> Result<Ingested, FrontMatterError> {
    let (front, body) = split_front_matter(raw);
    let metadata = match front {
        Some(yaml) => parse_front_matter(yaml)?,
        None => FrontMatter::new(),
    };
    Ok(Ingested {
        metadata,
        html: render(body),
    })
}

/// Split a leading `---` delimited block from the body.
///
/// The block must start on the first line and end with a line holding only
/// `---` or `...`. Without a closing line the whole input is body.
pub fn split_front_matter(raw: &str) -> (Option<&str>, &str) {
    let content = raw.strip_prefix('\u{feff}').unwrap_or(raw);

    let Some(first_line_end) = content.find('\n') else {
        return (None, raw);
    };
    if content[..first_line_end].trim_end() != "---" {
        return (None, raw);
    }

    let block_start = first_line_end + 1;
    let mut line_start = block_start;
    while line_start <= content.len() {
        let line_end = content[line_start..]
            .find('\n')
            .map_or(content.len(), |pos| line_start + pos);
        let line = content[line_start..line_end].trim_end();
        if line == "---" || line == "..." {
            let body_start = (line_end + 1).min(content.len());
            return (Some(&content[block_start..line_start]), &content[body_start..]);
        }
        if line_end == content.len() {
            break;
        }
        line_start = line_end + 1;
    }

    (None, raw)
}

fn parse_front_matter(yaml: &str) -> Result<FrontMatter, FrontMatterError> {
    if yaml.trim().is_empty() {
        return Ok(FrontMatter::new());
    }
    let value: Value = serde_yaml::from_str(yaml)?;
    let mapping = match value {
        Value::Mapping(mapping) => mapping,
        Value::Null => return Ok(FrontMatter::new()),
        _ => return Err(FrontMatterError::NotAMapping),
    };

    // Nested sequences/mappings have no flat representation and are dropped
    Ok(mapping
        .into_iter()
        .filter_map(|(key, value)| Some((scalar_to_string(key)?, scalar_to_string(value)?)))
        .collect())
}

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null => Some(String::new()),
        Value::Tagged(tagged) => scalar_to_string(tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

fn markdown_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

/// Render a Markdown body to HTML, shielding templating expressions.
///
/// Every event that carries source text (container starts and leaves) is
/// checked against the raw source it came from: a `{{` opens an expression,
/// a `}}` closes one. While at least one expression is open, events are
/// emitted as their raw source. A verbatim container swallows its children,
/// since its raw text already covers them. Unbalanced markers at the end of
/// the document are not an error.
pub fn render(body: &str) -> String {
    let parser = Parser::new_ext(body, markdown_options()).into_offset_iter();

    let mut open_expressions = 0usize;
    // Depth inside a container that was emitted verbatim
    let mut verbatim_depth = 0usize;
    let mut events = Vec::new();

    for (event, range) in parser {
        if verbatim_depth > 0 {
            match event {
                Event::Start(_) => verbatim_depth += 1,
                Event::End(_) => verbatim_depth -= 1,
                _ => {}
            }
            continue;
        }

        if matches!(event, Event::End(_)) {
            events.push(event);
            continue;
        }

        let raw = &body[range];
        if raw.contains(OPEN_MARKER) {
            open_expressions += 1;
        }
        if raw.contains(CLOSE_MARKER) {
            open_expressions = open_expressions.saturating_sub(1);
        }

        if open_expressions == 0 {
            events.push(event);
            continue;
        }

        match event {
            Event::Start(tag) => {
                verbatim_depth = 1;
                if is_inline(&tag) {
                    events.push(Event::InlineHtml(raw.into()));
                } else {
                    let mut block = raw.to_owned();
                    if !block.ends_with('\n') {
                        block.push('\n');
                    }
                    events.push(Event::Html(block.into()));
                }
            }
            _ => events.push(Event::InlineHtml(raw.into())),
        }
    }

    let mut output = String::with_capacity(body.len() * 3 / 2);
    html::push_html(&mut output, events.into_iter());
    output
}

#[inline]
fn is_inline(tag: &Tag<'_>) -> bool {
    matches!(
        tag,
        Tag::Emphasis
            | Tag::Strong
            | Tag::Strikethrough
            | Tag::Superscript
            | Tag::Subscript
            | Tag::Link { .. }
            | Tag::Image { .. }
    )
}
