use super::HtmlError;
use super::node::{Element, Node, is_void};
use quick_xml::{
    Writer,
    events::{BytesCData, BytesEnd, BytesPI, BytesStart, BytesText, Event, attributes::Attribute},
    name::QName,
};
use std::borrow::Cow;
use std::io::Cursor;

pub type HtmlWriter = Writer<Cursor<Vec<u8>>>;

/// Serialize nodes back to HTML. Raw payloads are written verbatim.
pub fn serialize(nodes: &[Node]) -> Result<String, HtmlError> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    write_nodes(&mut writer, nodes)?;
    let bytes = writer.into_inner().into_inner();
    Ok(String::from_utf8(bytes)?)
}

fn write_nodes(writer: &mut HtmlWriter, nodes: &[Node]) -> Result<(), HtmlError> {
    for node in nodes {
        match node {
            Node::Element(elem) => write_element(writer, elem)?,
            Node::Text(text) => writer.write_event(Event::Text(BytesText::from_escaped(text.as_str())))?,
            Node::Comment(text) => {
                writer.write_event(Event::Comment(BytesText::from_escaped(text.as_str())))?;
            }
            Node::Doctype(text) => {
                writer.write_event(Event::DocType(BytesText::from_escaped(text.as_str())))?;
            }
            Node::Instruction(text) => writer.write_event(Event::PI(BytesPI::new(text.as_str())))?,
            Node::CData(text) => writer.write_event(Event::CData(BytesCData::new(text.as_str())))?,
        }
    }
    Ok(())
}

fn write_element(writer: &mut HtmlWriter, elem: &Element) -> Result<(), HtmlError> {
    let mut start = BytesStart::new(elem.name.as_str());
    for (key, value) in &elem.attrs {
        // Constructed directly so the raw value is not escaped a second time.
        // Values read from single-quoted attributes may hold `"`.
        let value = if value.contains('"') {
            Cow::Owned(value.replace('"', "&quot;").into_bytes())
        } else {
            Cow::Borrowed(value.as_bytes())
        };
        start.push_attribute(Attribute {
            key: QName(key.as_bytes()),
            value,
        });
    }

    if elem.self_closing && elem.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    if is_void(&elem.name) {
        return Ok(());
    }
    write_nodes(writer, &elem.children)?;
    writer.write_event(Event::End(BytesEnd::new(elem.name.as_str())))?;
    Ok(())
}
