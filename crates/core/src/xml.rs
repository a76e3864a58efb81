//! XML to generic mapping conversion.
//!
//! The root element's content becomes the top-level mapping, so a path for
//! `<rsp><status>ok</status></rsp>` is `["status"]`. Text-only elements become
//! strings, elements with children become mappings, attributes are stored
//! under `@name`, text mixed with children under `#text`, and repeated
//! siblings collapse into an array.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde_json::{Map, Value};

use crate::error::ExtractError;

const ATTRIBUTE_PREFIX: &str = "@";
const TEXT_KEY: &str = "#text";

struct Node {
    name: String,
    fields: Map<String, Value>,
    text: String,
}

impl Node {
    fn open(start: &BytesStart<'_>) -> Result<Self, ExtractError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut fields = Map::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| decode_error(format!("attribute error: {e}")))?;
            let key = format!(
                "{ATTRIBUTE_PREFIX}{}",
                String::from_utf8_lossy(attr.key.as_ref())
            );
            let value = attr
                .unescape_value()
                .map_err(|e| decode_error(e.to_string()))?;
            fields.insert(key, Value::String(value.into_owned()));
        }
        Ok(Self {
            name,
            fields,
            text: String::new(),
        })
    }

    fn close(self) -> (String, Value) {
        let Self {
            name,
            mut fields,
            text,
        } = self;
        if fields.is_empty() {
            return (name, Value::String(text));
        }
        if !text.is_empty() {
            fields.insert(TEXT_KEY.to_owned(), Value::String(text));
        }
        (name, Value::Object(fields))
    }
}

fn decode_error(message: String) -> ExtractError {
    ExtractError::Decode {
        format: "xml",
        message,
    }
}

fn add_child(parent: &mut Map<String, Value>, name: String, value: Value) {
    match parent.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            parent.insert(name, value);
        }
    }
}

/// Decode `body` and return the root element's content as a mapping.
pub(crate) fn decode(body: &[u8]) -> Result<Map<String, Value>, ExtractError> {
    let mut reader = Reader::from_reader(body);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<Value> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| decode_error(format!("at byte {}: {e}", reader.buffer_position())))?;

        match event {
            Event::Start(start) => {
                if root.is_some() {
                    return Err(decode_error("multiple root elements".to_owned()));
                }
                stack.push(Node::open(&start)?);
            }
            Event::Empty(start) => {
                if root.is_some() {
                    return Err(decode_error("multiple root elements".to_owned()));
                }
                let (name, value) = Node::open(&start)?.close();
                match stack.last_mut() {
                    Some(parent) => add_child(&mut parent.fields, name, value),
                    None => root = Some(value),
                }
            }
            Event::End(_) => {
                let Some(node) = stack.pop() else {
                    return Err(decode_error("unbalanced closing tag".to_owned()));
                };
                let (name, value) = node.close();
                match stack.last_mut() {
                    Some(parent) => add_child(&mut parent.fields, name, value),
                    None => root = Some(value),
                }
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| decode_error(e.to_string()))?;
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&text);
                }
            }
            Event::CData(cdata) => {
                if let Some(node) = stack.last_mut() {
                    node.text
                        .push_str(&String::from_utf8_lossy(&cdata.into_inner()));
                }
            }
            Event::Eof => break,
            Event::Decl(_) | Event::PI(_) | Event::Comment(_) | Event::DocType(_) => {}
        }
    }

    if !stack.is_empty() {
        return Err(decode_error("unexpected end of document".to_owned()));
    }

    match root {
        Some(Value::Object(fields)) => Ok(fields),
        Some(_) => Err(decode_error(
            "root element does not contain child nodes".to_owned(),
        )),
        None => Err(decode_error("no root element".to_owned())),
    }
}
