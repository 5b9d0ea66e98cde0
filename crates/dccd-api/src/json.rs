//! XML to JSON conversion for content negotiation.
//!
//! Clients asking for `application/json` get a structural translation of
//! the XML response: elements become objects, repeated sibling elements
//! become arrays, attributes are prefixed with `@`, and text-only
//! elements collapse to strings.

use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::{Map, Value};

/// Conversion failure; the XML could not be walked.
#[derive(Debug, thiserror::Error)]
#[error("xml to json conversion error: {message}")]
pub struct JsonConversionError {
    message: String,
}

fn conversion_error(e: impl std::fmt::Display) -> JsonConversionError {
    JsonConversionError {
        message: e.to_string(),
    }
}

#[derive(Debug, Default)]
struct Node {
    name: String,
    fields: Map<String, Value>,
    text: String,
}

impl Node {
    fn into_value(self) -> (String, Value) {
        let text = self.text.trim();
        let value = if self.fields.is_empty() {
            Value::String(text.to_string())
        } else {
            let mut fields = self.fields;
            if !text.is_empty() {
                fields.insert("$".to_string(), Value::String(text.to_string()));
            }
            Value::Object(fields)
        };
        (self.name, value)
    }
}

/// Inserts `value` under `key`, turning repeated keys into an array.
fn insert_field(fields: &mut Map<String, Value>, key: String, value: Value) {
    match fields.get_mut(&key) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            fields.insert(key, value);
        }
    }
}

/// Converts an XML document to its JSON rendition.
pub fn xml_to_json(xml: &str) -> Result<Value, JsonConversionError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Node> = vec![Node::default()];

    loop {
        match reader.read_event().map_err(conversion_error)? {
            Event::Start(start) => {
                let mut node = Node {
                    name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
                    ..Default::default()
                };
                for attribute in start.attributes() {
                    let attribute = attribute.map_err(conversion_error)?;
                    let key = format!("@{}", String::from_utf8_lossy(attribute.key.as_ref()));
                    let value = attribute
                        .unescape_value()
                        .map_err(conversion_error)?
                        .into_owned();
                    node.fields.insert(key, Value::String(value));
                }
                stack.push(node);
            }
            Event::Empty(start) => {
                let mut fields = Map::new();
                for attribute in start.attributes() {
                    let attribute = attribute.map_err(conversion_error)?;
                    let key = format!("@{}", String::from_utf8_lossy(attribute.key.as_ref()));
                    let value = attribute
                        .unescape_value()
                        .map_err(conversion_error)?
                        .into_owned();
                    fields.insert(key, Value::String(value));
                }
                let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                let value = if fields.is_empty() {
                    Value::String(String::new())
                } else {
                    Value::Object(fields)
                };
                if let Some(parent) = stack.last_mut() {
                    insert_field(&mut parent.fields, name, value);
                }
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(conversion_error)?;
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&text);
                }
            }
            Event::End(_) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| conversion_error("unbalanced end tag"))?;
                let (name, value) = node.into_value();
                let parent = stack
                    .last_mut()
                    .ok_or_else(|| conversion_error("unbalanced end tag"))?;
                insert_field(&mut parent.fields, name, value);
            }
            Event::Eof => break,
            // declarations, comments, processing instructions
            _ => {}
        }
    }

    let root = stack
        .pop()
        .ok_or_else(|| conversion_error("document has no root"))?;
    Ok(Value::Object(root.fields))
}
