//! Generic XML codec for Acumulus messages.
//!
//! Acumulus messages are plain element trees without attributes or
//! namespaces, so they map directly onto JSON values: objects become child
//! elements, arrays become repeated elements.

use std::io::Cursor;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::core::{AcumulusError, round_half_up};

fn xml_io(e: std::io::Error) -> AcumulusError {
    AcumulusError::Xml(format!("write error: {e}"))
}

/// Event based XML writer over an in-memory buffer.
pub struct XmlWriter {
    writer: Writer<Cursor<Vec<u8>>>,
}

impl XmlWriter {
    /// Writer with an XML declaration. `pretty` indents by 2 spaces.
    pub fn new(pretty: bool) -> Result<Self, AcumulusError> {
        let buffer = Cursor::new(Vec::new());
        let mut writer = if pretty {
            Writer::new_with_indent(buffer, b' ', 2)
        } else {
            Writer::new(buffer)
        };
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_io)?;
        Ok(Self { writer })
    }

    pub fn into_string(self) -> Result<String, AcumulusError> {
        let buf = self.writer.into_inner().into_inner();
        String::from_utf8(buf).map_err(|e| AcumulusError::Xml(format!("UTF-8 error: {e}")))
    }

    pub fn start_element(&mut self, name: &str) -> Result<&mut Self, AcumulusError> {
        self.writer
            .write_event(Event::Start(BytesStart::new(name)))
            .map_err(xml_io)?;
        Ok(self)
    }

    pub fn end_element(&mut self, name: &str) -> Result<&mut Self, AcumulusError> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(xml_io)?;
        Ok(self)
    }

    pub fn text_element(&mut self, name: &str, text: &str) -> Result<&mut Self, AcumulusError> {
        self.start_element(name)?;
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(xml_io)?;
        self.end_element(name)
    }

    fn value(&mut self, name: &str, value: &Value) -> Result<(), AcumulusError> {
        match value {
            Value::Null => {}
            Value::Object(map) => {
                self.start_element(name)?;
                for (key, child) in map {
                    self.value(key, child)?;
                }
                self.end_element(name)?;
            }
            Value::Array(items) => {
                for item in items {
                    self.value(name, item)?;
                }
            }
            Value::Bool(b) => {
                self.text_element(name, if *b { "1" } else { "0" })?;
            }
            Value::Number(n) => {
                self.text_element(name, &n.to_string())?;
            }
            Value::String(s) => {
                self.text_element(name, s)?;
            }
        }
        Ok(())
    }
}

/// Serialize `value` as the content of a `root` element.
pub fn value_to_xml(root: &str, value: &Value, pretty: bool) -> Result<String, AcumulusError> {
    let mut w = XmlWriter::new(pretty)?;
    match value {
        Value::Object(_) => w.value(root, value)?,
        Value::Null => {
            w.start_element(root)?.end_element(root)?;
        }
        other => {
            w.start_element(root)?;
            w.value("value", other)?;
            w.end_element(root)?;
        }
    }
    w.into_string()
}

struct Frame {
    name: String,
    children: Map<String, Value>,
    text: String,
}

impl Frame {
    fn new(name: String) -> Self {
        Self {
            name,
            children: Map::new(),
            text: String::new(),
        }
    }

    fn into_value(self) -> (String, Value) {
        let value = if self.children.is_empty() {
            Value::String(self.text)
        } else {
            Value::Object(self.children)
        };
        (self.name, value)
    }

    /// Add a child; a repeated name turns into an array.
    fn insert(&mut self, name: String, value: Value) {
        match self.children.get_mut(&name) {
            None => {
                self.children.insert(name, value);
            }
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
        }
    }
}

fn element_name(name: &[u8]) -> Result<String, AcumulusError> {
    std::str::from_utf8(name)
        .map(str::to_string)
        .map_err(|e| AcumulusError::Xml(format!("element name is not UTF-8: {e}")))
}

/// Parse an XML document into the value of its root element.
///
/// Elements with children become objects, repeated names become arrays,
/// text-only elements become strings and empty elements become `""`.
/// Attributes are ignored.
pub fn xml_to_value(xml: &str) -> Result<Value, AcumulusError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Frame> = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => stack.push(Frame::new(element_name(e.name().as_ref())?)),
            Ok(Event::Empty(ref e)) => {
                let name = element_name(e.name().as_ref())?;
                match stack.last_mut() {
                    Some(parent) => parent.insert(name, Value::String(String::new())),
                    None => return Ok(Value::String(String::new())),
                }
            }
            Ok(Event::Text(ref e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| AcumulusError::Xml(format!("invalid text: {err}")))?;
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&text);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::End(_)) => {
                let Some(frame) = stack.pop() else {
                    return Err(AcumulusError::Xml("unbalanced end element".into()));
                };
                let (name, value) = frame.into_value();
                match stack.last_mut() {
                    Some(parent) => parent.insert(name, value),
                    None => return Ok(value),
                }
            }
            Ok(Event::Eof) => {
                return Err(AcumulusError::Xml(if stack.is_empty() {
                    "document has no root element".into()
                } else {
                    "unexpected end of document".into()
                }));
            }
            Err(e) => return Err(AcumulusError::Xml(format!("parse error: {e}"))),
            _ => {}
        }
    }
}

/// Format an amount for the wire: rounded to 4 decimals, at least 2 shown.
pub fn format_amount(amount: Decimal) -> String {
    let s = round_half_up(amount, 4).normalize().to_string();
    match s.find('.') {
        Some(dot) if s.len() - dot - 1 >= 2 => s,
        Some(dot) => format!("{s}{}", "0".repeat(2 - (s.len() - dot - 1))),
        None => format!("{s}.00"),
    }
}
