//! Minimal element tree for the annotation wire format.
//!
//! The renderer's documents are tiny and attribute-heavy, so the whole
//! document is held in memory. Reading goes through `quick_xml::Reader`,
//! writing through `quick_xml::Writer`, and the typed `query_*` helpers give
//! the decoder fault-tolerant access to single values.

use std::borrow::Cow;

use chrono::{DateTime, FixedOffset};
use quick_xml::escape::escape;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;
use tracing::warn;

use super::values::parse_date;

#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Malformed document: {0}")]
    Parse(String),

    #[error("Document has no root element")]
    MissingRoot,

    #[error("Unclosed element <{0}>")]
    Unclosed(String),

    #[error("Failed to write document: {0}")]
    Write(String),
}

impl From<XmlError> for crate::CodecError {
    fn from(err: XmlError) -> Self {
        crate::CodecError::Xml(err.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElement {
    pub name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlElement>,
    text: String,
}

impl XmlElement {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Appends an attribute. An existing attribute of the same name is
    /// removed first, so a rewritten value moves to the end.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        self.attributes.retain(|(existing, _)| existing != name);
        self.attributes.push((name.to_string(), value.into()));
    }

    pub fn set_bool_attribute(&mut self, name: &str, value: bool) {
        // The renderer only recognises lower-case booleans.
        self.set_attribute(name, if value { "true" } else { "false" });
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn push_child(&mut self, child: XmlElement) {
        self.children.push(child);
    }

    pub fn children(&self) -> &[XmlElement] {
        &self.children
    }

    /// Concatenated text of this element and all of its descendants
    pub fn inner_text(&self) -> String {
        let mut text = self.text.clone();
        for child in &self.children {
            text.push_str(&child.inner_text());
        }
        text
    }

    fn select<'a>(&'a self, steps: &[&str]) -> Option<&'a XmlElement> {
        match steps.split_first() {
            None => Some(self),
            Some((step, rest)) => self
                .children
                .iter()
                .filter(|child| child.name == *step)
                .find_map(|child| child.select(rest)),
        }
    }

    fn write<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<(), XmlError> {
        let mut content = self.name.clone();
        for (name, value) in &self.attributes {
            content.push_str(&format!(" {}=\"{}\"", name, escape(value.as_str())));
        }

        let name_len = self.name.len();
        if self.children.is_empty() && self.text.is_empty() {
            // Self-closing form as the renderer writes it: `<F_POINTS />`.
            content.push(' ');
            let start = BytesStart::from_content(content, name_len);
            return write_event(writer, Event::Empty(start));
        }

        let start = BytesStart::from_content(content, name_len);
        write_event(writer, Event::Start(start))?;
        if !self.text.is_empty() {
            write_event(writer, Event::Text(BytesText::new(&self.text)))?;
        }
        for child in &self.children {
            child.write(writer)?;
        }
        write_event(writer, Event::End(BytesEnd::new(self.name.as_str())))
    }
}

fn write_event<W: std::io::Write>(
    writer: &mut Writer<W>,
    event: Event<'_>,
) -> Result<(), XmlError> {
    writer
        .write_event(event)
        .map_err(|e| XmlError::Write(e.to_string()))
}

#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    root: XmlElement,
}

impl XmlDocument {
    pub fn new(root: XmlElement) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &XmlElement {
        &self.root
    }

    pub fn parse(source: &str) -> Result<Self, XmlError> {
        let mut reader = Reader::from_str(source);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            let event = reader.read_event().map_err(|e| {
                XmlError::Parse(format!("at byte {}: {}", reader.buffer_position(), e))
            })?;

            match event {
                Event::Start(start) => stack.push(element_from_start(&start)?),
                Event::Empty(start) => {
                    let element = element_from_start(&start)?;
                    attach(&mut stack, &mut root, element);
                }
                Event::End(_) => {
                    if let Some(element) = stack.pop() {
                        attach(&mut stack, &mut root, element);
                    }
                }
                Event::Text(text) => {
                    if let Some(current) = stack.last_mut() {
                        let value = text.unescape().map_err(|e| XmlError::Parse(e.to_string()))?;
                        current.text.push_str(&value);
                    }
                }
                Event::CData(data) => {
                    if let Some(current) = stack.last_mut() {
                        current
                            .text
                            .push_str(&String::from_utf8_lossy(&data.into_inner()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.pop() {
            return Err(XmlError::Unclosed(open.name));
        }
        root.map(XmlDocument::new).ok_or(XmlError::MissingRoot)
    }

    /// Serialises without an XML declaration or indentation
    pub fn to_bytes(&self) -> Result<Vec<u8>, XmlError> {
        let mut writer = Writer::new(Vec::new());
        self.root.write(&mut writer)?;
        Ok(writer.into_inner())
    }

    /// First element matching an absolute path such as `/FnAnno/PropDesc`
    pub fn select_single(&self, path: &str) -> Option<&XmlElement> {
        let steps: Vec<&str> = path.split('/').filter(|step| !step.is_empty()).collect();
        let (first, rest) = steps.split_first()?;
        if self.root.name != *first {
            return None;
        }
        self.root.select(rest)
    }

    pub fn query_exists(&self, path: &str) -> bool {
        self.select_single(path).is_some()
    }

    /// Inner text of the node at `path`, or empty when it is missing
    pub fn query_string(&self, path: &str) -> String {
        match self.select_single(path) {
            Some(element) => element.inner_text(),
            None => {
                warn!("No node found at {}", path);
                String::new()
            }
        }
    }

    pub fn query_string_as_integer(&self, path: &str) -> i32 {
        self.query_text_parsed(path, "integer", parse_integer)
            .unwrap_or_default()
    }

    pub fn query_string_as_single(&self, path: &str) -> f32 {
        self.query_text_parsed(path, "single", parse_single)
            .unwrap_or_default()
    }

    pub fn query_string_as_boolean(&self, path: &str) -> bool {
        self.query_text_parsed(path, "boolean", parse_boolean)
            .unwrap_or_default()
    }

    /// Unparseable or missing dates fall back to the Unix epoch
    pub fn query_string_as_date(&self, path: &str) -> DateTime<FixedOffset> {
        self.query_text_parsed(path, "date", parse_date)
            .unwrap_or_default()
    }

    /// Raw attribute value; `None` when the node or attribute is absent
    pub fn query_attribute(&self, path: &str, attribute: &str) -> Option<&str> {
        self.select_single(path)?.attribute(attribute)
    }

    pub fn query_attribute_as_string(&self, path: &str, attribute: &str) -> String {
        match self.query_attribute(path, attribute) {
            Some(value) => value.to_string(),
            None => {
                warn!("Attribute {} not found at {}", attribute, path);
                String::new()
            }
        }
    }

    pub fn query_attribute_as_integer(&self, path: &str, attribute: &str) -> i32 {
        self.query_attribute_parsed(path, attribute, "integer", parse_integer)
            .unwrap_or_default()
    }

    pub fn query_attribute_as_single(&self, path: &str, attribute: &str) -> f32 {
        self.query_attribute_parsed(path, attribute, "single", parse_single)
            .unwrap_or_default()
    }

    pub fn query_attribute_as_boolean(&self, path: &str, attribute: &str) -> bool {
        self.query_attribute_parsed(path, attribute, "boolean", parse_boolean)
            .unwrap_or_default()
    }

    /// Unparseable or missing dates fall back to the Unix epoch
    pub fn query_attribute_as_date(&self, path: &str, attribute: &str) -> DateTime<FixedOffset> {
        self.query_attribute_parsed(path, attribute, "date", parse_date)
            .unwrap_or_default()
    }

    fn query_text_parsed<T>(
        &self,
        path: &str,
        type_name: &str,
        parse: impl FnOnce(&str) -> Option<T>,
    ) -> Option<T> {
        let Some(element) = self.select_single(path) else {
            warn!("No node found at {}", path);
            return None;
        };
        parse_logged(&element.inner_text(), type_name, path, parse)
    }

    fn query_attribute_parsed<T>(
        &self,
        path: &str,
        attribute: &str,
        type_name: &str,
        parse: impl FnOnce(&str) -> Option<T>,
    ) -> Option<T> {
        let Some(value) = self.query_attribute(path, attribute) else {
            warn!("Attribute {} not found at {}", attribute, path);
            return None;
        };
        parse_logged(value, type_name, attribute, parse)
    }
}

fn parse_logged<T>(
    value: &str,
    type_name: &str,
    source: &str,
    parse: impl FnOnce(&str) -> Option<T>,
) -> Option<T> {
    let parsed = parse(value);
    if parsed.is_none() {
        warn!("Could not parse {} {:?} from {}", type_name, value, source);
    }
    parsed
}

fn parse_integer(value: &str) -> Option<i32> {
    value.trim().parse().ok()
}

fn parse_single(value: &str) -> Option<f32> {
    value.trim().parse().ok()
}

fn parse_boolean(value: &str) -> Option<bool> {
    Some(value.trim().eq_ignore_ascii_case("true"))
}

fn element_from_start(start: &BytesStart<'_>) -> Result<XmlElement, XmlError> {
    let mut element = XmlElement::new(&String::from_utf8_lossy(start.name().as_ref()));
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| XmlError::Parse(e.to_string()))?;
        let name = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value: Cow<'_, str> = attribute
            .unescape_value()
            .map_err(|e| XmlError::Parse(e.to_string()))?;
        element.set_attribute(&name, value.into_owned());
    }
    Ok(element)
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.push_child(element),
        // Only the first top-level element is kept.
        None if root.is_none() => *root = Some(element),
        None => {}
    }
}
