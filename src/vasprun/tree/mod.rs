//! Whole-document strategy.
//!
//! The complete document is loaded into an [`Element`] tree and every
//! quantity is fetched with its own path query. In recovery mode a damaged
//! or truncated tail is dropped: elements still open when the reader fails
//! are closed in place, so everything before the damage stays queryable.
//! Only structural containers survive being cut off; a data section without
//! its closing tag is discarded rather than read as a short array.

use std::io::BufRead;

use log::{debug, warn};
use quick_xml::events::Event;
use quick_xml::Reader;

use super::helpers::{attributes, tag_name};
use super::VasprunError;

pub use path::Path;

mod fetch;
mod path;

pub(crate) use fetch::extract;

/// Elements kept in the tree when the input ends before their closing tag
const RECOVERABLE_CONTAINERS: &[&str] = &["modeling", "calculation", "structure", "crystal"];

/// One element of the loaded document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    /// Concatenated, trimmed character data
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    /// Get an attribute value
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First element matching a path query
    pub fn find(&self, path: &str) -> Option<&Element> {
        Path::parse(path).find(self)
    }

    /// All elements matching a path query, in document order
    pub fn find_all(&self, path: &str) -> Vec<&Element> {
        Path::parse(path).find_all(self)
    }

    /// Text of every element matching a path query
    pub fn texts(&self, path: &str) -> Vec<String> {
        self.find_all(path).into_iter().map(|e| e.text.clone()).collect()
    }

    fn push_text(&mut self, text: &str) {
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(text);
    }
}

/// Load a document into a tree
///
/// With `recover` set, reader errors and a premature end of input close the
/// open elements instead of failing. Without it they are structural errors.
pub fn parse<R: BufRead>(reader: R, recover: bool) -> Result<Element, VasprunError> {
    let mut xml_reader = Reader::from_reader(reader);
    xml_reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;
    let mut buf = Vec::new();

    loop {
        let event = match xml_reader.read_event_into(&mut buf) {
            Ok(event) => event,
            Err(e) if recover => {
                warn!(
                    "Recovering from XML error at byte {}: {}",
                    xml_reader.buffer_position(),
                    e
                );
                break;
            }
            Err(e) => return Err(VasprunError::Xml(e)),
        };

        match event {
            Event::Start(e) => {
                stack.push(Element {
                    name: tag_name(&e),
                    attributes: attributes(&e)?,
                    ..Element::default()
                });
            }
            Event::Empty(e) => {
                let element = Element {
                    name: tag_name(&e),
                    attributes: attributes(&e)?,
                    ..Element::default()
                };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => {
                        root = Some(element);
                        break;
                    }
                }
            }
            Event::Text(t) => {
                if let Some(current) = stack.last_mut() {
                    current.push_text(&t.unescape()?);
                }
            }
            Event::CData(t) => {
                if let Some(current) = stack.last_mut() {
                    current.push_text(&String::from_utf8_lossy(&t));
                }
            }
            Event::End(_) => {
                let Some(element) = stack.pop() else {
                    return Err(VasprunError::StructuralParse("unbalanced closing tag".to_string()));
                };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => {
                        root = Some(element);
                        break;
                    }
                }
            }
            Event::Eof => {
                if !stack.is_empty() && !recover {
                    let open = stack.last().map(|e| e.name.clone()).unwrap_or_default();
                    return Err(VasprunError::StructuralParse(format!(
                        "unexpected end of document inside <{}>",
                        open
                    )));
                }
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    if root.is_none() && !stack.is_empty() {
        debug!("Closing {} unterminated elements", stack.len());
        while let Some(element) = stack.pop() {
            match stack.last_mut() {
                Some(parent) if RECOVERABLE_CONTAINERS.contains(&element.name.as_str()) => {
                    parent.children.push(element)
                }
                Some(_) => debug!("Dropping unterminated <{}>", element.name),
                None => root = Some(element),
            }
        }
    }

    root.ok_or_else(|| VasprunError::StructuralParse("no root element".to_string()))
}
