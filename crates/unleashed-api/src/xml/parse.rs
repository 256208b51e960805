// XML text → `Node` tree, built on quick-xml's pull reader.

use indexmap::IndexMap;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::{Node, Record};
use crate::error::Error;

/// Key under which the text of a mixed-content element is kept.
const TEXT_KEY: &str = "#text";

/// An element still being assembled.
struct Frame {
    name: String,
    attrs: Record,
    children: Record,
    text: String,
}

impl Frame {
    fn open(start: &BytesStart<'_>) -> Result<Self, Error> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attrs = IndexMap::new();
        for attr in start.attributes() {
            let attr = attr.map_err(xml_error)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().map_err(xml_error)?;
            insert_child(&mut attrs, key, Node::Scalar(value.into_owned()));
        }
        Ok(Self {
            name,
            attrs,
            children: IndexMap::new(),
            text: String::new(),
        })
    }

    fn close(self) -> (String, Node) {
        let text = self.text.trim();
        if self.attrs.is_empty() && self.children.is_empty() {
            return (self.name, Node::Scalar(text.to_owned()));
        }

        let mut map = self.attrs;
        for (key, value) in self.children {
            insert_child(&mut map, key, value);
        }
        if !text.is_empty() {
            insert_child(&mut map, TEXT_KEY.to_owned(), Node::Scalar(text.to_owned()));
        }
        (self.name, Node::Map(map))
    }
}

/// Insert a named value, collapsing repeats into an ordered list.
fn insert_child(map: &mut Record, key: String, node: Node) {
    match map.get_mut(&key) {
        Some(Node::List(items)) => items.push(node),
        Some(existing) => {
            let first = std::mem::replace(existing, Node::List(Vec::with_capacity(2)));
            if let Node::List(items) = existing {
                items.push(first);
                items.push(node);
            }
        }
        None => {
            map.insert(key, node);
        }
    }
}

fn xml_error(err: impl std::fmt::Display) -> Error {
    Error::Xml {
        message: err.to_string(),
    }
}

/// Parse a document into a mapping of root element name → root node.
///
/// The XML declaration, comments and processing instructions are skipped.
pub fn parse(xml: &str) -> Result<Node, Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut root: Record = IndexMap::new();
    let mut stack: Vec<Frame> = Vec::new();

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(start) => stack.push(Frame::open(&start)?),
            Event::Empty(start) => {
                let (name, node) = Frame::open(&start)?.close();
                let parent = stack.last_mut().map_or(&mut root, |f| &mut f.children);
                insert_child(parent, name, node);
            }
            Event::End(_) => {
                let frame = stack.pop().ok_or_else(|| Error::Xml {
                    message: "unbalanced closing tag".into(),
                })?;
                let (name, node) = frame.close();
                let parent = stack.last_mut().map_or(&mut root, |f| &mut f.children);
                insert_child(parent, name, node);
            }
            Event::Text(text) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&text.unescape().map_err(xml_error)?);
                }
            }
            Event::CData(data) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(Error::Xml {
            message: format!("unexpected end of document inside <{}>", open.name),
        });
    }

    Ok(Node::Map(root))
}
