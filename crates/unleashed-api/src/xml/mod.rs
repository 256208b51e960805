// Generic XML document tree
//
// Status replies have no fixed schema: the same record element can sit at
// different depths depending on firmware and on which document it came
// from. Replies are therefore parsed into an untyped `Node` tree
// (scalar | list | mapping) and searched structurally, keeping the rest
// of the exporter independent of the XML library.

mod extract;
mod parse;

use indexmap::IndexMap;

pub use extract::find_all;
pub use parse::parse;

/// One repeated element instance: field name → value, in document order.
pub type Record = IndexMap<String, Node>;

/// A parsed XML value.
///
/// Attributes are flattened into the same mapping as child elements.
/// Repeated child elements collapse into a [`Node::List`].
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Scalar(String),
    List(Vec<Node>),
    Map(Record),
}

impl Node {
    /// The scalar text, if this node is a scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Record> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Field lookup on a mapping node; `None` for scalars and lists.
    pub fn get(&self, key: &str) -> Option<&Self> {
        self.as_map().and_then(|m| m.get(key))
    }

    /// View as a sequence of records: a mapping yields itself, a list
    /// yields its mapping elements, anything else yields nothing.
    pub fn records(&self) -> Vec<&Record> {
        match self {
            Self::Map(m) => vec![m],
            Self::List(items) => items.iter().filter_map(Self::as_map).collect(),
            Self::Scalar(_) => Vec::new(),
        }
    }
}

