// Structure-agnostic record extraction.

use super::{Node, Record};

/// Collect every record stored under `element` anywhere in the tree.
///
/// Depth-first, mapping values visited in document order. At each
/// mapping, a match under `element` is collected before descending, and
/// the match itself is descended into as well, so nested same-named
/// elements are found too. A matched mapping yields one record, a matched
/// list yields one record per mapping element; scalars are ignored.
/// Absence anywhere yields an empty vector.
pub fn find_all<'a>(document: &'a Node, element: &str) -> Vec<&'a Record> {
    let mut found = Vec::new();
    visit(document, element, &mut found);
    found
}

fn visit<'a>(node: &'a Node, element: &str, found: &mut Vec<&'a Record>) {
    match node {
        Node::Map(map) => {
            if let Some(hit) = map.get(element) {
                found.extend(hit.records());
            }
            for value in map.values() {
                visit(value, element, found);
            }
        }
        Node::List(items) => {
            for item in items {
                visit(item, element, found);
            }
        }
        Node::Scalar(_) => {}
    }
}
