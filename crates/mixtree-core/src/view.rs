//! JSON snapshot of a (sub)tree.

use serde_json::{Map, Value as Json};

use crate::node::Node;

impl Node {
    /// Render the materialized part of the tree below this node.
    ///
    /// Values become JSON scalars (`null` when unset), commands `null`, and
    /// containers objects keyed by address segment in declared order.
    pub fn view(&self) -> Json {
        match self {
            Node::Value(value) => value.to_json(),
            Node::Command(_) => Json::Null,
            Node::Container(container) => {
                let mut object = Map::new();
                for (segment, child) in container.materialized_entries() {
                    object.insert(segment, child.view());
                }
                Json::Object(object)
            }
        }
    }
}
