//! Branch nodes.
//!
//! A [`Container`] owns the children its [`Schema`] declares and creates
//! them on first access. Collections are containers whose schema also
//! declares integer-indexed items; see [`Collection`](crate::Collection) for
//! the typed view.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::NodeError;
use crate::events::NodeEvent;
use crate::key::Key;
use crate::node::{FromNode, Node, NodeCore};
use crate::schema::{ItemsDef, PropertyDef, Schema};
use crate::value::AnyValue;
use crate::wire::{Argument, Peer};

/// Resolved child position.
enum Slot<'a> {
    Property(&'a PropertyDef),
    Item(&'a ItemsDef, usize),
}

impl Slot<'_> {
    fn segment(&self) -> String {
        match self {
            Slot::Property(def) => def.key().to_string(),
            Slot::Item(items, index) => items.format_index(*index),
        }
    }
}

pub struct Container {
    core: NodeCore,
    schema: Rc<Schema>,
    properties: RefCell<HashMap<String, Node>>,
    items: RefCell<Vec<Option<Node>>>,
}

impl Container {
    pub fn new(schema: Rc<Schema>) -> Self {
        Self::with_core(NodeCore::new(), schema)
    }

    pub(crate) fn new_root(schema: Rc<Schema>) -> Self {
        Self::with_core(NodeCore::new_root(), schema)
    }

    fn with_core(core: NodeCore, schema: Rc<Schema>) -> Self {
        let size = schema.items().map_or(0, ItemsDef::size);
        Self {
            core,
            schema,
            properties: RefCell::new(HashMap::new()),
            items: RefCell::new(vec![None; size]),
        }
    }

    pub fn core(&self) -> &NodeCore {
        &self.core
    }

    pub fn schema(&self) -> &Rc<Schema> {
        &self.schema
    }

    pub fn is_callable(&self) -> bool {
        self.schema.is_callable()
    }

    pub fn is_collection(&self) -> bool {
        self.schema.items().is_some()
    }

    pub fn callable_properties(&self) -> Vec<Key> {
        self.schema.callable_properties()
    }

    /// Number of item slots; zero for plain containers.
    pub fn item_count(&self) -> usize {
        self.items.borrow().len()
    }

    fn resolve(&self, key: &Key) -> Result<Slot<'_>, NodeError> {
        let unknown = || NodeError::UnknownProperty {
            key: key.to_string(),
        };
        match key {
            Key::Index(index) => {
                let items = self.schema.items().ok_or_else(unknown)?;
                Self::item_slot(items, *index as i64)
            }
            Key::Name(name) => {
                if let Some(def) = self.schema.property(name) {
                    return Ok(Slot::Property(def));
                }
                let items = self.schema.items().ok_or_else(unknown)?;
                let index = items.parse_segment(name).ok_or_else(unknown)?;
                Self::item_slot(items, index)
            }
        }
    }

    fn item_slot(items: &ItemsDef, index: i64) -> Result<Slot<'_>, NodeError> {
        if index < 0 || index >= items.size() as i64 {
            return Err(NodeError::IndexOutOfRange {
                index,
                size: items.size(),
            });
        }
        Ok(Slot::Item(items, index as usize))
    }

    fn cached(&self, slot: &Slot<'_>) -> Option<Node> {
        match slot {
            Slot::Property(def) => self.properties.borrow().get(def.key()).cloned(),
            Slot::Item(_, index) => self.items.borrow().get(*index).cloned().flatten(),
        }
    }

    fn materialize(&self, slot: &Slot<'_>) -> Node {
        if let Some(node) = self.cached(slot) {
            return node;
        }
        let node = match slot {
            Slot::Property(def) => def.create(),
            Slot::Item(items, index) => items.create(*index),
        };
        self.store(slot, node.clone());
        if self.core.is_attached() {
            self.attach_child(&slot.segment(), &node);
        }
        node
    }

    fn store(&self, slot: &Slot<'_>, node: Node) {
        match slot {
            Slot::Property(def) => {
                self.properties
                    .borrow_mut()
                    .insert(def.key().to_string(), node);
            }
            Slot::Item(_, index) => {
                if let Some(entry) = self.items.borrow_mut().get_mut(*index) {
                    *entry = Some(node);
                }
            }
        }
    }

    fn take(&self, slot: &Slot<'_>) -> Option<Node> {
        match slot {
            Slot::Property(def) => self.properties.borrow_mut().remove(def.key()),
            Slot::Item(_, index) => self
                .items
                .borrow_mut()
                .get_mut(*index)
                .and_then(Option::take),
        }
    }

    fn attach_child(&self, segment: &str, child: &Node) {
        child.attach(format!("{}/{}", self.core.address(), segment));
        self.core.emit(&NodeEvent::ChildAttached {
            child: child.clone(),
        });
    }

    fn detach_child(&self, child: &Node) {
        if child.detach() {
            self.core.emit(&NodeEvent::ChildDetached {
                child: child.clone(),
            });
        }
    }

    /// The child at `key`, created on first access.
    pub fn get(&self, key: impl Into<Key>) -> Result<Node, NodeError> {
        let key = key.into();
        let slot = self.resolve(&key)?;
        Ok(self.materialize(&slot))
    }

    pub fn get_as<T: FromNode>(&self, key: impl Into<Key>) -> Result<T, NodeError> {
        T::from_node(self.get(key)?)
    }

    /// Replace the child at `key`. The previous occupant, if any, is
    /// detached and destroyed first.
    pub fn set(&self, key: impl Into<Key>, node: impl Into<Node>) -> Result<(), NodeError> {
        let node = node.into();
        if node.is_attached() {
            return Err(NodeError::AlreadyAttached(node.address()));
        }
        let key = key.into();
        let slot = self.resolve(&key)?;
        if let Some(previous) = self.take(&slot) {
            self.detach_child(&previous);
            previous.destroy();
        }
        self.store(&slot, node.clone());
        if self.core.is_attached() {
            self.attach_child(&slot.segment(), &node);
        }
        Ok(())
    }

    /// Whether the child at `key` has been created. Unknown keys report
    /// false.
    pub fn is_materialized(&self, key: impl Into<Key>) -> bool {
        let key = key.into();
        self.resolve(&key)
            .map(|slot| self.cached(&slot).is_some())
            .unwrap_or(false)
    }

    /// Every declared key: named properties, then item indices.
    pub fn keys(&self) -> Vec<Key> {
        self.schema
            .known_properties()
            .map(Key::from)
            .chain((0..self.item_count()).map(Key::Index))
            .collect()
    }

    /// Every child in declared order, materializing as needed.
    pub fn children(&self) -> Vec<Node> {
        let properties = self.schema.properties().iter().map(Slot::Property);
        let items = self
            .schema
            .items()
            .into_iter()
            .flat_map(|items| (0..items.size()).map(move |index| Slot::Item(items, index)));
        properties
            .chain(items)
            .map(|slot| self.materialize(&slot))
            .collect()
    }

    /// Already created children in declared order.
    pub fn materialized(&self) -> Vec<Node> {
        self.materialized_entries()
            .into_iter()
            .map(|(_, node)| node)
            .collect()
    }

    /// Already created children with their address segments.
    pub fn materialized_entries(&self) -> Vec<(String, Node)> {
        let mut entries = Vec::new();
        {
            let properties = self.properties.borrow();
            for def in self.schema.properties() {
                if let Some(node) = properties.get(def.key()) {
                    entries.push((def.key().to_string(), node.clone()));
                }
            }
        }
        if let Some(items) = self.schema.items() {
            let slots = self.items.borrow();
            for (index, node) in slots.iter().enumerate() {
                if let Some(node) = node {
                    entries.push((items.format_index(index), node.clone()));
                }
            }
        }
        entries
    }

    pub(crate) fn attach(&self, address: String) {
        self.core.attach(address);
        for (segment, child) in self.materialized_entries() {
            self.attach_child(&segment, &child);
        }
    }

    pub(crate) fn detach(&self) -> bool {
        if !self.core.detach() {
            return false;
        }
        for child in self.materialized() {
            self.detach_child(&child);
        }
        true
    }

    pub(crate) fn destroy(&self) {
        if !self.core.destroy() {
            return;
        }
        for child in self.materialized() {
            child.destroy();
        }
    }

    /// Walk `props` pairing each with the argument at the same position and
    /// hand every Value child to `visit`.
    ///
    /// With arguments, the walk covers `min(args, props)` entries and stops
    /// early at the first non-Value child; results are not collected. With no
    /// arguments, the walk collects `visit`'s results and stops at the first
    /// non-Value child or the first `None`. The second element of the result
    /// holds the properties the walk did not reach.
    pub fn apply_to_values<R, F>(
        &self,
        props: &[Key],
        args: &[Argument],
        mut visit: F,
    ) -> Result<(Option<Vec<R>>, Vec<Key>), NodeError>
    where
        F: FnMut(&Rc<dyn AnyValue>, Option<&Argument>) -> Option<R>,
    {
        let collecting = args.is_empty();
        let mut results = collecting.then(Vec::new);
        let limit = if collecting {
            props.len()
        } else {
            args.len().min(props.len())
        };

        let mut reached = 0;
        while reached < limit {
            let node = self.get(props[reached].clone())?;
            let Node::Value(value) = &node else {
                break;
            };
            let result = visit(value, args.get(reached));
            if let Some(results) = results.as_mut() {
                match result {
                    Some(result) => results.push(result),
                    None => break,
                }
            }
            reached += 1;
        }

        Ok((results, props[reached..].to_vec()))
    }

    /// Inbound call on a callable container.
    ///
    /// Arguments are distributed over the callable properties in order and
    /// nothing is returned. A call without arguments answers with the wire
    /// values of the leading set Value children.
    pub fn handle_call(
        &self,
        peer: Option<&Peer>,
        args: &[Argument],
    ) -> Result<Option<Vec<Argument>>, NodeError> {
        if !self.is_callable() {
            return Err(NodeError::NotCallable {
                address: self.core.address(),
            });
        }
        let props = self.callable_properties();
        let (results, _) =
            self.apply_to_values(&props, args, |value, arg| value.handle_call(peer, arg))?;
        Ok(results.filter(|results| !results.is_empty()))
    }

    /// Copy every set value of `other` into the structurally matching child
    /// of `self`. Children are paired in declared order; only the common
    /// prefix is visited.
    pub fn merge(&self, other: &Container) {
        for (source, target) in other.children().into_iter().zip(self.children()) {
            match (&source, &target) {
                (Node::Container(source), Node::Container(target)) => target.merge(source),
                (Node::Value(source), Node::Value(target)) if source.is_set() => {
                    target.merge_from(source.as_ref());
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::value::{FloatValue, IntValue};
    use std::cell::RefCell;

    fn channel() -> Rc<Schema> {
        Schema::builder("channel")
            .property("gain", FloatValue::new)
            .property("solo", Command::new)
            .property("trim", FloatValue::new)
            .build()
    }

    #[test]
    fn test_get_materializes_once() {
        let container = Container::new(channel());
        assert!(!container.is_materialized("gain"));
        let a = container.get("gain");
        let b = container.get("gain");
        assert!(container.is_materialized("gain"));
        assert_eq!(a, b);
        assert_eq!(container.materialized().len(), 1);
    }

    #[test]
    fn test_unknown_property() {
        let container = Container::new(channel());
        assert_eq!(
            container.get("pan"),
            Err(NodeError::UnknownProperty { key: "pan".into() })
        );
        assert!(matches!(
            container.get(0usize),
            Err(NodeError::UnknownProperty { .. })
        ));
    }

    #[test]
    fn test_detached_container_leaves_children_detached() {
        let container = Container::new(channel());
        let gain = container.get("gain").map(|node| node.is_attached());
        assert_eq!(gain, Ok(false));
    }

    #[test]
    fn test_set_rejects_attached_node() {
        let parent = Rc::new(Container::new_root(channel()));
        let gain = parent.get("gain");
        let other = Container::new_root(channel());
        let result = gain.map(|gain| other.set("trim", gain));
        assert!(matches!(result, Ok(Err(NodeError::AlreadyAttached(a))) if a == "/gain"));
    }

    #[test]
    fn test_children_follow_declared_order() {
        let container = Container::new(channel());
        container.get("trim").ok();
        let kinds: Vec<_> = container.children().iter().map(Node::kind).collect();
        assert_eq!(
            kinds,
            [
                crate::node::NodeKind::Value,
                crate::node::NodeKind::Command,
                crate::node::NodeKind::Value
            ]
        );
        assert_eq!(
            container.keys(),
            vec![Key::from("gain"), Key::from("solo"), Key::from("trim")]
        );
    }

    #[test]
    fn test_apply_to_values_stops_at_non_value() {
        let container = Container::new(channel());
        let props = container.callable_properties();
        let args = [Argument::Float(1.0), Argument::Float(2.0), Argument::Float(3.0)];
        let visited = RefCell::new(Vec::new());
        let outcome = container.apply_to_values(&props, &args, |value, arg| {
            visited.borrow_mut().push(arg.cloned());
            value.handle_call(None, arg)
        });
        let (results, unused) = match outcome {
            Ok(outcome) => outcome,
            Err(err) => panic!("{err}"),
        };
        assert!(results.is_none());
        assert_eq!(unused, vec![Key::from("solo"), Key::from("trim")]);
        assert_eq!(*visited.borrow(), vec![Some(Argument::Float(1.0))]);
    }

    #[test]
    fn test_apply_to_values_collects_until_unset() {
        let schema = Schema::builder("pair")
            .property("a", IntValue::new)
            .property("b", IntValue::new)
            .property("c", IntValue::new)
            .build();
        let container = Container::new(schema);
        container
            .get_as::<Rc<IntValue>>("a")
            .map(|a| a.set(Some(1)))
            .ok();
        let props = container.callable_properties();
        let outcome = container.apply_to_values(&props, &[], |value, _| value.to_wire());
        assert_eq!(
            outcome,
            Ok((Some(vec![Argument::Int(1)]), vec![Key::from("b"), Key::from("c")]))
        );
    }

    #[test]
    fn test_not_callable() {
        let container = Container::new(channel());
        assert!(matches!(
            container.handle_call(None, &[]),
            Err(NodeError::NotCallable { .. })
        ));
    }

    #[test]
    fn test_destroy_cascades_after_self() {
        let container = Rc::new(Container::new(channel()));
        let order = Rc::new(RefCell::new(Vec::new()));
        for key in ["gain", "solo"] {
            if let Ok(child) = container.get(key) {
                let order = Rc::clone(&order);
                child.on(move |event| {
                    if matches!(event, NodeEvent::Destroy) {
                        order.borrow_mut().push(key);
                    }
                });
            }
        }
        let o = Rc::clone(&order);
        container.core().on(move |event| {
            if matches!(event, NodeEvent::Destroy) {
                o.borrow_mut().push("self");
            }
        });
        Node::from(Rc::clone(&container)).destroy();
        assert_eq!(*order.borrow(), vec!["self", "gain", "solo"]);
        assert!(container.core().is_destroyed());
    }
}
