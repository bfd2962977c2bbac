//! Tree root with a flat address index.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::container::Container;
use crate::error::NodeError;
use crate::events::{ListenerId, NodeEvent};
use crate::key::Key;
use crate::node::{FromNode, Node, NodeId};
use crate::schema::Schema;

/// Listeners the index keeps on one tracked node.
struct Hooks {
    node: Node,
    detached: ListenerId,
    child_attached: Option<ListenerId>,
}

#[derive(Default)]
struct AddressIndex {
    nodes: RefCell<IndexMap<String, Node>>,
    hooks: RefCell<HashMap<NodeId, Hooks>>,
}

impl AddressIndex {
    fn watch_container(self: &Rc<Self>, container: &Container) -> ListenerId {
        let index = Rc::downgrade(self);
        let id = container.core().on(move |event| {
            if let NodeEvent::ChildAttached { child } = event {
                if let Some(index) = index.upgrade() {
                    index.track(child);
                }
            }
        });
        for child in container.materialized() {
            if child.is_attached() {
                self.track(&child);
            }
        }
        id
    }

    fn track(self: &Rc<Self>, node: &Node) {
        let id = node.id();
        self.release(id);
        self.nodes.borrow_mut().insert(node.address(), node.clone());

        let index = Rc::downgrade(self);
        let detached = node.on(move |event| {
            if let NodeEvent::Detached { address } = event {
                if let Some(index) = index.upgrade() {
                    index.forget(id, address);
                }
            }
        });
        let child_attached = node
            .as_container()
            .map(|container| self.watch_container(container));

        self.hooks.borrow_mut().insert(
            id,
            Hooks {
                node: node.clone(),
                detached,
                child_attached,
            },
        );
    }

    fn forget(&self, id: NodeId, address: &str) {
        {
            let mut nodes = self.nodes.borrow_mut();
            if nodes.get(address).is_some_and(|node| node.id() == id) {
                nodes.shift_remove(address);
            }
        }
        self.release(id);
    }

    fn release(&self, id: NodeId) {
        let hooks = self.hooks.borrow_mut().remove(&id);
        if let Some(hooks) = hooks {
            hooks.node.off(hooks.detached);
            if let Some(listener) = hooks.child_attached {
                hooks.node.off(listener);
            }
        }
    }
}

/// Top-level container. It is attached from construction at the empty
/// address, so its children live at `/key`, and it indexes every attached
/// descendant by address.
pub struct Root {
    container: Rc<Container>,
    index: Rc<AddressIndex>,
}

impl Root {
    pub fn new(schema: Rc<Schema>) -> Self {
        let container = Rc::new(Container::new_root(schema));
        let index = Rc::new(AddressIndex::default());
        index.watch_container(&container);
        Self { container, index }
    }

    pub fn container(&self) -> &Rc<Container> {
        &self.container
    }

    pub fn node(&self) -> Node {
        Node::Container(Rc::clone(&self.container))
    }

    pub fn get(&self, key: impl Into<Key>) -> Result<Node, NodeError> {
        self.container.get(key)
    }

    pub fn get_as<T: FromNode>(&self, key: impl Into<Key>) -> Result<T, NodeError> {
        self.container.get_as(key)
    }

    pub fn set(&self, key: impl Into<Key>, node: impl Into<Node>) -> Result<(), NodeError> {
        self.container.set(key, node)
    }

    /// Node at `address`. Addresses missing from the index are resolved by
    /// walking the tree from the root, materializing along the way.
    pub fn lookup(&self, address: &str) -> Result<Node, NodeError> {
        if address.is_empty() || address == "/" {
            return Ok(self.node());
        }
        if let Some(node) = self.index.nodes.borrow().get(address) {
            return Ok(node.clone());
        }

        let not_found = || NodeError::AddressNotFound(address.to_string());
        let mut current = Rc::clone(&self.container);
        let mut segments = address.trim_start_matches('/').split('/').peekable();
        while let Some(segment) = segments.next() {
            let node = current.get(segment).map_err(|_| not_found())?;
            if segments.peek().is_none() {
                return Ok(node);
            }
            current = node.into_container().map_err(|_| not_found())?;
        }
        Err(not_found())
    }

    /// Like [`Root::lookup`], without the error.
    pub fn find(&self, address: &str) -> Option<Node> {
        self.lookup(address).ok()
    }

    pub fn lookup_as<T: FromNode>(&self, address: &str) -> Result<T, NodeError> {
        T::from_node(self.lookup(address)?)
    }

    /// Indexed addresses in the order their nodes were attached.
    pub fn addresses(&self) -> Vec<String> {
        self.index.nodes.borrow().keys().cloned().collect()
    }

    pub fn is_indexed(&self, address: &str) -> bool {
        self.index.nodes.borrow().contains_key(address)
    }
}
