//! Node identity and the closed set of node kinds.
//!
//! # Node kinds
//!
//! | Variant             | Holds                    | Callable            |
//! |---------------------|--------------------------|---------------------|
//! | `Node::Value`       | one optional scalar      | always              |
//! | `Node::Command`     | nothing, triggers action | always              |
//! | `Node::Container`   | named children           | when schema says so |
//! | (collection)        | a container with items   | when schema says so |
//!
//! Nodes are reference counted. A node is owned by at most one container,
//! which is the only party that ever sets or clears its address.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::command::Command;
use crate::container::Container;
use crate::error::NodeError;
use crate::events::{Emitter, ListenerId, NodeEvent, ObservesLocalMutation};
use crate::value::AnyValue;
use crate::wire::{Argument, Peer};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique node identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Value,
    Command,
    Container,
    Collection,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Value => "value",
            NodeKind::Command => "command",
            NodeKind::Container => "container",
            NodeKind::Collection => "collection",
        };
        f.write_str(name)
    }
}

// ── NodeCore ──────────────────────────────────────────────────────────────

/// State shared by every node kind: identity, address and listeners.
pub struct NodeCore {
    id: NodeId,
    address: RefCell<String>,
    attached: Cell<bool>,
    destroyed: Cell<bool>,
    events: Emitter<NodeEvent>,
}

impl Default for NodeCore {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeCore {
    pub fn new() -> Self {
        Self {
            id: NodeId::next(),
            address: RefCell::new(String::new()),
            attached: Cell::new(false),
            destroyed: Cell::new(false),
            events: Emitter::new(),
        }
    }

    /// A tree root: attached from birth, at the empty address.
    pub(crate) fn new_root() -> Self {
        let core = Self::new();
        core.attached.set(true);
        core
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Current address; empty while detached.
    pub fn address(&self) -> String {
        self.address.borrow().clone()
    }

    pub fn is_attached(&self) -> bool {
        self.attached.get()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    pub fn on<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&NodeEvent) + 'static,
    {
        self.events.on(listener)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.events.off(id)
    }

    pub fn listener_count(&self) -> usize {
        self.events.len()
    }

    pub(crate) fn emit(&self, event: &NodeEvent) -> bool {
        self.events.emit(event)
    }

    pub(crate) fn attach(&self, address: String) {
        self.address.replace(address.clone());
        self.attached.set(true);
        self.emit(&NodeEvent::Attached { address });
    }

    /// Returns false when the node was not attached.
    pub(crate) fn detach(&self) -> bool {
        if !self.attached.get() {
            return false;
        }
        let address = self.address.take();
        self.attached.set(false);
        self.emit(&NodeEvent::Detached { address });
        true
    }

    /// Returns false when the node was already destroyed.
    pub(crate) fn destroy(&self) -> bool {
        if self.destroyed.replace(true) {
            return false;
        }
        self.emit(&NodeEvent::Destroy);
        self.events.clear();
        true
    }
}

// ── Node ──────────────────────────────────────────────────────────────────

/// Shared handle to any node of the tree.
#[derive(Clone)]
pub enum Node {
    Value(Rc<dyn AnyValue>),
    Command(Rc<Command>),
    Container(Rc<Container>),
}

impl Node {
    pub fn core(&self) -> &NodeCore {
        match self {
            Node::Value(v) => v.core(),
            Node::Command(c) => c.core(),
            Node::Container(c) => c.core(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.core().id()
    }

    pub fn address(&self) -> String {
        self.core().address()
    }

    pub fn is_attached(&self) -> bool {
        self.core().is_attached()
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Value(_) => NodeKind::Value,
            Node::Command(_) => NodeKind::Command,
            Node::Container(c) if c.is_collection() => NodeKind::Collection,
            Node::Container(_) => NodeKind::Container,
        }
    }

    pub fn is_callable(&self) -> bool {
        match self {
            Node::Value(_) | Node::Command(_) => true,
            Node::Container(c) => c.is_callable(),
        }
    }

    /// Apply an inbound wire call and return the response to send back, if
    /// any.
    pub fn handle_call(
        &self,
        peer: Option<&Peer>,
        args: &[Argument],
    ) -> Result<Option<Vec<Argument>>, NodeError> {
        match self {
            Node::Value(v) => Ok(v.handle_call(peer, args.first()).map(|arg| vec![arg])),
            Node::Command(c) => {
                c.handle_call(peer, args);
                Ok(None)
            }
            Node::Container(c) => c.handle_call(peer, args),
        }
    }

    pub fn on<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&NodeEvent) + 'static,
    {
        self.core().on(listener)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.core().off(id)
    }

    /// Terminal: notifies listeners, drops them, and destroys descendants.
    pub fn destroy(&self) {
        match self {
            Node::Container(c) => c.destroy(),
            _ => {
                self.core().destroy();
            }
        }
    }

    pub(crate) fn attach(&self, address: String) {
        match self {
            Node::Container(c) => c.attach(address),
            _ => self.core().attach(address),
        }
    }

    pub(crate) fn detach(&self) -> bool {
        match self {
            Node::Container(c) => c.detach(),
            _ => self.core().detach(),
        }
    }

    /// Local-mutation capability, present on values and commands.
    pub fn local_mutation(&self) -> Option<&dyn ObservesLocalMutation> {
        match self {
            Node::Value(v) => Some(v.as_local_mutation()),
            Node::Command(c) => Some(c.as_ref()),
            Node::Container(_) => None,
        }
    }

    pub fn as_value(&self) -> Option<&Rc<dyn AnyValue>> {
        match self {
            Node::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_command(&self) -> Option<&Rc<Command>> {
        match self {
            Node::Command(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_container(&self) -> Option<&Rc<Container>> {
        match self {
            Node::Container(c) => Some(c),
            _ => None,
        }
    }

    pub fn into_container(self) -> Result<Rc<Container>, NodeError> {
        match self {
            Node::Container(c) => Ok(c),
            other => Err(other.wrong_kind(NodeKind::Container)),
        }
    }

    pub(crate) fn wrong_kind(&self, expected: NodeKind) -> NodeError {
        NodeError::WrongKind {
            address: self.address(),
            expected,
            actual: self.kind(),
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Value(v) => write!(f, "Value({:?} = {})", v.core().address(), v),
            _ => write!(f, "{}({:?})", self.kind(), self.address()),
        }
    }
}

impl From<Command> for Node {
    fn from(command: Command) -> Self {
        Node::Command(Rc::new(command))
    }
}

impl From<Rc<Command>> for Node {
    fn from(command: Rc<Command>) -> Self {
        Node::Command(command)
    }
}

impl From<Container> for Node {
    fn from(container: Container) -> Self {
        Node::Container(Rc::new(container))
    }
}

impl From<Rc<Container>> for Node {
    fn from(container: Rc<Container>) -> Self {
        Node::Container(container)
    }
}

impl From<Rc<dyn AnyValue>> for Node {
    fn from(value: Rc<dyn AnyValue>) -> Self {
        Node::Value(value)
    }
}

// ── Typed access ──────────────────────────────────────────────────────────

/// Conversion from an untyped [`Node`] into a concrete handle.
///
/// Application-defined container wrappers implement this to be reachable
/// through [`Container::get_as`](crate::Container::get_as).
pub trait FromNode: Sized {
    fn from_node(node: Node) -> Result<Self, NodeError>;
}

impl FromNode for Node {
    fn from_node(node: Node) -> Result<Self, NodeError> {
        Ok(node)
    }
}

impl FromNode for Rc<Command> {
    fn from_node(node: Node) -> Result<Self, NodeError> {
        match node {
            Node::Command(c) => Ok(c),
            other => Err(other.wrong_kind(NodeKind::Command)),
        }
    }
}

impl FromNode for Rc<Container> {
    fn from_node(node: Node) -> Result<Self, NodeError> {
        node.into_container()
    }
}

impl FromNode for Rc<dyn AnyValue> {
    fn from_node(node: Node) -> Result<Self, NodeError> {
        match node {
            Node::Value(v) => Ok(v),
            other => Err(other.wrong_kind(NodeKind::Value)),
        }
    }
}
