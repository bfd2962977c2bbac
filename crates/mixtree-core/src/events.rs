//! Node lifecycle and mutation events, and the listener registry that
//! delivers them.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::node::Node;
use crate::wire::{Argument, Peer};

/// Who initiated a value mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// The owning application.
    Local,
    /// An inbound wire call, from the given peer when known.
    Remote(Option<Peer>),
}

impl Origin {
    pub fn is_local(&self) -> bool {
        matches!(self, Origin::Local)
    }
}

/// Every notification a node can emit.
///
/// Which variants occur depends on the node kind: values emit the change
/// events, commands the call events, containers the child events.
#[derive(Debug, Clone)]
pub enum NodeEvent {
    /// The node received an address from its owning container.
    Attached { address: String },
    /// The node lost its address; `address` is the one just vacated.
    Detached { address: String },
    /// The node is being destroyed. Listeners are dropped right after.
    Destroy,
    /// A container attached `child` (materialized, replaced or re-attached).
    ChildAttached { child: Node },
    /// A container detached `child`.
    ChildDetached { child: Node },
    /// The application changed a value. `wire` is the new wire form, if any.
    LocalChange { wire: Option<Argument> },
    /// An inbound call changed a value.
    RemoteChange { peer: Option<Peer> },
    /// The application invoked a command.
    LocalCall { args: Vec<Argument> },
    /// An inbound call invoked a command.
    RemoteCall {
        args: Vec<Argument>,
        peer: Option<Peer>,
    },
}

/// Handle returned by listener registration, used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

pub type Listener<E> = Rc<dyn Fn(&E)>;

/// Ordered listener registry.
///
/// Emission works on a snapshot, so listeners may register or unregister
/// (themselves or others) while an event is being delivered. A listener
/// removed mid-emission is not called for that event.
pub struct Emitter<E> {
    next_id: Cell<u64>,
    listeners: RefCell<BTreeMap<ListenerId, Listener<E>>>,
}

impl<E> Default for Emitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Emitter<E> {
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(1),
            listeners: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn on<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&E) + 'static,
    {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(self.next_id.get().saturating_add(1));
        self.listeners.borrow_mut().insert(id, Rc::new(listener));
        id
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.listeners.borrow_mut().remove(&id).is_some()
    }

    pub fn clear(&self) {
        self.listeners.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.borrow().is_empty()
    }

    /// Deliver `event` to every listener. Returns whether any was registered.
    pub fn emit(&self, event: &E) -> bool {
        let snapshot: Vec<(ListenerId, Listener<E>)> = self
            .listeners
            .borrow()
            .iter()
            .map(|(id, listener)| (*id, Rc::clone(listener)))
            .collect();
        if snapshot.is_empty() {
            return false;
        }
        for (id, listener) in snapshot {
            let live = self.listeners.borrow().contains_key(&id);
            if live {
                listener(event);
            }
        }
        true
    }
}

/// Capability of nodes whose local mutations must be forwarded to the peer.
///
/// Values report their new wire form on local change; commands report the
/// arguments of a local call. Containers do not implement it.
pub trait ObservesLocalMutation {
    fn on_local_mutation(&self, listener: Rc<dyn Fn(&[Argument])>) -> ListenerId;

    fn off_local_mutation(&self, id: ListenerId) -> bool;
}
