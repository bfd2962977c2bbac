//! Synchronization façade between a node tree and a [`Port`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use mixtree_core::{Emitter, ListenerId, Node, NodeId};

use crate::config::DispatcherConfig;
use crate::monitor::Monitor;
use crate::port::Port;

static NEXT_OWNERSHIP_KEY: AtomicU64 = AtomicU64::new(1);

/// Token identifying one monitoring consumer. A node stays monitored while
/// at least one key references it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnershipKey(u64);

impl OwnershipKey {
    pub fn new() -> Self {
        Self(NEXT_OWNERSHIP_KEY.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for OwnershipKey {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub enum DispatcherEvent {
    /// A node gained its first ownership key.
    Monitor(Node),
    /// A node lost its last ownership key, or was destroyed.
    Unmonitor(Node),
}

pub(crate) struct Inner {
    pub(crate) port: Rc<dyn Port>,
    pub(crate) config: DispatcherConfig,
    pub(crate) monitors: RefCell<HashMap<NodeId, Monitor>>,
    pub(crate) events: Emitter<DispatcherEvent>,
}

/// Watches subtrees on behalf of ownership keys and keeps them in sync with
/// the peer behind a [`Port`].
///
/// Monitored nodes subscribe at their address while attached, apply inbound
/// calls as remote changes, answer with the node's response, and forward
/// local changes outward. Containers hand their keys down to children created
/// later.
///
/// Dropping the dispatcher tears every monitor down.
pub struct Dispatcher {
    pub(crate) inner: Rc<Inner>,
}

impl Dispatcher {
    pub fn new(port: Rc<dyn Port>) -> Self {
        Self::with_config(port, DispatcherConfig::default())
    }

    pub fn with_config(port: Rc<dyn Port>, config: DispatcherConfig) -> Self {
        Self {
            inner: Rc::new(Inner {
                port,
                config,
                monitors: RefCell::new(HashMap::new()),
                events: Emitter::new(),
            }),
        }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.inner.config
    }

    pub fn port(&self) -> &Rc<dyn Port> {
        &self.inner.port
    }

    pub fn on<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&DispatcherEvent) + 'static,
    {
        self.inner.events.on(listener)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.inner.events.off(id)
    }

    /// Monitor `nodes` and their currently materialized descendants on
    /// behalf of `key`.
    pub fn add(&self, key: OwnershipKey, nodes: &[Node]) {
        for node in nodes {
            self.inner.add(key, node);
        }
    }

    /// Drop `key` from `nodes` and their materialized descendants.
    pub fn remove(&self, key: OwnershipKey, nodes: &[Node]) {
        for node in nodes {
            self.inner.remove(key, node);
        }
    }

    pub fn is_monitored(&self, node: &Node) -> bool {
        self.inner.is_monitored(node.id())
    }

    pub fn monitored_count(&self) -> usize {
        self.inner.monitors.borrow().len()
    }

    /// Keys currently holding `node`, in no particular order.
    pub fn keys_of(&self, node: &Node) -> Vec<OwnershipKey> {
        self.inner
            .monitors
            .borrow()
            .get(&node.id())
            .map(|monitor| monitor.keys().collect())
            .unwrap_or_default()
    }
}

impl Inner {
    pub(crate) fn is_monitored(&self, id: NodeId) -> bool {
        self.monitors.borrow().contains_key(&id)
    }

    pub(crate) fn add(self: &Rc<Self>, key: OwnershipKey, node: &Node) {
        self.monitor(key, node);
        if let Node::Container(container) = node {
            for child in container.materialized() {
                self.add(key, &child);
            }
        }
    }

    pub(crate) fn remove(&self, key: OwnershipKey, node: &Node) {
        self.unmonitor(key, node);
        if let Node::Container(container) = node {
            for child in container.materialized() {
                self.remove(key, &child);
            }
        }
    }

    fn monitor(self: &Rc<Self>, key: OwnershipKey, node: &Node) {
        let id = node.id();
        if let Some(monitor) = self.monitors.borrow_mut().get_mut(&id) {
            monitor.retain(key);
            return;
        }

        let hook = node.on(self.lifecycle_hook(id));
        self.monitors
            .borrow_mut()
            .insert(id, Monitor::new(node.clone(), key, hook));
        if node.is_attached() {
            self.activate(id);
        }
        tracing::debug!(address = %node.address(), kind = %node.kind(), "monitoring node");
        self.events.emit(&DispatcherEvent::Monitor(node.clone()));
    }

    fn unmonitor(&self, key: OwnershipKey, node: &Node) {
        let released = match self.monitors.borrow_mut().get_mut(&node.id()) {
            Some(monitor) => monitor.release(key),
            None => return,
        };
        if released {
            self.teardown(node.id());
        }
    }

    /// Stop monitoring regardless of remaining keys.
    pub(crate) fn teardown(&self, id: NodeId) {
        self.deactivate(id);
        let Some(monitor) = self.monitors.borrow_mut().remove(&id) else {
            return;
        };
        let node = monitor.into_node();
        tracing::debug!(address = %node.address(), "unmonitored node");
        self.events.emit(&DispatcherEvent::Unmonitor(node));
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let ids: Vec<NodeId> = self.monitors.borrow().keys().copied().collect();
        for id in ids {
            self.teardown(id);
        }
    }
}
