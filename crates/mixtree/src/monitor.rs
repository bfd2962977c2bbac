//! Per-node monitoring session.
//!
//! A [`Monitor`] exists for every monitored node. While the node is attached
//! it holds the wire subscription at the node's address (callable nodes only)
//! and the listener forwarding local mutations to the peer. Listeners
//! registered on nodes and on the port reach the dispatcher through a weak
//! reference, so neither keeps it alive.

use std::collections::HashSet;
use std::rc::Rc;

use mixtree_core::{Argument, ListenerId, Node, NodeEvent, NodeId};

use crate::dispatcher::{Inner, OwnershipKey};
use crate::port::{Message, MessageHandler, SubscriptionId};

pub(crate) struct Monitor {
    node: Node,
    keys: HashSet<OwnershipKey>,
    hook: ListenerId,
    forwarding: Option<ListenerId>,
    subscription: Option<(String, SubscriptionId)>,
}

impl Monitor {
    pub(crate) fn new(node: Node, key: OwnershipKey, hook: ListenerId) -> Self {
        Self {
            node,
            keys: HashSet::from([key]),
            hook,
            forwarding: None,
            subscription: None,
        }
    }

    pub(crate) fn retain(&mut self, key: OwnershipKey) {
        self.keys.insert(key);
    }

    /// Returns true when the last key is gone.
    pub(crate) fn release(&mut self, key: OwnershipKey) -> bool {
        self.keys.remove(&key);
        self.keys.is_empty()
    }

    pub(crate) fn keys(&self) -> impl Iterator<Item = OwnershipKey> + '_ {
        self.keys.iter().copied()
    }

    pub(crate) fn into_node(self) -> Node {
        self.node.off(self.hook);
        self.node
    }
}

impl Inner {
    pub(crate) fn lifecycle_hook(self: &Rc<Self>, id: NodeId) -> impl Fn(&NodeEvent) + 'static {
        let inner = Rc::downgrade(self);
        move |event: &NodeEvent| {
            let Some(inner) = inner.upgrade() else {
                return;
            };
            match event {
                NodeEvent::Attached { .. } => inner.activate(id),
                NodeEvent::Detached { .. } => inner.deactivate(id),
                NodeEvent::ChildAttached { child } => inner.propagate(id, child),
                NodeEvent::Destroy => inner.teardown(id),
                _ => {}
            }
        }
    }

    fn node_of(&self, id: NodeId) -> Option<Node> {
        self.monitors
            .borrow()
            .get(&id)
            .map(|monitor| monitor.node.clone())
    }

    /// Subscribe at the node's current address and start forwarding.
    pub(crate) fn activate(self: &Rc<Self>, id: NodeId) {
        let Some(node) = self.node_of(id) else {
            return;
        };
        self.deactivate(id);

        let address = node.address();
        let subscription = if node.is_callable() && !address.is_empty() {
            let subscription = self.port.subscribe(&address, self.inbound_handler(id));
            tracing::debug!(%address, "subscribed");
            Some((address, subscription))
        } else {
            None
        };
        let forwarding = node
            .local_mutation()
            .map(|observable| observable.on_local_mutation(self.forwarder(id)));

        if let Some(monitor) = self.monitors.borrow_mut().get_mut(&id) {
            monitor.subscription = subscription;
            monitor.forwarding = forwarding;
        }
    }

    pub(crate) fn deactivate(&self, id: NodeId) {
        let (node, subscription, forwarding) = match self.monitors.borrow_mut().get_mut(&id) {
            Some(monitor) => (
                monitor.node.clone(),
                monitor.subscription.take(),
                monitor.forwarding.take(),
            ),
            None => return,
        };
        if let Some((address, subscription)) = subscription {
            self.port.unsubscribe(&address, subscription);
            tracing::debug!(%address, "unsubscribed");
        }
        if let (Some(observable), Some(listener)) = (node.local_mutation(), forwarding) {
            observable.off_local_mutation(listener);
        }
    }

    /// Hand every key of container `id` to a newly attached child.
    fn propagate(self: &Rc<Self>, id: NodeId, child: &Node) {
        let keys: Vec<OwnershipKey> = match self.monitors.borrow().get(&id) {
            Some(monitor) => monitor.keys().collect(),
            None => return,
        };
        for key in keys {
            self.add(key, child);
        }
    }

    fn inbound_handler(self: &Rc<Self>, id: NodeId) -> MessageHandler {
        let inner = Rc::downgrade(self);
        Rc::new(move |message: &Message| {
            if let Some(inner) = inner.upgrade() {
                inner.route(id, message);
            }
        })
    }

    fn route(&self, id: NodeId, message: &Message) {
        let Some(node) = self.node_of(id) else {
            return;
        };
        tracing::trace!(
            address = %message.address,
            args = message.args.len(),
            "routing inbound call"
        );
        match node.handle_call(message.peer.as_ref(), &message.args) {
            Ok(Some(response)) => {
                let address = node.address();
                if let Err(err) = self.port.send(&address, response, message.peer.as_ref()) {
                    tracing::warn!(%address, %err, "failed to send response");
                }
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(address = %message.address, %err, "inbound call failed");
            }
        }
    }

    fn forwarder(self: &Rc<Self>, id: NodeId) -> Rc<dyn Fn(&[Argument])> {
        let inner = Rc::downgrade(self);
        Rc::new(move |args: &[Argument]| {
            if let Some(inner) = inner.upgrade() {
                inner.forward(id, args);
            }
        })
    }

    fn forward(&self, id: NodeId, args: &[Argument]) {
        let Some(node) = self.node_of(id) else {
            return;
        };
        let address = node.address();
        if address.is_empty() {
            return;
        }
        tracing::trace!(%address, args = args.len(), "forwarding local mutation");
        if let Err(err) = self.port.send(&address, args.to_vec(), None) {
            tracing::warn!(%address, %err, "failed to forward local mutation");
        }
    }
}
