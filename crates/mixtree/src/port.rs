//! Transport contract and an in-process implementation.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use mixtree_core::{Argument, Peer};
use tokio::sync::mpsc;

use crate::error::PortError;

/// One decoded wire message.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub address: String,
    pub args: Vec<Argument>,
    pub peer: Option<Peer>,
}

impl Message {
    pub fn new(address: impl Into<String>, args: Vec<Argument>, peer: Option<Peer>) -> Self {
        Self {
            address: address.into(),
            args,
            peer,
        }
    }
}

/// Handle of one subscription, unique per port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl From<u64> for SubscriptionId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

pub type MessageHandler = Rc<dyn Fn(&Message)>;

/// Address-based messaging endpoint connected to one or more peers.
///
/// Sends are fire-and-forget. Inbound messages are delivered to every
/// handler subscribed at exactly the message's address.
#[async_trait(?Send)]
pub trait Port {
    fn subscribe(&self, address: &str, handler: MessageHandler) -> SubscriptionId;

    /// Returns false when `id` was not subscribed at `address`.
    fn unsubscribe(&self, address: &str, id: SubscriptionId) -> bool;

    /// Queue one outbound message. Implementations must not block here;
    /// writes that can stall belong in [`Port::flush`].
    fn send(&self, address: &str, args: Vec<Argument>, peer: Option<&Peer>)
        -> Result<(), PortError>;

    /// Wait until queued messages are handed to the transport.
    async fn flush(&self) -> Result<(), PortError> {
        Ok(())
    }

    /// One request/response round trip: send a parameterless message to
    /// `address` and wait for the first message arriving there.
    async fn query(&self, address: &str, timeout: Duration) -> Result<Message, PortError> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = self.subscribe(
            address,
            Rc::new(move |message: &Message| {
                let _ = tx.send(message.clone());
            }),
        );
        let sent = match self.send(address, Vec::new(), None) {
            Ok(()) => self.flush().await,
            Err(err) => Err(err),
        };
        let outcome = match sent {
            Ok(()) => match tokio::time::timeout(timeout, rx.recv()).await {
                Ok(Some(message)) => Ok(message),
                Ok(None) => Err(PortError::Closed),
                Err(_) => Err(PortError::Timeout {
                    address: address.to_string(),
                    timeout,
                }),
            },
            Err(err) => Err(err),
        };
        self.unsubscribe(address, id);
        outcome
    }
}

/// Computes the peer's answer to an outbound message, if it answers.
pub type Responder = Box<dyn Fn(&str, &[Argument]) -> Option<Vec<Argument>>>;

/// In-process [`Port`].
///
/// Outbound messages are recorded, and optionally answered by a responder
/// standing in for the peer. Inbound traffic is injected with
/// [`MemoryPort::deliver`].
pub struct MemoryPort {
    peer: Peer,
    next_id: Cell<u64>,
    handlers: RefCell<BTreeMap<String, Vec<(SubscriptionId, MessageHandler)>>>,
    sent: RefCell<Vec<Message>>,
    responder: RefCell<Option<Responder>>,
    subscribes: Cell<usize>,
    unsubscribes: Cell<usize>,
    closed: Cell<bool>,
}

impl Default for MemoryPort {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPort {
    pub fn new() -> Self {
        Self::with_peer(Peer::new("memory"))
    }

    /// Responses produced by the responder are attributed to `peer`.
    pub fn with_peer(peer: Peer) -> Self {
        Self {
            peer,
            next_id: Cell::new(1),
            handlers: RefCell::new(BTreeMap::new()),
            sent: RefCell::new(Vec::new()),
            responder: RefCell::new(None),
            subscribes: Cell::new(0),
            unsubscribes: Cell::new(0),
            closed: Cell::new(false),
        }
    }

    /// Answer outbound messages. The responder sees every send, requests and
    /// replies alike; returning `None` leaves a message unanswered.
    pub fn respond_with<F>(&self, responder: F)
    where
        F: Fn(&str, &[Argument]) -> Option<Vec<Argument>> + 'static,
    {
        self.responder.replace(Some(Box::new(responder)));
    }

    pub fn clear_responder(&self) {
        self.responder.replace(None);
    }

    /// Inject an inbound message. Returns the number of handlers reached.
    pub fn deliver(&self, address: &str, args: Vec<Argument>, peer: Option<Peer>) -> usize {
        let handlers: Vec<MessageHandler> = self
            .handlers
            .borrow()
            .get(address)
            .map(|entries| entries.iter().map(|(_, h)| Rc::clone(h)).collect())
            .unwrap_or_default();
        let message = Message::new(address, args, peer);
        for handler in &handlers {
            handler(&message);
        }
        handlers.len()
    }

    pub fn sent(&self) -> Vec<Message> {
        self.sent.borrow().clone()
    }

    pub fn sent_to(&self, address: &str) -> Vec<Message> {
        self.sent
            .borrow()
            .iter()
            .filter(|message| message.address == address)
            .cloned()
            .collect()
    }

    pub fn take_sent(&self) -> Vec<Message> {
        self.sent.take()
    }

    pub fn subscriber_count(&self, address: &str) -> usize {
        self.handlers.borrow().get(address).map_or(0, Vec::len)
    }

    /// Every address with at least one subscriber.
    pub fn subscribed_addresses(&self) -> Vec<String> {
        self.handlers.borrow().keys().cloned().collect()
    }

    pub fn subscribe_count(&self) -> usize {
        self.subscribes.get()
    }

    pub fn unsubscribe_count(&self) -> usize {
        self.unsubscribes.get()
    }

    /// Every later send fails with [`PortError::Closed`].
    pub fn close(&self) {
        self.closed.set(true);
    }
}

#[async_trait(?Send)]
impl Port for MemoryPort {
    fn subscribe(&self, address: &str, handler: MessageHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(self.next_id.get() + 1);
        self.handlers
            .borrow_mut()
            .entry(address.to_string())
            .or_default()
            .push((id, handler));
        self.subscribes.set(self.subscribes.get() + 1);
        id
    }

    fn unsubscribe(&self, address: &str, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let Some(entries) = handlers.get_mut(address) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(entry, _)| *entry != id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            handlers.remove(address);
        }
        if removed {
            self.unsubscribes.set(self.unsubscribes.get() + 1);
        }
        removed
    }

    fn send(
        &self,
        address: &str,
        args: Vec<Argument>,
        peer: Option<&Peer>,
    ) -> Result<(), PortError> {
        if self.closed.get() {
            return Err(PortError::Closed);
        }
        let response = self
            .responder
            .borrow()
            .as_ref()
            .and_then(|responder| responder(address, &args));
        self.sent
            .borrow_mut()
            .push(Message::new(address, args, peer.cloned()));
        if let Some(response) = response {
            self.deliver(address, response, Some(self.peer.clone()));
        }
        Ok(())
    }
}
