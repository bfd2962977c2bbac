//! Reading state from the peer.

use std::future;
use std::rc::Rc;

use async_recursion::async_recursion;
use futures::future::try_join_all;
use mixtree_core::{AnyValue, Argument, Container, Node, Value, ValueCodec};
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};

use crate::dispatcher::{Dispatcher, OwnershipKey};
use crate::error::{DispatchError, PortError};
use crate::port::{Message, MessageHandler, Port, SubscriptionId};

/// Port subscription released on drop, whichever way a query ends.
struct SubscriptionGuard {
    port: Rc<dyn Port>,
    address: String,
    id: SubscriptionId,
}

impl SubscriptionGuard {
    fn new(port: Rc<dyn Port>, address: &str, handler: MessageHandler) -> Self {
        let id = port.subscribe(address, handler);
        Self {
            port,
            address: address.to_string(),
            id,
        }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.port.unsubscribe(&self.address, self.id);
    }
}

impl Dispatcher {
    /// Ask the peer for `value` and resolve with the value once answered.
    ///
    /// The request is re-sent every `retry_interval_ms` until a message with
    /// arguments arrives at the value's address, or until
    /// `query_timeout_ms` elapses.
    pub async fn query<C: ValueCodec>(
        &self,
        value: &Rc<Value<C>>,
    ) -> Result<Option<C::Item>, DispatchError> {
        let erased: Rc<dyn AnyValue> = value.clone();
        self.query_value(&erased).await?;
        Ok(value.get())
    }

    /// Monitor `value` for `key`, then query it.
    pub async fn add_and_query<C: ValueCodec>(
        &self,
        key: OwnershipKey,
        value: &Rc<Value<C>>,
    ) -> Result<Option<C::Item>, DispatchError> {
        self.add(key, &[Node::from(Rc::clone(value))]);
        self.query(value).await
    }

    /// Query several values concurrently. Resolves with their wire forms in
    /// order, or with the first failure.
    pub async fn query_all(
        &self,
        values: &[Rc<dyn AnyValue>],
    ) -> Result<Vec<Option<Argument>>, DispatchError> {
        try_join_all(values.iter().map(|value| async move {
            self.query_value(value).await?;
            Ok::<_, DispatchError>(value.to_wire())
        }))
        .await
    }

    /// Type-erased [`Dispatcher::query`].
    pub async fn query_value(&self, value: &Rc<dyn AnyValue>) -> Result<(), DispatchError> {
        let address = value.core().address();
        if address.is_empty() {
            return Err(DispatchError::NotAttached);
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
        let _subscription = SubscriptionGuard::new(
            Rc::clone(&self.inner.port),
            &address,
            Rc::new(move |message: &Message| {
                if !message.args.is_empty() {
                    let _ = tx.send(message.clone());
                }
            }),
        );

        let mut retry = time::interval(self.inner.config.retry_interval());
        retry.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let timeout = self.inner.config.query_timeout();
        let expired = async move {
            match timeout {
                Some(timeout) => time::sleep(timeout).await,
                None => future::pending::<()>().await,
            }
        };
        tokio::pin!(expired);

        let message = loop {
            tokio::select! {
                biased;
                received = rx.recv() => match received {
                    Some(message) => break message,
                    None => return Err(PortError::Closed.into()),
                },
                () = &mut expired => {
                    let timeout = timeout.unwrap_or_default();
                    tracing::debug!(%address, ?timeout, "query timed out");
                    return Err(DispatchError::QueryTimeout {
                        address: address.clone(),
                        timeout,
                    });
                }
                _ = retry.tick() => {
                    tracing::debug!(%address, "sending query");
                    let sent = match self.inner.port.send(&address, Vec::new(), None) {
                        Ok(()) => self.inner.port.flush().await,
                        Err(err) => Err(err),
                    };
                    if let Err(err) = sent {
                        tracing::warn!(%address, %err, "failed to send query");
                    }
                }
            }
        };

        if !self.inner.is_monitored(value.core().id()) {
            value.handle_call(message.peer.as_ref(), message.args.first());
        }
        Ok(())
    }

    /// Read whole subtrees from the peer.
    ///
    /// Values are queried; callable containers are read with one round trip
    /// and only the children that answer did not cover are visited further;
    /// other containers are descended into child by child. A callable
    /// container that does not answer its round trip is skipped with its
    /// subtree; any other failure fails the discovery.
    pub async fn query_recursive(&self, nodes: &[Node]) -> Result<(), DispatchError> {
        try_join_all(nodes.iter().cloned().map(|node| self.discover(node))).await?;
        Ok(())
    }

    #[async_recursion(?Send)]
    async fn discover(&self, node: Node) -> Result<(), DispatchError> {
        let container = match node {
            Node::Value(value) => return self.query_value(&value).await,
            Node::Command(_) => return Ok(()),
            Node::Container(container) => container,
        };
        let pending = if container.is_callable() {
            self.read_container(&container).await?
        } else {
            container.children()
        };
        try_join_all(pending.into_iter().map(|child| self.discover(child))).await?;
        Ok(())
    }

    /// Children of a callable container left to visit after one round trip:
    /// the callable properties past the point the answer reached, then
    /// everything the call does not cover. A container that does not answer
    /// in time has nothing left to visit.
    async fn read_container(&self, container: &Rc<Container>) -> Result<Vec<Node>, DispatchError> {
        let address = container.core().address();
        if address.is_empty() {
            return Err(DispatchError::NotAttached);
        }
        let response = match self
            .inner
            .port
            .query(&address, self.inner.config.round_trip_timeout())
            .await
        {
            Ok(response) => response,
            Err(PortError::Timeout { timeout, .. }) => {
                tracing::debug!(%address, ?timeout, "container did not answer, skipping");
                return Ok(Vec::new());
            }
            Err(err) => return Err(err.into()),
        };

        let props = container.callable_properties();
        let unused = if response.args.is_empty() {
            props.clone()
        } else {
            let apply = !self.inner.is_monitored(container.core().id());
            let (_, unused) = container.apply_to_values(&props, &response.args, |value, arg| {
                if apply {
                    value.handle_call(response.peer.as_ref(), arg);
                }
                Some(())
            })?;
            unused
        };
        tracing::debug!(
            %address,
            answered = props.len() - unused.len(),
            "read container"
        );

        let keys = container.keys();
        let uncovered = keys.iter().filter(|key| !props.contains(key));
        let mut pending = Vec::new();
        for key in unused.iter().chain(uncovered) {
            pending.push(container.get(key.clone())?);
        }
        Ok(pending)
    }
}
