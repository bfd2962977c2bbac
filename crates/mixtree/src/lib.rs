//! mixtree - Synchronizes a `mixtree-core` node tree with a remote peer.
//!
//! A [`Dispatcher`] sits between the tree and a [`Port`]. Nodes handed to it
//! under an [`OwnershipKey`] are monitored: inbound calls at their address
//! are applied and answered, local changes are forwarded, and containers
//! pass their keys on to children created later. Queries read current state
//! from the peer, one value at a time or whole subtrees at once.
//!
//! Like the tree itself, everything here is single-threaded. Run async
//! operations on a current-thread runtime or a `LocalSet`.

pub mod config;
pub mod dispatcher;
pub mod error;
mod monitor;
pub mod port;
mod query;

pub use config::DispatcherConfig;
pub use dispatcher::{Dispatcher, DispatcherEvent, OwnershipKey};
pub use error::{DispatchError, PortError};
pub use port::{MemoryPort, Message, MessageHandler, Port, Responder, SubscriptionId};
