use std::time::Duration;

use mixtree_core::NodeError;
use thiserror::Error;

/// Transport failures reported by a [`Port`](crate::Port).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortError {
    #[error("port is closed")]
    Closed,
    #[error("no response from '{address}' within {timeout:?}")]
    Timeout { address: String, timeout: Duration },
    #[error("send to '{address}' failed: {reason}")]
    Send { address: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Node(#[from] NodeError),
    #[error(transparent)]
    Port(#[from] PortError),
    #[error("query for '{address}' timed out after {timeout:?}")]
    QueryTimeout { address: String, timeout: Duration },
    /// Queries need the node's address; detached nodes have none.
    #[error("node is not attached")]
    NotAttached,
}
