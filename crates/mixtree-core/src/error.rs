use thiserror::Error;

use crate::node::NodeKind;

/// Structural failures of the node tree. All of them are reported
/// synchronously to the caller that triggered them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
    #[error("node is not callable: '{address}'")]
    NotCallable { address: String },
    #[error("unknown property: '{key}'")]
    UnknownProperty { key: String },
    #[error("index {index} out of range for collection of size {size}")]
    IndexOutOfRange { index: i64, size: usize },
    #[error("address not found: '{0}'")]
    AddressNotFound(String),
    #[error("node at '{address}' is a {actual}, expected {expected}")]
    WrongKind {
        address: String,
        expected: NodeKind,
        actual: NodeKind,
    },
    #[error("value at '{address}' does not hold {expected}")]
    ValueType {
        address: String,
        expected: &'static str,
    },
    #[error("unknown enum name: '{0}'")]
    UnknownVariant(String),
    #[error("node is already attached at '{0}'")]
    AlreadyAttached(String),
}
