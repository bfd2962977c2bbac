//! mixtree-core - Typed node tree mirroring a remote control surface.
//!
//! The tree is built from [`Value`]s, [`Command`]s and [`Container`]s laid out
//! by [`Schema`]s, usually under a [`Root`]. Every node knows its
//! slash-delimited address once attached and reports its lifecycle and
//! mutations through [`NodeEvent`]s. Synchronization with the peer lives in
//! the `mixtree` crate.
//!
//! Everything here is single-threaded: nodes are `Rc`-shared and `!Send`.

pub mod collection;
pub mod command;
pub mod container;
pub mod enums;
pub mod error;
pub mod events;
pub mod key;
pub mod node;
pub mod root;
pub mod scales;
pub mod schema;
pub mod value;
pub mod view;
pub mod wire;

pub use collection::Collection;
pub use command::Command;
pub use container::Container;
pub use enums::EnumDef;
pub use error::NodeError;
pub use events::{Emitter, ListenerId, NodeEvent, ObservesLocalMutation, Origin};
pub use key::Key;
pub use node::{FromNode, Node, NodeCore, NodeId, NodeKind};
pub use root::Root;
pub use scales::{linear, LinearScale, Scale};
pub use schema::{ItemsDef, PropertyDef, Schema, SchemaBuilder};
pub use value::{
    AnyValue, BoolCodec, BooleanValue, EnumCodec, EnumValue, FloatCodec, FloatValue, IntCodec,
    IntValue, ScaledCodec, ScaledValue, StringCodec, StringValue, Value, ValueCodec,
};
pub use wire::{Argument, Peer};
