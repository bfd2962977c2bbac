//! Leaf nodes holding a single optional scalar.
//!
//! A [`Value`] is generic over a [`ValueCodec`], which decides what the value
//! stores and how it converts to and from wire [`Argument`]s. The concrete
//! variants are type aliases over the codecs at the bottom of this module.
//! [`AnyValue`] is the object-safe face every value shows to containers and
//! to the dispatcher.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use mixtree_util::to_significant_digits;
use serde_json::Value as Json;

use crate::enums::EnumDef;
use crate::error::NodeError;
use crate::events::{ListenerId, NodeEvent, ObservesLocalMutation, Origin};
use crate::node::{FromNode, Node, NodeCore, NodeKind};
use crate::scales::Scale;
use crate::wire::{Argument, Peer};

/// Conversion between a stored item and its wire form.
pub trait ValueCodec: 'static {
    type Item: Clone + PartialEq + fmt::Debug + 'static;

    /// Human-readable name of the stored type, used in error messages.
    const NAME: &'static str;

    /// `None` when the argument's type is not accepted.
    fn decode(&self, arg: &Argument) -> Option<Self::Item>;

    fn encode(&self, item: &Self::Item) -> Argument;

    fn describe(&self, item: &Self::Item) -> String;

    fn to_json(&self, item: &Self::Item) -> Json {
        self.encode(item).to_json()
    }
}

pub struct Value<C: ValueCodec> {
    core: NodeCore,
    codec: C,
    current: RefCell<Option<C::Item>>,
    nullable: bool,
    echo: bool,
}

impl<C: ValueCodec + Default> Value<C> {
    pub fn new() -> Self {
        Self::with_codec(C::default())
    }
}

impl<C: ValueCodec + Default> Default for Value<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ValueCodec> Value<C> {
    pub fn with_codec(codec: C) -> Self {
        Self {
            core: NodeCore::new(),
            codec,
            current: RefCell::new(None),
            nullable: false,
            echo: false,
        }
    }

    /// Accept and emit the null sentinel for "unset".
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Answer every inbound set with the resulting wire value.
    pub fn echoing(mut self) -> Self {
        self.echo = true;
        self
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn get(&self) -> Option<C::Item> {
        self.current.borrow().clone()
    }

    /// Local-origin update. Returns whether the stored value changed.
    pub fn set(&self, value: Option<C::Item>) -> bool {
        self.set_with(value, Origin::Local)
    }

    /// Store `value` and emit the change event matching `origin`. Setting an
    /// equal value is a no-op and emits nothing.
    pub fn set_with(&self, value: Option<C::Item>, origin: Origin) -> bool {
        {
            let mut current = self.current.borrow_mut();
            if *current == value {
                return false;
            }
            *current = value;
        }
        let event = match origin {
            Origin::Local => NodeEvent::LocalChange {
                wire: self.to_wire(),
            },
            Origin::Remote(peer) => NodeEvent::RemoteChange { peer },
        };
        self.core.emit(&event);
        true
    }
}

impl<C: ValueCodec> fmt::Display for Value<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.current.borrow().as_ref() {
            Some(item) => f.write_str(&self.codec.describe(item)),
            None => f.write_str("not set"),
        }
    }
}

impl<C: ValueCodec> ObservesLocalMutation for Value<C> {
    fn on_local_mutation(&self, listener: Rc<dyn Fn(&[Argument])>) -> ListenerId {
        self.core.on(move |event| {
            if let NodeEvent::LocalChange { wire: Some(arg) } = event {
                listener(std::slice::from_ref(arg));
            }
        })
    }

    fn off_local_mutation(&self, id: ListenerId) -> bool {
        self.core.off(id)
    }
}

/// Type-erased view of a [`Value`].
pub trait AnyValue: ObservesLocalMutation + fmt::Display {
    fn core(&self) -> &NodeCore;

    fn is_set(&self) -> bool;

    fn is_nullable(&self) -> bool;

    fn echoes(&self) -> bool;

    /// Current wire form: the encoded value, the null sentinel for an unset
    /// nullable value, or nothing.
    fn to_wire(&self) -> Option<Argument>;

    /// Convert and store `arg`. Unaccepted argument types leave the value
    /// untouched. Returns whether the stored value changed.
    fn apply_wire(&self, arg: &Argument, origin: Origin) -> bool;

    fn to_json(&self) -> Json;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Rc<Self>) -> Rc<dyn Any>;

    fn as_local_mutation(&self) -> &dyn ObservesLocalMutation;

    /// Copy `source` into this value as a local change.
    fn merge_from(&self, source: &dyn AnyValue) -> bool {
        match source.to_wire() {
            Some(arg) => self.apply_wire(&arg, Origin::Local),
            None => false,
        }
    }

    /// Inbound call: with an argument, apply it as a remote change and
    /// return the new wire value when echoing; without one, return the
    /// current wire value.
    fn handle_call(&self, peer: Option<&Peer>, arg: Option<&Argument>) -> Option<Argument> {
        match arg {
            Some(arg) => {
                self.apply_wire(arg, Origin::Remote(peer.cloned()));
                if self.echoes() {
                    self.to_wire()
                } else {
                    None
                }
            }
            None => self.to_wire(),
        }
    }
}

impl<C: ValueCodec> AnyValue for Value<C> {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn is_set(&self) -> bool {
        self.current.borrow().is_some()
    }

    fn is_nullable(&self) -> bool {
        self.nullable
    }

    fn echoes(&self) -> bool {
        self.echo
    }

    fn to_wire(&self) -> Option<Argument> {
        match self.current.borrow().as_ref() {
            Some(item) => Some(self.codec.encode(item)),
            None if self.nullable => Some(Argument::Null),
            None => None,
        }
    }

    fn apply_wire(&self, arg: &Argument, origin: Origin) -> bool {
        if self.nullable && arg.is_null() {
            return self.set_with(None, origin);
        }
        match self.codec.decode(arg) {
            Some(item) => self.set_with(Some(item), origin),
            None => {
                tracing::debug!(
                    address = %self.core.address(),
                    tag = %arg.type_tag(),
                    expected = C::NAME,
                    "ignoring unaccepted wire argument"
                );
                false
            }
        }
    }

    fn to_json(&self) -> Json {
        self.current
            .borrow()
            .as_ref()
            .map_or(Json::Null, |item| self.codec.to_json(item))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }

    fn as_local_mutation(&self) -> &dyn ObservesLocalMutation {
        self
    }

    fn merge_from(&self, source: &dyn AnyValue) -> bool {
        match source.as_any().downcast_ref::<Value<C>>() {
            Some(same) => match same.get() {
                Some(item) => self.set(Some(item)),
                None => false,
            },
            None => match source.to_wire() {
                Some(arg) => self.apply_wire(&arg, Origin::Local),
                None => false,
            },
        }
    }
}

impl<C: ValueCodec> From<Value<C>> for Node {
    fn from(value: Value<C>) -> Self {
        Node::Value(Rc::new(value))
    }
}

impl<C: ValueCodec> From<Rc<Value<C>>> for Node {
    fn from(value: Rc<Value<C>>) -> Self {
        Node::Value(value)
    }
}

impl<C: ValueCodec> FromNode for Rc<Value<C>> {
    fn from_node(node: Node) -> Result<Self, NodeError> {
        match node {
            Node::Value(value) => {
                let address = value.core().address();
                value
                    .into_any()
                    .downcast::<Value<C>>()
                    .map_err(|_| NodeError::ValueType {
                        address,
                        expected: C::NAME,
                    })
            }
            other => Err(other.wrong_kind(NodeKind::Value)),
        }
    }
}

// ── Codecs ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct IntCodec;

impl ValueCodec for IntCodec {
    type Item = i32;
    const NAME: &'static str = "integer";

    fn decode(&self, arg: &Argument) -> Option<i32> {
        arg.as_int()
    }

    fn encode(&self, item: &i32) -> Argument {
        Argument::Int(*item)
    }

    fn describe(&self, item: &i32) -> String {
        item.to_string()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FloatCodec;

impl ValueCodec for FloatCodec {
    type Item = f32;
    const NAME: &'static str = "float";

    fn decode(&self, arg: &Argument) -> Option<f32> {
        arg.as_float()
    }

    fn encode(&self, item: &f32) -> Argument {
        Argument::Float(*item)
    }

    fn describe(&self, item: &f32) -> String {
        item.to_string()
    }
}

/// Float stored raw; integers on the wire are step indices of the scale.
#[derive(Clone)]
pub struct ScaledCodec {
    scale: Rc<dyn Scale>,
}

impl ScaledCodec {
    pub fn new(scale: Rc<dyn Scale>) -> Self {
        Self { scale }
    }

    pub fn scale(&self) -> &dyn Scale {
        self.scale.as_ref()
    }
}

impl ValueCodec for ScaledCodec {
    type Item = f32;
    const NAME: &'static str = "scaled float";

    fn decode(&self, arg: &Argument) -> Option<f32> {
        match arg {
            Argument::Int(step) => Some(self.scale.step_to_raw(*step)),
            Argument::Float(raw) => Some(*raw),
            _ => None,
        }
    }

    fn encode(&self, item: &f32) -> Argument {
        Argument::Float(*item)
    }

    fn describe(&self, item: &f32) -> String {
        format!(
            "{} ({})",
            to_significant_digits(f64::from(*item), 4, true),
            self.scale.raw_to_step(*item)
        )
    }
}

/// Integer code; accepts either the code or its name on the wire.
#[derive(Debug, Clone)]
pub struct EnumCodec {
    def: Rc<EnumDef>,
}

impl EnumCodec {
    pub fn new(def: Rc<EnumDef>) -> Self {
        Self { def }
    }

    pub fn def(&self) -> &EnumDef {
        &self.def
    }
}

impl ValueCodec for EnumCodec {
    type Item = i32;
    const NAME: &'static str = "enum";

    fn decode(&self, arg: &Argument) -> Option<i32> {
        match arg {
            Argument::Str(name) => self.def.code_of(name),
            Argument::Int(code) => Some(*code),
            _ => None,
        }
    }

    fn encode(&self, item: &i32) -> Argument {
        Argument::Int(*item)
    }

    fn describe(&self, item: &i32) -> String {
        format!("{} ({})", item, self.def.name_of(*item).unwrap_or("?"))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StringCodec;

impl ValueCodec for StringCodec {
    type Item = String;
    const NAME: &'static str = "string";

    fn decode(&self, arg: &Argument) -> Option<String> {
        arg.as_str().map(str::to_string)
    }

    fn encode(&self, item: &String) -> Argument {
        Argument::Str(item.clone())
    }

    fn describe(&self, item: &String) -> String {
        item.clone()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BoolCodec;

impl ValueCodec for BoolCodec {
    type Item = bool;
    const NAME: &'static str = "boolean";

    fn decode(&self, arg: &Argument) -> Option<bool> {
        arg.as_bool()
    }

    fn encode(&self, item: &bool) -> Argument {
        Argument::Bool(*item)
    }

    fn describe(&self, item: &bool) -> String {
        item.to_string()
    }
}

pub type IntValue = Value<IntCodec>;
pub type FloatValue = Value<FloatCodec>;
pub type ScaledValue = Value<ScaledCodec>;
pub type EnumValue = Value<EnumCodec>;
pub type StringValue = Value<StringCodec>;
pub type BooleanValue = Value<BoolCodec>;

impl Value<ScaledCodec> {
    pub fn scaled(scale: Rc<dyn Scale>) -> Self {
        Self::with_codec(ScaledCodec::new(scale))
    }

    /// Current position on the scale's step grid.
    pub fn step(&self) -> Option<i32> {
        self.get().map(|raw| self.codec.scale.raw_to_step(raw))
    }

    pub fn set_step(&self, step: i32) -> bool {
        self.set(Some(self.codec.scale.step_to_raw(step)))
    }
}

impl Value<EnumCodec> {
    pub fn enumerated(def: Rc<EnumDef>) -> Self {
        Self::with_codec(EnumCodec::new(def))
    }

    /// Name of the current code, if set and known.
    pub fn name(&self) -> Option<String> {
        self.get()
            .and_then(|code| self.codec.def.name_of(code).map(str::to_string))
    }

    pub fn set_name(&self, name: &str) -> Result<bool, NodeError> {
        let code = self
            .codec
            .def
            .code_of(name)
            .ok_or_else(|| NodeError::UnknownVariant(name.to_string()))?;
        Ok(self.set(Some(code)))
    }
}
