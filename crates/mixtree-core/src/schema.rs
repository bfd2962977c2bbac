//! Declarative container layouts.
//!
//! A [`Schema`] lists a container's known properties in declared order, each
//! with the factory that materializes it, plus an optional [`ItemsDef`] for
//! collections. Schemas are immutable once built and shared between all
//! containers of the same type.
//!
//! ```
//! use mixtree_core::{FloatValue, Schema, StringValue};
//!
//! let channel = Schema::builder("channel")
//!     .property("gain", FloatValue::new)
//!     .property("name", StringValue::new)
//!     .callable(true)
//!     .build();
//! assert_eq!(channel.known_properties().collect::<Vec<_>>(), ["gain", "name"]);
//! ```

use std::rc::Rc;

use crate::enums::EnumDef;
use crate::key::Key;
use crate::node::Node;
use crate::scales::linear;
use crate::value::{EnumValue, ScaledValue};

pub type PropertyFactory = Rc<dyn Fn() -> Node>;
pub type ItemFactory = Rc<dyn Fn(usize) -> Node>;

#[derive(Clone)]
pub struct PropertyDef {
    key: String,
    factory: PropertyFactory,
}

impl PropertyDef {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn create(&self) -> Node {
        (self.factory)()
    }
}

/// Homogeneous, integer-indexed children of a collection.
///
/// Items are addressed by `index + base`, left-padded with zeros to `pad`
/// characters.
#[derive(Clone)]
pub struct ItemsDef {
    size: usize,
    base: usize,
    pad: usize,
    factory: ItemFactory,
}

impl ItemsDef {
    pub fn new<F, N>(size: usize, factory: F) -> Self
    where
        F: Fn(usize) -> N + 'static,
        N: Into<Node>,
    {
        Self {
            size,
            base: 1,
            pad: 0,
            factory: Rc::new(move |index| factory(index).into()),
        }
    }

    pub fn base(mut self, base: usize) -> Self {
        self.base = base;
        self
    }

    pub fn pad(mut self, width: usize) -> Self {
        self.pad = width;
        self
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn index_base(&self) -> usize {
        self.base
    }

    pub fn pad_width(&self) -> usize {
        self.pad
    }

    pub fn create(&self, index: usize) -> Node {
        (self.factory)(index)
    }

    /// Address segment of the item at `index`.
    pub fn format_index(&self, index: usize) -> String {
        format!("{:0>width$}", index + self.base, width = self.pad)
    }

    /// Zero-based index named by an address segment, or `None` when the
    /// segment is not numeric. The result is not bounds-checked and may be
    /// negative.
    pub fn parse_segment(&self, segment: &str) -> Option<i64> {
        if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let digits = segment.trim_start_matches('0');
        let number = if digits.is_empty() {
            0
        } else {
            digits.parse::<i64>().unwrap_or(i64::MAX)
        };
        Some(number.saturating_sub(self.base as i64))
    }
}

pub struct Schema {
    name: String,
    properties: Vec<PropertyDef>,
    callable: bool,
    callable_properties: Option<Vec<Key>>,
    items: Option<ItemsDef>,
}

impl Schema {
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            schema: Schema {
                name: name.into(),
                properties: Vec::new(),
                callable: false,
                callable_properties: None,
                items: None,
            },
        }
    }

    /// Start a schema that inherits everything `base` declares, in `base`'s
    /// order.
    pub fn extend(base: &Schema, name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            schema: Schema {
                name: name.into(),
                properties: base.properties.clone(),
                callable: base.callable,
                callable_properties: base.callable_properties.clone(),
                items: base.items.clone(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has(&self, key: &str) -> bool {
        self.property(key).is_some()
    }

    pub fn property(&self, key: &str) -> Option<&PropertyDef> {
        self.properties.iter().find(|def| def.key == key)
    }

    pub fn properties(&self) -> &[PropertyDef] {
        &self.properties
    }

    pub fn known_properties(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|def| def.key.as_str())
    }

    pub fn is_callable(&self) -> bool {
        self.callable
    }

    /// Targets of a distributed call, in order. Defaults to every named
    /// property.
    pub fn callable_properties(&self) -> Vec<Key> {
        match &self.callable_properties {
            Some(keys) => keys.clone(),
            None => self.properties.iter().map(|def| Key::from(&def.key)).collect(),
        }
    }

    pub fn items(&self) -> Option<&ItemsDef> {
        self.items.as_ref()
    }
}

pub struct SchemaBuilder {
    schema: Schema,
}

fn boxed<F, N>(factory: F) -> PropertyFactory
where
    F: Fn() -> N + 'static,
    N: Into<Node>,
{
    Rc::new(move || factory().into())
}

impl SchemaBuilder {
    /// Declare `key`. A key that already exists keeps its position and gets
    /// the new factory.
    pub fn property<F, N>(mut self, key: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> N + 'static,
        N: Into<Node>,
    {
        let key = key.into();
        let factory = boxed(factory);
        match self.schema.properties.iter_mut().find(|def| def.key == key) {
            Some(def) => def.factory = factory,
            None => self.schema.properties.push(PropertyDef { key, factory }),
        }
        self
    }

    /// Declare `key` right before `anchor`, or last when `anchor` is unknown.
    pub fn property_before<F, N>(self, anchor: &str, key: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> N + 'static,
        N: Into<Node>,
    {
        self.place(anchor, 0, key.into(), boxed(factory))
    }

    /// Declare `key` right after `anchor`, or last when `anchor` is unknown.
    pub fn property_after<F, N>(self, anchor: &str, key: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> N + 'static,
        N: Into<Node>,
    {
        self.place(anchor, 1, key.into(), boxed(factory))
    }

    fn place(mut self, anchor: &str, offset: usize, key: String, factory: PropertyFactory) -> Self {
        let properties = &mut self.schema.properties;
        properties.retain(|def| def.key != key);
        let at = properties
            .iter()
            .position(|def| def.key == anchor)
            .map_or(properties.len(), |i| i + offset);
        properties.insert(at, PropertyDef { key, factory });
        self
    }

    pub fn callable(mut self, callable: bool) -> Self {
        self.schema.callable = callable;
        self
    }

    /// Restrict distributed calls to `keys`, in the given order.
    pub fn callable_properties<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        self.schema.callable_properties = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn items(mut self, items: ItemsDef) -> Self {
        self.schema.items = Some(items);
        self
    }

    /// Declare a [`ScaledValue`] over a shared linear scale.
    pub fn linear(self, key: impl Into<String>, min: f32, max: f32, steps: u32) -> Self {
        self.property(key, move || ScaledValue::scaled(linear(min, max, steps)))
    }

    /// Declare an [`EnumValue`] over `def`.
    pub fn enumeration(self, key: impl Into<String>, def: Rc<EnumDef>) -> Self {
        self.property(key, move || EnumValue::enumerated(Rc::clone(&def)))
    }

    pub fn build(self) -> Rc<Schema> {
        Rc::new(self.schema)
    }
}
