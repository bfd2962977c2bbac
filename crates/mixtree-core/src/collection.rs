use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::container::Container;
use crate::error::NodeError;
use crate::key::Key;
use crate::node::{FromNode, Node, NodeKind};
use crate::schema::{ItemsDef, Schema};

/// Typed view of a container with homogeneous integer-indexed items.
///
/// Indices are zero-based; the schema's [`ItemsDef`] decides how they are
/// rendered into addresses.
pub struct Collection<T> {
    container: Rc<Container>,
    _item: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            container: Rc::clone(&self.container),
            _item: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Collection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("address", &self.container.core().address())
            .field("len", &self.len())
            .finish()
    }
}

impl<T> Collection<T> {
    pub fn new(schema: Rc<Schema>) -> Result<Self, NodeError> {
        Self::from_container(Rc::new(Container::new(schema)))
    }

    /// A collection with no named properties besides its items.
    pub fn with_items(name: impl Into<String>, items: ItemsDef) -> Self {
        let schema = Schema::builder(name).items(items).build();
        Self {
            container: Rc::new(Container::new(schema)),
            _item: PhantomData,
        }
    }

    pub fn from_container(container: Rc<Container>) -> Result<Self, NodeError> {
        if !container.is_collection() {
            return Err(Node::Container(container).wrong_kind(NodeKind::Collection));
        }
        Ok(Self {
            container,
            _item: PhantomData,
        })
    }

    pub fn container(&self) -> &Rc<Container> {
        &self.container
    }

    pub fn len(&self) -> usize {
        self.container.item_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the item at `index`, detaching and destroying the previous one.
    pub fn set(&self, index: usize, item: impl Into<Node>) -> Result<(), NodeError> {
        self.container.set(Key::Index(index), item)
    }
}

impl<T: FromNode> Collection<T> {
    pub fn get(&self, index: usize) -> Result<T, NodeError> {
        self.container.get_as(Key::Index(index))
    }

    /// Every item in index order, materializing lazily as the iterator
    /// advances.
    pub fn iter(&self) -> impl Iterator<Item = Result<T, NodeError>> + '_ {
        (0..self.len()).map(move |index| self.get(index))
    }
}

impl<T> FromNode for Collection<T> {
    fn from_node(node: Node) -> Result<Self, NodeError> {
        Self::from_container(node.into_container()?)
    }
}

impl<T> From<Collection<T>> for Node {
    fn from(collection: Collection<T>) -> Self {
        Node::Container(collection.container)
    }
}
