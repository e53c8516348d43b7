//! Path-aware views over values in a store.

use crate::error::value_type_name;
use crate::event::{MutationEvent, MutationMetadata, Operation};
use crate::handlers::{handler_for, ListNode, MapNode, ObjectNode};
use crate::store::StoreInner;
use crate::{ArborError, ArborResult, Kind, Path, Seg, Store, Value};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::{Arc, Weak};

/// A wrapper over one version of a container value.
///
/// Nodes are immutable snapshots. Reads see the value the node was created
/// with; writes go to the store and produce new nodes. Use
/// [`Lifecycle::reload`](crate::Lifecycle::reload) to get the current version.
#[derive(Clone)]
pub struct Node {
    inner: Arc<NodeInner>,
}

struct NodeInner {
    value: Value,
    binding: Option<Binding>,
}

struct Binding {
    store: Weak<StoreInner>,
    path: Path,
}

impl Node {
    /// Wrap a value that is not part of any store.
    ///
    /// Reads work as usual; writes and lifecycle operations fail with
    /// [`ArborError::NotBound`].
    pub fn unbound(value: impl Into<Value>) -> Self {
        Self {
            inner: Arc::new(NodeInner {
                value: value.into(),
                binding: None,
            }),
        }
    }

    pub(crate) fn bound(value: Value, store: Weak<StoreInner>, path: Path) -> Self {
        Self {
            inner: Arc::new(NodeInner {
                value,
                binding: Some(Binding { store, path }),
            }),
        }
    }

    /// The snapshot this node wraps.
    #[inline]
    pub fn value(&self) -> &Value {
        &self.inner.value
    }

    #[inline]
    pub fn kind(&self) -> Kind {
        self.inner.value.kind()
    }

    /// Path of this node in its store.
    pub fn path(&self) -> ArborResult<&Path> {
        self.inner
            .binding
            .as_ref()
            .map(|binding| &binding.path)
            .ok_or(ArborError::NotBound)
    }

    /// The owning store. Fails if the node was never bound or the store has
    /// been dropped.
    pub fn store(&self) -> ArborResult<Store> {
        self.inner
            .binding
            .as_ref()
            .and_then(|binding| binding.store.upgrade())
            .map(Store::from_inner)
            .ok_or(ArborError::NotBound)
    }

    pub fn is_bound(&self) -> bool {
        self.store().is_ok()
    }

    /// Wrapper identity. Two calls to `get_node_at` for an unchanged value
    /// return nodes that are `same`.
    #[inline]
    pub fn same(&self, other: &Node) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Direct child. Containers come back as nodes, everything else as the
    /// raw leaf value.
    pub fn get(&self, seg: impl Into<Seg>) -> Option<Child> {
        let value = self.value();
        let handler = handler_for(value)?;
        let seg = handler.canonical(&seg.into())?;
        let child = handler.child(value, &seg)?;
        if !child.is_proxiable() {
            return Some(Child::Leaf(child.clone()));
        }
        let node = match (self.path(), self.store()) {
            (Ok(path), Ok(store)) => store.child_node(path, seg, child),
            _ => Node::unbound(child.clone()),
        };
        Some(Child::Node(node))
    }

    /// Child segments in iteration order.
    pub fn keys(&self) -> Vec<Seg> {
        handler_for(self.value())
            .map(|handler| handler.segs(self.value()))
            .unwrap_or_default()
    }

    pub fn children(&self) -> Vec<(Seg, Child)> {
        self.keys()
            .into_iter()
            .filter_map(|seg| {
                let child = self.get(seg.clone())?;
                Some((seg, child))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.value().len()
    }

    pub fn is_empty(&self) -> bool {
        self.value().is_empty()
    }

    /// Write child `seg` of the current value at this node's path.
    pub fn set(&self, seg: impl Into<Seg>, value: impl Into<Value>) -> ArborResult<MutationEvent> {
        let path = self.path()?.clone();
        let seg = seg.into();
        let value = value.into();
        self.mutate(move |current| {
            let handler = container_handler(current, &path)?;
            let seg = canonical_seg(handler, &seg)?;
            handler.set_child(current, &seg, value, &path)?;
            Ok(MutationMetadata::new(Operation::Set, vec![seg]))
        })
    }

    /// Remove child `seg`. Absent children leave the tree untouched and
    /// return `None`.
    pub fn delete(&self, seg: impl Into<Seg>) -> ArborResult<Option<Value>> {
        let path = self.path()?.clone();
        let seg = seg.into();
        let present = self
            .store()?
            .get(&path)
            .ok_or_else(|| ArborError::detached(path.clone()))?
            .get(seg.clone())
            .is_some();
        if !present {
            return Ok(None);
        }
        let (_, removed) = self.mutate_with(move |current| {
            let handler = container_handler(current, &path)?;
            let seg = canonical_seg(handler, &seg)?;
            let removed = handler.remove_child(current, &seg);
            Ok((MutationMetadata::new(Operation::Delete, vec![seg]), removed))
        })?;
        Ok(removed)
    }

    pub fn as_object(&self) -> Option<ObjectNode> {
        matches!(self.kind(), Kind::PlainObject).then(|| ObjectNode::new(self.clone()))
    }

    pub fn as_list(&self) -> Option<ListNode> {
        matches!(self.kind(), Kind::OrderedList).then(|| ListNode::new(self.clone()))
    }

    pub fn as_map(&self) -> Option<MapNode> {
        matches!(self.kind(), Kind::KeyedMap).then(|| MapNode::new(self.clone()))
    }

    pub fn to_json(&self) -> ArborResult<serde_json::Value> {
        self.value().to_json()
    }

    /// Deserialize this snapshot into `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> ArborResult<T> {
        self.value().deserialize()
    }

    pub(crate) fn mutate<F>(&self, mutator: F) -> ArborResult<MutationEvent>
    where
        F: FnOnce(&mut Value) -> ArborResult<MutationMetadata>,
    {
        self.store()?.mutate(self.path()?, mutator)
    }

    pub(crate) fn mutate_with<R, F>(&self, mutator: F) -> ArborResult<(MutationEvent, R)>
    where
        F: FnOnce(&mut Value) -> ArborResult<(MutationMetadata, R)>,
    {
        self.store()?.mutate_with(self.path()?, mutator)
    }
}

fn container_handler(
    value: &Value,
    path: &Path,
) -> ArborResult<&'static dyn crate::handlers::Handler> {
    handler_for(value)
        .ok_or_else(|| ArborError::type_mismatch(path.clone(), "container", value_type_name(value)))
}

fn canonical_seg(handler: &dyn crate::handlers::Handler, seg: &Seg) -> ArborResult<Seg> {
    handler.canonical(seg).ok_or_else(|| {
        ArborError::invalid_argument(format!(
            "`{seg}` cannot address a child of a {}",
            handler.kind().name()
        ))
    })
}

impl PartialEq for Node {
    /// Same path and equal content.
    fn eq(&self, other: &Self) -> bool {
        self.path().ok() == other.path().ok() && self.value() == other.value()
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("path", &self.path().ok())
            .field("value", self.value())
            .finish()
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        node.value().clone()
    }
}

impl From<&Node> for Value {
    fn from(node: &Node) -> Self {
        node.value().clone()
    }
}

/// A child read through [`Node::get`].
#[derive(Clone, Debug, PartialEq)]
pub enum Child {
    /// Container child.
    Node(Node),
    /// Scalar or opaque child.
    Leaf(Value),
}

impl Child {
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Child::Node(node) => Some(node),
            Child::Leaf(_) => None,
        }
    }

    pub fn into_node(self) -> Option<Node> {
        match self {
            Child::Node(node) => Some(node),
            Child::Leaf(_) => None,
        }
    }

    pub fn as_leaf(&self) -> Option<&Value> {
        match self {
            Child::Node(_) => None,
            Child::Leaf(value) => Some(value),
        }
    }

    /// The child's value regardless of kind.
    pub fn value(&self) -> &Value {
        match self {
            Child::Node(node) => node.value(),
            Child::Leaf(value) => value,
        }
    }
}
