//! Lifecycle operations shared by every node kind.

use crate::error::value_type_name;
use crate::event::{MutationMetadata, Operation};
use crate::handlers::{handler_for, ListNode, MapNode, ObjectNode};
use crate::{ArborError, ArborResult, Node, Path, Seg, Value};

/// Lifecycle operations for anything that wraps a [`Node`].
///
/// Every operation fails with [`ArborError::NotBound`] on a node that was
/// never admitted into a store.
pub trait Lifecycle {
    /// The wrapped node.
    fn node(&self) -> &Node;

    fn path(&self) -> ArborResult<&Path> {
        self.node().path()
    }

    /// The current parent node, `None` at the root or when the parent path
    /// no longer resolves.
    fn parent(&self) -> ArborResult<Option<Node>> {
        let node = self.node();
        let path = node.path()?;
        let store = node.store()?;
        Ok(path.parent().and_then(|parent| store.get_node_at(&parent)))
    }

    /// Remove this node from its parent and return the removed value.
    ///
    /// Fails with [`ArborError::RootDetach`] on the root and with
    /// [`ArborError::Detached`] when the path no longer resolves.
    fn detach(&self) -> ArborResult<Value> {
        let node = self.node();
        let path = node.path()?;
        let store = node.store()?;
        let (Some(parent), Some(seg)) = (path.parent(), path.last().cloned()) else {
            return Err(ArborError::RootDetach);
        };
        if store.get(path).is_none() {
            return Err(ArborError::detached(path.clone()));
        }
        let (_, removed) = store.mutate_with(&parent, |value| {
            let removed = handler_for(value)
                .and_then(|handler| handler.remove_child(value, &seg))
                .ok_or_else(|| ArborError::detached(path.clone()))?;
            Ok((MutationMetadata::new(Operation::Delete, vec![seg.clone()]), removed))
        })?;
        Ok(removed)
    }

    /// Put this node's value back at its path and return the attached node.
    ///
    /// Whatever currently sits at the path is overwritten. A list child whose
    /// index is one past the end is appended. Attaching a node that is
    /// already installed, or the root, returns the current node unchanged.
    fn attach(&self) -> ArborResult<Node> {
        let node = self.node();
        let path = node.path()?.clone();
        let store = node.store()?;
        let current = store.get(&path);
        let (Some(parent), Some(seg)) = (path.parent(), path.last().cloned()) else {
            return store.root().ok_or(ArborError::detached(path));
        };
        if !current.is_some_and(|current| current.same(node.value())) {
            let value = node.value().clone();
            store.mutate(&parent, |target| {
                let found = value_type_name(target);
                let handler = handler_for(target)
                    .ok_or_else(|| ArborError::type_mismatch(parent.clone(), "container", found))?;
                if handler.child(target, &seg).is_some() {
                    handler.set_child(target, &seg, value, &parent)?;
                } else {
                    handler.insert_child(target, &seg, value, &parent)?;
                }
                Ok(MutationMetadata::new(Operation::Set, vec![seg.clone()]))
            })?;
        }
        store
            .get_node_at(&path)
            .ok_or_else(|| ArborError::detached(path))
    }

    /// Write several attributes of an object or map node in one mutation.
    /// Returns the fresh node.
    fn merge<I, K, V>(&self, attrs: I) -> ArborResult<Node>
    where
        Self: Sized,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let node = self.node();
        let path = node.path()?;
        let store = node.store()?;
        let attrs: Vec<(String, Value)> = attrs
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        store.mutate(path, |target| {
            let props = merge_into(target, attrs, path)?;
            Ok(MutationMetadata::new(Operation::Merge, props))
        })?;
        store
            .get_node_at(path)
            .ok_or_else(|| ArborError::detached(path.clone()))
    }

    /// The current version of this node, `None` once its path stops
    /// resolving.
    fn reload(&self) -> ArborResult<Option<Node>> {
        let node = self.node();
        Ok(node.store()?.get_node_at(node.path()?))
    }

    /// True while the node's path resolves to a container in the current
    /// tree.
    fn is_attached(&self) -> ArborResult<bool> {
        Ok(self.reload()?.is_some())
    }

    /// True when a newer version of this node exists, or it was removed.
    fn is_stale(&self) -> ArborResult<bool> {
        Ok(self
            .reload()?
            .map_or(true, |current| !current.same(self.node())))
    }
}

/// Insert `attrs` into an object or map value, returning the written keys.
pub(crate) fn merge_into(
    target: &mut Value,
    attrs: Vec<(String, Value)>,
    path: &Path,
) -> ArborResult<Vec<Seg>> {
    let found = value_type_name(target);
    let entries = if matches!(*target, Value::Map(_)) {
        target.map_mut()
    } else {
        target.object_mut()
    }
    .ok_or_else(|| ArborError::type_mismatch(path.clone(), "object or map", found))?;
    let mut props = Vec::with_capacity(attrs.len());
    for (key, value) in attrs {
        props.push(Seg::Key(key.clone()));
        entries.insert(key, value);
    }
    Ok(props)
}

impl Lifecycle for Node {
    fn node(&self) -> &Node {
        self
    }
}

impl Lifecycle for ObjectNode {
    fn node(&self) -> &Node {
        ObjectNode::node(self)
    }
}

impl Lifecycle for ListNode {
    fn node(&self) -> &Node {
        ListNode::node(self)
    }
}

impl Lifecycle for MapNode {
    fn node(&self) -> &Node {
        MapNode::node(self)
    }
}
