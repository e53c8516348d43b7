//! Keyed-map handler.
//!
//! Maps behave like objects at the addressing level but carry their own
//! mutator set: `set` skips writes of the identical value, `delete` skips
//! absent keys, and `clear` reports every removed key.

use super::{key_segs, Handler, Kind};
use crate::error::value_type_name;
use crate::event::{MutationMetadata, Operation};
use crate::{ArborError, ArborResult, Child, Map, Node, Path, Seg, Value};

pub(crate) struct MapHandler;

impl Handler for MapHandler {
    fn kind(&self) -> Kind {
        Kind::KeyedMap
    }

    fn accepts(&self, value: &Value) -> bool {
        matches!(value, Value::Map(_))
    }

    fn canonical(&self, seg: &Seg) -> Option<Seg> {
        Some(Seg::Key(seg.to_key()))
    }

    fn child<'a>(&self, value: &'a Value, seg: &Seg) -> Option<&'a Value> {
        value.as_map()?.get(seg.as_key()?)
    }

    fn segs(&self, value: &Value) -> Vec<Seg> {
        value.as_map().map(key_segs).unwrap_or_default()
    }

    fn set_child(
        &self,
        value: &mut Value,
        seg: &Seg,
        child: Value,
        path: &Path,
    ) -> ArborResult<()> {
        map_of(value, path)?.insert(seg.to_key(), child);
        Ok(())
    }

    fn remove_child(&self, value: &mut Value, seg: &Seg) -> Option<Value> {
        value.map_mut()?.shift_remove(seg.as_key()?)
    }
}

fn map_of<'a>(value: &'a mut Value, path: &Path) -> ArborResult<&'a mut Map> {
    let found = value_type_name(value);
    value
        .map_mut()
        .ok_or_else(|| ArborError::type_mismatch(path.clone(), "map", found))
}

/// Typed view over a keyed-map node.
#[derive(Clone, Debug)]
pub struct MapNode(Node);

impl MapNode {
    pub(crate) fn new(node: Node) -> Self {
        Self(node)
    }

    pub fn node(&self) -> &Node {
        &self.0
    }

    pub fn into_node(self) -> Node {
        self.0
    }

    /// Entry `key` of this snapshot.
    pub fn get(&self, key: &str) -> Option<Child> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.value().get(key).is_some()
    }

    /// Write entry `key`.
    ///
    /// Returns `false` without touching the tree when the current entry is
    /// already the same value.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> ArborResult<bool> {
        let value = value.into();
        let path = self.0.path()?;
        let current = self.0.store()?.get(&path.child(key));
        if current.is_some_and(|current| current.same(&value)) {
            return Ok(false);
        }
        self.0.set(key, value)?;
        Ok(true)
    }

    /// Remove entry `key`. Absent keys leave the tree untouched.
    pub fn delete(&self, key: &str) -> ArborResult<Option<Value>> {
        self.0.delete(key)
    }

    /// Remove every entry. Always produces a new version of the map.
    pub fn clear(&self) -> ArborResult<Vec<String>> {
        let path = self.0.path()?.clone();
        let (_, removed) = self.0.mutate_with(|value| {
            let entries = map_of(value, &path)?;
            let removed: Vec<String> = entries.keys().cloned().collect();
            entries.clear();
            let props = removed.iter().cloned().map(Seg::Key).collect();
            Ok((MutationMetadata::new(Operation::Clear, props), removed))
        })?;
        Ok(removed)
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.0
            .value()
            .as_map()
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn values(&self) -> Vec<Child> {
        self.keys().iter().filter_map(|key| self.get(key)).collect()
    }

    pub fn entries(&self) -> Vec<(String, Child)> {
        self.keys()
            .into_iter()
            .filter_map(|key| {
                let child = self.get(&key)?;
                Some((key, child))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.value().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply a batch of writes and removals as a single mutation tagged
    /// `operation`.
    pub(crate) fn batch<R, F>(&self, operation: Operation, op: F) -> ArborResult<R>
    where
        F: FnOnce(&mut Map) -> ArborResult<(Vec<Seg>, R)>,
    {
        let path = self.0.path()?.clone();
        let (_, result) = self.0.mutate_with(|value| {
            let (props, result) = op(map_of(value, &path)?)?;
            Ok((MutationMetadata::new(operation, props), result))
        })?;
        Ok(result)
    }
}
