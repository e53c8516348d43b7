//! Keyed collections of records.
//!
//! A [`Collection`] is a repository view over a keyed-map node whose entries
//! are objects carrying an identifier attribute. Reads always see the
//! collection's current contents in the store; mutators return fresh item
//! nodes.

use crate::event::Operation;
use crate::handlers::MapNode;
use crate::lifecycle::{merge_into, Lifecycle};
use crate::model::Model;
use crate::{ArborError, ArborResult, Child, Map, Node, Path, Seg, Value};
use std::cmp::Ordering;

/// Identifier attribute used when none is configured.
pub const DEFAULT_ID_KEY: &str = "id";

/// Repository operations over a keyed-map node.
///
/// ```
/// use arbor_state::{path, Collection, Store, Value};
/// use serde_json::json;
///
/// let store = Store::new(json!({}));
/// store.root().unwrap().set("todos", Value::empty_map()).unwrap();
///
/// let todos = Collection::new(store.get_node_at(&path!("todos")).unwrap()).unwrap();
/// let todo = todos.add(json!({"id": "1", "text": "a"})).unwrap();
///
/// assert_eq!(todo.path().unwrap(), &path!("todos", "1"));
/// assert_eq!(todos.len(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct Collection {
    map: MapNode,
    id_key: String,
}

impl Collection {
    /// Wrap a keyed-map node using the default `"id"` attribute.
    pub fn new(node: Node) -> ArborResult<Self> {
        Self::with_id_key(node, DEFAULT_ID_KEY)
    }

    pub fn with_id_key(node: Node, id_key: impl Into<String>) -> ArborResult<Self> {
        let found = crate::error::value_type_name(node.value());
        let path = node.path().cloned().unwrap_or_default();
        let map = node
            .as_map()
            .ok_or_else(|| ArborError::type_mismatch(path, "map", found))?;
        Ok(Self {
            map,
            id_key: id_key.into(),
        })
    }

    /// Wrap a keyed map of `M` records, keyed by the model's identifier
    /// attribute.
    pub fn for_model<M: Model>(node: Node) -> ArborResult<Self> {
        Self::with_id_key(node, M::ID_KEY.unwrap_or(DEFAULT_ID_KEY))
    }

    /// Build a keyed-map value from `items`, keyed by their `id_key`
    /// attribute.
    pub fn build<I, V>(items: I, id_key: &str) -> ArborResult<Value>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let mut entries = Map::new();
        for item in items {
            let item = item.into();
            entries.insert(identifier(&item, id_key)?, item);
        }
        Ok(Value::Map(std::sync::Arc::new(entries)))
    }

    pub fn id_key(&self) -> &str {
        &self.id_key
    }

    /// The map node this collection was created from.
    pub fn map_node(&self) -> &MapNode {
        &self.map
    }

    /// Item `id` in the current tree.
    pub fn fetch(&self, id: &str) -> Option<Node> {
        self.current().get(id).and_then(Child::into_node)
    }

    /// Items in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = Node> {
        self.items().into_iter()
    }

    pub fn values(&self) -> Vec<Node> {
        self.items()
    }

    pub fn map<T, F>(&self, transform: F) -> Vec<T>
    where
        F: FnMut(Node) -> T,
    {
        self.iter().map(transform).collect()
    }

    pub fn for_each<F>(&self, f: F)
    where
        F: FnMut(Node),
    {
        self.iter().for_each(f);
    }

    pub fn filter<P>(&self, mut predicate: P) -> Vec<Node>
    where
        P: FnMut(&Node) -> bool,
    {
        self.iter().filter(|item| predicate(item)).collect()
    }

    pub fn find<P>(&self, mut predicate: P) -> Option<Node>
    where
        P: FnMut(&Node) -> bool,
    {
        self.iter().find(|item| predicate(item))
    }

    pub fn some<P>(&self, mut predicate: P) -> bool
    where
        P: FnMut(&Node) -> bool,
    {
        self.iter().any(|item| predicate(&item))
    }

    pub fn every<P>(&self, mut predicate: P) -> bool
    where
        P: FnMut(&Node) -> bool,
    {
        self.iter().all(|item| predicate(&item))
    }

    /// Items ordered by `compare`. The collection itself is not reordered.
    pub fn sort_by<F>(&self, mut compare: F) -> Vec<Node>
    where
        F: FnMut(&Node, &Node) -> Ordering,
    {
        let mut items = self.items();
        items.sort_by(|a, b| compare(a, b));
        items
    }

    /// Items with position in `start..end`.
    pub fn slice(&self, start: usize, end: usize) -> Vec<Node> {
        self.iter()
            .take(end)
            .skip(start)
            .collect()
    }

    pub fn first(&self) -> Option<Node> {
        self.iter().next()
    }

    pub fn last(&self) -> Option<Node> {
        self.iter().last()
    }

    pub fn len(&self) -> usize {
        self.current().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ids(&self) -> Vec<String> {
        self.current().keys()
    }

    pub fn includes(&self, id: &str) -> bool {
        self.current().contains_key(id)
    }

    /// Add or replace one item. Returns its node.
    pub fn add(&self, item: impl Into<Value>) -> ArborResult<Node> {
        self.add_many([item])?
            .pop()
            .ok_or_else(|| ArborError::invalid_argument("no item was added"))
    }

    /// Add or replace several items in a single mutation.
    ///
    /// Every item is validated first; one missing identifier rejects the
    /// whole batch.
    pub fn add_many<I, V>(&self, items: I) -> ArborResult<Vec<Node>>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let items = items
            .into_iter()
            .map(|item| {
                let item = item.into();
                identifier(&item, &self.id_key).map(|id| (id, item))
            })
            .collect::<ArborResult<Vec<_>>>()?;
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = items.iter().map(|(id, _)| id.clone()).collect();
        self.map.batch(Operation::Set, move |entries| {
            let props = items
                .into_iter()
                .map(|(id, item)| {
                    entries.insert(id.clone(), item);
                    Seg::Key(id)
                })
                .collect();
            Ok((props, ()))
        })?;
        self.fetch_all(&ids)
    }

    /// Merge `data` into item `id`. The identifier attribute in `data` is
    /// ignored. Returns `None` when the item does not exist.
    pub fn merge<I, K, V>(&self, id: &str, data: I) -> ArborResult<Option<Node>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let Some(item) = self.fetch(id) else {
            return Ok(None);
        };
        let attrs = self.strip_id(data);
        let item_path = item.path()?.clone();
        self.map.batch(Operation::Merge, |entries| {
            let mut merged = item.value().clone();
            merge_into(&mut merged, attrs, &item_path)?;
            entries.insert(id.to_owned(), merged);
            Ok((vec![Seg::key(id)], ()))
        })?;
        Ok(self.fetch(id))
    }

    /// Merge the output of `update` into every item matching `predicate`,
    /// as a single mutation. Returns the updated item nodes.
    pub fn merge_by<P, U, A, K, V>(&self, mut predicate: P, mut update: U) -> ArborResult<Vec<Node>>
    where
        P: FnMut(&Node) -> bool,
        U: FnMut(&Node) -> A,
        A: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut updates = Vec::new();
        for item in self.iter().filter(|item| predicate(item)) {
            let Some(id) = item.path()?.last().map(Seg::to_key) else {
                continue;
            };
            let attrs = self.strip_id(update(&item));
            let mut merged = item.value().clone();
            merge_into(&mut merged, attrs, item.path()?)?;
            updates.push((id, merged));
        }
        if updates.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = updates.iter().map(|(id, _)| id.clone()).collect();
        self.map.batch(Operation::Merge, move |entries| {
            let props = updates
                .into_iter()
                .map(|(id, merged)| {
                    entries.insert(id.clone(), merged);
                    Seg::Key(id)
                })
                .collect();
            Ok((props, ()))
        })?;
        self.fetch_all(&ids)
    }

    /// Remove item `id`, returning its value. Absent ids leave the tree
    /// untouched.
    pub fn delete(&self, id: &str) -> ArborResult<Option<Value>> {
        self.current_map()?.delete(id)
    }

    /// Remove every item matching `predicate` in a single mutation.
    pub fn delete_by<P>(&self, mut predicate: P) -> ArborResult<Vec<Value>>
    where
        P: FnMut(&Node) -> bool,
    {
        let ids: Vec<String> = self
            .iter()
            .filter(|item| predicate(item))
            .filter_map(|item| item.path().ok().and_then(|path| path.last().map(Seg::to_key)))
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.map.batch(Operation::Delete, move |entries| {
            let mut props = Vec::with_capacity(ids.len());
            let mut removed = Vec::with_capacity(ids.len());
            for id in ids {
                if let Some(value) = entries.shift_remove(&id) {
                    removed.push(value);
                    props.push(Seg::Key(id));
                }
            }
            Ok((props, removed))
        })
    }

    /// Remove every item. Returns the removed ids.
    pub fn clear(&self) -> ArborResult<Vec<String>> {
        self.current_map()?.clear()
    }

    /// Add a typed model and return its typed node.
    pub fn add_model<M: Model>(&self, model: &M) -> ArborResult<M::Node> {
        M::view(self.add(model.to_value()?)?)
    }

    /// Typed node for item `id`.
    pub fn fetch_model<M: Model>(&self, id: &str) -> ArborResult<Option<M::Node>> {
        self.fetch(id).map(M::view).transpose()
    }

    fn map_path(&self) -> ArborResult<&Path> {
        self.map.node().path()
    }

    /// The map node's current version, falling back to the snapshot for
    /// unbound collections.
    fn current(&self) -> MapNode {
        self.current_map().unwrap_or_else(|_| self.map.clone())
    }

    fn current_map(&self) -> ArborResult<MapNode> {
        let path = self.map_path()?;
        self.map
            .node()
            .store()?
            .get_node_at(path)
            .and_then(|node| node.as_map())
            .ok_or_else(|| ArborError::detached(path.clone()))
    }

    fn items(&self) -> Vec<Node> {
        self.current()
            .values()
            .into_iter()
            .filter_map(Child::into_node)
            .collect()
    }

    fn fetch_all(&self, ids: &[String]) -> ArborResult<Vec<Node>> {
        let current = self.current_map()?;
        let path = self.map_path()?;
        ids.iter()
            .map(|id| {
                current
                    .get(id)
                    .and_then(Child::into_node)
                    .ok_or_else(|| ArborError::detached(path.child(id)))
            })
            .collect()
    }

    fn strip_id<I, K, V>(&self, data: I) -> Vec<(String, Value)>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        data.into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .filter(|(key, _)| *key != self.id_key)
            .collect()
    }
}

/// Identifier of `item`: its `id_key` attribute, as a string. Numeric ids
/// are stringified.
fn identifier(item: &Value, id_key: &str) -> ArborResult<String> {
    match item.as_object().and_then(|attrs| attrs.get(id_key)) {
        Some(Value::String(id)) => Ok(id.clone()),
        Some(Value::Number(id)) => Ok(id.to_string()),
        _ => Err(ArborError::missing_identifier(id_key)),
    }
}

impl Lifecycle for Collection {
    fn node(&self) -> &Node {
        self.map.node()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_keys_items_by_id() {
        let value = Collection::build([json!({"id": 1, "n": "a"}), json!({"id": "b"})], "id").unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map.keys().cloned().collect::<Vec<_>>(), vec!["1", "b"]);
    }

    #[test]
    fn test_build_rejects_missing_identifier() {
        let err = Collection::build([json!({"name": "x"})], "id").unwrap_err();
        assert!(matches!(err, ArborError::MissingIdentifier { ref key } if key == "id"));
    }

    #[test]
    fn test_rejects_non_map_nodes() {
        let err = Collection::new(Node::unbound(json!({"a": 1}))).unwrap_err();
        assert!(matches!(err, ArborError::TypeMismatch { .. }));
    }

    #[test]
    fn test_unbound_collection_reads_snapshot() {
        let value = Collection::build([json!({"id": "a"}), json!({"id": "b"})], "id").unwrap();
        let collection = Collection::new(Node::unbound(value)).unwrap();
        assert_eq!(collection.ids(), vec!["a", "b"]);
        assert!(collection.includes("b"));
        assert!(matches!(collection.add(json!({"id": "c"})), Err(ArborError::NotBound)));
    }
}
