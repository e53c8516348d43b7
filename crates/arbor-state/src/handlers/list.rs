//! Ordered-list handler and its structural mutators.
//!
//! Index-addressed paths change meaning whenever elements move, so every
//! structural mutator reports the indices whose element identity changed and
//! the engine re-links (evicts) the cached wrappers under each of them.

use super::{Handler, Kind};
use crate::error::value_type_name;
use crate::event::{MutationEvent, MutationMetadata, Operation};
use crate::{ArborError, ArborResult, Child, List, Node, Path, Seg, Value};
use std::cmp::Ordering;

pub(crate) struct ListHandler;

impl Handler for ListHandler {
    fn kind(&self) -> Kind {
        Kind::OrderedList
    }

    fn accepts(&self, value: &Value) -> bool {
        matches!(value, Value::List(_))
    }

    fn canonical(&self, seg: &Seg) -> Option<Seg> {
        seg.to_index().map(Seg::Index)
    }

    fn child<'a>(&self, value: &'a Value, seg: &Seg) -> Option<&'a Value> {
        value.as_list()?.get(seg.as_index()?)
    }

    fn segs(&self, value: &Value) -> Vec<Seg> {
        (0..value.len()).map(Seg::Index).collect()
    }

    fn set_child(
        &self,
        value: &mut Value,
        seg: &Seg,
        child: Value,
        path: &Path,
    ) -> ArborResult<()> {
        let index = index_of(seg)?;
        let list = list_of(value, path)?;
        let len = list.len();
        let slot = list
            .get_mut(index)
            .ok_or_else(|| ArborError::index_out_of_bounds(path.clone(), index, len))?;
        *slot = child;
        Ok(())
    }

    fn insert_child(
        &self,
        value: &mut Value,
        seg: &Seg,
        child: Value,
        path: &Path,
    ) -> ArborResult<()> {
        let index = index_of(seg)?;
        let list = list_of(value, path)?;
        if index != list.len() {
            return Err(ArborError::index_out_of_bounds(path.clone(), index, list.len()));
        }
        list.push(child);
        Ok(())
    }

    fn remove_child(&self, value: &mut Value, seg: &Seg) -> Option<Value> {
        let index = seg.as_index()?;
        let list = value.list_mut()?;
        (index < list.len()).then(|| list.remove(index))
    }
}

fn index_of(seg: &Seg) -> ArborResult<usize> {
    seg.to_index()
        .ok_or_else(|| ArborError::invalid_argument(format!("`{seg}` is not a list index")))
}

fn list_of<'a>(value: &'a mut Value, path: &Path) -> ArborResult<&'a mut List> {
    let found = value_type_name(value);
    value
        .list_mut()
        .ok_or_else(|| ArborError::type_mismatch(path.clone(), "list", found))
}

/// Typed view over an ordered-list node.
#[derive(Clone, Debug)]
pub struct ListNode(Node);

impl ListNode {
    pub(crate) fn new(node: Node) -> Self {
        Self(node)
    }

    /// The underlying node.
    pub fn node(&self) -> &Node {
        &self.0
    }

    pub fn into_node(self) -> Node {
        self.0
    }

    /// Length of this snapshot.
    pub fn len(&self) -> usize {
        self.0.value().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index`: a node for containers, the raw value for leaves.
    pub fn at(&self, index: usize) -> Option<Child> {
        self.0.get(Seg::Index(index))
    }

    /// Elements of this snapshot in order.
    pub fn iter(&self) -> impl Iterator<Item = Child> + '_ {
        (0..self.len()).filter_map(move |i| self.at(i))
    }

    /// Replace the element at `index`. The index must exist.
    pub fn set(&self, index: usize, value: impl Into<Value>) -> ArborResult<MutationEvent> {
        self.0.set(Seg::Index(index), value)
    }

    /// Remove the element at `index`, shifting later elements down.
    pub fn remove(&self, index: usize) -> ArborResult<Value> {
        let path = self.0.path()?.clone();
        let (_, removed) = self.0.mutate_with(|value| {
            let list = list_of(value, &path)?;
            if index >= list.len() {
                return Err(ArborError::index_out_of_bounds(path.clone(), index, list.len()));
            }
            let removed = list.remove(index);
            Ok((
                MutationMetadata::new(Operation::Delete, vec![Seg::Index(index)]),
                removed,
            ))
        })?;
        Ok(removed)
    }

    /// Append elements. Returns the new length.
    pub fn push<I, V>(&self, items: I) -> ArborResult<usize>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let items: Vec<Value> = items.into_iter().map(Into::into).collect();
        self.structural(Operation::Push, move |list| {
            list.extend(items);
            Ok(list.len())
        })
    }

    /// Remove the last element. An empty list is left untouched.
    pub fn pop(&self) -> ArborResult<Option<Value>> {
        if self.current_len()? == 0 {
            return Ok(None);
        }
        self.structural(Operation::Pop, |list| Ok(list.pop()))
    }

    /// Remove the first element. An empty list is left untouched.
    pub fn shift(&self) -> ArborResult<Option<Value>> {
        if self.current_len()? == 0 {
            return Ok(None);
        }
        self.structural(Operation::Shift, |list| {
            Ok((!list.is_empty()).then(|| list.remove(0)))
        })
    }

    /// Prepend elements. Returns the new length.
    pub fn unshift<I, V>(&self, items: I) -> ArborResult<usize>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let items: Vec<Value> = items.into_iter().map(Into::into).collect();
        self.structural(Operation::Unshift, move |list| {
            list.splice(0..0, items);
            Ok(list.len())
        })
    }

    /// Remove `delete_count` elements starting at `start` and insert `items`
    /// in their place. Returns the removed elements.
    ///
    /// Arguments are checked strictly: `start` must be at most the length and
    /// `start + delete_count` must not run past the end.
    pub fn splice<I, V>(&self, start: usize, delete_count: usize, items: I) -> ArborResult<Vec<Value>>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let items: Vec<Value> = items.into_iter().map(Into::into).collect();
        self.structural(Operation::Splice, move |list| {
            let end = start
                .checked_add(delete_count)
                .filter(|end| start <= list.len() && *end <= list.len())
                .ok_or_else(|| {
                    ArborError::invalid_argument(format!(
                        "splice({start}, {delete_count}) out of range for list of length {}",
                        list.len()
                    ))
                })?;
            Ok(list.splice(start..end, items).collect())
        })
    }

    /// Sort elements in place with `compare`. Returns the fresh list node.
    pub fn sort_by<F>(&self, mut compare: F) -> ArborResult<ListNode>
    where
        F: FnMut(&Value, &Value) -> Ordering,
    {
        self.structural(Operation::Sort, |list| {
            list.sort_by(|a, b| compare(a, b));
            Ok(())
        })?;
        self.fresh()
    }

    /// Reverse element order. Returns the fresh list node.
    pub fn reverse(&self) -> ArborResult<ListNode> {
        self.structural(Operation::Reverse, |list| {
            list.reverse();
            Ok(())
        })?;
        self.fresh()
    }

    /// Run a raw list operation inside `mutate`, reporting every index whose
    /// element identity changed.
    fn structural<R, F>(&self, operation: Operation, op: F) -> ArborResult<R>
    where
        F: FnOnce(&mut List) -> ArborResult<R>,
    {
        let path = self.0.path()?;
        let (_, result) = self
            .0
            .store()?
            .mutate_relinked(path, operation, |value| op(list_of(value, path)?))?;
        Ok(result)
    }

    fn current_len(&self) -> ArborResult<usize> {
        let path = self.0.path()?;
        let store = self.0.store()?;
        store
            .get(path)
            .map(|value| value.len())
            .ok_or_else(|| ArborError::detached(path.clone()))
    }

    fn fresh(&self) -> ArborResult<ListNode> {
        let path = self.0.path()?;
        self.0
            .store()?
            .get_node_at(path)
            .and_then(|node| node.as_list())
            .ok_or_else(|| ArborError::detached(path.clone()))
    }
}
