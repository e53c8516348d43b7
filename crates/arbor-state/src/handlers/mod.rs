//! Value classification and the handler dispatch table.
//!
//! Every proxiable value is served by exactly one [`Handler`]. The handler
//! knows how to address the value's children and how to splice a replacement
//! child into a fresh copy; the typed views ([`ObjectNode`], [`ListNode`],
//! [`MapNode`]) build their mutators on top of it.

mod list;
mod map;
mod object;

pub use list::ListNode;
pub use map::MapNode;
pub use object::ObjectNode;

use crate::{ArborResult, Path, Seg, Value};
use serde::{Deserialize, Serialize};

/// How the tree treats a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    /// Object with named attributes.
    PlainObject,
    /// List addressed by index.
    OrderedList,
    /// Map addressed by key.
    KeyedMap,
    /// Stored as an opaque leaf.
    NotProxiable,
}

impl Kind {
    /// True for kinds the tree wraps in nodes.
    #[inline]
    pub fn is_proxiable(self) -> bool {
        !matches!(self, Kind::NotProxiable)
    }

    pub fn name(self) -> &'static str {
        match self {
            Kind::PlainObject => "object",
            Kind::OrderedList => "list",
            Kind::KeyedMap => "map",
            Kind::NotProxiable => "leaf",
        }
    }
}

/// Per-kind child addressing used by the mutation engine.
pub(crate) trait Handler: Sync {
    fn kind(&self) -> Kind;

    fn accepts(&self, value: &Value) -> bool;

    /// Canonical segment for this kind, or `None` if `seg` cannot address a
    /// child of it.
    fn canonical(&self, seg: &Seg) -> Option<Seg>;

    fn child<'a>(&self, value: &'a Value, seg: &Seg) -> Option<&'a Value>;

    /// Child segments in iteration order.
    fn segs(&self, value: &Value) -> Vec<Seg>;

    /// Replace (or for keyed kinds, insert) the child at `seg`.
    fn set_child(&self, value: &mut Value, seg: &Seg, child: Value, path: &Path)
        -> ArborResult<()>;

    /// Add a child at a `seg` that is not present yet. Lists only accept the
    /// index one past the end.
    fn insert_child(
        &self,
        value: &mut Value,
        seg: &Seg,
        child: Value,
        path: &Path,
    ) -> ArborResult<()> {
        self.set_child(value, seg, child, path)
    }

    fn remove_child(&self, value: &mut Value, seg: &Seg) -> Option<Value>;
}

/// Priority order: list, then map, then plain object.
static HANDLERS: [&dyn Handler; 3] = [
    &list::ListHandler,
    &map::MapHandler,
    &object::ObjectHandler,
];

/// The handler serving `value`, `None` for leaves.
pub(crate) fn handler_for(value: &Value) -> Option<&'static dyn Handler> {
    HANDLERS.iter().copied().find(|h| h.accepts(value))
}

/// Classify a raw value.
pub fn classify(value: &Value) -> Kind {
    handler_for(value).map_or(Kind::NotProxiable, |h| h.kind())
}

/// True when the tree wraps `value` in a node.
#[inline]
pub fn is_proxiable(value: &Value) -> bool {
    classify(value).is_proxiable()
}

/// Direct child lookup through whichever handler serves `value`.
pub(crate) fn child_of<'a>(value: &'a Value, seg: &Seg) -> Option<&'a Value> {
    handler_for(value).and_then(|h| h.child(value, seg))
}

/// Child segments whose value identity differs between two versions of the
/// same node: replaced, removed, added or moved children.
pub(crate) fn changed_children(before: &Value, after: &Value) -> Vec<Seg> {
    let segs_of = |v: &Value| handler_for(v).map(|h| h.segs(v)).unwrap_or_default();
    let mut changed = Vec::new();

    for seg in segs_of(before) {
        let same = match (child_of(before, &seg), child_of(after, &seg)) {
            (Some(a), Some(b)) => a.same(b),
            _ => false,
        };
        if !same {
            changed.push(seg);
        }
    }
    for seg in segs_of(after) {
        if child_of(before, &seg).is_none() {
            changed.push(seg);
        }
    }
    changed
}

/// Shared implementation for the two key-addressed kinds.
fn key_segs(entries: &indexmap::IndexMap<String, Value>) -> Vec<Seg> {
    entries.keys().map(|k| Seg::Key(k.clone())).collect()
}
