use super::{key_segs, Handler, Kind};
use crate::error::value_type_name;
use crate::event::MutationEvent;
use crate::{ArborError, ArborResult, Child, Node, Path, Seg, Value};

pub(crate) struct ObjectHandler;

impl Handler for ObjectHandler {
    fn kind(&self) -> Kind {
        Kind::PlainObject
    }

    fn accepts(&self, value: &Value) -> bool {
        matches!(value, Value::Object(_))
    }

    fn canonical(&self, seg: &Seg) -> Option<Seg> {
        Some(Seg::Key(seg.to_key()))
    }

    fn child<'a>(&self, value: &'a Value, seg: &Seg) -> Option<&'a Value> {
        value.as_object()?.get(seg.as_key()?)
    }

    fn segs(&self, value: &Value) -> Vec<Seg> {
        value.as_object().map(key_segs).unwrap_or_default()
    }

    fn set_child(
        &self,
        value: &mut Value,
        seg: &Seg,
        child: Value,
        path: &Path,
    ) -> ArborResult<()> {
        let found = value_type_name(value);
        let attrs = value
            .object_mut()
            .ok_or_else(|| ArborError::type_mismatch(path.clone(), "object", found))?;
        attrs.insert(seg.to_key(), child);
        Ok(())
    }

    fn remove_child(&self, value: &mut Value, seg: &Seg) -> Option<Value> {
        value.object_mut()?.shift_remove(seg.as_key()?)
    }
}

/// Typed view over a plain-object node.
#[derive(Clone, Debug)]
pub struct ObjectNode(Node);

impl ObjectNode {
    pub(crate) fn new(node: Node) -> Self {
        Self(node)
    }

    pub fn node(&self) -> &Node {
        &self.0
    }

    pub fn into_node(self) -> Node {
        self.0
    }

    /// Attribute `key` of this snapshot.
    pub fn get(&self, key: &str) -> Option<Child> {
        self.0.get(key)
    }

    /// Write attribute `key`. Always produces a new version of this object.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> ArborResult<MutationEvent> {
        self.0.set(key, value)
    }

    /// Remove attribute `key`. Absent keys leave the tree untouched.
    pub fn delete(&self, key: &str) -> ArborResult<Option<Value>> {
        self.0.delete(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.value().get(key).is_some()
    }

    /// Attribute names in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.0
            .value()
            .as_object()
            .map(|attrs| attrs.keys().cloned().collect())
            .unwrap_or_default()
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
}
