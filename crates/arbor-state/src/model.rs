//! Typed models backed by plain-object nodes.
//!
//! The `Model` trait is usually implemented with `#[derive(Model)]`, which
//! generates a `{Name}Node` view with one getter and one setter per field.
//! The helpers in this module are what the generated code calls.

use crate::error::value_type_name;
use crate::lifecycle::Lifecycle;
use crate::{ArborError, ArborResult, Child, Kind, Node, Value};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A record type stored as a plain object.
///
/// # Example
///
/// ```
/// use arbor_state::{path, Model, Store};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Serialize, Deserialize, Model)]
/// struct Todo {
///     #[arbor(id)]
///     id: String,
///     text: String,
///     done: bool,
/// }
///
/// let store = Store::new(serde_json::json!({"todo": {"id": "1", "text": "a", "done": false}}));
/// let todo = Todo::view(store.get_node_at(&path!("todo")).unwrap()).unwrap();
///
/// assert_eq!(todo.text().unwrap(), "a");
/// let todo = todo.set_done(true).unwrap();
/// assert!(todo.done().unwrap());
/// ```
pub trait Model: Serialize + DeserializeOwned {
    /// Generated typed view.
    type Node: Lifecycle;

    /// Attribute holding the record identifier, if the model has one.
    const ID_KEY: Option<&'static str> = None;

    /// Wrap a plain-object node in the typed view.
    fn view(node: Node) -> ArborResult<Self::Node>;

    fn to_value(&self) -> ArborResult<Value> {
        Value::from_serialize(self)
    }

    fn from_value(value: &Value) -> ArborResult<Self> {
        value.deserialize()
    }
}

/// Check that `node` wraps a plain object.
pub fn expect_object(node: &Node) -> ArborResult<()> {
    if node.kind() == Kind::PlainObject {
        return Ok(());
    }
    Err(ArborError::type_mismatch(
        node.path().cloned().unwrap_or_default(),
        "object",
        value_type_name(node.value()),
    ))
}

/// Read attribute `key` of the node's snapshot. A missing attribute reads as
/// null, so `Option` fields come back as `None`.
pub fn read_field<T: DeserializeOwned>(node: &Node, key: &str) -> ArborResult<T> {
    match node.value().get(key) {
        Some(value) => value.deserialize(),
        None => Value::Null
            .deserialize()
            .map_err(|_| ArborError::path_not_found(field_path(node, key))),
    }
}

/// Read attribute `key`, `None` when it is absent.
pub fn read_optional_field<T: DeserializeOwned>(node: &Node, key: &str) -> ArborResult<Option<T>> {
    node.value().get(key).map(Value::deserialize).transpose()
}

/// Write attribute `key` and return the fresh node.
pub fn write_field<T: Serialize + ?Sized>(node: &Node, key: &str, value: &T) -> ArborResult<Node> {
    let value = Value::from_serialize(value)?;
    node.set(key, value)?;
    node.reload()?
        .ok_or_else(|| ArborError::detached(node.path().cloned().unwrap_or_default()))
}

/// Remove attribute `key` and return the fresh node.
pub fn delete_field(node: &Node, key: &str) -> ArborResult<Node> {
    node.delete(key)?;
    node.reload()?
        .ok_or_else(|| ArborError::detached(node.path().cloned().unwrap_or_default()))
}

/// Typed view over the nested model at attribute `key`.
pub fn nested_field<M: Model>(node: &Node, key: &str) -> ArborResult<M::Node> {
    nested_optional_field::<M>(node, key)?
        .ok_or_else(|| ArborError::path_not_found(field_path(node, key)))
}

/// Typed view over an optional nested model. Null reads as `None`.
pub fn nested_optional_field<M: Model>(node: &Node, key: &str) -> ArborResult<Option<M::Node>> {
    match node.get(key) {
        Some(Child::Node(child)) => M::view(child).map(Some),
        Some(Child::Leaf(Value::Null)) | None => Ok(None),
        Some(Child::Leaf(leaf)) => Err(ArborError::type_mismatch(
            field_path(node, key),
            "object",
            value_type_name(&leaf),
        )),
    }
}

fn field_path(node: &Node, key: &str) -> crate::Path {
    node.path().cloned().unwrap_or_default().child(key)
}
