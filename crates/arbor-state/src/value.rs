//! Raw values stored in a state tree.
//!
//! Containers are reference counted so unchanged subtrees are shared between
//! snapshots. Identity ([`Value::same`]) is pointer identity for containers and
//! plain equality for scalars.

use crate::handlers::{classify, handler_for, Kind};
use crate::{ArborResult, Path, Seg};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::ser::{Error as _, SerializeMap};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Attribute storage of a plain object. Insertion ordered.
pub type Object = IndexMap<String, Value>;

/// Entry storage of a keyed map. Insertion ordered.
pub type Map = IndexMap<String, Value>;

/// Element storage of an ordered list.
pub type List = Vec<Value>;

/// A leaf the tree stores as-is: never wrapped, never diffed, never serialized.
#[derive(Clone)]
pub struct Opaque(Arc<dyn Any + Send + Sync>);

impl Opaque {
    /// Wrap an arbitrary value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Borrow the wrapped value if it has type `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Pointer identity.
    pub fn ptr_eq(&self, other: &Opaque) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Opaque").field(&"<any>").finish()
    }
}

/// A structured datum reachable from a store root.
#[derive(Clone, Debug, Default)]
pub enum Value {
    /// Absent / null leaf.
    #[default]
    Null,
    /// Boolean leaf.
    Bool(bool),
    /// Numeric leaf.
    Number(serde_json::Number),
    /// String leaf.
    String(String),
    /// Plain object with named attributes.
    Object(Arc<Object>),
    /// Ordered list addressed by index.
    List(Arc<List>),
    /// Keyed map addressed by string key.
    Map(Arc<Map>),
    /// Opaque application value.
    Opaque(Opaque),
}

impl Value {
    /// Build a plain object from attribute pairs.
    pub fn object<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Object(Arc::new(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ))
    }

    /// An object with no attributes.
    pub fn empty_object() -> Self {
        Value::Object(Arc::new(Object::new()))
    }

    /// Build an ordered list.
    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Value::List(Arc::new(items.into_iter().map(Into::into).collect()))
    }

    /// Build a keyed map from entries.
    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Map(Arc::new(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ))
    }

    /// A map with no entries.
    pub fn empty_map() -> Self {
        Value::Map(Arc::new(Map::new()))
    }

    /// Wrap an opaque application value.
    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        Value::Opaque(Opaque::new(value))
    }

    /// Convert any serializable type. Structs become plain objects.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> ArborResult<Self> {
        Ok(Value::from(serde_json::to_value(value)?))
    }

    /// Deserialize into a concrete type. Keyed maps deserialize as objects.
    pub fn deserialize<T: DeserializeOwned>(&self) -> ArborResult<T> {
        Ok(serde_json::from_value(self.to_json()?)?)
    }

    /// Convert to a JSON document. Fails on opaque leaves.
    pub fn to_json(&self) -> ArborResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// How the tree treats this value.
    #[inline]
    pub fn kind(&self) -> Kind {
        classify(self)
    }

    /// True for objects, lists and maps.
    #[inline]
    pub fn is_proxiable(&self) -> bool {
        self.kind().is_proxiable()
    }

    /// Reference identity: pointer equality for containers and opaque leaves,
    /// value equality for scalars.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Object(a), Value::Object(b)) | (Value::Map(a), Value::Map(b)) => {
                Arc::ptr_eq(a, b)
            }
            (Value::List(a), Value::List(b)) => Arc::ptr_eq(a, b),
            (Value::Opaque(a), Value::Opaque(b)) => a.ptr_eq(b),
            (Value::Object(_) | Value::List(_) | Value::Map(_) | Value::Opaque(_), _)
            | (_, Value::Object(_) | Value::List(_) | Value::Map(_) | Value::Opaque(_)) => false,
            _ => self == other,
        }
    }

    /// Copy the top level into a fresh allocation. Children stay shared.
    pub fn shallow_clone(&self) -> Value {
        match self {
            Value::Object(o) => Value::Object(Arc::new(Object::clone(o))),
            Value::Map(m) => Value::Map(Arc::new(Map::clone(m))),
            Value::List(l) => Value::List(Arc::new(List::clone(l))),
            other => other.clone(),
        }
    }

    /// Look up a direct child. Keys and indices are accepted interchangeably.
    pub fn get(&self, seg: impl Into<Seg>) -> Option<&Value> {
        let seg = seg.into();
        let handler = handler_for(self)?;
        let seg = handler.canonical(&seg)?;
        handler.child(self, &seg)
    }

    /// Look up a descendant.
    pub fn at_path(&self, path: &Path) -> Option<&Value> {
        path.iter().try_fold(self, |current, seg| current.get(seg))
    }

    /// Number of children (zero for leaves).
    pub fn len(&self) -> usize {
        match self {
            Value::Object(o) => o.len(),
            Value::Map(m) => m.len(),
            Value::List(l) => l.len(),
            _ => 0,
        }
    }

    /// True when [`Value::len`] is zero.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_opaque(&self) -> Option<&Opaque> {
        match self {
            Value::Opaque(o) => Some(o),
            _ => None,
        }
    }

    /// Mutable attribute storage. Copies the allocation if it is shared.
    pub(crate) fn object_mut(&mut self) -> Option<&mut Object> {
        match self {
            Value::Object(o) => Some(Arc::make_mut(o)),
            _ => None,
        }
    }

    /// Mutable entry storage. Copies the allocation if it is shared.
    pub(crate) fn map_mut(&mut self) -> Option<&mut Map> {
        match self {
            Value::Map(m) => Some(Arc::make_mut(m)),
            _ => None,
        }
    }

    /// Mutable element storage. Copies the allocation if it is shared.
    pub(crate) fn list_mut(&mut self) -> Option<&mut List> {
        match self {
            Value::List(l) => Some(Arc::make_mut(l)),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) | (Value::Map(a), Value::Map(b)) => {
                Arc::ptr_eq(a, b) || **a == **b
            }
            (Value::List(a), Value::List(b)) => Arc::ptr_eq(a, b) || **a == **b,
            (Value::Opaque(a), Value::Opaque(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::list(items),
            serde_json::Value::Object(entries) => Value::object(entries),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Number(v.into())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Number(v.into())
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Number(v.into())
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Number(v.into())
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Number(v.into())
    }
}

impl From<f64> for Value {
    /// Non-finite numbers become `Null`, as in JSON.
    fn from(v: f64) -> Self {
        serde_json::Number::from_f64(v).map_or(Value::Null, Value::Number)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(Arc::new(items))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<&Value> for Value {
    fn from(v: &Value) -> Self {
        v.clone()
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => n.serialize(serializer),
            Value::String(s) => serializer.serialize_str(s),
            Value::Object(entries) | Value::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries.iter() {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            Value::List(items) => items.as_slice().serialize(serializer),
            Value::Opaque(_) => Err(S::Error::custom("opaque values cannot be serialized")),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}
