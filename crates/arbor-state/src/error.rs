//! Error types for arbor-state operations.

use crate::{Path, Value};
use thiserror::Error;

/// Result type alias for arbor-state operations.
pub type ArborResult<T> = Result<T, ArborError>;

/// Errors that can occur while reading or mutating a state tree.
#[derive(Debug, Error)]
pub enum ArborError {
    /// A lifecycle or mutation operation on a value that was never admitted
    /// into a store (or whose store has been dropped).
    #[error("value is not bound to an arbor store")]
    NotBound,

    /// `detach()` invoked on the root node.
    #[error("cannot detach the root node of a state tree")]
    RootDetach,

    /// The node's path no longer resolves in the current tree.
    #[error("node at {path} is detached from the state tree")]
    Detached {
        /// Path the node was last seen at.
        path: Path,
    },

    /// A collection item lacks its identifier attribute.
    #[error("collection items must carry an identifier attribute `{key}`")]
    MissingIdentifier {
        /// Name of the identifier attribute.
        key: String,
    },

    /// Malformed arguments to a structural mutator.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of what went wrong.
        message: String,
    },

    /// List index is out of bounds.
    #[error("index {index} out of bounds (len: {len}) at path {path}")]
    IndexOutOfBounds {
        /// The path to the list.
        path: Path,
        /// The index that was accessed.
        index: usize,
        /// The actual length of the list.
        len: usize,
    },

    /// The value at a path has an unexpected kind.
    #[error("type mismatch at {path}: expected {expected}, found {found}")]
    TypeMismatch {
        /// The path where the mismatch occurred.
        path: Path,
        /// The expected kind.
        expected: &'static str,
        /// The actual kind found.
        found: &'static str,
    },

    /// Path does not exist in the tree.
    #[error("path not found: {path}")]
    PathNotFound {
        /// The path that was not found.
        path: Path,
    },

    /// A subscriber kept mutating the tree from inside event delivery.
    #[error("mutation at {path} rejected: notification depth {depth} exceeds the configured limit")]
    NotificationLoop {
        /// Path of the rejected mutation.
        path: Path,
        /// Nesting depth reached.
        depth: usize,
    },

    /// The tree changed between preparing and installing a mutation.
    #[error("tree changed while the mutation at {path} was being prepared")]
    Conflict {
        /// Path of the rejected mutation.
        path: Path,
    },

    /// JSON serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ArborError {
    /// Create a detached-node error.
    #[inline]
    pub fn detached(path: Path) -> Self {
        ArborError::Detached { path }
    }

    /// Create a missing identifier error.
    #[inline]
    pub fn missing_identifier(key: impl Into<String>) -> Self {
        ArborError::MissingIdentifier { key: key.into() }
    }

    /// Create an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        ArborError::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create an index out of bounds error.
    #[inline]
    pub fn index_out_of_bounds(path: Path, index: usize, len: usize) -> Self {
        ArborError::IndexOutOfBounds { path, index, len }
    }

    /// Create a type mismatch error.
    #[inline]
    pub fn type_mismatch(path: Path, expected: &'static str, found: &'static str) -> Self {
        ArborError::TypeMismatch {
            path,
            expected,
            found,
        }
    }

    /// Create a conflicting-write error.
    #[inline]
    pub fn conflict(path: Path) -> Self {
        ArborError::Conflict { path }
    }

    /// Create a path not found error.
    #[inline]
    pub fn path_not_found(path: Path) -> Self {
        ArborError::PathNotFound { path }
    }
}

/// Get the kind name of a value, for error messages.
#[inline]
pub fn value_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Object(_) => "object",
        Value::List(_) => "list",
        Value::Map(_) => "map",
        Value::Opaque(_) => "opaque",
    }
}
