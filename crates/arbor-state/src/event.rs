//! Mutation events delivered to subscribers.

use crate::{Path, Seg, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The operation that produced a mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Set,
    Delete,
    Merge,
    Push,
    Pop,
    Shift,
    Unshift,
    Splice,
    Sort,
    Reverse,
    Clear,
    /// The whole tree was replaced through `Store::set_root`.
    Replace,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Set => "set",
            Operation::Delete => "delete",
            Operation::Merge => "merge",
            Operation::Push => "push",
            Operation::Pop => "pop",
            Operation::Shift => "shift",
            Operation::Unshift => "unshift",
            Operation::Splice => "splice",
            Operation::Sort => "sort",
            Operation::Reverse => "reverse",
            Operation::Clear => "clear",
            Operation::Replace => "replace",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a mutator reports about its change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationMetadata {
    /// Operation tag.
    pub operation: Operation,
    /// Child keys or indices the operation touched.
    pub props: Vec<Seg>,
}

impl MutationMetadata {
    pub fn new(operation: Operation, props: Vec<Seg>) -> Self {
        Self { operation, props }
    }

    /// True when `seg` is among the touched children.
    pub fn touches(&self, seg: &Seg) -> bool {
        self.props.iter().any(|p| p == seg)
    }
}

/// One installed mutation.
///
/// `previous` and `state` are the root values before and after the change.
/// Both are immutable snapshots and stay valid after later mutations.
#[derive(Clone, Debug)]
pub struct MutationEvent {
    /// Path of the node the mutator ran on.
    pub mutation_path: Path,
    pub metadata: MutationMetadata,
    pub previous: Value,
    pub state: Value,
}

impl MutationEvent {
    /// The mutated node's value before the change.
    pub fn previous_value(&self) -> Option<&Value> {
        self.previous.at_path(&self.mutation_path)
    }

    /// The mutated node's value after the change.
    pub fn current_value(&self) -> Option<&Value> {
        self.state.at_path(&self.mutation_path)
    }
}
