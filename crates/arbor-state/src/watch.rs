//! Relevance predicates for scoped observation.
//!
//! A predicate decides whether a mutation event matters to a watched node.
//! Bindings pass one to [`Store::watch`](crate::Store::watch) and only react
//! when it returns `true`.

use crate::event::{MutationEvent, Operation};
use crate::{Node, Path, Seg};

/// Decides whether an event is relevant to a watched node.
pub trait Relevance: Send + Sync {
    fn is_relevant(&self, node: &Node, event: &MutationEvent) -> bool;
}

impl<F> Relevance for F
where
    F: Fn(&Node, &MutationEvent) -> bool + Send + Sync,
{
    fn is_relevant(&self, node: &Node, event: &MutationEvent) -> bool {
        self(node, event)
    }
}

/// True when `event` replaced the value at `path`: the mutation ran on
/// `path` or one of its ancestors on the way down, or it touched the child
/// leading to `path`.
pub fn affects(event: &MutationEvent, path: &Path) -> bool {
    if event.metadata.operation == Operation::Replace {
        return true;
    }
    let mutation = &event.mutation_path;
    if path.targets(mutation) {
        return true;
    }
    path.is_descendant_of(mutation) && event.metadata.touches(&path[mutation.len()])
}

fn node_path(node: &Node) -> Option<&Path> {
    node.path().ok()
}

/// Default strict rule: relevant iff the mutation path is an ancestor of, or
/// equal to, the watched node's path.
pub fn targets() -> impl Relevance {
    |node: &Node, event: &MutationEvent| {
        node_path(node).is_some_and(|path| {
            event.metadata.operation == Operation::Replace || event.mutation_path.targets(path)
        })
    }
}

/// [`targets`], plus changes to the named attributes of the node.
pub fn watch_props<I, S>(props: I) -> impl Relevance
where
    I: IntoIterator<Item = S>,
    S: Into<Seg>,
{
    let props: Vec<Seg> = props.into_iter().map(Into::into).collect();
    move |node: &Node, event: &MutationEvent| {
        let Some(path) = node_path(node) else {
            return false;
        };
        targets().is_relevant(node, event)
            || props.iter().any(|prop| affects(event, &path.child(prop)))
    }
}

/// Changes to child `key` of the node, optionally narrowed to some of the
/// child's own attributes.
pub fn watch_child<I, S>(key: impl Into<Seg>, props: I) -> impl Relevance
where
    I: IntoIterator<Item = S>,
    S: Into<Seg>,
{
    let key = key.into();
    let props: Vec<Seg> = props.into_iter().map(Into::into).collect();
    move |node: &Node, event: &MutationEvent| {
        let Some(path) = node_path(node) else {
            return false;
        };
        let child = path.child(&key);
        if props.is_empty() {
            return affects(event, &child);
        }
        // the child itself being swapped out counts for every prop
        if child.is_descendant_of(&event.mutation_path) && affects(event, &child) {
            return true;
        }
        props.iter().any(|prop| affects(event, &child.child(prop)))
    }
}

/// Changes to the named attributes of any direct child of the node, or to
/// the set of children itself.
pub fn watch_children_props<I, S>(props: I) -> impl Relevance
where
    I: IntoIterator<Item = S>,
    S: Into<Seg>,
{
    let props: Vec<Seg> = props.into_iter().map(Into::into).collect();
    move |node: &Node, event: &MutationEvent| {
        let Some(path) = node_path(node) else {
            return false;
        };
        if targets().is_relevant(node, event) {
            return true;
        }
        let mutation = &event.mutation_path;
        if !mutation.is_descendant_of(path) {
            return false;
        }
        let depth = path.len();
        if mutation.len() == depth + 1 {
            props.iter().any(|prop| event.metadata.touches(prop))
        } else {
            props.iter().any(|prop| mutation[depth + 1] == *prop)
        }
    }
}

/// Changes at or below any of the absolute `paths`.
pub fn watch_paths<I>(paths: I) -> impl Relevance
where
    I: IntoIterator<Item = Path>,
{
    let paths: Vec<Path> = paths.into_iter().collect();
    move |_: &Node, event: &MutationEvent| {
        paths.iter().any(|path| affects(event, path))
    }
}

/// Every event.
pub fn watch_any() -> impl Relevance {
    |_: &Node, _: &MutationEvent| true
}
