//! Copy-on-write mutation engine and the path-keyed node cache.
//!
//! A cached node is fresh while its value is the same reference as the value
//! currently installed at its path. A mutation at `P` rebuilds every ancestor
//! of `P`, so it evicts those entries plus the subtrees under each child of
//! `P` whose identity changed. Everything else keeps its cached wrapper.

use crate::event::{MutationEvent, MutationMetadata, Operation};
use crate::handlers::{changed_children, handler_for};
use crate::store::StoreInner;
use crate::{ArborError, ArborResult, Node, Path, Seg, Store, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{MutexGuard, PoisonError, Weak};

pub(crate) struct TreeState {
    pub(crate) root: Value,
    cache: HashMap<Path, Node>,
}

impl TreeState {
    pub(crate) fn new(root: Value) -> Self {
        Self {
            root,
            cache: HashMap::new(),
        }
    }

    /// Cached node for `path`, creating it when missing or stale.
    fn current_node(&mut self, path: Path, value: Value, store: &Weak<StoreInner>) -> Node {
        if let Some(node) = self.cache.get(&path) {
            if node.value().same(&value) {
                return node.clone();
            }
        }
        let node = Node::bound(value, store.clone(), path.clone());
        self.cache.insert(path, node.clone());
        node
    }

    /// Drop entries invalidated by a mutation at `path`.
    fn invalidate(&mut self, path: &Path, relinked: &[Seg]) {
        let relinked: Vec<Path> = relinked.iter().map(|seg| path.child(seg)).collect();
        self.cache.retain(|cached, _| {
            !cached.targets(path) && !relinked.iter().any(|child| child.targets(cached))
        });
    }

    pub(crate) fn cached_len(&self) -> usize {
        self.cache.len()
    }
}

/// Walk `path` from `root`, canonicalizing each segment for the container it
/// addresses.
pub(crate) fn resolve<'a>(root: &'a Value, path: &Path) -> Option<(Path, &'a Value)> {
    let mut canonical = Vec::with_capacity(path.len());
    let mut current = root;
    for seg in path {
        let handler = handler_for(current)?;
        let seg = handler.canonical(seg)?;
        current = handler.child(current, &seg)?;
        canonical.push(seg);
    }
    Some((Path::from_segments(canonical), current))
}

/// Rebuild the ancestor chain of `segs` around `replacement`. Siblings stay
/// shared with `current`.
fn replace_at(current: &Value, segs: &[Seg], replacement: Value, path: &Path) -> ArborResult<Value> {
    let Some((head, rest)) = segs.split_first() else {
        return Ok(replacement);
    };
    let handler = handler_for(current).ok_or_else(|| ArborError::detached(path.clone()))?;
    let child = handler
        .child(current, head)
        .ok_or_else(|| ArborError::detached(path.clone()))?;
    let child = replace_at(child, rest, replacement, path)?;
    let mut copy = current.shallow_clone();
    handler.set_child(&mut copy, head, child, path)?;
    Ok(copy)
}

/// Tracks nested event delivery.
struct DeliveryGuard<'a>(&'a AtomicUsize);

impl<'a> DeliveryGuard<'a> {
    fn enter(depth: &'a AtomicUsize) -> Self {
        depth.fetch_add(1, Ordering::SeqCst);
        Self(depth)
    }
}

impl Drop for DeliveryGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Store {
    pub(crate) fn lock_tree(&self) -> MutexGuard<'_, TreeState> {
        self.inner.tree.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Node at `path` in the current tree. Leaves and unresolvable paths
    /// yield `None`. Repeated calls return the same node until a mutation
    /// replaces the value there.
    pub fn get_node_at(&self, path: &Path) -> Option<Node> {
        let store = self.downgrade();
        let mut tree = self.lock_tree();
        let (canonical, value) = resolve(&tree.root, path)?;
        if !value.is_proxiable() {
            return None;
        }
        let value = value.clone();
        Some(tree.current_node(canonical, value, &store))
    }

    /// Node for a container child read through its parent at `parent_path`.
    ///
    /// Only children of the installed tree are cached; reads through a stale
    /// parent get an uncached historical node.
    pub(crate) fn child_node(&self, parent_path: &Path, seg: Seg, value: &Value) -> Node {
        let path = parent_path.child(seg);
        let store = self.downgrade();
        let mut tree = self.lock_tree();
        let current = resolve(&tree.root, &path)
            .filter(|(_, installed)| installed.same(value))
            .map(|(canonical, _)| canonical);
        match current {
            Some(canonical) => tree.current_node(canonical, value.clone(), &store),
            None => Node::bound(value.clone(), store, path),
        }
    }

    /// Apply `mutator` to a fresh copy of the node at `path` and install the
    /// result as the new root.
    ///
    /// The tree lock is not held while `mutator` runs, so it may read the
    /// store. If the tree changes before the result is installed (another
    /// thread wrote, or `mutator` itself did), the mutation fails with
    /// [`ArborError::Conflict`] and nothing is applied.
    pub fn mutate<F>(&self, path: &Path, mutator: F) -> ArborResult<MutationEvent>
    where
        F: FnOnce(&mut Value) -> ArborResult<MutationMetadata>,
    {
        self.mutate_with(path, |value| mutator(value).map(|metadata| (metadata, ())))
            .map(|(event, ())| event)
    }

    /// [`Store::mutate`] for mutators that also hand back a result.
    pub(crate) fn mutate_with<R, F>(&self, path: &Path, mutator: F) -> ArborResult<(MutationEvent, R)>
    where
        F: FnOnce(&mut Value) -> ArborResult<(MutationMetadata, R)>,
    {
        self.apply(path, |_, next| mutator(next))
    }

    /// Run a structural operation at `path`, reporting every child whose
    /// identity changed as the affected props.
    pub(crate) fn mutate_relinked<R, F>(
        &self,
        path: &Path,
        operation: Operation,
        op: F,
    ) -> ArborResult<(MutationEvent, R)>
    where
        F: FnOnce(&mut Value) -> ArborResult<R>,
    {
        self.apply(path, |target, next| {
            let result = op(next)?;
            let props = changed_children(target, next);
            Ok((MutationMetadata::new(operation, props), result))
        })
    }

    /// Shared copy-on-write step. `mutator` receives the installed target and
    /// its fresh copy.
    fn apply<R, F>(&self, path: &Path, mutator: F) -> ArborResult<(MutationEvent, R)>
    where
        F: FnOnce(&Value, &mut Value) -> ArborResult<(MutationMetadata, R)>,
    {
        self.check_depth(path)?;

        let (base, canonical, target) = {
            let tree = self.lock_tree();
            let (canonical, target) = resolve(&tree.root, path)
                .map(|(canonical, target)| (canonical, target.clone()))
                .ok_or_else(|| ArborError::detached(path.clone()))?;
            (tree.root.clone(), canonical, target)
        };

        let mut next = target.shallow_clone();
        let (metadata, result) = mutator(&target, &mut next)?;
        let relinked = changed_children(&target, &next);
        let root = replace_at(&base, canonical.segments(), next, &canonical)?;

        let event = {
            let mut tree = self.lock_tree();
            if !tree.root.same(&base) {
                tracing::debug!(
                    path = %canonical,
                    operation = %metadata.operation,
                    "tree changed during mutation"
                );
                return Err(ArborError::conflict(canonical));
            }
            let previous = std::mem::replace(&mut tree.root, root.clone());
            tree.invalidate(&canonical, &relinked);

            tracing::trace!(
                path = %canonical,
                operation = %metadata.operation,
                props = metadata.props.len(),
                relinked = relinked.len(),
                "mutation installed"
            );

            MutationEvent {
                mutation_path: canonical,
                metadata,
                previous,
                state: root,
            }
        };

        self.publish(&event);
        Ok((event, result))
    }

    /// Replace the whole tree. Every cached node becomes stale.
    pub fn set_root(&self, value: impl Into<Value>) -> ArborResult<MutationEvent> {
        let root_path = Path::root();
        self.check_depth(&root_path)?;

        let event = {
            let mut tree = self.lock_tree();
            let state = value.into();
            let previous = std::mem::replace(&mut tree.root, state.clone());
            tree.cache.clear();
            tracing::trace!(path = %root_path, operation = %Operation::Replace, "root replaced");
            MutationEvent {
                mutation_path: root_path,
                metadata: MutationMetadata::new(Operation::Replace, Vec::new()),
                previous,
                state,
            }
        };

        self.publish(&event);
        Ok(event)
    }

    /// Number of nodes currently cached.
    pub fn cached_nodes(&self) -> usize {
        self.lock_tree().cached_len()
    }

    fn check_depth(&self, path: &Path) -> ArborResult<()> {
        let depth = self.inner.delivery_depth.load(Ordering::SeqCst);
        if depth > self.inner.config.max_notification_depth {
            tracing::warn!(
                path = %path,
                depth,
                max = self.inner.config.max_notification_depth,
                "re-entrant mutation rejected"
            );
            return Err(ArborError::NotificationLoop {
                path: path.clone(),
                depth,
            });
        }
        Ok(())
    }

    fn publish(&self, event: &MutationEvent) {
        let _guard = DeliveryGuard::enter(&self.inner.delivery_depth);
        self.inner.subscriptions.notify(event);
    }
}
