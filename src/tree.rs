// Burkhard-Keller tree over an arbitrary discrete metric
//
// Every node stores one key. A child hanging off slot `d - 1` of node N holds
// keys that are exactly distance `d` from N's key. Distance 0 means "same key",
// so insertion stops there instead of creating a child.
//
// Range queries use the triangle inequality: if the query is `d` away from N,
// any key within `max_dist` of the query sits in a child whose label lies in
// `[d - max_dist, d + max_dist]`, so every other slot can be skipped.
//
// Nodes live in a flat arena and refer to their children by index; the root is
// always the first node. Children are keyed sparsely by label since a generic
// metric can return distances anywhere in `u32`. Nothing is ever removed, so the arena length is the
// number of distinct keys.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use tracing::trace;

use crate::error::{BkError, Result};

/// Strategy for measuring the distance between two keys.
///
/// Implementations must return 0 exactly when the keys are the same for
/// indexing purposes and should satisfy the triangle inequality; queries may
/// miss matches otherwise.
pub trait Metric<K: ?Sized> {
    fn distance(&self, a: &K, b: &K) -> u32;
}

impl<K: ?Sized, F> Metric<K> for F
where
    F: Fn(&K, &K) -> u32,
{
    fn distance(&self, a: &K, b: &K) -> u32 {
        self(a, b)
    }
}

/// Boxed metric, the default for trees built from closures of unnameable type.
pub type DistanceFn<K> = Box<dyn Fn(&K, &K) -> u32 + Send + Sync>;

type NodeId = usize;

const ROOT: NodeId = 0;

struct Node<K> {
    key: K,
    // Edge label (distance - 1) to child.
    children: BTreeMap<u32, NodeId>,
}

impl<K> Node<K> {
    fn leaf(key: K) -> Self {
        Node {
            key,
            children: BTreeMap::new(),
        }
    }
}

/// A key found by [`BkTree::find`] together with its distance from the query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match<K> {
    pub key: K,
    pub distance: u32,
}

pub struct BkTree<K, M = DistanceFn<K>> {
    nodes: Vec<Node<K>>,
    metric: Option<M>,
}

impl<K, M> Default for BkTree<K, M> {
    fn default() -> Self {
        Self::without_metric()
    }
}

impl<K, M> BkTree<K, M> {
    /// Creates an empty tree that measures keys with `metric`.
    pub fn new(metric: M) -> Self {
        BkTree {
            nodes: Vec::new(),
            metric: Some(metric),
        }
    }

    /// Creates an empty tree with no metric. The first key can still be
    /// inserted; anything that needs a distance fails with
    /// [`BkError::MissingDistance`].
    pub fn without_metric() -> Self {
        BkTree {
            nodes: Vec::new(),
            metric: None,
        }
    }

    /// Number of distinct keys stored.
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    pub fn len(&self) -> usize {
        self.size()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn metric(&self) -> Result<&M> {
        self.metric.as_ref().ok_or(BkError::MissingDistance)
    }

    /// Visits every key once in pre-order with its depth (root is 0).
    pub fn walk<F>(&self, mut visit: F) -> &Self
    where
        F: FnMut(&K, usize),
    {
        if self.nodes.is_empty() {
            return self;
        }

        let mut stack = vec![(ROOT, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            let node = &self.nodes[id];
            visit(&node.key, depth);
            stack.extend(
                node.children
                    .values()
                    .rev()
                    .map(|&child| (child, depth + 1)),
            );
        }
        self
    }
}

impl<K, M: Metric<K>> BkTree<K, M> {
    pub fn distance(&self, a: &K, b: &K) -> Result<u32> {
        Ok(self.metric()?.distance(a, b))
    }

    /// Inserts `key`. Exact duplicates (distance 0 from the node reached by
    /// descent) are ignored and leave the size unchanged.
    pub fn add(&mut self, key: K) -> Result<&mut Self> {
        self.insert(key)?;
        Ok(self)
    }

    /// Inserts each key in order. Order changes the tree's shape, never the
    /// set of keys a query returns.
    pub fn add_all<I>(&mut self, keys: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = K>,
    {
        for key in keys {
            self.insert(key)?;
        }
        Ok(self)
    }

    // Returns whether a new node was created.
    fn insert(&mut self, key: K) -> Result<bool> {
        if self.nodes.is_empty() {
            self.nodes.push(Node::leaf(key));
            return Ok(true);
        }

        let metric = self.metric.as_ref().ok_or(BkError::MissingDistance)?;
        let next_id = self.nodes.len();
        let mut current = ROOT;
        let mut depth = 0usize;

        loop {
            let dist = metric.distance(&self.nodes[current].key, &key);
            if dist == 0 {
                trace!(depth, "duplicate key ignored");
                return Ok(false);
            }

            match self.nodes[current].children.entry(dist - 1) {
                Entry::Occupied(child) => {
                    current = *child.get();
                    depth += 1;
                }
                Entry::Vacant(slot) => {
                    slot.insert(next_id);
                    self.nodes.push(Node::leaf(key));
                    return Ok(true);
                }
            }
        }
    }

    /// Calls `visit(key, distance)` for every stored key within `max_dist` of
    /// `key`. Nodes are reported before their descendants; order among
    /// siblings is unspecified.
    pub fn query<F>(&self, key: &K, max_dist: u32, mut visit: F) -> Result<&Self>
    where
        F: FnMut(&K, u32),
    {
        if self.nodes.is_empty() {
            return Ok(self);
        }

        let metric = self.metric()?;
        let mut visited = 0usize;
        let mut emitted = 0usize;
        let mut stack = vec![ROOT];

        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            let dist = metric.distance(&node.key, key);
            visited += 1;

            if dist <= max_dist {
                visit(&node.key, dist);
                emitted += 1;
                // Only reachable with dist == 0: every child is at least 1 away.
                if max_dist == 0 {
                    continue;
                }
            }

            // Labels for distances [max(1, d - r), d + r]. The upper end is at
            // least 1 here: d + r == 0 was an exact match at radius 0 above.
            let lo = dist.saturating_sub(max_dist).max(1) - 1;
            let hi = dist.saturating_add(max_dist) - 1;
            stack.extend(node.children.range(lo..=hi).rev().map(|(_, &child)| child));
        }

        trace!(visited, emitted, max_dist, "query finished");
        Ok(self)
    }

    /// Collects every key within `max_dist` of `key`, nearest first.
    pub fn find(&self, key: &K, max_dist: u32) -> Result<Vec<Match<K>>>
    where
        K: Clone,
    {
        let mut found = Vec::new();
        self.query(key, max_dist, |k, distance| {
            found.push(Match {
                key: k.clone(),
                distance,
            })
        })?;
        found.sort_by_key(|m| m.distance);
        Ok(found)
    }

    /// True if `key` itself is stored.
    pub fn has(&self, key: &K) -> Result<bool> {
        let mut found = false;
        self.query(key, 0, |_, _| found = true)?;
        Ok(found)
    }
}
