//! Leaf-storing AVL tree with per-node bounding boxes.
//!
//! Entries are kept in the total order of a user comparator, which gives
//! ordered iteration, `find` and 1-D range queries along that order. Every
//! node additionally carries the union box of its subtree, which gives
//! pruned overlap and nearest-entry queries.
//!
//! Nodes live in two arenas (leaves and internal nodes) addressed by index,
//! with free lists for recycled slots and parent indices for climbing. After
//! every structural change the path to the root is walked once, recomputing
//! box, height and the leftmost/rightmost leaf of each node and applying AVL
//! rotations where sibling heights differ by more than one.

use std::cmp::Ordering;
use std::fmt;

use tracing::debug;

use crate::aabb::{Aabb, AabbBound};
use crate::error::{SpatialError, SpatialResult};

/// Inflation applied to both boxes in overlap tests by default.
pub const DEFAULT_EPSILON: f64 = 1e-9;

/// Handle to an entry of an [`AabbTree`].
///
/// Handles stay valid until their entry is erased; the slot may then be
/// reused by a later insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(usize);

impl EntryId {
    /// Arena index of the entry.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Link {
    Leaf(usize),
    Inner(usize),
}

struct LeafNode<K, V, const D: usize> {
    key: K,
    value: V,
    aabb: Aabb<D>,
    parent: Option<usize>,
}

#[derive(Clone, Copy)]
struct InnerNode<const D: usize> {
    left: Link,
    right: Link,
    parent: Option<usize>,
    aabb: Aabb<D>,
    height: usize,
    min_leaf: usize,
    max_leaf: usize,
}

/// Point key type used by [`PointTree`].
pub type PointExtractor<const D: usize> = fn(&[f64; D], AabbBound, usize) -> f64;

/// Lexicographic comparator type used by [`PointTree`].
pub type PointComparator<const D: usize> = fn(&[f64; D], &[f64; D]) -> Ordering;

/// An [`AabbTree`] over `D`-dimensional points, ordered lexicographically.
pub type PointTree<V, const D: usize> =
    AabbTree<[f64; D], V, PointExtractor<D>, PointComparator<D>, D>;

/// AVL-balanced binary tree of key/value entries with bounding boxes.
///
/// * `E` extracts the box of a key: `extractor(key, bound, axis)`.
/// * `C` is a total order on keys. Equal keys are allowed and keep their
///   insertion order.
///
/// # Example
///
/// ```
/// use spatial_index::{Aabb, PointTree};
///
/// let mut tree: PointTree<&str, 2> = PointTree::for_points();
/// tree.insert([0.0, 0.0], "origin");
/// tree.insert([5.0, 5.0], "far");
/// tree.insert([1.0, 0.5], "near");
///
/// let hits = tree.aabb_overlap_query(&Aabb::new([-1.0, -1.0], [2.0, 2.0]));
/// let mut names: Vec<_> = hits.iter().filter_map(|&id| tree.get(id)).map(|(_, v)| *v).collect();
/// names.sort_unstable();
/// assert_eq!(names, ["near", "origin"]);
///
/// // Iteration follows the comparator
/// let keys: Vec<_> = tree.iter().map(|(_, k, _)| *k).collect();
/// assert_eq!(keys, [[0.0, 0.0], [1.0, 0.5], [5.0, 5.0]]);
/// ```
pub struct AabbTree<K, V, E, C, const D: usize> {
    leaves: Vec<Option<LeafNode<K, V, D>>>,
    free_leaves: Vec<usize>,
    inners: Vec<InnerNode<D>>,
    free_inners: Vec<usize>,
    root: Option<Link>,
    len: usize,
    extractor: E,
    comparator: C,
    epsilon: f64,
}

impl<K, V, E, C, const D: usize> fmt::Debug for AabbTree<K, V, E, C, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AabbTree")
            .field("len", &self.len)
            .field("height", &self.height())
            .field("epsilon", &self.epsilon)
            .finish_non_exhaustive()
    }
}

// Structural helpers that need neither the extractor nor the comparator.
impl<K, V, E, C, const D: usize> AabbTree<K, V, E, C, D> {
    /// Number of entries.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the tree has no entries.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Height of the tree: 0 when empty, 1 for a single leaf.
    #[must_use]
    pub fn height(&self) -> usize {
        self.root.map_or(0, |r| self.link_height(r))
    }

    /// Epsilon used to inflate boxes in overlap tests.
    #[must_use]
    pub const fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Box enclosing every entry, or `None` when empty.
    #[must_use]
    pub fn root_aabb(&self) -> Option<Aabb<D>> {
        self.root.map(|r| self.link_aabb(r))
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.leaves.clear();
        self.free_leaves.clear();
        self.inners.clear();
        self.free_inners.clear();
        self.root = None;
        self.len = 0;
    }

    /// Key and value of an entry.
    #[must_use]
    pub fn get(&self, id: EntryId) -> Option<(&K, &V)> {
        self.leaves
            .get(id.0)
            .and_then(Option::as_ref)
            .map(|l| (&l.key, &l.value))
    }

    /// Mutable value of an entry. Keys cannot be changed in place.
    pub fn get_mut(&mut self, id: EntryId) -> Option<&mut V> {
        self.leaves
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .map(|l| &mut l.value)
    }

    /// Box of an entry's key.
    #[must_use]
    pub fn entry_aabb(&self, id: EntryId) -> Option<Aabb<D>> {
        self.leaves.get(id.0).and_then(Option::as_ref).map(|l| l.aabb)
    }

    /// Entry with the smallest key.
    #[must_use]
    pub fn first(&self) -> Option<EntryId> {
        self.root.map(|r| EntryId(self.min_leaf(r)))
    }

    /// Entry with the largest key.
    #[must_use]
    pub fn last(&self) -> Option<EntryId> {
        self.root.map(|r| EntryId(self.max_leaf(r)))
    }

    /// In-order successor of an entry.
    #[must_use]
    pub fn next(&self, id: EntryId) -> Option<EntryId> {
        self.get(id)?;
        self.successor(id.0).map(EntryId)
    }

    /// In-order predecessor of an entry.
    #[must_use]
    pub fn prev(&self, id: EntryId) -> Option<EntryId> {
        self.get(id)?;
        let mut cur = Link::Leaf(id.0);
        let mut parent = self.leaf(id.0).parent;
        while let Some(p) = parent {
            let node = &self.inners[p];
            if node.right == cur {
                return Some(EntryId(self.max_leaf(node.left)));
            }
            cur = Link::Inner(p);
            parent = node.parent;
        }
        None
    }

    /// Iterate entries in comparator order.
    pub fn iter(&self) -> Iter<'_, K, V, E, C, D> {
        Iter {
            tree: self,
            next: self.first().map(|e| e.0),
        }
    }

    /// Overlap query: entries whose key box overlaps `query`.
    ///
    /// Boxes are inflated by the tree's epsilon, so entries that touch the
    /// query box, or miss it by less than epsilon, are reported. Results are
    /// in comparator order.
    #[must_use]
    pub fn aabb_overlap_query(&self, query: &Aabb<D>) -> Vec<EntryId> {
        let mut out = Vec::new();
        let mut stack: Vec<Link> = self.root.into_iter().collect();
        while let Some(link) = stack.pop() {
            if !self.link_aabb(link).overlaps(query, self.epsilon) {
                continue;
            }
            match link {
                Link::Leaf(l) => out.push(EntryId(l)),
                Link::Inner(i) => {
                    stack.push(self.inners[i].right);
                    stack.push(self.inners[i].left);
                }
            }
        }
        out
    }

    /// Whether any entry's key box overlaps `query`.
    #[must_use]
    pub fn aabb_overlap_check(&self, query: &Aabb<D>) -> bool {
        let mut stack: Vec<Link> = self.root.into_iter().collect();
        while let Some(link) = stack.pop() {
            if !self.link_aabb(link).overlaps(query, self.epsilon) {
                continue;
            }
            match link {
                Link::Leaf(_) => return true,
                Link::Inner(i) => {
                    stack.push(self.inners[i].right);
                    stack.push(self.inners[i].left);
                }
            }
        }
        false
    }

    /// Nearest entry to `point` under a caller-supplied distance.
    ///
    /// `distance(key, value)` must never be smaller than the Euclidean
    /// distance from `point` to the key's box; subtrees whose box is farther
    /// than the best distance found so far are pruned.
    pub fn nearest_by(
        &self,
        point: &[f64; D],
        mut distance: impl FnMut(&K, &V) -> f64,
    ) -> Option<(EntryId, f64)> {
        let root = self.root?;
        let mut best: Option<(usize, f64)> = None;
        let mut stack = vec![(root, self.box_distance(root, point))];
        while let Some((link, bound)) = stack.pop() {
            if best.is_some_and(|(_, d)| bound >= d) {
                continue;
            }
            match link {
                Link::Leaf(l) => {
                    let leaf = self.leaf(l);
                    let d = distance(&leaf.key, &leaf.value);
                    if best.is_none_or(|(_, bd)| d < bd) {
                        best = Some((l, d));
                    }
                }
                Link::Inner(i) => {
                    let node = &self.inners[i];
                    let dl = self.box_distance(node.left, point);
                    let dr = self.box_distance(node.right, point);
                    // Nearer child on top of the stack
                    if dl <= dr {
                        stack.push((node.right, dr));
                        stack.push((node.left, dl));
                    } else {
                        stack.push((node.left, dl));
                        stack.push((node.right, dr));
                    }
                }
            }
        }
        best.map(|(l, d)| (EntryId(l), d))
    }

    fn box_distance(&self, link: Link, point: &[f64; D]) -> f64 {
        self.link_aabb(link).distance_squared_to_point(point).sqrt()
    }

    fn leaf(&self, i: usize) -> &LeafNode<K, V, D> {
        match &self.leaves[i] {
            Some(leaf) => leaf,
            None => unreachable!("vacant leaf slot {i} is linked into the tree"),
        }
    }

    fn leaf_mut(&mut self, i: usize) -> &mut LeafNode<K, V, D> {
        match &mut self.leaves[i] {
            Some(leaf) => leaf,
            None => unreachable!("vacant leaf slot {i} is linked into the tree"),
        }
    }

    fn link_height(&self, link: Link) -> usize {
        match link {
            Link::Leaf(_) => 1,
            Link::Inner(i) => self.inners[i].height,
        }
    }

    fn link_aabb(&self, link: Link) -> Aabb<D> {
        match link {
            Link::Leaf(l) => self.leaf(l).aabb,
            Link::Inner(i) => self.inners[i].aabb,
        }
    }

    fn link_parent(&self, link: Link) -> Option<usize> {
        match link {
            Link::Leaf(l) => self.leaf(l).parent,
            Link::Inner(i) => self.inners[i].parent,
        }
    }

    fn set_parent(&mut self, link: Link, parent: Option<usize>) {
        match link {
            Link::Leaf(l) => self.leaf_mut(l).parent = parent,
            Link::Inner(i) => self.inners[i].parent = parent,
        }
    }

    fn min_leaf(&self, link: Link) -> usize {
        match link {
            Link::Leaf(l) => l,
            Link::Inner(i) => self.inners[i].min_leaf,
        }
    }

    fn max_leaf(&self, link: Link) -> usize {
        match link {
            Link::Leaf(l) => l,
            Link::Inner(i) => self.inners[i].max_leaf,
        }
    }

    fn successor(&self, leaf: usize) -> Option<usize> {
        let mut cur = Link::Leaf(leaf);
        let mut parent = self.leaf(leaf).parent;
        while let Some(p) = parent {
            let node = &self.inners[p];
            if node.left == cur {
                return Some(self.min_leaf(node.right));
            }
            cur = Link::Inner(p);
            parent = node.parent;
        }
        None
    }

    fn alloc_leaf(&mut self, node: LeafNode<K, V, D>) -> usize {
        if let Some(i) = self.free_leaves.pop() {
            self.leaves[i] = Some(node);
            i
        } else {
            self.leaves.push(Some(node));
            self.leaves.len() - 1
        }
    }

    fn alloc_inner(&mut self, left: Link, right: Link, parent: Option<usize>) -> usize {
        let node = InnerNode {
            left,
            right,
            parent,
            aabb: Aabb::empty(),
            height: 2,
            min_leaf: self.min_leaf(left),
            max_leaf: self.max_leaf(right),
        };
        let i = if let Some(i) = self.free_inners.pop() {
            self.inners[i] = node;
            i
        } else {
            self.inners.push(node);
            self.inners.len() - 1
        };
        self.set_parent(left, Some(i));
        self.set_parent(right, Some(i));
        self.update(i);
        i
    }

    fn replace_child(&mut self, parent: Option<usize>, old: Link, new: Link) {
        match parent {
            None => self.root = Some(new),
            Some(p) => {
                let node = &mut self.inners[p];
                if node.left == old {
                    node.left = new;
                } else {
                    node.right = new;
                }
            }
        }
    }

    fn update(&mut self, i: usize) {
        let InnerNode { left, right, .. } = self.inners[i];
        let aabb = self.link_aabb(left).union(&self.link_aabb(right));
        let height = 1 + self.link_height(left).max(self.link_height(right));
        let min_leaf = self.min_leaf(left);
        let max_leaf = self.max_leaf(right);
        let node = &mut self.inners[i];
        node.aabb = aabb;
        node.height = height;
        node.min_leaf = min_leaf;
        node.max_leaf = max_leaf;
    }

    fn rotate_left(&mut self, x: usize) -> usize {
        let Link::Inner(y) = self.inners[x].right else {
            return x;
        };
        let moved = self.inners[y].left;
        let parent = self.inners[x].parent;

        self.inners[x].right = moved;
        self.set_parent(moved, Some(x));
        self.inners[y].left = Link::Inner(x);
        self.inners[y].parent = parent;
        self.replace_child(parent, Link::Inner(x), Link::Inner(y));
        self.inners[x].parent = Some(y);

        self.update(x);
        self.update(y);
        y
    }

    fn rotate_right(&mut self, x: usize) -> usize {
        let Link::Inner(y) = self.inners[x].left else {
            return x;
        };
        let moved = self.inners[y].right;
        let parent = self.inners[x].parent;

        self.inners[x].left = moved;
        self.set_parent(moved, Some(x));
        self.inners[y].right = Link::Inner(x);
        self.inners[y].parent = parent;
        self.replace_child(parent, Link::Inner(x), Link::Inner(y));
        self.inners[x].parent = Some(y);

        self.update(x);
        self.update(y);
        y
    }

    /// Refresh node `i` and restore its AVL balance. Returns the index of
    /// the inner node now rooting that subtree.
    fn rebalance(&mut self, i: usize) -> usize {
        self.update(i);
        let InnerNode { left, right, .. } = self.inners[i];
        let (hl, hr) = (self.link_height(left), self.link_height(right));

        if hl > hr + 1 {
            if let Link::Inner(l) = left {
                let InnerNode { left: ll, right: lr, .. } = self.inners[l];
                if self.link_height(lr) > self.link_height(ll) {
                    self.rotate_left(l);
                }
            }
            return self.rotate_right(i);
        }
        if hr > hl + 1 {
            if let Link::Inner(r) = right {
                let InnerNode { left: rl, right: rr, .. } = self.inners[r];
                if self.link_height(rl) > self.link_height(rr) {
                    self.rotate_right(r);
                }
            }
            return self.rotate_left(i);
        }
        i
    }

    fn refresh_upward(&mut self, start: Option<usize>) {
        let mut cur = start;
        while let Some(i) = cur {
            let top = self.rebalance(i);
            cur = self.inners[top].parent;
        }
    }

    /// Remove an entry by handle, returning its key and value.
    pub fn erase_entry(&mut self, id: EntryId) -> Option<(K, V)> {
        let leaf = self.leaves.get_mut(id.0)?.take()?;
        self.free_leaves.push(id.0);
        self.len -= 1;

        match leaf.parent {
            None => self.root = None,
            Some(p) => {
                let node = self.inners[p];
                let sibling = if node.left == Link::Leaf(id.0) {
                    node.right
                } else {
                    node.left
                };
                self.replace_child(node.parent, Link::Inner(p), sibling);
                self.set_parent(sibling, node.parent);
                self.free_inners.push(p);
                self.refresh_upward(node.parent);
            }
        }
        Some((leaf.key, leaf.value))
    }
}

impl<K, V, E, C, const D: usize> AabbTree<K, V, E, C, D>
where
    E: Fn(&K, AabbBound, usize) -> f64,
    C: Fn(&K, &K) -> Ordering,
{
    /// Create an empty tree.
    pub const fn new(extractor: E, comparator: C) -> Self {
        Self {
            leaves: Vec::new(),
            free_leaves: Vec::new(),
            inners: Vec::new(),
            free_inners: Vec::new(),
            root: None,
            len: 0,
            extractor,
            comparator,
            epsilon: DEFAULT_EPSILON,
        }
    }

    /// Build a balanced tree from a batch of entries.
    pub fn from_entries(
        entries: impl IntoIterator<Item = (K, V)>,
        extractor: E,
        comparator: C,
    ) -> Self {
        let mut tree = Self::new(extractor, comparator);
        tree.construction(entries);
        tree
    }

    /// Set the overlap epsilon.
    #[must_use]
    pub const fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Replace the contents with `entries`: sort, then build bottom-up.
    ///
    /// The sort is stable, so equal keys keep the order of `entries`.
    pub fn construction(&mut self, entries: impl IntoIterator<Item = (K, V)>) {
        self.clear();
        let mut entries: Vec<(K, V)> = entries.into_iter().collect();
        entries.sort_by(|a, b| (self.comparator)(&a.0, &b.0));

        let mut order = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let aabb = Aabb::from_extractor(&key, &self.extractor);
            order.push(self.alloc_leaf(LeafNode {
                key,
                value,
                aabb,
                parent: None,
            }));
        }
        self.len = order.len();
        self.root = if order.is_empty() {
            None
        } else {
            Some(self.build_balanced(&order))
        };
        debug!(entries = self.len, height = self.height(), "built AABB tree");
    }

    fn build_balanced(&mut self, leaves: &[usize]) -> Link {
        if let [only] = leaves {
            return Link::Leaf(*only);
        }
        let mid = leaves.len() / 2;
        let left = self.build_balanced(&leaves[..mid]);
        let right = self.build_balanced(&leaves[mid..]);
        Link::Inner(self.alloc_inner(left, right, None))
    }

    fn less(&self, a: &K, b: &K) -> bool {
        (self.comparator)(a, b) == Ordering::Less
    }

    /// Insert an entry and return its handle.
    ///
    /// An entry equal to existing keys is placed after all of them.
    pub fn insert(&mut self, key: K, value: V) -> EntryId {
        let aabb = Aabb::from_extractor(&key, &self.extractor);
        let new = self.alloc_leaf(LeafNode {
            key,
            value,
            aabb,
            parent: None,
        });
        self.len += 1;

        let Some(mut cur) = self.root else {
            self.root = Some(Link::Leaf(new));
            return EntryId(new);
        };

        let new_key = &self.leaf(new).key;
        let old = loop {
            match cur {
                Link::Leaf(l) => break l,
                Link::Inner(i) => {
                    let node = &self.inners[i];
                    let left_max = &self.leaf(self.max_leaf(node.left)).key;
                    cur = if self.less(new_key, left_max) {
                        node.left
                    } else {
                        node.right
                    };
                }
            }
        };

        let parent = self.leaf(old).parent;
        let (left, right) = if self.less(new_key, &self.leaf(old).key) {
            (Link::Leaf(new), Link::Leaf(old))
        } else {
            (Link::Leaf(old), Link::Leaf(new))
        };
        let inner = self.alloc_inner(left, right, parent);
        self.replace_child(parent, Link::Leaf(old), Link::Inner(inner));
        self.refresh_upward(Some(inner));
        EntryId(new)
    }

    /// Remove the first entry equal to `key`, returning its value.
    pub fn erase(&mut self, key: &K) -> Option<V> {
        let id = self.find(key)?;
        self.erase_entry(id).map(|(_, v)| v)
    }

    /// First entry equal to `key`.
    #[must_use]
    pub fn find(&self, key: &K) -> Option<EntryId> {
        let id = self.lower_bound(key)?;
        if self.less(key, &self.leaf(id.0).key) {
            None
        } else {
            Some(id)
        }
    }

    /// Whether an entry equal to `key` exists.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// First entry whose key is not less than `key`.
    #[must_use]
    pub fn lower_bound(&self, key: &K) -> Option<EntryId> {
        let mut cur = self.root?;
        loop {
            match cur {
                Link::Leaf(l) => {
                    return if self.less(&self.leaf(l).key, key) {
                        self.successor(l).map(EntryId)
                    } else {
                        Some(EntryId(l))
                    };
                }
                Link::Inner(i) => {
                    let node = &self.inners[i];
                    let left_max = &self.leaf(self.max_leaf(node.left)).key;
                    cur = if self.less(left_max, key) {
                        node.right
                    } else {
                        node.left
                    };
                }
            }
        }
    }

    /// First entry whose key is greater than `key`.
    #[must_use]
    pub fn upper_bound(&self, key: &K) -> Option<EntryId> {
        let mut cur = self.root?;
        loop {
            match cur {
                Link::Leaf(l) => {
                    return if self.less(key, &self.leaf(l).key) {
                        Some(EntryId(l))
                    } else {
                        self.successor(l).map(EntryId)
                    };
                }
                Link::Inner(i) => {
                    let node = &self.inners[i];
                    let left_max = &self.leaf(self.max_leaf(node.left)).key;
                    cur = if self.less(key, left_max) {
                        node.left
                    } else {
                        node.right
                    };
                }
            }
        }
    }

    /// Entries with `lo <= key <= hi` in the comparator's order.
    ///
    /// This is a range along the 1-D total order of keys, not a spatial
    /// range; use [`aabb_overlap_query`](Self::aabb_overlap_query) for that.
    #[must_use]
    pub fn range_query(&self, lo: &K, hi: &K) -> Vec<EntryId> {
        let mut out = Vec::new();
        let mut cur = self.lower_bound(lo);
        while let Some(id) = cur {
            if self.less(hi, &self.leaf(id.0).key) {
                break;
            }
            out.push(id);
            cur = self.successor(id.0).map(EntryId);
        }
        out
    }

    /// Verify every structural invariant of the tree.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::InvariantViolation`] describing the first
    /// broken invariant: stale boxes, heights or leaf bounds, an AVL
    /// imbalance, a wrong parent link, a wrong entry count or keys out of
    /// order.
    pub fn check_invariants(&self) -> SpatialResult<()> {
        let fail = |msg: String| Err(SpatialError::InvariantViolation(msg));
        let Some(root) = self.root else {
            return if self.len == 0 {
                Ok(())
            } else {
                fail(format!("empty tree reports {} entries", self.len))
            };
        };
        if self.link_parent(root).is_some() {
            return fail("root has a parent".into());
        }

        let mut leaves = 0;
        let mut stack = vec![root];
        while let Some(link) = stack.pop() {
            match link {
                Link::Leaf(l) => {
                    leaves += 1;
                    let leaf = self.leaf(l);
                    if leaf.aabb != Aabb::from_extractor(&leaf.key, &self.extractor) {
                        return fail(format!("leaf {l} box differs from its key box"));
                    }
                }
                Link::Inner(i) => {
                    let node = &self.inners[i];
                    for child in [node.left, node.right] {
                        if self.link_parent(child) != Some(i) {
                            return fail(format!("child {child:?} of node {i} has a wrong parent"));
                        }
                    }
                    let (hl, hr) = (self.link_height(node.left), self.link_height(node.right));
                    if node.height != 1 + hl.max(hr) {
                        return fail(format!("node {i} has a stale height"));
                    }
                    if hl.abs_diff(hr) > 1 {
                        return fail(format!("node {i} is unbalanced ({hl} vs {hr})"));
                    }
                    let union = self.link_aabb(node.left).union(&self.link_aabb(node.right));
                    if node.aabb != union {
                        return fail(format!("node {i} box is not the union of its children"));
                    }
                    if node.min_leaf != self.min_leaf(node.left)
                        || node.max_leaf != self.max_leaf(node.right)
                    {
                        return fail(format!("node {i} has stale leaf bounds"));
                    }
                    stack.push(node.left);
                    stack.push(node.right);
                }
            }
        }
        if leaves != self.len {
            return fail(format!("{leaves} leaves but len is {}", self.len));
        }

        let mut prev: Option<&K> = None;
        for (_, key, _) in self.iter() {
            if prev.is_some_and(|p| self.less(key, p)) {
                return fail("keys are out of order".into());
            }
            prev = Some(key);
        }
        Ok(())
    }
}

fn point_bound<const D: usize>(key: &[f64; D], _bound: AabbBound, axis: usize) -> f64 {
    key[axis]
}

fn point_cmp<const D: usize>(a: &[f64; D], b: &[f64; D]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| x.total_cmp(y))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

impl<V, const D: usize> PointTree<V, D> {
    /// Empty tree keyed by points, ordered lexicographically.
    #[must_use]
    pub fn for_points() -> Self {
        Self::new(point_bound::<D>, point_cmp::<D>)
    }
}

/// In-order iterator over `(handle, key, value)`.
pub struct Iter<'a, K, V, E, C, const D: usize> {
    tree: &'a AabbTree<K, V, E, C, D>,
    next: Option<usize>,
}

impl<'a, K, V, E, C, const D: usize> Iterator for Iter<'a, K, V, E, C, D> {
    type Item = (EntryId, &'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let i = self.next?;
        self.next = self.tree.successor(i);
        let leaf = self.tree.leaf(i);
        Some((EntryId(i), &leaf.key, &leaf.value))
    }
}
