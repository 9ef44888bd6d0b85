//! Bucketed octree over 3D points.
//!
//! Each node covers the half-open cube `[min, max)` per axis. Leaves hold up
//! to `max_box_elements` entries; a leaf over capacity (or larger than
//! `max_box_radius`) is split into eight octants and its entries are
//! redistributed. The tree never grows beyond its root cube.
//!
//! Child `i` of a node covers the upper half of axis `a` when bit `a` of `i`
//! is set, so a point exactly on a split plane belongs to the upper child.

use nalgebra::Point3;
use tracing::debug;

use crate::error::{SpatialError, SpatialResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Handle to an octree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Arena index of the node.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Octree configuration.
///
/// # Example
///
/// ```
/// use spatial_index::OctreeParams;
/// use nalgebra::Point3;
///
/// let params = OctreeParams::new(Point3::origin(), 10.0)
///     .with_max_box_elements(8)
///     .with_max_depth(12);
/// assert!(params.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OctreeParams {
    /// Center of the root cube.
    pub center: Point3<f64>,
    /// Half-extent of the root cube.
    pub radius: f64,
    /// Leaves holding more entries than this are split.
    pub max_box_elements: usize,
    /// Non-empty leaves with a larger half-extent are split.
    pub max_box_radius: f64,
    /// Nodes at this depth are never split.
    pub max_depth: usize,
}

impl Default for OctreeParams {
    fn default() -> Self {
        Self {
            center: Point3::origin(),
            radius: 1.0,
            max_box_elements: 16,
            max_box_radius: f64::INFINITY,
            max_depth: 24,
        }
    }
}

impl OctreeParams {
    /// Root cube with the default split policy.
    #[must_use]
    pub fn new(center: Point3<f64>, radius: f64) -> Self {
        Self {
            center,
            radius,
            ..Default::default()
        }
    }

    /// Root cube enclosing the closed box `[min, max]`.
    ///
    /// The cube is padded so that points on the maximum faces are inside
    /// the half-open root. The padding grows with the coordinate magnitude,
    /// since far from the origin `center + radius` rounds in steps of the
    /// coordinates' ulp.
    #[must_use]
    pub fn enclosing(min: Point3<f64>, max: Point3<f64>) -> Self {
        let center = nalgebra::center(&min, &max);
        let half = (max - min).amax() * 0.5;
        let magnitude = min.coords.amax().max(max.coords.amax());
        let mut pad = half.mul_add(1e-6, magnitude.mul_add(4.0 * f64::EPSILON, 1e-9));
        let mut radius = half + pad;
        for _ in 0..64 {
            let encloses =
                (0..3).all(|a| center[a] - radius <= min[a] && max[a] < center[a] + radius);
            if encloses {
                break;
            }
            pad *= 2.0;
            radius = half + pad;
        }
        Self::new(center, radius)
    }

    /// Set the leaf capacity.
    #[must_use]
    pub const fn with_max_box_elements(mut self, max_box_elements: usize) -> Self {
        self.max_box_elements = max_box_elements;
        self
    }

    /// Set the largest half-extent a non-empty leaf may keep.
    #[must_use]
    pub const fn with_max_box_radius(mut self, max_box_radius: f64) -> Self {
        self.max_box_radius = max_box_radius;
        self
    }

    /// Set the depth limit.
    #[must_use]
    pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Check the parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the radius is not positive and finite, if the
    /// capacity is zero, or if `max_box_radius` is not positive.
    pub fn validate(&self) -> SpatialResult<()> {
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(SpatialError::InvalidRadius(self.radius));
        }
        if self.max_box_radius.is_nan() || self.max_box_radius <= 0.0 {
            return Err(SpatialError::InvalidRadius(self.max_box_radius));
        }
        if self.max_box_elements == 0 {
            return Err(SpatialError::InvalidCapacity(self.max_box_elements));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum NodeKind<V> {
    Leaf(Vec<(Point3<f64>, V)>),
    Internal([NodeId; 8]),
}

/// A node of an [`Octree`].
#[derive(Debug, Clone)]
pub struct OctreeNode<V> {
    min: Point3<f64>,
    max: Point3<f64>,
    center: Point3<f64>,
    depth: usize,
    parent: Option<NodeId>,
    octant: u8,
    kind: NodeKind<V>,
}

impl<V> OctreeNode<V> {
    fn new(
        min: Point3<f64>,
        max: Point3<f64>,
        depth: usize,
        parent: Option<NodeId>,
        octant: u8,
    ) -> Self {
        Self {
            min,
            max,
            center: nalgebra::center(&min, &max),
            depth,
            parent,
            octant,
            kind: NodeKind::Leaf(Vec::new()),
        }
    }

    /// Center of the cube; also the split point for the children.
    #[must_use]
    pub const fn center(&self) -> Point3<f64> {
        self.center
    }

    /// Half-extent of the cube.
    #[must_use]
    pub fn radius(&self) -> f64 {
        (self.max.x - self.min.x) * 0.5
    }

    /// Minimum (inclusive) and maximum (exclusive) corners.
    #[must_use]
    pub const fn bounds(&self) -> (Point3<f64>, Point3<f64>) {
        (self.min, self.max)
    }

    /// Depth below the root (root is 0).
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Parent node, `None` for the root.
    #[must_use]
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Octant index of this node inside its parent.
    #[must_use]
    pub const fn octant(&self) -> u8 {
        self.octant
    }

    /// Whether the node stores entries rather than children.
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    /// Entries of a leaf; empty for internal nodes.
    #[must_use]
    pub fn entries(&self) -> &[(Point3<f64>, V)] {
        match &self.kind {
            NodeKind::Leaf(entries) => entries,
            NodeKind::Internal(_) => &[],
        }
    }

    /// Children of an internal node, indexed by octant.
    #[must_use]
    pub const fn children(&self) -> Option<&[NodeId; 8]> {
        match &self.kind {
            NodeKind::Leaf(_) => None,
            NodeKind::Internal(children) => Some(children),
        }
    }

    /// Half-open containment `[min, max)` on every axis.
    #[must_use]
    pub fn contains(&self, p: &Point3<f64>) -> bool {
        (0..3).all(|a| self.min[a] <= p[a] && p[a] < self.max[a])
    }

    fn octant_of(&self, p: &Point3<f64>) -> usize {
        usize::from(p.x >= self.center.x)
            | usize::from(p.y >= self.center.y) << 1
            | usize::from(p.z >= self.center.z) << 2
    }

    fn child_bounds(&self, octant: usize) -> (Point3<f64>, Point3<f64>) {
        let mut min = self.min;
        let mut max = self.max;
        for a in 0..3 {
            if octant >> a & 1 == 1 {
                min[a] = self.center[a];
            } else {
                max[a] = self.center[a];
            }
        }
        (min, max)
    }

    fn distance_squared_to(&self, p: &Point3<f64>) -> f64 {
        (0..3)
            .map(|a| {
                let d = (self.min[a] - p[a]).max(p[a] - self.max[a]).max(0.0);
                d * d
            })
            .sum()
    }
}

/// Bucketed octree mapping 3D points to values.
///
/// The root is created on the first insertion using the configured center
/// and radius. Points outside the root cube are rejected.
///
/// # Example
///
/// ```
/// use spatial_index::{Octree, OctreeParams};
/// use nalgebra::Point3;
///
/// let params = OctreeParams::new(Point3::origin(), 1.0).with_max_box_elements(2);
/// let mut tree = Octree::new(params)?;
/// tree.insert(Point3::new(0.5, 0.5, 0.5), "a")?;
/// tree.insert(Point3::new(-0.5, 0.5, 0.5), "b")?;
/// tree.insert(Point3::new(-0.5, -0.5, -0.5), "c")?;
///
/// assert_eq!(tree.len(), 3);
/// assert_eq!(tree.find(&Point3::new(-0.5, 0.5, 0.5)), Some(&"b"));
///
/// // The third entry split the root
/// let root = tree.root().and_then(|r| tree.node(r)).unwrap();
/// assert!(!root.is_leaf());
///
/// // Outside the root cube
/// assert!(tree.insert(Point3::new(2.0, 0.0, 0.0), "d").is_err());
/// # Ok::<(), spatial_index::SpatialError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Octree<V> {
    params: OctreeParams,
    nodes: Vec<OctreeNode<V>>,
    root: Option<NodeId>,
    len: usize,
}

impl<V> Octree<V> {
    /// Create an empty octree.
    ///
    /// # Errors
    ///
    /// Returns an error if `params` fail [`OctreeParams::validate`].
    pub fn new(params: OctreeParams) -> SpatialResult<Self> {
        params.validate()?;
        Ok(Self {
            params,
            nodes: Vec::new(),
            root: None,
            len: 0,
        })
    }

    /// Build an octree from a batch of entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are invalid or an entry lies
    /// outside the root cube.
    pub fn from_entries(
        params: OctreeParams,
        entries: impl IntoIterator<Item = (Point3<f64>, V)>,
    ) -> SpatialResult<Self> {
        let mut tree = Self::new(params)?;
        for (key, value) in entries {
            tree.insert(key, value)?;
        }
        debug!(
            entries = tree.len,
            nodes = tree.nodes.len(),
            "built octree"
        );
        Ok(tree)
    }

    /// Configuration of the tree.
    #[must_use]
    pub const fn params(&self) -> &OctreeParams {
        &self.params
    }

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

    /// Root node, `None` until the first insertion.
    #[must_use]
    pub const fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Access a node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&OctreeNode<V>> {
        self.nodes.get(id.0)
    }

    /// Number of allocated nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether a point lies in the half-open root cube.
    #[must_use]
    pub fn root_contains(&self, p: &Point3<f64>) -> bool {
        let r = self.params.radius;
        (0..3).all(|a| {
            let c = self.params.center[a];
            c - r <= p[a] && p[a] < c + r
        })
    }

    /// Insert an entry.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::OutOfBounds`] if `key` lies outside the root
    /// cube (the tree is never re-centered or grown).
    pub fn insert(&mut self, key: Point3<f64>, value: V) -> SpatialResult<()> {
        if !self.root_contains(&key) {
            return Err(SpatialError::OutOfBounds {
                point: key,
                center: self.params.center,
                radius: self.params.radius,
            });
        }
        let root = self.ensure_root();
        let leaf = self.descend(root, &key);
        if let NodeKind::Leaf(entries) = &mut self.nodes[leaf.0].kind {
            entries.push((key, value));
        }
        self.len += 1;
        self.split_from(leaf);
        Ok(())
    }

    fn ensure_root(&mut self) -> NodeId {
        if let Some(root) = self.root {
            return root;
        }
        let r = nalgebra::Vector3::repeat(self.params.radius);
        let c = self.params.center;
        let id = NodeId(self.nodes.len());
        self.nodes.push(OctreeNode::new(c - r, c + r, 0, None, 0));
        self.root = Some(id);
        id
    }

    fn needs_split(&self, id: NodeId) -> bool {
        let node = &self.nodes[id.0];
        let NodeKind::Leaf(entries) = &node.kind else {
            return false;
        };
        node.depth < self.params.max_depth
            && !entries.is_empty()
            && (entries.len() > self.params.max_box_elements
                || node.radius() > self.params.max_box_radius)
    }

    /// Split `start` and then every child that received entries, as long
    /// as the split policy asks for it.
    fn split_from(&mut self, start: NodeId) {
        let mut work = vec![start];
        while let Some(id) = work.pop() {
            if !self.needs_split(id) {
                continue;
            }
            let first = self.nodes.len();
            let children: [NodeId; 8] = std::array::from_fn(|i| NodeId(first + i));
            let parent = &self.nodes[id.0];
            let depth = parent.depth + 1;
            let new_nodes: Vec<OctreeNode<V>> = (0..8u8)
                .map(|o| {
                    let (min, max) = parent.child_bounds(usize::from(o));
                    OctreeNode::new(min, max, depth, Some(id), o)
                })
                .collect();
            self.nodes.extend(new_nodes);

            let old = std::mem::replace(&mut self.nodes[id.0].kind, NodeKind::Internal(children));
            let NodeKind::Leaf(entries) = old else {
                continue;
            };
            for (key, value) in entries {
                let child = children[self.nodes[id.0].octant_of(&key)];
                if let NodeKind::Leaf(bucket) = &mut self.nodes[child.0].kind {
                    bucket.push((key, value));
                }
            }
            work.extend(children.iter().copied().filter(|&c| !self.nodes[c.0].entries().is_empty()));
        }
    }

    /// Descend from `from` by octant comparison until a leaf.
    fn descend(&self, from: NodeId, p: &Point3<f64>) -> NodeId {
        let mut cur = from;
        loop {
            let node = &self.nodes[cur.0];
            match &node.kind {
                NodeKind::Leaf(_) => return cur,
                NodeKind::Internal(children) => cur = children[node.octant_of(p)],
            }
        }
    }

    /// Leaf whose cube contains `p`, or `None` outside the root.
    #[must_use]
    pub fn find_leaf(&self, p: &Point3<f64>) -> Option<NodeId> {
        let root = self.root?;
        self.root_contains(p).then(|| self.descend(root, p))
    }

    /// Leaf closest to `p`: the containing leaf, or for points outside the
    /// root, the leaf containing `p` clamped onto the root cube.
    #[must_use]
    pub fn find_closest(&self, p: &Point3<f64>) -> Option<NodeId> {
        let root = self.root?;
        let (min, max) = self.nodes[root.0].bounds();
        let clamped = Point3::new(
            p.x.clamp(min.x, max.x),
            p.y.clamp(min.y, max.y),
            p.z.clamp(min.z, max.z),
        );
        Some(self.descend(root, &clamped))
    }

    /// Value stored under exactly `key`.
    #[must_use]
    pub fn find(&self, key: &Point3<f64>) -> Option<&V> {
        let leaf = self.find_leaf(key)?;
        self.nodes[leaf.0]
            .entries()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Remove the first entry stored under exactly `key`.
    ///
    /// Emptied leaves are kept; nodes are never merged.
    pub fn remove(&mut self, key: &Point3<f64>) -> Option<V> {
        let leaf = self.find_leaf(key)?;
        let NodeKind::Leaf(entries) = &mut self.nodes[leaf.0].kind else {
            return None;
        };
        let pos = entries.iter().position(|(k, _)| k == key)?;
        self.len -= 1;
        Some(entries.remove(pos).1)
    }

    /// Exact nearest entry to `p`, with its distance.
    #[must_use]
    pub fn nearest(&self, p: &Point3<f64>) -> Option<(&Point3<f64>, &V, f64)> {
        let root = self.root?;
        let mut best: Option<(&Point3<f64>, &V, f64)> = None;
        let mut stack = vec![(root, self.nodes[root.0].distance_squared_to(p))];
        while let Some((id, bound)) = stack.pop() {
            if best.is_some_and(|(_, _, d)| bound >= d * d) {
                continue;
            }
            let node = &self.nodes[id.0];
            match &node.kind {
                NodeKind::Leaf(entries) => {
                    for (k, v) in entries {
                        let d = (k - p).norm();
                        if best.is_none_or(|(_, _, bd)| d < bd) {
                            best = Some((k, v, d));
                        }
                    }
                }
                NodeKind::Internal(children) => {
                    let mut ordered: Vec<(NodeId, f64)> = children
                        .iter()
                        .map(|&c| (c, self.nodes[c.0].distance_squared_to(p)))
                        .collect();
                    // Farthest first so the nearest child is popped next
                    ordered.sort_by(|a, b| b.1.total_cmp(&a.1));
                    stack.extend(ordered);
                }
            }
        }
        best
    }

    /// Leaves adjacent to `id` across the face, edge or corner given by
    /// `direction` (each component in `-1..=1`).
    ///
    /// The neighbour cell of the same size is located by climbing to the
    /// common ancestor while mirroring octant bits on the moving axes, then
    /// descending along the mirrored path. A coarser leaf met on the way
    /// down is returned as is; a finer subtree contributes all of its leaves
    /// that touch `id`. Returns an empty list at the root boundary.
    #[must_use]
    pub fn neighbors_in_direction(&self, id: NodeId, direction: [i8; 3]) -> Vec<NodeId> {
        if direction == [0; 3] || self.node(id).is_none() {
            return Vec::new();
        }
        let mut remaining = direction.map(i8::signum);
        let mut path = Vec::new();
        let mut cur = id;
        while remaining != [0; 3] {
            let node = &self.nodes[cur.0];
            let Some(parent) = node.parent else {
                return Vec::new();
            };
            let mut octant = node.octant;
            for (a, step) in remaining.iter_mut().enumerate() {
                if *step == 0 {
                    continue;
                }
                let upper = octant >> a & 1 == 1;
                octant ^= 1 << a;
                // Moving towards the other half of the parent stays inside it
                if (*step > 0) != upper {
                    *step = 0;
                }
            }
            path.push(octant);
            cur = parent;
        }

        for &octant in path.iter().rev() {
            match self.nodes[cur.0].children() {
                Some(children) => cur = children[usize::from(octant)],
                None => break,
            }
        }
        self.near_side_leaves(cur, direction)
    }

    /// Leaves of the subtree at `id` on the side facing a node located in
    /// the opposite of `direction`.
    fn near_side_leaves(&self, id: NodeId, direction: [i8; 3]) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            match self.nodes[n.0].children() {
                None => out.push(n),
                Some(children) => {
                    for (o, &child) in children.iter().enumerate() {
                        let facing = (0..3).all(|a| {
                            let upper = o >> a & 1 == 1;
                            match direction[a].signum() {
                                1 => !upper,
                                -1 => upper,
                                _ => true,
                            }
                        });
                        if facing {
                            stack.push(child);
                        }
                    }
                }
            }
        }
        out
    }

    /// All leaves adjacent to `id` in any of the 26 directions, sorted,
    /// deduplicated and without `id` itself.
    #[must_use]
    pub fn neighbors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        for dx in -1..=1i8 {
            for dy in -1..=1i8 {
                for dz in -1..=1i8 {
                    out.extend(self.neighbors_in_direction(id, [dx, dy, dz]));
                }
            }
        }
        out.sort_unstable();
        out.dedup();
        out.retain(|&n| n != id);
        out
    }

    /// IDs of every leaf.
    #[must_use]
    pub fn leaves(&self) -> Vec<NodeId> {
        (0..self.nodes.len())
            .map(NodeId)
            .filter(|&id| self.nodes[id.0].is_leaf())
            .collect()
    }

    /// Iterate over all entries.
    pub fn iter(&self) -> impl Iterator<Item = (&Point3<f64>, &V)> + '_ {
        self.nodes
            .iter()
            .flat_map(|n| n.entries().iter().map(|(k, v)| (k, v)))
    }

    /// Entries inside the closed box `[min, max]`.
    #[must_use]
    pub fn query_aabb(&self, min: &Point3<f64>, max: &Point3<f64>) -> Vec<(&Point3<f64>, &V)> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.0];
            let disjoint = (0..3).any(|a| node.max[a] < min[a] || node.min[a] > max[a]);
            if disjoint {
                continue;
            }
            match &node.kind {
                NodeKind::Leaf(entries) => out.extend(
                    entries
                        .iter()
                        .filter(|(k, _)| (0..3).all(|a| min[a] <= k[a] && k[a] <= max[a]))
                        .map(|(k, v)| (k, v)),
                ),
                NodeKind::Internal(children) => stack.extend(children.iter().copied()),
            }
        }
        out
    }

    /// Verify the structural invariants of the tree.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::InvariantViolation`] if an entry lies outside
    /// its leaf, child links are inconsistent, a splittable leaf is over
    /// capacity or the entry count is wrong.
    pub fn check_invariants(&self) -> SpatialResult<()> {
        let fail = |msg: String| Err(SpatialError::InvariantViolation(msg));
        let mut count = 0;
        for (i, node) in self.nodes.iter().enumerate() {
            match &node.kind {
                NodeKind::Leaf(entries) => {
                    count += entries.len();
                    if let Some((k, _)) = entries.iter().find(|(k, _)| !node.contains(k)) {
                        return fail(format!("entry {k:?} lies outside leaf {i}"));
                    }
                    if entries.len() > self.params.max_box_elements
                        && node.depth < self.params.max_depth
                    {
                        return fail(format!("leaf {i} is over capacity"));
                    }
                }
                NodeKind::Internal(children) => {
                    for (o, c) in children.iter().enumerate() {
                        let child = self.node(*c).ok_or_else(|| {
                            SpatialError::InvariantViolation(format!("node {i} has a dangling child"))
                        })?;
                        if child.parent != Some(NodeId(i))
                            || usize::from(child.octant) != o
                            || child.depth != node.depth + 1
                            || (child.min, child.max) != node.child_bounds(o)
                        {
                            return fail(format!("child {o} of node {i} is inconsistent"));
                        }
                    }
                }
            }
        }
        if count != self.len {
            return fail(format!("{count} entries stored but len is {}", self.len));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(cap: usize) -> OctreeParams {
        OctreeParams::new(Point3::origin(), 1.0).with_max_box_elements(cap)
    }

    fn grid_tree(cap: usize, n: i32) -> Octree<usize> {
        let step = 2.0 / f64::from(n);
        let mut tree = Octree::new(params(cap)).unwrap();
        let mut i = 0;
        for x in 0..n {
            for y in 0..n {
                for z in 0..n {
                    let p = Point3::new(
                        f64::from(x).mul_add(step, -1.0 + step * 0.5),
                        f64::from(y).mul_add(step, -1.0 + step * 0.5),
                        f64::from(z).mul_add(step, -1.0 + step * 0.5),
                    );
                    tree.insert(p, i).unwrap();
                    i += 1;
                }
            }
        }
        tree
    }

    #[test]
    fn invalid_params_rejected() {
        assert!(Octree::<()>::new(OctreeParams::new(Point3::origin(), 0.0)).is_err());
        assert!(Octree::<()>::new(params(0)).is_err());
        assert!(Octree::<()>::new(params(1).with_max_box_radius(-1.0)).is_err());
    }

    #[test]
    fn empty_tree_has_no_root() {
        let tree: Octree<u8> = Octree::new(params(4)).unwrap();
        assert!(tree.root().is_none());
        assert!(tree.find_closest(&Point3::origin()).is_none());
        assert!(tree.nearest(&Point3::origin()).is_none());
    }

    #[test]
    fn half_open_root() {
        let mut tree = Octree::new(params(4)).unwrap();
        assert!(tree.insert(Point3::new(-1.0, -1.0, -1.0), 0).is_ok());
        assert!(matches!(
            tree.insert(Point3::new(1.0, 0.0, 0.0), 1),
            Err(SpatialError::OutOfBounds { .. })
        ));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn split_redistributes_without_loss() {
        let mut tree = Octree::new(params(2)).unwrap();
        let pts = [
            Point3::new(0.5, 0.5, 0.5),
            Point3::new(-0.5, 0.5, 0.5),
            Point3::new(0.0, 0.0, 0.0),
        ];
        for (i, p) in pts.iter().enumerate() {
            tree.insert(*p, i).unwrap();
        }
        tree.check_invariants().unwrap();
        let root = tree.node(tree.root().unwrap()).unwrap();
        let children = root.children().unwrap();
        let counts: usize = children
            .iter()
            .map(|&c| tree.node(c).unwrap().entries().len())
            .sum();
        assert_eq!(counts, 3);
        // The center point sits on every split plane and goes to the upper octant
        let upper = tree.node(children[7]).unwrap();
        assert_eq!(upper.entries().len(), 2);
    }

    #[test]
    fn coincident_points_stop_at_max_depth() {
        let mut tree = Octree::new(params(1).with_max_depth(4)).unwrap();
        for i in 0..5 {
            tree.insert(Point3::new(0.1, 0.1, 0.1), i).unwrap();
        }
        tree.check_invariants().unwrap();
        let leaf = tree.find_leaf(&Point3::new(0.1, 0.1, 0.1)).unwrap();
        assert_eq!(tree.node(leaf).unwrap().depth(), 4);
        assert_eq!(tree.node(leaf).unwrap().entries().len(), 5);
    }

    #[test]
    fn max_box_radius_forces_split() {
        let mut tree = Octree::new(params(100).with_max_box_radius(0.3)).unwrap();
        tree.insert(Point3::new(0.1, 0.2, 0.3), ()).unwrap();
        let leaf = tree.find_leaf(&Point3::new(0.1, 0.2, 0.3)).unwrap();
        assert!(tree.node(leaf).unwrap().radius() <= 0.3);
        tree.check_invariants().unwrap();
    }

    #[test]
    fn find_and_remove() {
        let mut tree = grid_tree(3, 4);
        let p = Point3::new(0.25, -0.75, 0.75);
        assert!(tree.find(&p).is_some());
        assert!(tree.find(&Point3::new(0.2, 0.2, 0.2)).is_none());
        let before = tree.len();
        assert!(tree.remove(&p).is_some());
        assert!(tree.find(&p).is_none());
        assert_eq!(tree.len(), before - 1);
        tree.check_invariants().unwrap();
    }

    #[test]
    fn find_closest_clamps() {
        let tree = grid_tree(1, 4);
        let leaf = tree.find_closest(&Point3::new(5.0, 5.0, 5.0)).unwrap();
        let node = tree.node(leaf).unwrap();
        assert_eq!(node.entries()[0].0, Point3::new(0.75, 0.75, 0.75));
    }

    #[test]
    fn nearest_matches_brute_force() {
        let tree = grid_tree(2, 5);
        let q = Point3::new(0.13, -0.41, 0.77);
        let (k, _, d) = tree.nearest(&q).unwrap();
        let brute = tree
            .iter()
            .map(|(k, _)| (*k - q).norm())
            .fold(f64::INFINITY, f64::min);
        assert!((d - brute).abs() < 1e-12);
        assert!(((*k - q).norm() - d).abs() < 1e-12);
    }

    #[test]
    fn uniform_grid_neighbors() {
        // One point per cell of a 4x4x4 grid, capacity 1: every leaf is a cell
        let tree = grid_tree(1, 4);
        let corner = tree.find_leaf(&Point3::new(-0.75, -0.75, -0.75)).unwrap();
        assert_eq!(tree.neighbors(corner).len(), 7);

        let inner = tree.find_leaf(&Point3::new(-0.25, -0.25, -0.25)).unwrap();
        assert_eq!(tree.neighbors(inner).len(), 26);

        let east = tree.neighbors_in_direction(inner, [1, 0, 0]);
        assert_eq!(east.len(), 1);
        let east_node = tree.node(east[0]).unwrap();
        assert_eq!(east_node.entries()[0].0, Point3::new(0.25, -0.25, -0.25));

        // Crossing the root face finds nothing
        assert!(tree.neighbors_in_direction(corner, [-1, 0, 0]).is_empty());
    }

    #[test]
    fn finer_neighbors_are_collected() {
        let mut tree = Octree::new(params(1)).unwrap();
        // Coarse leaf on the negative x side, refined region on the positive side
        tree.insert(Point3::new(-0.5, -0.5, -0.5), 0).unwrap();
        for (i, p) in [
            Point3::new(0.1, -0.9, -0.9),
            Point3::new(0.1, -0.6, -0.9),
            Point3::new(0.9, -0.9, -0.9),
        ]
        .into_iter()
        .enumerate()
        {
            tree.insert(p, i + 1).unwrap();
        }
        tree.check_invariants().unwrap();
        let coarse = tree.find_leaf(&Point3::new(-0.5, -0.5, -0.5)).unwrap();
        let east = tree.neighbors_in_direction(coarse, [1, 0, 0]);
        for n in &east {
            let (min, _) = tree.node(*n).unwrap().bounds();
            assert!(min.x.abs() < 1e-12, "neighbour must touch x = 0");
        }
        assert!(east.len() > 1);
        // And back: every finer leaf sees the coarse one to the west
        for n in east {
            assert_eq!(tree.neighbors_in_direction(n, [-1, 0, 0]), vec![coarse]);
        }
    }

    #[test]
    fn query_aabb_filters_entries() {
        let tree = grid_tree(2, 4);
        let hits = tree.query_aabb(&Point3::new(0.0, 0.0, 0.0), &Point3::new(1.0, 1.0, 1.0));
        assert_eq!(hits.len(), 8);
        assert!(hits.iter().all(|(k, _)| k.x > 0.0 && k.y > 0.0 && k.z > 0.0));
    }

    #[test]
    fn enclosing_contains_max_corner() {
        let p = OctreeParams::enclosing(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0));
        let tree: Octree<()> = Octree::new(p).unwrap();
        assert!(tree.root_contains(&Point3::new(2.0, 1.0, 1.0)));
        assert!(tree.root_contains(&Point3::new(0.0, 0.0, 0.0)));
    }

    #[test]
    fn enclosing_holds_corners_far_from_origin() {
        for offset in [0.0, 1e6, 1e10, -1e10] {
            let min = Point3::new(offset - 1.0, offset - 1.0, offset);
            let max = Point3::new(offset + 1.0, offset + 1.0, offset);
            let corners = [(min, 0), (max, 1), (nalgebra::center(&min, &max), 2)];
            let tree = Octree::from_entries(
                OctreeParams::enclosing(min, max).with_max_box_elements(1),
                corners,
            )
            .unwrap();
            assert!(tree.root_contains(&max), "offset {offset}");
            assert_eq!(tree.len(), 3);
            tree.check_invariants().unwrap();
        }
    }
}
