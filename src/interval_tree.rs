//! Augmented red-black interval tree.
//!
//! Stores closed intervals `[low, high]` ordered by `low`, each node carrying
//! the maximum `high` of its subtree so overlap queries can skip subtrees that
//! end before the query starts.
//!
//! # Arena-based allocation
//!
//! Nodes live in a `Vec` arena and refer to each other through [`NodeId`]
//! indices. Removed slots go onto a free list and are reused by later
//! inserts. Payloads are owned by the tree and dropped with it.

use crate::error::Result;

/// Handle to an interval stored in an [`IntervalTree`].
///
/// Stays valid until the interval is removed; after that the slot may be
/// reused by a later insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    #[inline(always)]
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
struct TreeNode<T> {
    low: u64,
    high: u64,
    max: u64,
    parent: Option<NodeId>,
    left: Option<NodeId>,
    right: Option<NodeId>,
    red: bool,
    /// `None` once the slot has been freed.
    payload: Option<T>,
}

/// Interval tree mapping closed intervals to payloads of type `T`.
#[derive(Debug)]
pub struct IntervalTree<T> {
    nodes: Vec<TreeNode<T>>,
    free_list: Vec<u32>,
    root: Option<NodeId>,
    len: usize,
}

impl<T> Default for IntervalTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> IntervalTree<T> {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free_list: Vec::new(),
            root: None,
            len: 0,
        }
    }

    /// Number of stored intervals.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Payload stored under `id`, if the interval is still in the tree.
    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.nodes.get(id.index()).and_then(|n| n.payload.as_ref())
    }

    /// Interval stored under `id`.
    pub fn interval(&self, id: NodeId) -> Option<(u64, u64)> {
        self.nodes
            .get(id.index())
            .filter(|n| n.payload.is_some())
            .map(|n| (n.low, n.high))
    }

    // ===== Field accessors =====

    #[inline(always)]
    fn node(&self, id: NodeId) -> &TreeNode<T> {
        &self.nodes[id.index()]
    }

    #[inline(always)]
    fn node_mut(&mut self, id: NodeId) -> &mut TreeNode<T> {
        &mut self.nodes[id.index()]
    }

    #[inline(always)]
    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    #[inline(always)]
    fn left(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).left
    }

    #[inline(always)]
    fn right(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).right
    }

    #[inline(always)]
    fn is_red(&self, id: Option<NodeId>) -> bool {
        id.is_some_and(|n| self.node(n).red)
    }

    #[inline(always)]
    fn set_red(&mut self, id: NodeId, red: bool) {
        self.node_mut(id).red = red;
    }

    fn alloc_node(&mut self, low: u64, high: u64, payload: T) -> NodeId {
        let node = TreeNode {
            low,
            high,
            max: high,
            parent: None,
            left: None,
            right: None,
            red: true,
            payload: Some(payload),
        };
        match self.free_list.pop() {
            Some(idx) => {
                self.nodes[idx as usize] = node;
                NodeId(idx)
            }
            None => {
                self.nodes.push(node);
                NodeId((self.nodes.len() - 1) as u32)
            }
        }
    }

    // ===== Augmentation =====

    fn update_max(&mut self, id: NodeId) {
        let mut max = self.node(id).high;
        if let Some(l) = self.left(id) {
            max = max.max(self.node(l).max);
        }
        if let Some(r) = self.right(id) {
            max = max.max(self.node(r).max);
        }
        self.node_mut(id).max = max;
    }

    /// Recompute `max` from `start` up to the root.
    fn propagate_max(&mut self, start: Option<NodeId>) {
        let mut current = start;
        while let Some(id) = current {
            self.update_max(id);
            current = self.parent(id);
        }
    }

    // ===== Rotations =====

    fn rotate_left(&mut self, x: NodeId) {
        let Some(y) = self.right(x) else {
            return;
        };
        let y_left = self.left(y);
        self.node_mut(x).right = y_left;
        if let Some(yl) = y_left {
            self.node_mut(yl).parent = Some(x);
        }
        self.replace_child(Some(y), x);
        self.node_mut(y).left = Some(x);
        self.node_mut(x).parent = Some(y);
        self.update_max(x);
        self.update_max(y);
    }

    fn rotate_right(&mut self, x: NodeId) {
        let Some(y) = self.left(x) else {
            return;
        };
        let y_right = self.right(y);
        self.node_mut(x).left = y_right;
        if let Some(yr) = y_right {
            self.node_mut(yr).parent = Some(x);
        }
        self.replace_child(Some(y), x);
        self.node_mut(y).right = Some(x);
        self.node_mut(x).parent = Some(y);
        self.update_max(x);
        self.update_max(y);
    }

    /// Put `source` where `dest` hangs below its parent.
    fn replace_child(&mut self, source: Option<NodeId>, dest: NodeId) {
        let parent = self.parent(dest);
        match parent {
            None => self.root = source,
            Some(p) => {
                if self.left(p) == Some(dest) {
                    self.node_mut(p).left = source;
                } else {
                    self.node_mut(p).right = source;
                }
            }
        }
        if let Some(s) = source {
            self.node_mut(s).parent = parent;
        }
    }

    // ===== Insertion =====

    /// Insert `[low, high]` with `payload`, returning a handle for removal.
    ///
    /// # Panics
    ///
    /// Panics if `low > high`.
    pub fn insert(&mut self, low: u64, high: u64, payload: T) -> NodeId {
        assert!(low <= high, "interval low {} > high {}", low, high);
        let id = self.alloc_node(low, high, payload);

        let mut parent = None;
        let mut current = self.root;
        while let Some(c) = current {
            parent = Some(c);
            let node = self.node_mut(c);
            node.max = node.max.max(high);
            current = if low < node.low { node.left } else { node.right };
        }

        self.node_mut(id).parent = parent;
        match parent {
            None => self.root = Some(id),
            Some(p) => {
                if low < self.node(p).low {
                    self.node_mut(p).left = Some(id);
                } else {
                    self.node_mut(p).right = Some(id);
                }
            }
        }

        self.insert_fix(id);
        self.len += 1;
        id
    }

    fn insert_fix(&mut self, mut z: NodeId) {
        while let Some(p) = self.parent(z).filter(|&p| self.node(p).red) {
            // A red parent is never the root, so the grandparent exists.
            let Some(g) = self.parent(p) else {
                break;
            };
            if self.left(g) == Some(p) {
                let uncle = self.right(g);
                if self.is_red(uncle) {
                    self.set_red(p, false);
                    if let Some(u) = uncle {
                        self.set_red(u, false);
                    }
                    self.set_red(g, true);
                    z = g;
                } else {
                    if self.right(p) == Some(z) {
                        z = p;
                        self.rotate_left(z);
                    }
                    if let Some(zp) = self.parent(z) {
                        self.set_red(zp, false);
                        if let Some(zg) = self.parent(zp) {
                            self.set_red(zg, true);
                            self.rotate_right(zg);
                        }
                    }
                }
            } else {
                let uncle = self.left(g);
                if self.is_red(uncle) {
                    self.set_red(p, false);
                    if let Some(u) = uncle {
                        self.set_red(u, false);
                    }
                    self.set_red(g, true);
                    z = g;
                } else {
                    if self.left(p) == Some(z) {
                        z = p;
                        self.rotate_right(z);
                    }
                    if let Some(zp) = self.parent(z) {
                        self.set_red(zp, false);
                        if let Some(zg) = self.parent(zp) {
                            self.set_red(zg, true);
                            self.rotate_left(zg);
                        }
                    }
                }
            }
        }
        if let Some(root) = self.root {
            self.set_red(root, false);
        }
    }

    // ===== Removal =====

    fn subtree_min(&self, mut id: NodeId) -> NodeId {
        while let Some(l) = self.left(id) {
            id = l;
        }
        id
    }

    /// Remove the interval stored under `id` and return its payload.
    ///
    /// Returns `None` if `id` does not refer to a stored interval.
    pub fn remove(&mut self, z: NodeId) -> Option<T> {
        if self.get(z).is_none() {
            return None;
        }

        let mut removed_red = self.node(z).red;
        let x;
        let x_parent;

        match (self.left(z), self.right(z)) {
            (None, right) => {
                x = right;
                x_parent = self.parent(z);
                self.replace_child(right, z);
            }
            (left, None) => {
                x = left;
                x_parent = self.parent(z);
                self.replace_child(left, z);
            }
            (Some(z_left), Some(z_right)) => {
                let y = self.subtree_min(z_right);
                removed_red = self.node(y).red;
                x = self.right(y);
                if self.parent(y) == Some(z) {
                    x_parent = Some(y);
                } else {
                    x_parent = self.parent(y);
                    self.replace_child(x, y);
                    self.node_mut(y).right = Some(z_right);
                    self.node_mut(z_right).parent = Some(y);
                }
                self.replace_child(Some(y), z);
                self.node_mut(y).left = Some(z_left);
                self.node_mut(z_left).parent = Some(y);
                let z_red = self.node(z).red;
                self.set_red(y, z_red);
            }
        }

        self.propagate_max(x_parent);
        if !removed_red {
            self.remove_fix(x, x_parent);
        }

        self.len -= 1;
        self.free_list.push(z.0);
        let node = self.node_mut(z);
        node.parent = None;
        node.left = None;
        node.right = None;
        node.payload.take()
    }

    fn remove_fix(&mut self, mut x: Option<NodeId>, mut parent: Option<NodeId>) {
        while let Some(p) = parent {
            if self.is_red(x) {
                break;
            }
            if x == self.left(p) {
                let Some(mut w) = self.right(p) else {
                    break;
                };
                if self.node(w).red {
                    self.set_red(w, false);
                    self.set_red(p, true);
                    self.rotate_left(p);
                    match self.right(p) {
                        Some(next) => w = next,
                        None => break,
                    }
                }
                if !self.is_red(self.left(w)) && !self.is_red(self.right(w)) {
                    self.set_red(w, true);
                    x = Some(p);
                    parent = self.parent(p);
                } else {
                    if !self.is_red(self.right(w)) {
                        if let Some(wl) = self.left(w) {
                            self.set_red(wl, false);
                        }
                        self.set_red(w, true);
                        self.rotate_right(w);
                        match self.right(p) {
                            Some(next) => w = next,
                            None => break,
                        }
                    }
                    let p_red = self.node(p).red;
                    self.set_red(w, p_red);
                    self.set_red(p, false);
                    if let Some(wr) = self.right(w) {
                        self.set_red(wr, false);
                    }
                    self.rotate_left(p);
                    x = self.root;
                    parent = None;
                }
            } else {
                let Some(mut w) = self.left(p) else {
                    break;
                };
                if self.node(w).red {
                    self.set_red(w, false);
                    self.set_red(p, true);
                    self.rotate_right(p);
                    match self.left(p) {
                        Some(next) => w = next,
                        None => break,
                    }
                }
                if !self.is_red(self.right(w)) && !self.is_red(self.left(w)) {
                    self.set_red(w, true);
                    x = Some(p);
                    parent = self.parent(p);
                } else {
                    if !self.is_red(self.left(w)) {
                        if let Some(wr) = self.right(w) {
                            self.set_red(wr, false);
                        }
                        self.set_red(w, true);
                        self.rotate_left(w);
                        match self.left(p) {
                            Some(next) => w = next,
                            None => break,
                        }
                    }
                    let p_red = self.node(p).red;
                    self.set_red(w, p_red);
                    self.set_red(p, false);
                    if let Some(wl) = self.left(w) {
                        self.set_red(wl, false);
                    }
                    self.rotate_right(p);
                    x = self.root;
                    parent = None;
                }
            }
        }
        if let Some(n) = x {
            self.set_red(n, false);
        }
    }

    // ===== Queries =====

    /// Call `f` for every interval overlapping `[low, high]`.
    ///
    /// Visit order is unspecified.
    pub fn iterate_overlapping<'a, F>(&'a self, low: u64, high: u64, mut f: F)
    where
        F: FnMut(NodeId, &'a T),
    {
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            if node.max < low {
                continue;
            }
            if let Some(l) = node.left {
                stack.push(l);
            }
            if node.low <= high {
                if node.high >= low {
                    if let Some(payload) = node.payload.as_ref() {
                        f(id, payload);
                    }
                }
                // Everything right of a node starting after `high` does too.
                if let Some(r) = node.right {
                    stack.push(r);
                }
            }
        }
    }

    /// All payloads whose interval overlaps `[low, high]`, in unspecified order.
    pub fn find_all_overlapping(&self, low: u64, high: u64) -> Vec<&T> {
        let mut found = Vec::new();
        self.iterate_overlapping(low, high, |_, payload| found.push(payload));
        found
    }

    /// The overlapping interval with the smallest `low`, if any.
    pub fn find_first_overlapping(&self, low: u64, high: u64) -> Option<&T> {
        let mut current = self.root;
        let mut best: Option<NodeId> = None;
        while let Some(id) = current {
            let node = self.node(id);
            if node.left.is_some_and(|l| self.node(l).max >= low) {
                // Left subtree may hold an overlap with a smaller low.
                if node.low <= high && node.high >= low {
                    best = Some(id);
                }
                current = node.left;
            } else if node.low <= high && node.high >= low {
                return node.payload.as_ref();
            } else if node.low > high {
                break;
            } else {
                current = node.right;
            }
        }
        best.and_then(|id| self.get(id))
    }

    /// In-order (ascending `low`) iterator over all payloads.
    pub fn iter(&self) -> Iter<'_, T> {
        let mut iter = Iter {
            tree: self,
            stack: Vec::new(),
        };
        iter.push_left(self.root);
        iter
    }

    /// Call `f` for every payload in ascending order of `low`.
    ///
    /// The first error stops the traversal.
    pub fn traverse<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&T) -> Result<()>,
    {
        for payload in self.iter() {
            f(payload)?;
        }
        Ok(())
    }
}

/// In-order iterator over an [`IntervalTree`].
pub struct Iter<'a, T> {
    tree: &'a IntervalTree<T>,
    stack: Vec<NodeId>,
}

impl<T> Iter<'_, T> {
    fn push_left(&mut self, mut current: Option<NodeId>) {
        while let Some(id) = current {
            self.stack.push(id);
            current = self.tree.left(id);
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        self.push_left(self.tree.right(id));
        self.tree.node(id).payload.as_ref()
    }
}
