//! Binary search tree over right ascension.
//!
//! Nodes live in a flat arena sorted by `(ra, offset)`; node `i` is the `i`-th element of the
//! sorted sequence. Construction links the median of each sub-range as its root, which bounds
//! the height by `⌈log2(n + 1)⌉` regardless of input order. Trees are never mutated after
//! construction.

use ordered_float::OrderedFloat;

use crate::constants::{ByteOffset, Degree};

/// Arena index of a node.
pub type NodeId = u32;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaNode {
    pub offset: ByteOffset,
    pub ra: Degree,
    pub dec: Degree,
    pub left: Option<NodeId>,
    pub right: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RaTree {
    nodes: Vec<RaNode>,
    root: Option<NodeId>,
}

impl RaTree {
    /// Build a balanced tree from `(offset, ra, dec)` points in any order.
    pub fn build(mut points: Vec<(ByteOffset, Degree, Degree)>) -> RaTree {
        points.sort_by_key(|&(offset, ra, _)| (OrderedFloat(ra), offset));

        let mut nodes: Vec<RaNode> = points
            .into_iter()
            .map(|(offset, ra, dec)| RaNode {
                offset,
                ra,
                dec,
                left: None,
                right: None,
            })
            .collect();
        let n = nodes.len();
        let root = link_median(&mut nodes, 0, n);
        RaTree { nodes, root }
    }

    /// Reassemble a tree from stored parts, checking that it is a well-formed search tree.
    pub fn from_parts(nodes: Vec<RaNode>, root: Option<NodeId>) -> Result<RaTree, String> {
        let tree = RaTree { nodes, root };
        tree.validate()?;
        Ok(tree)
    }

    pub fn nodes(&self) -> &[RaNode] {
        &self.nodes
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn height(&self) -> usize {
        fn depth(tree: &RaTree, id: Option<NodeId>) -> usize {
            match id {
                None => 0,
                Some(id) => {
                    let node = &tree.nodes[id as usize];
                    1 + depth(tree, node.left).max(depth(tree, node.right))
                }
            }
        }
        depth(self, self.root)
    }

    /// Nodes in in-order (ascending right ascension).
    pub fn in_order(&self) -> Vec<&RaNode> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = Vec::new();
        let mut current = self.root;
        while current.is_some() || !stack.is_empty() {
            while let Some(id) = current {
                stack.push(id);
                current = self.nodes[id as usize].left;
            }
            if let Some(id) = stack.pop() {
                let node = &self.nodes[id as usize];
                out.push(node);
                current = node.right;
            }
        }
        out
    }

    /// Visit every node with `lo <= ra <= hi`, pruning subtrees that cannot intersect.
    pub fn range(&self, lo: Degree, hi: Degree, mut visit: impl FnMut(&RaNode)) {
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id as usize];
            if node.ra >= lo {
                stack.extend(node.left);
            }
            if node.ra <= hi {
                stack.extend(node.right);
            }
            if node.ra >= lo && node.ra <= hi {
                visit(node);
            }
        }
    }

    fn validate(&self) -> Result<(), String> {
        let n = self.nodes.len();
        if n > NodeId::MAX as usize {
            return Err(format!("{n} nodes exceed the arena capacity"));
        }
        match self.root {
            None if n == 0 => return Ok(()),
            None => return Err(format!("{n} nodes but no root")),
            Some(root) if root as usize >= n => {
                return Err(format!("root {root} out of range ({n} nodes)"))
            }
            Some(_) => {}
        }

        let mut seen = vec![false; n];
        let mut stack: Vec<(NodeId, Degree, Degree)> = self
            .root
            .map(|r| (r, f64::NEG_INFINITY, f64::INFINITY))
            .into_iter()
            .collect();
        while let Some((id, lo, hi)) = stack.pop() {
            let idx = id as usize;
            if idx >= n {
                return Err(format!("child {id} out of range ({n} nodes)"));
            }
            if seen[idx] {
                return Err(format!("node {id} reachable twice"));
            }
            seen[idx] = true;

            let node = &self.nodes[idx];
            if !node.ra.is_finite() || !node.dec.is_finite() {
                return Err(format!("node {id} has a non-finite coordinate"));
            }
            if node.ra < lo || node.ra > hi {
                return Err(format!(
                    "node {id} (ra {}) violates the search order [{lo}, {hi}]",
                    node.ra
                ));
            }
            if let Some(left) = node.left {
                stack.push((left, lo, node.ra));
            }
            if let Some(right) = node.right {
                stack.push((right, node.ra, hi));
            }
        }

        if seen.iter().any(|s| !s) {
            return Err("unreachable nodes in arena".to_string());
        }
        Ok(())
    }
}

fn link_median(nodes: &mut [RaNode], lo: usize, hi: usize) -> Option<NodeId> {
    if lo >= hi {
        return None;
    }
    let mid = lo + (hi - lo) / 2;
    nodes[mid].left = link_median(nodes, lo, mid);
    nodes[mid].right = link_median(nodes, mid + 1, hi);
    Some(mid as NodeId)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn points(ras: &[f64]) -> Vec<(ByteOffset, Degree, Degree)> {
        ras.iter()
            .enumerate()
            .map(|(i, &ra)| (i as u64 * 100, ra, -20.0))
            .collect()
    }

    #[test]
    fn test_empty_tree() {
        let tree = RaTree::build(Vec::new());
        assert!(tree.is_empty());
        assert_eq!(tree.root(), None);
        assert_eq!(tree.height(), 0);
        let mut visited = 0;
        tree.range(0.0, 360.0, |_| visited += 1);
        assert_eq!(visited, 0);
    }

    #[test]
    fn test_median_construction() {
        let tree = RaTree::build(points(&[5.0, 1.0, 4.0, 2.0, 3.0, 6.0, 7.0]));
        assert_eq!(tree.height(), 3);
        let root = &tree.nodes()[tree.root().unwrap() as usize];
        assert_eq!(root.ra, 4.0);
    }

    #[test]
    fn test_duplicate_keys_ordered_by_offset() {
        let tree = RaTree::build(vec![(300, 1.0, 0.0), (100, 1.0, 0.0), (200, 1.0, 0.0)]);
        let offsets: Vec<u64> = tree.in_order().iter().map(|n| n.offset).collect();
        assert_eq!(offsets, vec![100, 200, 300]);

        let mut found = Vec::new();
        tree.range(1.0, 1.0, |n| found.push(n.offset));
        found.sort();
        assert_eq!(found, vec![100, 200, 300]);
    }

    #[test]
    fn test_from_parts_rejects_bad_order() {
        let mut tree = RaTree::build(points(&[1.0, 2.0, 3.0]));
        let mut nodes = tree.nodes().to_vec();
        nodes.swap(0, 2);
        nodes[1].left = Some(0);
        nodes[1].right = Some(2);
        assert!(RaTree::from_parts(nodes, tree.root()).is_err());

        let mut nodes = tree.nodes().to_vec();
        nodes[1].left = Some(7);
        assert!(RaTree::from_parts(nodes, tree.root()).is_err());

        tree = RaTree::build(points(&[1.0, 2.0, 3.0]));
        assert!(RaTree::from_parts(tree.nodes().to_vec(), tree.root()).is_ok());
    }

    proptest! {
        #[test]
        fn prop_in_order_is_sorted(ras in prop::collection::vec(0.0f64..360.0, 0..300)) {
            let tree = RaTree::build(points(&ras));
            let in_order: Vec<f64> = tree.in_order().iter().map(|n| n.ra).collect();
            prop_assert_eq!(in_order.len(), ras.len());
            prop_assert!(in_order.windows(2).all(|w| w[0] <= w[1]));
        }

        #[test]
        fn prop_height_is_logarithmic(ras in prop::collection::vec(0.0f64..360.0, 0..500)) {
            let tree = RaTree::build(points(&ras));
            let bound = (usize::BITS - ras.len().leading_zeros()) as usize;
            prop_assert!(tree.height() <= bound);
        }

        #[test]
        fn prop_range_matches_linear_scan(
            ras in prop::collection::vec(0.0f64..10.0, 0..200),
            lo in 0.0f64..10.0,
            width in 0.0f64..3.0,
        ) {
            let tree = RaTree::build(points(&ras));
            let hi = lo + width;

            let mut found = Vec::new();
            tree.range(lo, hi, |n| found.push(n.offset));
            found.sort();

            let expected: Vec<u64> = points(&ras)
                .into_iter()
                .filter(|&(_, ra, _)| ra >= lo && ra <= hi)
                .map(|(offset, _, _)| offset)
                .collect();
            prop_assert_eq!(found, expected);
        }
    }
}
