//! Octree construction: insertion, averaging, axis replication

use super::{NodeId, Octree, EMPTY, ROOT};
use crate::core::color;

impl Octree {
    /// Insert a colored cell `depth` levels below the root.
    ///
    /// At each level the child octant is picked from one coordinate bit per
    /// axis, allocating missing children on the way down. With `depth` equal
    /// to the tree depth this addresses a single voxel; smaller values write
    /// correspondingly larger cells.
    pub fn set(&mut self, x: u32, y: u32, z: u32, depth: u32, color: u32) {
        debug_assert!(depth <= self.depth());
        let mut id = ROOT;
        let mut d = depth;
        while d > 0 {
            d -= 1;
            let m = 1u32 << d;
            let idx = (((x & m) * 4 + (y & m) * 2 + (z & m)) >> d) as usize;
            let mut child = self.node(id).children[idx];
            if child == EMPTY {
                child = self.add_node();
                self.node_mut(id).children[idx] = child;
            }
            id = child;
        }
        self.node_mut(id).color = color;
    }

    /// Recompute interior colors as the channel-wise mean of each node's
    /// non-empty children, post-order.
    ///
    /// Nodes without children keep their color and act as solid leaves.
    /// With `prune` set, an interior node whose only non-empty child is a
    /// leaf absorbs that child's color and drops it, becoming the leaf
    /// itself; the orphaned node stays in the arena. Idempotent on an
    /// already averaged tree.
    pub fn average(&mut self, prune: bool) {
        self.average_node(ROOT, prune);
    }

    fn average_node(&mut self, id: NodeId, prune: bool) {
        let children = self.node(id).children;
        let mut r = 0.0f32;
        let mut g = 0.0f32;
        let mut b = 0.0f32;
        let mut n = 0u32;
        let mut only: Option<(usize, NodeId)> = None;
        for (i, &child) in children.iter().enumerate() {
            if child == EMPTY {
                continue;
            }
            self.average_node(child, prune);
            let c = self.node(child).color;
            r += color::red(c) as f32;
            g += color::green(c) as f32;
            b += color::blue(c) as f32;
            n += 1;
            only = Some((i, child));
        }
        if n == 0 {
            return;
        }
        match only {
            Some((slot, child)) if prune && n == 1 => {
                self.node_mut(id).color = self.node(child).color;
                if self.node(child).is_leaf() {
                    self.node_mut(id).children[slot] = EMPTY;
                }
            }
            _ => self.node_mut(id).color = color::mean(r, g, b, n),
        }
    }

    /// Tile the scene along the axes cleared in `mask` for the top `depth`
    /// levels.
    ///
    /// Child slot `i` whose bits are not already `i & mask` is aliased to
    /// slot `i & mask`; subtrees become shared, which the index arena makes
    /// safe. `mask == 7` or `depth == 0` is a no-op.
    pub fn replicate(&mut self, mask: u8, depth: u32) {
        if depth == 0 {
            return;
        }
        self.replicate_node(ROOT, mask as usize, depth);
    }

    fn replicate_node(&mut self, id: NodeId, mask: usize, depth: u32) {
        if depth == 0 {
            return;
        }
        for i in 0..8 {
            if i == (i & mask) {
                let child = self.node(id).children[i];
                if child != EMPTY {
                    self.replicate_node(child, mask, depth - 1);
                }
            } else {
                self.node_mut(id).children[i] = self.node(id).children[i & mask];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::color::{blue, green, red, rgb};
    use crate::octree::Node;

    #[test]
    fn test_set_addresses_expected_octant() {
        let mut tree = Octree::new(1);
        tree.set(1, 0, 1, 1, 0xff0000ff);
        // x bit -> 4, z bit -> 1
        let root = tree.node(ROOT);
        assert_ne!(root.children[5], EMPTY);
        assert_eq!(root.child_count(), 1);
        let child = tree.node(root.children[5]);
        assert_eq!(child.color, 0xff0000ff);
        assert!(child.is_leaf());
    }

    #[test]
    fn test_average_closure() {
        let mut tree = Octree::new(1);
        tree.set(0, 0, 0, 1, rgb(0, 0, 0));
        tree.set(0, 0, 1, 1, rgb(0, 255, 0));
        tree.set(0, 1, 0, 1, rgb(0, 0, 255));
        tree.set(1, 0, 0, 1, rgb(255, 0, 0));
        tree.average(false);
        let c = tree.node(ROOT).color;
        for channel in [red(c), green(c), blue(c)] {
            assert!((channel as i32 - 0x3f).unsigned_abs() <= 1);
        }
    }

    #[test]
    fn test_average_is_idempotent() {
        let mut tree = Octree::new(3);
        tree.set(0, 1, 2, 3, rgb(10, 20, 30));
        tree.set(7, 6, 5, 3, rgb(200, 100, 50));
        tree.average(false);
        let colors: Vec<u32> = tree.nodes_slice().iter().map(|n| n.color).collect();
        tree.average(false);
        let again: Vec<u32> = tree.nodes_slice().iter().map(|n| n.color).collect();
        assert_eq!(colors, again);
    }

    #[test]
    fn test_average_closure_holds_at_every_level() {
        let mut tree = Octree::new(3);
        for (i, &(x, y, z)) in [(0, 0, 0), (1, 3, 5), (7, 7, 7), (2, 6, 4), (5, 1, 6)]
            .iter()
            .enumerate()
        {
            tree.set(x, y, z, 3, rgb(40 * i as u32, 30 * i as u32, 20 * i as u32));
        }
        tree.average(false);
        for id in 0..tree.node_count() as NodeId {
            let node = tree.node(id);
            if node.is_leaf() {
                continue;
            }
            let mut r = 0.0;
            let mut g = 0.0;
            let mut b = 0.0;
            let mut n = 0;
            for &c in &node.children {
                if c == EMPTY {
                    continue;
                }
                let cc = tree.node(c).color;
                r += red(cc) as f32;
                g += green(cc) as f32;
                b += blue(cc) as f32;
                n += 1;
            }
            assert_eq!(node.color, color::mean(r, g, b, n));
        }
    }

    #[test]
    fn test_prune_absorbs_single_leaf_child() {
        let mut tree = Octree::new(2);
        tree.set(0, 0, 0, 2, rgb(1, 2, 3));
        tree.average(true);
        // The chain of single-child interiors collapses bottom-up into the root.
        assert!(tree.node(ROOT).is_leaf());
        assert_eq!(tree.node(ROOT).color, rgb(1, 2, 3));
    }

    #[test]
    fn test_replicate_full_mask_is_noop() {
        let mut tree = Octree::new(3);
        tree.set(1, 2, 3, 3, 0xffabcdef);
        tree.average(false);
        let before: Vec<Node> = tree.nodes_slice().to_vec();
        tree.replicate(7, 0);
        tree.replicate(7, 3);
        assert_eq!(tree.nodes_slice(), &before[..]);
    }

    #[test]
    fn test_replicate_equivalence() {
        // mask 2 keeps y, tiles x and z across the top two levels.
        let mut tree = Octree::new(4);
        tree.set(1, 9, 2, 4, 0xff102030);
        tree.set(3, 2, 1, 4, 0xff405060);
        tree.average(false);
        let a = tree.sample(1, 9, 2);
        let b = tree.sample(3, 2, 1);
        tree.replicate(2, 2);
        // Originals still answer.
        assert_eq!(tree.sample(1, 9, 2), a);
        assert_eq!(tree.sample(3, 2, 1), b);
        // Mirrors along x and z at the replicated levels answer identically.
        assert_eq!(tree.sample(1 + 8, 9, 2), a);
        assert_eq!(tree.sample(1, 9, 2 + 8), a);
        assert_eq!(tree.sample(1 + 8, 9, 2 + 8), a);
        assert_eq!(tree.sample(3 + 12, 2, 1 + 4), b);
    }
}
