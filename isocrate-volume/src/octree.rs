//! Fixed-depth octree over the integer volume domain
//!
//! Nodes live in a flat arena built breadth-first, so the root is always
//! node 0 and children are addressed by index. Each march runs a mark pass
//! that records which samplers touch which nodes, then a collect pass that
//! gathers the nodes to polygonize.

use isocrate_core::{Aabbi, Error, Point3i, Result};
use isocrate_samplers::VolumeSampler;
use std::sync::Arc;

/// A node of the octree arena
#[derive(Debug, Clone)]
pub struct OctreeNode {
    pub bounds: Aabbi,
    pub depth: usize,
    /// Octant within the parent, 0 for the root
    pub child_index: usize,
    pub children: Option<[usize; 8]>,

    /// Additive samplers touching this node during the current pass
    pub additive: Vec<usize>,
    /// Subtractive samplers touching this node during the current pass
    pub subtractive: Vec<usize>,
    /// No additive sampler reaches this node
    pub empty: bool,
    /// This node is polygonized as a unit
    pub march: bool,
}

impl OctreeNode {
    fn new(bounds: Aabbi, depth: usize, child_index: usize) -> Self {
        Self {
            bounds,
            depth,
            child_index,
            children: None,
            additive: Vec::new(),
            subtractive: Vec::new(),
            empty: true,
            march: false,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    fn reset(&mut self) {
        self.additive.clear();
        self.subtractive.clear();
        self.empty = true;
        self.march = false;
    }
}

/// Longest side of an integer box
fn extent(bounds: &Aabbi) -> i32 {
    let size = bounds.size();
    size.x.max(size.y).max(size.z)
}

/// Arena octree over `[0, size)^3`
#[derive(Debug, Clone)]
pub struct Octree {
    nodes: Vec<OctreeNode>,
    size: i32,
    min_node_size: i32,
    depth: usize,
}

impl Octree {
    /// Build the full tree down to nodes of at most `min_node_size`
    pub fn new(size: i32, min_node_size: i32) -> Result<Self> {
        if size <= 0 {
            return Err(Error::InvalidConfiguration(format!(
                "volume size must be positive, got {}",
                size
            )));
        }
        if min_node_size <= 0 {
            return Err(Error::InvalidConfiguration(format!(
                "minimum node size must be positive, got {}",
                min_node_size
            )));
        }
        if min_node_size >= size {
            return Err(Error::InvalidConfiguration(format!(
                "minimum node size {} must be smaller than the volume size {}",
                min_node_size, size
            )));
        }
        // every split must halve evenly down to the leaves
        if !(size as u32).is_power_of_two() {
            return Err(Error::InvalidConfiguration(format!(
                "volume size must be a power of two, got {}",
                size
            )));
        }

        let root = Aabbi::new(Point3i::origin(), Point3i::new(size, size, size));
        let mut nodes = vec![OctreeNode::new(root, 0, 0)];
        let mut depth = 0;
        let mut next = 0;

        while next < nodes.len() {
            let longest = extent(&nodes[next].bounds);
            if longest > min_node_size && longest > 1 {
                let first_child = nodes.len();
                let child_depth = nodes[next].depth + 1;
                for (child_index, bounds) in nodes[next].bounds.octree_subdivide().into_iter().enumerate() {
                    nodes.push(OctreeNode::new(bounds, child_depth, child_index));
                }
                nodes[next].children = Some(std::array::from_fn(|i| first_child + i));
                depth = depth.max(child_depth);
            }
            next += 1;
        }

        Ok(Self {
            nodes,
            size,
            min_node_size,
            depth,
        })
    }

    pub fn size(&self) -> i32 {
        self.size
    }

    pub fn min_node_size(&self) -> i32 {
        self.min_node_size
    }

    /// Depth of the deepest leaves; the root is depth 0
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    pub fn root(&self) -> &OctreeNode {
        &self.nodes[0]
    }

    pub fn node(&self, id: usize) -> Option<&OctreeNode> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> &[OctreeNode] {
        &self.nodes
    }

    /// Record which samplers touch which nodes and flag nodes to march
    ///
    /// `additive` and `subtractive` index into `samplers`. A node is occupied
    /// when it is a non-empty leaf or all eight of its children are occupied.
    /// Returns whether the root is occupied.
    pub fn mark(
        &mut self,
        samplers: &[Arc<dyn VolumeSampler>],
        additive: &[usize],
        subtractive: &[usize],
    ) -> bool {
        for node in &mut self.nodes {
            node.reset();
        }
        self.mark_node(0, samplers, additive, subtractive)
    }

    fn mark_node(
        &mut self,
        id: usize,
        samplers: &[Arc<dyn VolumeSampler>],
        additive: &[usize],
        subtractive: &[usize],
    ) -> bool {
        let bounds = self.nodes[id].bounds.to_f32();
        let node = &mut self.nodes[id];

        node.additive
            .extend(additive.iter().copied().filter(|&i| samplers[i].intersects(&bounds)));
        // subtraction alone never creates surface
        if node.additive.is_empty() {
            return false;
        }
        node.subtractive
            .extend(subtractive.iter().copied().filter(|&i| samplers[i].intersects(&bounds)));
        node.empty = false;

        let Some(children) = node.children else {
            node.march = true;
            return true;
        };

        let mut occupied = 0;
        for &child in &children {
            if self.mark_node(child, samplers, additive, subtractive) {
                occupied += 1;
            }
        }

        // a partial branch stays non-empty so collect still reaches its leaves
        if occupied < children.len() {
            return false;
        }
        self.coalesce(id, &children);
        true
    }

    /// March `id` in place of its fully occupied children
    fn coalesce(&mut self, id: usize, children: &[usize; 8]) {
        let mut additive = std::mem::take(&mut self.nodes[id].additive);
        let mut subtractive = std::mem::take(&mut self.nodes[id].subtractive);
        for &child in children {
            let child = &mut self.nodes[child];
            child.march = false;
            additive.extend_from_slice(&child.additive);
            subtractive.extend_from_slice(&child.subtractive);
        }
        additive.sort_unstable();
        additive.dedup();
        subtractive.sort_unstable();
        subtractive.dedup();

        let node = &mut self.nodes[id];
        node.additive = additive;
        node.subtractive = subtractive;
        node.march = true;
    }

    /// Ids of the nodes flagged by the last mark pass
    ///
    /// Descends through occupied nodes that are not marched themselves and
    /// stops at the first marched node on every path.
    pub fn collect(&self) -> Vec<usize> {
        let mut marched = Vec::new();
        let mut stack = vec![0];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if node.march {
                marched.push(id);
            } else if !node.empty {
                if let Some(children) = node.children {
                    stack.extend(children.iter().rev());
                }
            }
        }
        marched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isocrate_core::{MaterialState, Point3f};
    use isocrate_samplers::{Mode, Sphere};

    fn split(samplers: &[Arc<dyn VolumeSampler>]) -> (Vec<usize>, Vec<usize>) {
        let ids = |mode| {
            samplers
                .iter()
                .enumerate()
                .filter(|(_, s)| s.mode() == mode)
                .map(|(i, _)| i)
                .collect()
        };
        (ids(Mode::Additive), ids(Mode::Subtractive))
    }

    fn mark_and_collect(tree: &mut Octree, samplers: &[Arc<dyn VolumeSampler>]) -> Vec<usize> {
        let (additive, subtractive) = split(samplers);
        tree.mark(samplers, &additive, &subtractive);
        tree.collect()
    }

    fn sphere(x: f32, y: f32, z: f32, radius: f32) -> Arc<dyn VolumeSampler> {
        Arc::new(Sphere::additive(Point3f::new(x, y, z), radius, MaterialState::default()))
    }

    #[test]
    fn test_invalid_configuration() {
        assert!(matches!(Octree::new(16, 0), Err(Error::InvalidConfiguration(_))));
        assert!(matches!(Octree::new(0, 4), Err(Error::InvalidConfiguration(_))));
        assert!(matches!(Octree::new(16, 16), Err(Error::InvalidConfiguration(_))));
        assert!(matches!(Octree::new(16, 32), Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn test_size_must_be_power_of_two() {
        for (size, min) in [(6, 1), (9, 2), (48, 4), (100, 8)] {
            assert!(
                matches!(Octree::new(size, min), Err(Error::InvalidConfiguration(_))),
                "size {} min {}",
                size,
                min
            );
        }
        // the minimum node size itself may be anything smaller
        let tree = Octree::new(8, 3).unwrap();
        assert_eq!(tree.depth(), 2);
        assert!(tree.nodes().iter().all(|n| n.bounds.volume() > 0));
    }

    #[test]
    fn test_depth_and_node_count() {
        for (size, min, depth) in [(64, 4, 4), (64, 5, 4), (64, 8, 3), (16, 4, 2), (2, 1, 1)] {
            let tree = Octree::new(size, min).unwrap();
            assert_eq!(tree.depth(), depth, "size {} min {}", size, min);
            let expected: usize = (0..=depth as u32).map(|d| 8usize.pow(d)).sum();
            assert_eq!(tree.node_count(), expected);
            assert_eq!(tree.leaf_count(), 8usize.pow(depth as u32));
        }
    }

    #[test]
    fn test_leaves_partition_domain() {
        let tree = Octree::new(16, 4).unwrap();
        let volume: i32 = tree.nodes().iter().filter(|n| n.is_leaf()).map(|n| n.bounds.volume()).sum();
        assert_eq!(volume, 16 * 16 * 16);
        assert!(tree.nodes().iter().filter(|n| n.is_leaf()).all(|n| extent(&n.bounds) == 4));
        assert_eq!(tree.root().bounds.max, Point3i::new(16, 16, 16));
    }

    #[test]
    fn test_empty_volume_collects_nothing() {
        let mut tree = Octree::new(16, 4).unwrap();
        assert!(mark_and_collect(&mut tree, &[]).is_empty());
        assert!(tree.root().empty);
    }

    #[test]
    fn test_coalesces_fully_occupied_branch() {
        let mut tree = Octree::new(16, 4).unwrap();
        let samplers = vec![sphere(4.0, 4.0, 4.0, 2.0)];
        let marched = mark_and_collect(&mut tree, &samplers);

        assert_eq!(marched.len(), 1);
        let node = tree.node(marched[0]).unwrap();
        assert_eq!(node.depth, 1);
        assert_eq!(node.child_index, 0);
        assert_eq!(node.additive, vec![0]);
        let children = node.children.unwrap();
        assert!(children.iter().all(|&c| !tree.nodes()[c].march));
    }

    #[test]
    fn test_partial_branch_collects_leaves() {
        let mut tree = Octree::new(16, 4).unwrap();
        // reaches the four depth-2 leaves below z = 4 around (4, 4)
        let samplers = vec![sphere(4.0, 4.0, 2.0, 1.0)];
        let marched = mark_and_collect(&mut tree, &samplers);

        assert_eq!(marched.len(), 4);
        for id in marched {
            let node = &tree.nodes()[id];
            assert!(node.is_leaf());
            assert_eq!(node.depth, 2);
            assert_eq!(node.bounds.min.z, 0);
        }
    }

    #[test]
    fn test_small_centered_sphere_collects_leaves() {
        let mut tree = Octree::new(64, 4).unwrap();
        let samplers = vec![sphere(32.0, 32.0, 32.0, 2.0)];
        let marched = mark_and_collect(&mut tree, &samplers);

        assert_eq!(marched.len(), 8);
        assert!(!tree.root().march);
        assert!(!tree.root().empty);
        for id in marched {
            let node = &tree.nodes()[id];
            assert!(node.is_leaf());
            assert_eq!(node.depth, 4);
        }
    }

    #[test]
    fn test_full_coverage_coalesces_to_root() {
        let mut tree = Octree::new(16, 4).unwrap();
        let samplers = vec![sphere(8.0, 8.0, 8.0, 30.0)];
        assert_eq!(mark_and_collect(&mut tree, &samplers), vec![0]);
    }

    #[test]
    fn test_subtractive_only_is_empty() {
        let mut tree = Octree::new(16, 4).unwrap();
        let samplers: Vec<Arc<dyn VolumeSampler>> =
            vec![Arc::new(Sphere::subtractive(Point3f::new(8.0, 8.0, 8.0), 6.0))];
        assert!(mark_and_collect(&mut tree, &samplers).is_empty());
        assert!(tree.nodes().iter().all(|n| n.subtractive.is_empty()));
    }

    #[test]
    fn test_subtractive_recorded_where_additive_present() {
        let mut tree = Octree::new(16, 4).unwrap();
        let samplers: Vec<Arc<dyn VolumeSampler>> = vec![
            sphere(2.0, 2.0, 2.0, 1.0),
            Arc::new(Sphere::subtractive(Point3f::new(2.0, 2.0, 2.0), 0.5)),
            Arc::new(Sphere::subtractive(Point3f::new(12.0, 12.0, 12.0), 1.0)),
        ];
        let marched = mark_and_collect(&mut tree, &samplers);
        assert_eq!(marched.len(), 1);
        assert_eq!(tree.nodes()[marched[0]].subtractive, vec![1]);
    }

    #[test]
    fn test_mark_resets_previous_pass() {
        let mut tree = Octree::new(16, 4).unwrap();
        mark_and_collect(&mut tree, &[sphere(8.0, 8.0, 8.0, 30.0)]);
        let marched = mark_and_collect(&mut tree, &[sphere(2.0, 2.0, 2.0, 1.0)]);
        assert_eq!(marched.len(), 1);
        assert_eq!(tree.nodes().iter().filter(|n| n.march).count(), 1);
    }
}
