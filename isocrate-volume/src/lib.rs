//! # isocrate Volume
//!
//! Octree-accelerated marching cubes over a set of volume samplers.
//!
//! An [`OctreeVolume`] owns the samplers, prunes empty space with an octree
//! and polygonizes the remaining nodes on a [`ThreadPool`], writing the
//! triangles into caller-supplied consumers.

pub mod marching_cubes;
pub mod octree;
pub mod parallel;
pub mod volume;

// Re-export commonly used items
pub use marching_cubes::*;
pub use octree::*;
pub use parallel::*;
pub use volume::*;
