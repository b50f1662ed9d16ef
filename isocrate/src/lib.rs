//! # isocrate
//!
//! Triangulated isosurfaces from composable soft-edged volume primitives.
//!
//! This is the umbrella crate that provides convenient access to all isocrate
//! functionality. You can use this crate to get everything in one place, or use
//! individual crates for more granular control over dependencies.
//!
//! ## Features
//!
//! - **Core**: Bounding boxes, materials, triangles and triangle consumers
//! - **Samplers**: Spheres, planes, halfspaces, prisms, tubes and heightmaps
//! - **Volume**: Octree pruning, marching cubes and the parallel march scheduler
//!
//! ## Quick Start
//!
//! ```rust
//! use isocrate::prelude::*;
//! use std::sync::Arc;
//!
//! let pool = Arc::new(ThreadPool::new(ThreadPoolConfig::default().with_threads(2)).unwrap());
//! let queue = Arc::new(MainThreadQueue::new());
//! let consumers = vec![TriangleBuffer::new(), TriangleBuffer::new()];
//! let mut volume = OctreeVolume::new(VolumeConfig::new(32, 4), pool, queue, consumers).unwrap();
//!
//! volume.add(Sphere::additive(Point3f::new(16.0, 16.0, 16.0), 8.0, MaterialState::default()));
//! let stats = volume.march(None).unwrap();
//! assert_eq!(volume.consumers().triangle_count(), stats.triangles);
//! ```
//!
//! ## Feature Flags
//!
//! - `default`: Enables core, samplers and volume
//! - `samplers`: Volume primitives
//! - `volume`: Octree volume and marching cubes
//! - `all`: Enables all features

// Re-export core functionality
pub use isocrate_core::*;

// Re-export sub-crates
#[cfg(feature = "samplers")]
pub use isocrate_samplers as samplers;

#[cfg(feature = "volume")]
pub use isocrate_volume as volume;

/// Convenient imports for common use cases
pub mod prelude {
    pub use isocrate_core::*;

    #[cfg(feature = "samplers")]
    pub use isocrate_samplers::*;

    #[cfg(feature = "volume")]
    pub use isocrate_volume::*;
}
