//! # isocrate Samplers
//!
//! Volume primitives producing soft-edged occupancy fields.
//!
//! Every primitive evaluates to exactly 1 well inside its shape, exactly 0
//! outside, and ramps linearly across a shell of configurable width just inside
//! its boundary. Primitives are either additive or subtractive and are composed
//! by the volume crate.

pub mod sampler;
pub mod oriented;
pub mod sphere;
pub mod plane;
pub mod prism;
pub mod tube;
pub mod heightmap;

// Re-export commonly used items
pub use sampler::*;
pub use oriented::*;
pub use sphere::*;
pub use plane::*;
pub use prism::*;
pub use tube::*;
pub use heightmap::*;
