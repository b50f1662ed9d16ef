//! Core data structures and traits for isocrate
//!
//! This crate provides the fundamental types shared by the samplers and the
//! volume crate: bounding boxes, material state, triangles and the triangle
//! consumer sink trait.

pub mod aabb;
pub mod material;
pub mod triangle;
pub mod error;

pub use aabb::*;
pub use material::*;
pub use triangle::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Matrix3, Matrix4, Point3, Rotation3, UnitQuaternion, Vector3, Vector4};

/// A 3D point with floating point coordinates
pub type Point3f = Point3<f32>;

/// A 3D point with integer coordinates
pub type Point3i = Point3<i32>;

/// A 3D vector with floating point components
pub type Vector3f = Vector3<f32>;

/// An RGBA color / 4D vector with floating point components
pub type Vector4f = Vector4<f32>;
