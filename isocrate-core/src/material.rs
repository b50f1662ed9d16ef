//! Material state attached to sampled points

use nalgebra::Vector4;
use serde::{Deserialize, Serialize};

/// Surface attributes carried by additive samplers
///
/// `color` is RGBA; `shininess`, `texture0` and `texture1` are free scalar
/// channels the renderer interprets (roughness, metalness, texture weights).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaterialState {
    pub color: Vector4<f32>,
    pub shininess: f32,
    pub texture0: f32,
    pub texture1: f32,
}

impl MaterialState {
    /// Create a material with the given color and zeroed channels
    pub fn new(color: Vector4<f32>) -> Self {
        Self {
            color,
            shininess: 0.0,
            texture0: 0.0,
            texture1: 0.0,
        }
    }

    /// Set the three scalar channels
    pub fn with_channels(mut self, shininess: f32, texture0: f32, texture1: f32) -> Self {
        self.shininess = shininess;
        self.texture0 = texture0;
        self.texture1 = texture1;
        self
    }

    /// Linear interpolation toward `other`; `t == 0` yields `self`
    pub fn lerp(&self, other: &Self, t: f32) -> Self {
        let mix = |a: f32, b: f32| a + (b - a) * t;
        Self {
            color: self.color.lerp(&other.color, t),
            shininess: mix(self.shininess, other.shininess),
            texture0: mix(self.texture0, other.texture0),
            texture1: mix(self.texture1, other.texture1),
        }
    }
}

impl Default for MaterialState {
    fn default() -> Self {
        Self::new(Vector4::new(1.0, 1.0, 1.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_material() {
        let material = MaterialState::default();
        assert_eq!(material.color, Vector4::new(1.0, 1.0, 1.0, 1.0));
        assert_eq!(material.shininess, 0.0);
    }

    #[test]
    fn test_material_lerp() {
        let red = MaterialState::new(Vector4::new(1.0, 0.0, 0.0, 1.0)).with_channels(0.0, 1.0, 0.0);
        let blue = MaterialState::new(Vector4::new(0.0, 0.0, 1.0, 1.0)).with_channels(1.0, 0.0, 0.5);

        assert_eq!(red.lerp(&blue, 0.0), red);
        let mid = red.lerp(&blue, 0.5);
        assert_relative_eq!(mid.color, Vector4::new(0.5, 0.0, 0.5, 1.0));
        assert_relative_eq!(mid.shininess, 0.5);
        assert_relative_eq!(mid.texture0, 0.5);
        assert_relative_eq!(mid.texture1, 0.25);
    }
}
