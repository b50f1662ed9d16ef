//! Rotated rectangular prism sampler

use crate::{fuzzy_ramp, Mode, OrientedBox, Surface, VolumeSampler};
use isocrate_core::{Aabbf, MaterialState, Point3f, Result, Rotation3, Vector3f};

/// A box of arbitrary orientation
#[derive(Debug, Clone)]
pub struct RectangularPrism {
    shape: OrientedBox,
    surface: Surface,
}

impl RectangularPrism {
    pub fn additive(
        position: Point3f,
        half_extents: Vector3f,
        rotation: Rotation3<f32>,
        material: MaterialState,
    ) -> Self {
        Self {
            shape: OrientedBox::new(position, rotation, half_extents),
            surface: Surface::additive(material),
        }
    }

    pub fn subtractive(position: Point3f, half_extents: Vector3f, rotation: Rotation3<f32>) -> Self {
        Self {
            shape: OrientedBox::new(position, rotation, half_extents),
            surface: Surface::subtractive(),
        }
    }

    pub fn position(&self) -> Point3f {
        self.shape.position()
    }

    pub fn set_position(&mut self, position: Point3f) {
        self.shape.set_position(position);
    }

    pub fn rotation(&self) -> Rotation3<f32> {
        self.shape.rotation()
    }

    pub fn set_rotation(&mut self, rotation: Rotation3<f32>) {
        self.shape.set_rotation(rotation);
    }

    pub fn half_extents(&self) -> Vector3f {
        self.shape.half_extents()
    }

    pub fn set_half_extents(&mut self, half_extents: Vector3f) {
        self.shape.set_half_extents(half_extents);
    }

    /// World-space corners of the prism
    pub fn corners(&self) -> &[Point3f; 8] {
        self.shape.corners()
    }

    pub fn set_material(&mut self, material: MaterialState) -> Result<()> {
        self.surface.set_material(material)
    }
}

impl VolumeSampler for RectangularPrism {
    fn mode(&self) -> Mode {
        self.surface.mode()
    }

    fn intersects(&self, bounds: &Aabbf) -> bool {
        self.shape.intersects(bounds)
    }

    fn value_at(&self, point: &Point3f, fuzziness: f32) -> f32 {
        fuzzy_ramp(self.shape.depth(point), fuzziness)
    }

    fn material_at(&self, _point: &Point3f) -> Result<MaterialState> {
        self.surface.material()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Unit;
    use std::f32::consts::FRAC_PI_6;

    fn tilted() -> Rotation3<f32> {
        Rotation3::from_axis_angle(&Unit::new_normalize(Vector3f::new(1.0, 2.0, 0.5)), FRAC_PI_6)
    }

    #[test]
    fn test_value_at_axis_aligned() {
        let prism = RectangularPrism::additive(
            Point3f::origin(),
            Vector3f::new(2.0, 3.0, 4.0),
            Rotation3::identity(),
            MaterialState::default(),
        );
        assert_eq!(prism.value_at(&Point3f::origin(), 1.0), 1.0);
        assert_relative_eq!(prism.value_at(&Point3f::new(1.5, 0.0, 0.0), 1.0), 0.5);
        assert_eq!(prism.value_at(&Point3f::new(0.0, 3.0, 0.0), 1.0), 0.0);
        assert_eq!(prism.value_at(&Point3f::new(0.0, 0.0, 9.0), 1.0), 0.0);
    }

    #[test]
    fn test_translation_invariance() {
        let half_extents = Vector3f::new(2.0, 1.0, 3.0);
        let reference = RectangularPrism::additive(Point3f::origin(), half_extents, tilted(), MaterialState::default());
        let mut moved = reference.clone();
        let position = Point3f::new(12.0, -7.0, 30.0);
        moved.set_position(position);

        for offset in [
            Vector3f::new(0.0, 0.0, 0.0),
            Vector3f::new(1.5, 0.2, -0.7),
            Vector3f::new(-1.9, 0.9, 2.5),
            Vector3f::new(3.0, 3.0, 3.0),
        ] {
            assert_relative_eq!(
                moved.value_at(&(position + offset), 0.75),
                reference.value_at(&Point3f::from(offset), 0.75),
                epsilon = 1e-4
            );
        }
    }

    #[test]
    fn test_intersects_is_conservative() {
        let prism = RectangularPrism::subtractive(Point3f::new(8.0, 8.0, 8.0), Vector3f::new(3.0, 1.0, 2.0), tilted());

        // every unit cell holding a positive sample must be reported
        for x in 0..16 {
            for y in 0..16 {
                for z in 0..16 {
                    let cell = Aabbf::new(
                        Point3f::new(x as f32, y as f32, z as f32),
                        Point3f::new(x as f32 + 1.0, y as f32 + 1.0, z as f32 + 1.0),
                    );
                    let occupied = cell.corners().iter().any(|c| prism.value_at(c, 0.5) > 0.0)
                        || prism.value_at(&cell.center(), 0.5) > 0.0;
                    if occupied {
                        assert!(prism.intersects(&cell), "missed cell {x},{y},{z}");
                    }
                }
            }
        }
        assert!(!prism.intersects(&Aabbf::new(Point3f::origin(), Point3f::new(2.0, 2.0, 2.0))));
    }
}
