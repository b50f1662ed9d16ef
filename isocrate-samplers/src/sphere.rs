//! Sphere sampler

use crate::{fuzzy_ramp, Mode, Surface, VolumeSampler};
use isocrate_core::{Aabbf, MaterialState, Point3f, Result};

/// A solid ball
#[derive(Debug, Clone)]
pub struct Sphere {
    position: Point3f,
    radius: f32,
    surface: Surface,
}

impl Sphere {
    pub fn additive(position: Point3f, radius: f32, material: MaterialState) -> Self {
        Self {
            position,
            radius,
            surface: Surface::additive(material),
        }
    }

    pub fn subtractive(position: Point3f, radius: f32) -> Self {
        Self {
            position,
            radius,
            surface: Surface::subtractive(),
        }
    }

    pub fn position(&self) -> Point3f {
        self.position
    }

    pub fn set_position(&mut self, position: Point3f) {
        self.position = position;
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn set_radius(&mut self, radius: f32) {
        self.radius = radius.max(0.0);
    }

    pub fn set_material(&mut self, material: MaterialState) -> Result<()> {
        self.surface.set_material(material)
    }
}

impl VolumeSampler for Sphere {
    fn mode(&self) -> Mode {
        self.surface.mode()
    }

    fn intersects(&self, bounds: &Aabbf) -> bool {
        let closest = bounds.closest_point(&self.position);
        (closest - self.position).norm_squared() <= self.radius * self.radius
    }

    fn value_at(&self, point: &Point3f, fuzziness: f32) -> f32 {
        let distance2 = (point - self.position).norm_squared();
        if distance2 >= self.radius * self.radius {
            return 0.0;
        }
        fuzzy_ramp(self.radius - distance2.sqrt(), fuzziness)
    }

    fn material_at(&self, _point: &Point3f) -> Result<MaterialState> {
        self.surface.material()
    }
}
