//! Planar samplers: an infinite halfspace and a slab of finite thickness

use crate::{fuzzy_ramp, Mode, Surface, VolumeSampler};
use isocrate_core::{Aabbf, MaterialState, Point3f, Result, Vector3f};

fn unit_or_up(normal: Vector3f) -> Vector3f {
    normal.try_normalize(1e-12).unwrap_or_else(Vector3f::y)
}

/// Signed distance range of a box's corners from a plane
fn corner_distance_range(bounds: &Aabbf, origin: &Point3f, normal: &Vector3f) -> (f32, f32) {
    bounds
        .corners()
        .iter()
        .map(|corner| (corner - origin).dot(normal))
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), d| {
            (lo.min(d), hi.max(d))
        })
}

/// Everything on the far side of a plane from its normal
#[derive(Debug, Clone)]
pub struct Halfspace {
    origin: Point3f,
    normal: Vector3f,
    surface: Surface,
}

impl Halfspace {
    pub fn additive(origin: Point3f, normal: Vector3f, material: MaterialState) -> Self {
        Self {
            origin,
            normal: unit_or_up(normal),
            surface: Surface::additive(material),
        }
    }

    pub fn subtractive(origin: Point3f, normal: Vector3f) -> Self {
        Self {
            origin,
            normal: unit_or_up(normal),
            surface: Surface::subtractive(),
        }
    }

    pub fn origin(&self) -> Point3f {
        self.origin
    }

    pub fn set_origin(&mut self, origin: Point3f) {
        self.origin = origin;
    }

    pub fn normal(&self) -> Vector3f {
        self.normal
    }

    pub fn set_normal(&mut self, normal: Vector3f) {
        self.normal = unit_or_up(normal);
    }

    pub fn set_material(&mut self, material: MaterialState) -> Result<()> {
        self.surface.set_material(material)
    }

    fn signed_distance(&self, point: &Point3f) -> f32 {
        (point - self.origin).dot(&self.normal)
    }
}

impl VolumeSampler for Halfspace {
    fn mode(&self) -> Mode {
        self.surface.mode()
    }

    fn intersects(&self, bounds: &Aabbf) -> bool {
        let (nearest, _) = corner_distance_range(bounds, &self.origin, &self.normal);
        nearest <= 0.0
    }

    fn value_at(&self, point: &Point3f, fuzziness: f32) -> f32 {
        fuzzy_ramp(-self.signed_distance(point), fuzziness)
    }

    fn material_at(&self, _point: &Point3f) -> Result<MaterialState> {
        self.surface.material()
    }
}

/// A slab of `thickness` centered on a plane
#[derive(Debug, Clone)]
pub struct BoundedPlane {
    origin: Point3f,
    normal: Vector3f,
    half_thickness: f32,
    surface: Surface,
}

impl BoundedPlane {
    pub fn additive(
        origin: Point3f,
        normal: Vector3f,
        thickness: f32,
        material: MaterialState,
    ) -> Self {
        Self {
            origin,
            normal: unit_or_up(normal),
            half_thickness: thickness.max(0.0) * 0.5,
            surface: Surface::additive(material),
        }
    }

    pub fn subtractive(origin: Point3f, normal: Vector3f, thickness: f32) -> Self {
        Self {
            origin,
            normal: unit_or_up(normal),
            half_thickness: thickness.max(0.0) * 0.5,
            surface: Surface::subtractive(),
        }
    }

    pub fn origin(&self) -> Point3f {
        self.origin
    }

    pub fn set_origin(&mut self, origin: Point3f) {
        self.origin = origin;
    }

    pub fn normal(&self) -> Vector3f {
        self.normal
    }

    pub fn set_normal(&mut self, normal: Vector3f) {
        self.normal = unit_or_up(normal);
    }

    pub fn thickness(&self) -> f32 {
        self.half_thickness * 2.0
    }

    pub fn set_thickness(&mut self, thickness: f32) {
        self.half_thickness = thickness.max(0.0) * 0.5;
    }

    pub fn set_material(&mut self, material: MaterialState) -> Result<()> {
        self.surface.set_material(material)
    }
}

impl VolumeSampler for BoundedPlane {
    fn mode(&self) -> Mode {
        self.surface.mode()
    }

    fn intersects(&self, bounds: &Aabbf) -> bool {
        let (lo, hi) = corner_distance_range(bounds, &self.origin, &self.normal);
        lo <= self.half_thickness && hi >= -self.half_thickness
    }

    fn value_at(&self, point: &Point3f, fuzziness: f32) -> f32 {
        let distance = (point - self.origin).dot(&self.normal).abs();
        fuzzy_ramp(self.half_thickness - distance, fuzziness)
    }

    fn material_at(&self, _point: &Point3f) -> Result<MaterialState> {
        self.surface.material()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cell(min: [f32; 3], max: [f32; 3]) -> Aabbf {
        Aabbf::new(Point3f::from(min), Point3f::from(max))
    }

    #[test]
    fn test_halfspace_value() {
        let ground = Halfspace::additive(Point3f::new(0.0, 4.0, 0.0), Vector3f::y(), MaterialState::default());
        assert_eq!(ground.value_at(&Point3f::new(3.0, 10.0, -2.0), 1.0), 0.0);
        assert_eq!(ground.value_at(&Point3f::new(3.0, 4.0, -2.0), 1.0), 0.0);
        assert_relative_eq!(ground.value_at(&Point3f::new(3.0, 3.75, -2.0), 1.0), 0.25);
        assert_eq!(ground.value_at(&Point3f::new(0.0, -20.0, 0.0), 1.0), 1.0);
    }

    #[test]
    fn test_halfspace_intersects() {
        let ground = Halfspace::subtractive(Point3f::new(0.0, 4.0, 0.0), Vector3f::new(0.0, 2.0, 0.0));
        assert_relative_eq!(ground.normal(), Vector3f::y());
        assert!(ground.intersects(&cell([0.0, 0.0, 0.0], [8.0, 8.0, 8.0])));
        assert!(ground.intersects(&cell([0.0, -8.0, 0.0], [8.0, 0.0, 8.0])));
        assert!(!ground.intersects(&cell([0.0, 5.0, 0.0], [8.0, 9.0, 8.0])));
    }

    #[test]
    fn test_bounded_plane_value() {
        let slab = BoundedPlane::additive(Point3f::origin(), Vector3f::z(), 4.0, MaterialState::default());
        assert_eq!(slab.value_at(&Point3f::new(7.0, 7.0, 0.0), 1.0), 1.0);
        assert_relative_eq!(slab.value_at(&Point3f::new(0.0, 0.0, 1.5), 1.0), 0.5);
        assert_relative_eq!(slab.value_at(&Point3f::new(0.0, 0.0, -1.5), 1.0), 0.5);
        assert_eq!(slab.value_at(&Point3f::new(0.0, 0.0, 2.0), 1.0), 0.0);
        assert_eq!(slab.thickness(), 4.0);
    }

    #[test]
    fn test_bounded_plane_intersects() {
        let slab = BoundedPlane::additive(Point3f::origin(), Vector3f::z(), 2.0, MaterialState::default());
        assert!(slab.intersects(&cell([-4.0, -4.0, -4.0], [4.0, 4.0, 4.0])));
        assert!(slab.intersects(&cell([0.0, 0.0, 0.5], [1.0, 1.0, 3.0])));
        assert!(!slab.intersects(&cell([0.0, 0.0, 2.0], [1.0, 1.0, 3.0])));
        assert!(!slab.intersects(&cell([0.0, 0.0, -3.0], [1.0, 1.0, -1.5])));
    }
}
