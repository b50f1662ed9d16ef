//! Capped cylinder sampler, optionally hollow

use crate::{fuzzy_ramp, Mode, OrientedBox, Surface, VolumeSampler};
use isocrate_core::{Aabbf, MaterialState, Point3f, Result, Rotation3, Vector3f};

/// A cylinder of `length` along its local y axis, centered on `position`
///
/// With a positive `inner_radius` the core is open, giving a pipe.
#[derive(Debug, Clone)]
pub struct Tube {
    frame: OrientedBox,
    length: f32,
    radius: f32,
    inner_radius: f32,
    surface: Surface,
}

impl Tube {
    pub fn additive(
        position: Point3f,
        rotation: Rotation3<f32>,
        length: f32,
        radius: f32,
        material: MaterialState,
    ) -> Self {
        Self::with_surface(position, rotation, length, radius, Surface::additive(material))
    }

    pub fn subtractive(position: Point3f, rotation: Rotation3<f32>, length: f32, radius: f32) -> Self {
        Self::with_surface(position, rotation, length, radius, Surface::subtractive())
    }

    fn with_surface(
        position: Point3f,
        rotation: Rotation3<f32>,
        length: f32,
        radius: f32,
        surface: Surface,
    ) -> Self {
        let length = length.max(0.0);
        let radius = radius.max(0.0);
        Self {
            frame: OrientedBox::new(position, rotation, Self::frame_extents(length, radius)),
            length,
            radius,
            inner_radius: 0.0,
            surface,
        }
    }

    /// Open the core of the tube
    pub fn with_inner_radius(mut self, inner_radius: f32) -> Self {
        self.set_inner_radius(inner_radius);
        self
    }

    fn frame_extents(length: f32, radius: f32) -> Vector3f {
        Vector3f::new(radius, length * 0.5, radius)
    }

    pub fn position(&self) -> Point3f {
        self.frame.position()
    }

    pub fn set_position(&mut self, position: Point3f) {
        self.frame.set_position(position);
    }

    pub fn rotation(&self) -> Rotation3<f32> {
        self.frame.rotation()
    }

    pub fn set_rotation(&mut self, rotation: Rotation3<f32>) {
        self.frame.set_rotation(rotation);
    }

    /// World-space direction of the tube's axis
    pub fn axis(&self) -> Vector3f {
        self.frame.axes()[1]
    }

    pub fn length(&self) -> f32 {
        self.length
    }

    pub fn set_length(&mut self, length: f32) {
        self.length = length.max(0.0);
        self.frame.set_half_extents(Self::frame_extents(self.length, self.radius));
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn set_radius(&mut self, radius: f32) {
        self.radius = radius.max(0.0);
        self.inner_radius = self.inner_radius.min(self.radius);
        self.frame.set_half_extents(Self::frame_extents(self.length, self.radius));
    }

    pub fn inner_radius(&self) -> f32 {
        self.inner_radius
    }

    pub fn set_inner_radius(&mut self, inner_radius: f32) {
        self.inner_radius = inner_radius.clamp(0.0, self.radius);
    }

    pub fn set_material(&mut self, material: MaterialState) -> Result<()> {
        self.surface.set_material(material)
    }
}

impl VolumeSampler for Tube {
    fn mode(&self) -> Mode {
        self.surface.mode()
    }

    fn intersects(&self, bounds: &Aabbf) -> bool {
        self.frame.intersects(bounds)
    }

    fn value_at(&self, point: &Point3f, fuzziness: f32) -> f32 {
        let local = self.frame.to_local(point);
        let radial = (local.x * local.x + local.z * local.z).sqrt();
        let mut depth = (self.length * 0.5 - local.y.abs()).min(self.radius - radial);
        if self.inner_radius > 0.0 {
            depth = depth.min(radial - self.inner_radius);
        }
        fuzzy_ramp(depth, fuzziness)
    }

    fn material_at(&self, _point: &Point3f) -> Result<MaterialState> {
        self.surface.material()
    }
}
