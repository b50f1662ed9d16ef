//! Rotated box frame shared by the prism and tube samplers
//!
//! All derived geometry (basis axes, world corners, face planes and the
//! world-space bounds) is recomputed on every mutation so evaluation never
//! touches trigonometry.

use isocrate_core::{Aabbf, Point3f, Rotation3, Vector3f};

/// A plane given by a point on it and its outward unit normal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FacePlane {
    pub origin: Point3f,
    pub normal: Vector3f,
}

impl FacePlane {
    fn distance(&self, point: &Point3f) -> f32 {
        (point - self.origin).dot(&self.normal)
    }
}

/// An oriented box with cached derived geometry
#[derive(Debug, Clone)]
pub struct OrientedBox {
    position: Point3f,
    rotation: Rotation3<f32>,
    half_extents: Vector3f,

    axes: [Vector3f; 3],
    corners: [Point3f; 8],
    faces: [FacePlane; 6],
    bounds: Aabbf,
}

impl OrientedBox {
    pub fn new(position: Point3f, rotation: Rotation3<f32>, half_extents: Vector3f) -> Self {
        let mut oriented = Self {
            position,
            rotation,
            half_extents: half_extents.map(|e| e.max(0.0)),
            axes: [Vector3f::x(), Vector3f::y(), Vector3f::z()],
            corners: [Point3f::origin(); 8],
            faces: [FacePlane {
                origin: Point3f::origin(),
                normal: Vector3f::x(),
            }; 6],
            bounds: Aabbf::default(),
        };
        oriented.update();
        oriented
    }

    pub fn position(&self) -> Point3f {
        self.position
    }

    pub fn set_position(&mut self, position: Point3f) {
        self.position = position;
        self.update();
    }

    pub fn rotation(&self) -> Rotation3<f32> {
        self.rotation
    }

    pub fn set_rotation(&mut self, rotation: Rotation3<f32>) {
        self.rotation = rotation;
        self.update();
    }

    pub fn half_extents(&self) -> Vector3f {
        self.half_extents
    }

    pub fn set_half_extents(&mut self, half_extents: Vector3f) {
        self.half_extents = half_extents.map(|e| e.max(0.0));
        self.update();
    }

    /// Orthonormal basis, the rotated x, y and z axes
    pub fn axes(&self) -> &[Vector3f; 3] {
        &self.axes
    }

    /// World-space corners in marching-cubes winding
    pub fn corners(&self) -> &[Point3f; 8] {
        &self.corners
    }

    /// Outward face planes: -x, +x, -y, +y, -z, +z
    pub fn faces(&self) -> &[FacePlane; 6] {
        &self.faces
    }

    /// Axis-aligned bounds of the world corners
    pub fn bounds(&self) -> &Aabbf {
        &self.bounds
    }

    /// Coordinates of `point` in the box's own frame
    #[inline]
    pub fn to_local(&self, point: &Point3f) -> Vector3f {
        let d = point - self.position;
        Vector3f::new(d.dot(&self.axes[0]), d.dot(&self.axes[1]), d.dot(&self.axes[2]))
    }

    /// Distance inside the nearest face, negative outside
    #[inline]
    pub fn depth(&self, point: &Point3f) -> f32 {
        let local = self.to_local(point);
        (self.half_extents.x - local.x.abs())
            .min(self.half_extents.y - local.y.abs())
            .min(self.half_extents.z - local.z.abs())
    }

    /// Conservative separating-axis test against an axis-aligned box
    ///
    /// Tests the three world axes (via the cached bounds) and the six face
    /// normals; edge cross-product axes are skipped, which can only produce
    /// false positives.
    pub fn intersects(&self, other: &Aabbf) -> bool {
        if !self.bounds.intersects(other) {
            return false;
        }
        let corners = other.corners();
        !self
            .faces
            .iter()
            .any(|face| corners.iter().all(|corner| face.distance(corner) > 0.0))
    }

    fn update(&mut self) {
        let matrix = self.rotation.matrix();
        self.axes = [
            matrix.column(0).into_owned(),
            matrix.column(1).into_owned(),
            matrix.column(2).into_owned(),
        ];

        let local = Aabbf::new(Point3f::from(-self.half_extents), Point3f::from(self.half_extents));
        let mut bounds = Aabbf::default();
        for (slot, corner) in self.corners.iter_mut().zip(local.corners()) {
            *slot = self.position + self.rotation * corner.coords;
            bounds.expand_to_point(slot);
        }
        self.bounds = bounds;

        for (axis_index, axis) in self.axes.iter().enumerate() {
            let offset = axis * self.half_extents[axis_index];
            self.faces[axis_index * 2] = FacePlane {
                origin: self.position - offset,
                normal: -axis,
            };
            self.faces[axis_index * 2 + 1] = FacePlane {
                origin: self.position + offset,
                normal: *axis,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_4;

    #[test]
    fn test_axis_aligned_frame() {
        let frame = OrientedBox::new(Point3f::new(1.0, 1.0, 1.0), Rotation3::identity(), Vector3f::new(1.0, 2.0, 3.0));
        assert_relative_eq!(frame.bounds().min, Point3f::new(0.0, -1.0, -2.0));
        assert_relative_eq!(frame.bounds().max, Point3f::new(2.0, 3.0, 4.0));
        assert_relative_eq!(frame.depth(&Point3f::new(1.0, 1.0, 1.0)), 1.0);
        assert_relative_eq!(frame.depth(&Point3f::new(3.0, 1.0, 1.0)), -1.0);
    }

    #[test]
    fn test_rotated_frame_intersects() {
        let rotation = Rotation3::from_axis_angle(&Vector3f::z_axis(), FRAC_PI_4);
        let frame = OrientedBox::new(Point3f::origin(), rotation, Vector3f::new(1.0, 1.0, 1.0));

        // The diamond reaches sqrt(2) along x, and leaves the corner region empty
        assert!(frame.intersects(&Aabbf::new(Point3f::new(1.3, -0.1, -0.1), Point3f::new(1.5, 0.1, 0.1))));
        assert!(!frame.intersects(&Aabbf::new(Point3f::new(1.0, 1.0, -0.5), Point3f::new(1.3, 1.3, 0.5))));
        assert!(!frame.intersects(&Aabbf::new(Point3f::new(5.0, 5.0, 5.0), Point3f::new(6.0, 6.0, 6.0))));
    }

    #[test]
    fn test_faces_point_outward() {
        let frame = OrientedBox::new(Point3f::origin(), Rotation3::identity(), Vector3f::repeat(1.0));
        for face in frame.faces() {
            assert!(face.distance(&Point3f::origin()) < 0.0);
        }
    }
}
