//! Axis-aligned bounding boxes in floating point and integer coordinates

use nalgebra::{Point3, Scalar, Vector3};
use std::ops::{Add, Mul, Sub};

/// Scalar types an [`Aabb`] can be expressed in
pub trait Coord:
    Scalar + Copy + PartialOrd + Add<Output = Self> + Sub<Output = Self> + Mul<Output = Self>
{
    /// Smallest representable value, used as the max corner of an empty box
    const LOWEST: Self;
    /// Largest representable value, used as the min corner of an empty box
    const HIGHEST: Self;

    /// Half of the value, rounding toward negative infinity for integers
    fn half(self) -> Self;

    fn min_of(self, other: Self) -> Self {
        if other < self {
            other
        } else {
            self
        }
    }

    fn max_of(self, other: Self) -> Self {
        if other > self {
            other
        } else {
            self
        }
    }
}

impl Coord for f32 {
    const LOWEST: Self = f32::NEG_INFINITY;
    const HIGHEST: Self = f32::INFINITY;

    fn half(self) -> Self {
        self * 0.5
    }
}

impl Coord for i32 {
    const LOWEST: Self = i32::MIN;
    const HIGHEST: Self = i32::MAX;

    fn half(self) -> Self {
        self.div_euclid(2)
    }
}

/// How one box relates to another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intersection {
    /// The other box lies entirely within this one
    Inside,
    /// The boxes overlap without full containment
    Intersects,
    /// The boxes do not touch
    Outside,
}

/// An axis-aligned bounding box
///
/// A box is valid iff `min < max` on every axis. The default box is inverted
/// (min at the highest value, max at the lowest) so that expanding it by any
/// point or box yields exactly that point or box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb<T: Coord> {
    pub min: Point3<T>,
    pub max: Point3<T>,
}

/// Floating point bounding box
pub type Aabbf = Aabb<f32>;

/// Integer bounding box, used for octree nodes and voxel regions
pub type Aabbi = Aabb<i32>;

fn zip_with<T: Coord>(a: &Point3<T>, b: &Point3<T>, f: impl Fn(T, T) -> T) -> Point3<T> {
    Point3::new(f(a.x, b.x), f(a.y, b.y), f(a.z, b.z))
}

impl<T: Coord> Aabb<T> {
    /// Create a box from its min and max corners
    pub fn new(min: Point3<T>, max: Point3<T>) -> Self {
        Self { min, max }
    }

    /// An inverted box that contains nothing until expanded
    pub fn invalid() -> Self {
        Self {
            min: Point3::new(T::HIGHEST, T::HIGHEST, T::HIGHEST),
            max: Point3::new(T::LOWEST, T::LOWEST, T::LOWEST),
        }
    }

    /// Check that min < max on every axis
    pub fn is_valid(&self) -> bool {
        self.min.x < self.max.x && self.min.y < self.max.y && self.min.z < self.max.z
    }

    /// Extent along each axis
    pub fn size(&self) -> Vector3<T> {
        Vector3::new(
            self.max.x - self.min.x,
            self.max.y - self.min.y,
            self.max.z - self.min.z,
        )
    }

    /// Product of the extents
    pub fn volume(&self) -> T {
        let size = self.size();
        size.x * size.y * size.z
    }

    /// Grow the box to include a point
    pub fn expand_to_point(&mut self, point: &Point3<T>) {
        self.min = zip_with(&self.min, point, T::min_of);
        self.max = zip_with(&self.max, point, T::max_of);
    }

    /// Grow the box to include another box
    pub fn union_with(&mut self, other: &Self) {
        self.min = zip_with(&self.min, &other.min, T::min_of);
        self.max = zip_with(&self.max, &other.max, T::max_of);
    }

    /// Smallest box containing both boxes
    pub fn union(&self, other: &Self) -> Self {
        let mut result = *self;
        result.union_with(other);
        result
    }

    /// Shrink the box by `amount` on every side
    pub fn inset(&self, amount: T) -> Self {
        Self {
            min: Point3::new(self.min.x + amount, self.min.y + amount, self.min.z + amount),
            max: Point3::new(self.max.x - amount, self.max.y - amount, self.max.z - amount),
        }
    }

    /// Grow the box by `amount` on every side
    pub fn outset(&self, amount: T) -> Self {
        Self {
            min: Point3::new(self.min.x - amount, self.min.y - amount, self.min.z - amount),
            max: Point3::new(self.max.x + amount, self.max.y + amount, self.max.z + amount),
        }
    }

    /// Check if a point lies within the closed box
    pub fn contains_point(&self, point: &Point3<T>) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Check if two closed boxes overlap, shared faces included
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Classify `other` against this box
    pub fn classify(&self, other: &Self) -> Intersection {
        if !self.intersects(other) {
            Intersection::Outside
        } else if self.contains_point(&other.min) && self.contains_point(&other.max) {
            Intersection::Inside
        } else {
            Intersection::Intersects
        }
    }

    /// The 8 corners in marching-cubes winding: the bottom face (min z)
    /// counter-clockwise from `min`, then the top face in the same order
    pub fn corners(&self) -> [Point3<T>; 8] {
        let (a, b) = (&self.min, &self.max);
        [
            Point3::new(a.x, a.y, a.z),
            Point3::new(b.x, a.y, a.z),
            Point3::new(b.x, b.y, a.z),
            Point3::new(a.x, b.y, a.z),
            Point3::new(a.x, a.y, b.z),
            Point3::new(b.x, a.y, b.z),
            Point3::new(b.x, b.y, b.z),
            Point3::new(a.x, b.y, b.z),
        ]
    }

    /// Split into 8 octants which exactly partition this box
    ///
    /// Child `i` takes the upper half along x when bit 0 is set, along y when
    /// bit 1 is set and along z when bit 2 is set. The split plane sits at
    /// `min + size / 2`, so with integer coordinates the lower children get the
    /// floor of the halved size and the upper children the remainder.
    pub fn octree_subdivide(&self) -> [Self; 8] {
        let size = self.size();
        let mid = Point3::new(
            self.min.x + size.x.half(),
            self.min.y + size.y.half(),
            self.min.z + size.z.half(),
        );

        std::array::from_fn(|i| {
            let pick = |bit: usize, lo: T, mid: T, hi: T| {
                if i & bit == 0 {
                    (lo, mid)
                } else {
                    (mid, hi)
                }
            };
            let (x0, x1) = pick(1, self.min.x, mid.x, self.max.x);
            let (y0, y1) = pick(2, self.min.y, mid.y, self.max.y);
            let (z0, z1) = pick(4, self.min.z, mid.z, self.max.z);
            Self {
                min: Point3::new(x0, y0, z0),
                max: Point3::new(x1, y1, z1),
            }
        })
    }
}

impl<T: Coord> Default for Aabb<T> {
    fn default() -> Self {
        Self::invalid()
    }
}

impl Aabb<f32> {
    /// Create a box centered on `center` with full side lengths `extents`
    pub fn from_center_extents(center: Point3<f32>, extents: Vector3<f32>) -> Self {
        let half = extents * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Create a cube enclosing a sphere
    pub fn from_center_radius(center: Point3<f32>, radius: f32) -> Self {
        Self::from_center_extents(center, Vector3::repeat(radius * 2.0))
    }

    /// Center of the box
    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Closest point within the box to `point`
    pub fn closest_point(&self, point: &Point3<f32>) -> Point3<f32> {
        Point3::new(
            point.x.clamp(self.min.x, self.max.x),
            point.y.clamp(self.min.y, self.max.y),
            point.z.clamp(self.min.z, self.max.z),
        )
    }

    /// Smallest integer box enclosing this box
    pub fn round_out(&self) -> Aabbi {
        Aabbi {
            min: self.min.map(|v| v.floor() as i32),
            max: self.max.map(|v| v.ceil() as i32),
        }
    }
}

impl Aabb<i32> {
    /// Convert to floating point coordinates
    pub fn to_f32(&self) -> Aabbf {
        Aabbf {
            min: self.min.map(|v| v as f32),
            max: self.max.map(|v| v as f32),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cube(min: i32, max: i32) -> Aabbi {
        Aabbi::new(Point3::new(min, min, min), Point3::new(max, max, max))
    }

    #[test]
    fn test_default_is_invalid() {
        let aabb = Aabbf::default();
        assert!(!aabb.is_valid());

        let mut grown = Aabbi::default();
        grown.expand_to_point(&Point3::new(1, 2, 3));
        grown.expand_to_point(&Point3::new(4, 5, 6));
        assert!(grown.is_valid());
        assert_eq!(grown.min, Point3::new(1, 2, 3));
        assert_eq!(grown.max, Point3::new(4, 5, 6));
    }

    #[test]
    fn test_union_and_inset() {
        let a = cube(0, 4);
        let b = cube(2, 8);
        let u = a.union(&b);
        assert_eq!(u, cube(0, 8));
        assert_eq!(u.inset(1), cube(1, 7));
        assert_eq!(u.outset(2), cube(-2, 10));
        assert!(!cube(0, 2).inset(1).is_valid());
    }

    #[test]
    fn test_octree_subdivide_even() {
        let parent = cube(0, 16);
        let children = parent.octree_subdivide();

        let mut union = Aabbi::default();
        let mut total_volume = 0;
        for child in &children {
            assert_eq!(child.size(), Vector3::new(8, 8, 8));
            union.union_with(child);
            total_volume += child.volume();
        }
        assert_eq!(union, parent);
        assert_eq!(total_volume, parent.volume());

        // pairwise overlap only on shared faces
        for i in 0..8 {
            for j in (i + 1)..8 {
                let a = &children[i];
                let b = &children[j];
                let overlap = Vector3::new(
                    a.max.x.min(b.max.x) - a.min.x.max(b.min.x),
                    a.max.y.min(b.max.y) - a.min.y.max(b.min.y),
                    a.max.z.min(b.max.z) - a.min.z.max(b.min.z),
                );
                assert!(overlap.iter().any(|&o| o <= 0), "{i} and {j} overlap");
            }
        }
    }

    #[test]
    fn test_octree_subdivide_child_order() {
        let children = cube(0, 2).octree_subdivide();
        assert_eq!(children[0].min, Point3::new(0, 0, 0));
        assert_eq!(children[1].min, Point3::new(1, 0, 0));
        assert_eq!(children[2].min, Point3::new(0, 1, 0));
        assert_eq!(children[4].min, Point3::new(0, 0, 1));
        assert_eq!(children[7].min, Point3::new(1, 1, 1));
    }

    #[test]
    fn test_octree_subdivide_odd_covers_parent() {
        let parent = Aabbi::new(Point3::new(0, 0, 0), Point3::new(5, 7, 3));
        let children = parent.octree_subdivide();
        let total: i32 = children.iter().map(|c| c.volume()).sum();
        assert_eq!(total, parent.volume());
        assert_eq!(children[0].size(), Vector3::new(2, 3, 1));
        assert_eq!(children[7].size(), Vector3::new(3, 4, 2));
    }

    #[test]
    fn test_octree_subdivide_float() {
        let parent = Aabbf::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        for child in parent.octree_subdivide() {
            assert_relative_eq!(child.volume(), 0.125);
        }
    }

    #[test]
    fn test_classify() {
        let outer = cube(0, 10);
        assert_eq!(outer.classify(&cube(2, 4)), Intersection::Inside);
        assert_eq!(outer.classify(&cube(8, 12)), Intersection::Intersects);
        assert_eq!(outer.classify(&cube(11, 12)), Intersection::Outside);
    }

    #[test]
    fn test_corners_winding() {
        let corners = cube(0, 1).to_f32().corners();
        assert_eq!(corners[0], Point3::new(0.0, 0.0, 0.0));
        assert_eq!(corners[2], Point3::new(1.0, 1.0, 0.0));
        assert_eq!(corners[6], Point3::new(1.0, 1.0, 1.0));
        assert_eq!(corners[7], Point3::new(0.0, 1.0, 1.0));
    }

    #[test]
    fn test_round_out_and_closest_point() {
        let aabb = Aabbf::from_center_radius(Point3::new(0.5, 0.5, 0.5), 1.25);
        let rounded = aabb.round_out();
        assert_eq!(rounded, cube(-1, 2));

        let closest = aabb.closest_point(&Point3::new(10.0, 0.0, -10.0));
        assert_relative_eq!(closest, Point3::new(1.75, 0.0, -0.75));
    }
}
