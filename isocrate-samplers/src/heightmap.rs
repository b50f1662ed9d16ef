//! Heightmap sampler

use crate::{fuzzy_ramp, Mode, Surface, VolumeSampler};
use isocrate_core::{Aabbf, Error, MaterialState, Point3f, Result, Vector3f};
use std::sync::Arc;

/// A column of solid under a bilinearly interpolated height field
///
/// The field spans `width` by `depth` samples spaced `cell_size` apart on the
/// XZ plane starting at `origin`; the solid runs from `origin.y` up to
/// `origin.y + height`. The sides and floor are part of the boundary so the
/// field stays continuous at the footprint edge.
#[derive(Debug, Clone)]
pub struct Heightmap {
    origin: Point3f,
    cell_size: f32,
    width: usize,
    depth: usize,
    heights: Arc<[f32]>,
    max_height: f32,
    surface: Surface,
}

impl Heightmap {
    /// Create an additive heightmap from row-major (x fastest) heights
    pub fn additive(
        origin: Point3f,
        cell_size: f32,
        width: usize,
        depth: usize,
        heights: Vec<f32>,
        material: MaterialState,
    ) -> Result<Self> {
        Self::with_surface(origin, cell_size, width, depth, heights, Surface::additive(material))
    }

    /// Create a subtractive heightmap from row-major (x fastest) heights
    pub fn subtractive(
        origin: Point3f,
        cell_size: f32,
        width: usize,
        depth: usize,
        heights: Vec<f32>,
    ) -> Result<Self> {
        Self::with_surface(origin, cell_size, width, depth, heights, Surface::subtractive())
    }

    /// Create an additive heightmap by evaluating `height(x, z)` per sample
    pub fn from_fn<F>(
        origin: Point3f,
        cell_size: f32,
        width: usize,
        depth: usize,
        material: MaterialState,
        height: F,
    ) -> Result<Self>
    where
        F: Fn(usize, usize) -> f32,
    {
        let heights = (0..depth)
            .flat_map(|z| (0..width).map(move |x| (x, z)))
            .map(|(x, z)| height(x, z))
            .collect();
        Self::additive(origin, cell_size, width, depth, heights, material)
    }

    fn with_surface(
        origin: Point3f,
        cell_size: f32,
        width: usize,
        depth: usize,
        heights: Vec<f32>,
        surface: Surface,
    ) -> Result<Self> {
        if cell_size <= 0.0 || !cell_size.is_finite() {
            return Err(Error::InvalidData(format!(
                "heightmap cell size must be positive, got {}",
                cell_size
            )));
        }
        let mut heightmap = Self {
            origin,
            cell_size,
            width: 0,
            depth: 0,
            heights: Arc::from(Vec::new()),
            max_height: 0.0,
            surface,
        };
        heightmap.set_heights(width, depth, heights)?;
        Ok(heightmap)
    }

    pub fn origin(&self) -> Point3f {
        self.origin
    }

    pub fn set_origin(&mut self, origin: Point3f) {
        self.origin = origin;
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn max_height(&self) -> f32 {
        self.max_height
    }

    /// Replace the height samples
    ///
    /// Both dimensions must be at least 2, `heights` must hold exactly
    /// `width * depth` finite values. Negative heights are clamped to zero.
    pub fn set_heights(&mut self, width: usize, depth: usize, heights: Vec<f32>) -> Result<()> {
        if width < 2 || depth < 2 {
            return Err(Error::InvalidData(format!(
                "heightmap needs at least 2x2 samples, got {}x{}",
                width, depth
            )));
        }
        if heights.len() != width * depth {
            return Err(Error::InvalidData(format!(
                "heightmap of {}x{} needs {} samples, got {}",
                width,
                depth,
                width * depth,
                heights.len()
            )));
        }
        if heights.iter().any(|h| !h.is_finite()) {
            return Err(Error::InvalidData("heightmap samples must be finite".to_string()));
        }

        let heights: Vec<f32> = heights.into_iter().map(|h| h.max(0.0)).collect();
        self.max_height = heights.iter().copied().fold(0.0, f32::max);
        self.width = width;
        self.depth = depth;
        self.heights = Arc::from(heights);
        Ok(())
    }

    pub fn set_material(&mut self, material: MaterialState) -> Result<()> {
        self.surface.set_material(material)
    }

    /// World-space extent of the footprint on x and z
    fn extent(&self) -> (f32, f32) {
        (
            (self.width - 1) as f32 * self.cell_size,
            (self.depth - 1) as f32 * self.cell_size,
        )
    }

    /// Bounds enclosing every point with nonzero value
    pub fn bounds(&self) -> Aabbf {
        let (extent_x, extent_z) = self.extent();
        Aabbf::new(
            self.origin,
            self.origin + Vector3f::new(extent_x, self.max_height, extent_z),
        )
    }

    /// Interpolated height at footprint-local coordinates
    pub fn height_at(&self, local_x: f32, local_z: f32) -> f32 {
        let gx = (local_x / self.cell_size).clamp(0.0, (self.width - 1) as f32);
        let gz = (local_z / self.cell_size).clamp(0.0, (self.depth - 1) as f32);
        let x0 = (gx.floor() as usize).min(self.width - 2);
        let z0 = (gz.floor() as usize).min(self.depth - 2);
        let fx = gx - x0 as f32;
        let fz = gz - z0 as f32;

        let sample = |x: usize, z: usize| self.heights[z * self.width + x];
        let near = sample(x0, z0) * (1.0 - fx) + sample(x0 + 1, z0) * fx;
        let far = sample(x0, z0 + 1) * (1.0 - fx) + sample(x0 + 1, z0 + 1) * fx;
        near * (1.0 - fz) + far * fz
    }
}

impl VolumeSampler for Heightmap {
    fn mode(&self) -> Mode {
        self.surface.mode()
    }

    fn intersects(&self, bounds: &Aabbf) -> bool {
        self.bounds().intersects(bounds)
    }

    fn value_at(&self, point: &Point3f, fuzziness: f32) -> f32 {
        let local = point - self.origin;
        let (extent_x, extent_z) = self.extent();
        let edge = local
            .x
            .min(extent_x - local.x)
            .min(local.z)
            .min(extent_z - local.z)
            .min(local.y);
        if edge <= 0.0 {
            return 0.0;
        }
        let surface = self.height_at(local.x, local.z) - local.y;
        fuzzy_ramp(edge.min(surface), fuzziness)
    }

    fn material_at(&self, _point: &Point3f) -> Result<MaterialState> {
        self.surface.material()
    }
}
