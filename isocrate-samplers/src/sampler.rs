//! The sampler trait shared by all volume primitives

use isocrate_core::{Aabbf, Error, MaterialState, Point3f, Result};
use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

/// Whether a sampler adds occupancy to the volume or carves it away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Additive,
    Subtractive,
}

/// A soft-edged occupancy field over 3D space
pub trait VolumeSampler: Send + Sync + Debug + SamplerClone {
    /// Whether this sampler adds or subtracts occupancy
    fn mode(&self) -> Mode;

    /// Conservative overlap test against a box
    ///
    /// May report true for boxes the shape does not reach, but must never
    /// report false for a box containing any nonzero value: a false negative
    /// silently drops geometry from the octree prune.
    fn intersects(&self, bounds: &Aabbf) -> bool;

    /// Occupancy in [0,1] at `point`
    ///
    /// Exactly 1 at depth `fuzziness` or more inside the boundary, exactly 0
    /// on and outside the boundary, linear in between.
    fn value_at(&self, point: &Point3f, fuzziness: f32) -> f32;

    /// Material at `point`; fails for subtractive samplers
    fn material_at(&self, point: &Point3f) -> Result<MaterialState>;
}

/// Object-safe cloning and downcasting for boxed samplers
pub trait SamplerClone {
    fn clone_arc(&self) -> Arc<dyn VolumeSampler>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T> SamplerClone for T
where
    T: VolumeSampler + Clone + 'static,
{
    fn clone_arc(&self) -> Arc<dyn VolumeSampler> {
        Arc::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Mode plus the material an additive sampler carries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    mode: Mode,
    material: Option<MaterialState>,
}

impl Surface {
    pub fn additive(material: MaterialState) -> Self {
        Self {
            mode: Mode::Additive,
            material: Some(material),
        }
    }

    pub fn subtractive() -> Self {
        Self {
            mode: Mode::Subtractive,
            material: None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The carried material, or an error on subtractive surfaces
    pub fn material(&self) -> Result<MaterialState> {
        self.material.ok_or_else(|| {
            Error::InvalidState("subtractive samplers carry no material".to_string())
        })
    }

    /// Replace the material; fails on subtractive surfaces
    pub fn set_material(&mut self, material: MaterialState) -> Result<()> {
        match self.mode {
            Mode::Additive => {
                self.material = Some(material);
                Ok(())
            }
            Mode::Subtractive => Err(Error::InvalidState(
                "cannot assign a material to a subtractive sampler".to_string(),
            )),
        }
    }
}

/// Map depth inside a boundary to occupancy
///
/// `depth` is positive inside the shape. Returns 0 at or beyond the boundary,
/// 1 at `fuzziness` or deeper, and a linear ramp between. A non-positive
/// fuzziness gives a hard step.
#[inline]
pub fn fuzzy_ramp(depth: f32, fuzziness: f32) -> f32 {
    if depth <= 0.0 {
        0.0
    } else if depth >= fuzziness {
        1.0
    } else {
        depth / fuzziness
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fuzzy_ramp() {
        assert_eq!(fuzzy_ramp(-1.0, 1.0), 0.0);
        assert_eq!(fuzzy_ramp(0.0, 1.0), 0.0);
        assert_relative_eq!(fuzzy_ramp(0.25, 1.0), 0.25);
        assert_eq!(fuzzy_ramp(1.0, 1.0), 1.0);
        assert_eq!(fuzzy_ramp(5.0, 1.0), 1.0);
        assert_eq!(fuzzy_ramp(0.01, 0.0), 1.0);
    }

    #[test]
    fn test_surface_material() {
        let additive = Surface::additive(MaterialState::default());
        assert!(additive.material().is_ok());

        let mut subtractive = Surface::subtractive();
        assert!(matches!(subtractive.material(), Err(Error::InvalidState(_))));
        assert!(subtractive.set_material(MaterialState::default()).is_err());
    }
}
