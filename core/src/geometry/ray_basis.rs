//! Ray Direction Basis

use super::*;
use crate::common::*;

/// Orthonormal basis attached to a ray: the propagation direction and two
/// axes spanning the plane transverse to it. The optic axis of a voxel is
/// projected onto these to find the retardance and azimuth a ray sees.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct RayBasis<T> {
    /// Propagation direction.
    pub direction: Vector3<T>,

    /// First transverse axis.
    pub transverse1: Vector3<T>,

    /// Second transverse axis.
    pub transverse2: Vector3<T>,
}

/// Ray basis containing `Float` values.
pub type RayBasisf = RayBasis<Float>;

impl<T: num_traits::Float> RayBasis<T> {
    /// Creates a new basis from three orthonormal vectors.
    ///
    /// * `direction`   - Propagation direction.
    /// * `transverse1` - First transverse axis.
    /// * `transverse2` - Second transverse axis.
    pub fn new(direction: Vector3<T>, transverse1: Vector3<T>, transverse2: Vector3<T>) -> Self {
        Self {
            direction,
            transverse1,
            transverse2,
        }
    }

    /// Builds a basis for a ray travelling along `direction`. The transverse
    /// axes come from `coordinate_system()`.
    ///
    /// * `direction` - Propagation direction; need not be normalized.
    pub fn from_direction(direction: Vector3<T>) -> Self {
        let d = direction.normalize();
        let (t1, t2) = coordinate_system(&d);
        Self::new(d, t1, t2)
    }

    /// Returns true if any of the basis vectors contain NaN.
    pub fn has_nans(&self) -> bool {
        self.direction.has_nans() || self.transverse1.has_nans() || self.transverse2.has_nans()
    }

    /// Applies a conversion to every component of the basis.
    ///
    /// * `f` - The conversion.
    pub fn map<U, F>(self, f: F) -> RayBasis<U>
    where
        F: Fn(T) -> U + Copy,
    {
        RayBasis {
            direction: self.direction.map(f),
            transverse1: self.transverse1.map(f),
            transverse2: self.transverse2.map(f),
        }
    }
}
