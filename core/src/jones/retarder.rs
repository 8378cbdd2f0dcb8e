//! Linear Retarders

use super::*;
use crate::geometry::*;
use num_complex::Complex;

/// Returns the `(retardance, azimuth)` a ray sees while crossing one voxel.
///
/// The azimuth is the angle of the optic axis projected on the plane
/// transverse to the ray. A negative birefringence swaps the slow and fast
/// axes, which rotates the azimuth by π/2. A voxel without birefringence has
/// an azimuth of exactly 0 whatever its optic axis.
///
/// * `delta_n`     - Signed birefringence of the voxel.
/// * `optic_axis`  - Unit optic axis of the voxel.
/// * `basis`       - Direction basis of the ray.
/// * `path_length` - Length of the ray segment inside the voxel.
/// * `wavelength`  - Wavelength of the light, in the units of `path_length`.
pub fn voxel_retardance_azimuth<T: JonesFloat>(
    delta_n: T,
    optic_axis: &Vector3<T>,
    basis: &RayBasis<T>,
    path_length: T,
    wavelength: T,
) -> (T, T) {
    let azimuth = if delta_n == T::zero() {
        T::zero()
    } else {
        let azimuth = optic_axis
            .dot(&basis.transverse1)
            .atan2(optic_axis.dot(&basis.transverse2));
        if delta_n < T::zero() {
            azimuth + T::FRAC_PI_2()
        } else {
            azimuth
        }
    };

    let along = optic_axis.dot(&basis.direction);
    let two_pi = T::PI() + T::PI();
    let transverse = (T::one() - along * along).max(T::zero());
    let retardance = delta_n.abs() * transverse * two_pi * path_length / wavelength;

    debug_assert!(retardance.is_finite() && azimuth.is_finite());
    (retardance, azimuth)
}

/// Returns the Jones matrix of a linear retarder. It is unitary with a
/// determinant of 1.
///
/// * `retardance` - Phase delay between slow and fast axes in radians.
/// * `azimuth`    - Angle of the slow axis in radians.
pub fn jones_from_retardance_azimuth<T: JonesFloat>(retardance: T, azimuth: T) -> JonesMatrix<T> {
    let two = T::one() + T::one();
    let (s, c) = (retardance / two).sin_cos();
    let (sin_2a, cos_2a) = (two * azimuth).sin_cos();

    let diag = Complex::new(c, cos_2a * s);
    let offdiag = Complex::new(T::zero(), sin_2a * s);
    JonesMatrix::new(diag, offdiag, offdiag, diag.conj())
}

/// Returns the Jones matrix of a ray crossing one voxel.
///
/// * `delta_n`     - Signed birefringence of the voxel.
/// * `optic_axis`  - Unit optic axis of the voxel.
/// * `basis`       - Direction basis of the ray.
/// * `path_length` - Length of the ray segment inside the voxel.
/// * `wavelength`  - Wavelength of the light.
pub fn voxel_ray_jones<T: JonesFloat>(
    delta_n: T,
    optic_axis: &Vector3<T>,
    basis: &RayBasis<T>,
    path_length: T,
    wavelength: T,
) -> JonesMatrix<T> {
    let (ret, azim) = voxel_retardance_azimuth(delta_n, optic_axis, basis, path_length, wavelength);
    jones_from_retardance_azimuth(ret, azim)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
