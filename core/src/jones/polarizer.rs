//! Polarizers and Compensators

use super::*;
use crate::common::Float;
use crate::error::{RaytraceError, Result};
use num_complex::Complex;

/// Number of compensator settings in an intensity stack.
pub const N_POLARIZATION_SETTINGS: usize = 5;

/// A polarization state as a complex 2-vector.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct JonesVector<T> {
    /// Complex field amplitudes.
    pub e: [Complex<T>; 2],
}

impl<T: JonesFloat> JonesVector<T> {
    /// Creates a new Jones vector.
    ///
    /// * `e0` - First field component.
    /// * `e1` - Second field component.
    pub fn new(e0: Complex<T>, e1: Complex<T>) -> Self {
        Self { e: [e0, e1] }
    }

    /// Horizontally polarized light.
    pub fn horizontal() -> Self {
        Self::new(Complex::new(T::one(), T::zero()), Complex::new(T::zero(), T::zero()))
    }

    /// Returns the intensity `|e0|^2 + |e1|^2`.
    pub fn intensity(&self) -> T {
        self.e[0].norm_sqr() + self.e[1].norm_sqr()
    }
}

/// Returns the Jones matrix of an ideal linear polarizer.
///
/// * `theta` - Transmission axis angle in radians.
pub fn linear_polarizer<T: JonesFloat>(theta: T) -> JonesMatrix<T> {
    let (s, c) = theta.sin_cos();
    let z = |v: T| Complex::new(v, T::zero());
    JonesMatrix::new(z(c * c), z(c * s), z(c * s), z(s * s))
}

/// Returns the left circular analyzer `1/2 [[1, -i], [i, 1]]`. It extinguishes
/// the light leaving the compensator in its extinction setting.
pub fn left_circular_analyzer<T: JonesFloat>() -> JonesMatrix<T> {
    let half = T::one() / (T::one() + T::one());
    JonesMatrix::new(
        Complex::new(half, T::zero()),
        Complex::new(T::zero(), -half),
        Complex::new(T::zero(), half),
        Complex::new(half, T::zero()),
    )
}

/// Returns the Jones matrix of a universal compensator made of two variable
/// retarders: LC-A with its slow axis at π/4 followed by LC-B at 0.
///
/// * `ret_a` - Retardance of LC-A.
/// * `ret_b` - Retardance of LC-B.
pub fn universal_compensator<T: JonesFloat>(ret_a: T, ret_b: T) -> JonesMatrix<T> {
    jones_from_retardance_azimuth(ret_b, T::zero()) * jones_from_retardance_azimuth(ret_a, T::FRAC_PI_4())
}

/// Returns the compensator for one of the five settings of an intensity
/// stack. Setting 0 is extinction `(π/2, π)`; settings 1 to 4 add `swing` to
/// LC-A, add it to LC-B, subtract it from LC-B and subtract it from LC-A.
///
/// * `setting` - Setting index in `0..N_POLARIZATION_SETTINGS`.
/// * `swing`   - Compensator swing in radians.
pub fn universal_compensator_modes<T: JonesFloat>(setting: usize, swing: T) -> Result<JonesMatrix<T>> {
    let (a, b) = (T::FRAC_PI_2(), T::PI());
    let (ret_a, ret_b) = match setting {
        0 => (a, b),
        1 => (a + swing, b),
        2 => (a, b + swing),
        3 => (a, b - swing),
        4 => (a - swing, b),
        _ => {
            return Err(RaytraceError::Configuration(format!(
                "compensator setting {setting} is not in 0..{N_POLARIZATION_SETTINGS}"
            )))
        }
    };
    Ok(universal_compensator(ret_a, ret_b))
}

/// Returns the intensity reaching the sensor for horizontally polarized light
/// passing the compensator, the material and the analyzer in that order.
///
/// * `analyzer`    - Analyzer matrix.
/// * `material`    - Accumulated Jones matrix of the material.
/// * `compensator` - Compensator matrix.
pub fn detected_intensity<T: JonesFloat>(
    analyzer: &JonesMatrix<T>,
    material: &JonesMatrix<T>,
    compensator: &JonesMatrix<T>,
) -> T {
    let input = compensator.apply(&JonesVector::horizontal());
    analyzer.apply(&material.apply(&input)).intensity()
}

/// The default analyzer in storage precision.
pub fn default_analyzer() -> JonesMatrix<Float> {
    left_circular_analyzer()
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
