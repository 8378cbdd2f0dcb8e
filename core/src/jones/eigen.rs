//! Retardance and Azimuth Extraction
//!
//! The retardance and slow axis of an accumulated Jones matrix follow from its
//! eigen-structure: the eigenvalues differ in phase by the retardance and the
//! eigenvector of the fast eigenvalue lies along the fast axis.

use super::*;
use crate::common::{wrap_angle, THREE_PI_OVER_FOUR};
use num_complex::Complex;

/// Eigenvectors with both real components within this distance of each other
/// are treated as degenerate and snap the azimuth to 3π/4.
pub const AZIMUTH_DEGENERACY_TOLERANCE: f64 = 1e-5;

/// Retardances at or below this value are treated as zero when reporting an
/// azimuth.
pub const RETARDANCE_ZERO_TOLERANCE: f64 = 1e-8;

/// Returns the eigenvalues `(mean + h, mean - h)` of a 2x2 matrix together with
/// `h`, half their difference.
///
/// The discriminant is evaluated as `((a - d) / 2)^2 + bc` rather than
/// `(tr / 2)^2 - det` so that nearly identical eigenvalues do not lose all
/// their precision to cancellation.
///
/// * `j` - The matrix.
pub fn eigenvalues<T: JonesFloat>(j: &JonesMatrix<T>) -> (Complex<T>, Complex<T>, Complex<T>) {
    let two = T::one() + T::one();
    let [[a, b], [c, d]] = j.m;
    let mean = (a + d) / two;
    let half_diff = (a - d) / two;
    let h = (half_diff * half_diff + b * c).sqrt();
    (mean + h, mean - h, h)
}

/// Returns the retardance of a matrix as the absolute phase difference of its
/// eigenvalues. The result lies in `[0, 2π]`; for a linear retarder with
/// retardance `r` in `[0, π]` it recovers `r`. A (scaled) identity has equal
/// eigenvalues and a retardance of 0.
///
/// * `j` - The matrix.
pub fn retardance_from_matrix<T: JonesFloat>(j: &JonesMatrix<T>) -> T {
    let (l1, l2, _) = eigenvalues(j);
    let ret = (l1.arg() - l2.arg()).abs();
    debug_assert!(ret.is_finite(), "non-finite retardance from {:?}", j);
    ret
}

/// Returns the azimuth of the slow axis of a matrix in `[0, π)`.
///
/// The eigenvector of the eigenvalue with the negative imaginary part (the
/// fast eigenvalue) is rotated in phase so its largest component is real and
/// positive. Its real part `(x, y)` is the fast axis, so the slow axis lies at
/// `atan2(y, x) - π/2`. When `x` and `y` agree within
/// `AZIMUTH_DEGENERACY_TOLERANCE` the azimuth is exactly 3π/4. A matrix without
/// a birefringent interaction (identity, scaled identity or zero) has no
/// defined axis and returns 0.
///
/// * `j` - The matrix.
pub fn azimuth_from_matrix<T: JonesFloat>(j: &JonesMatrix<T>) -> T {
    let two = T::one() + T::one();
    let [[a, b], [c, d]] = j.m;
    let (l_plus, l_minus, h) = eigenvalues(j);
    let half_diff = (a - d) / two;

    // Fast eigenvalue is `mean + hh`.
    let hh = if l_minus.im <= l_plus.im { -h } else { h };

    // Two candidate eigenvectors; keep the better conditioned one.
    let v1 = [b, hh - half_diff];
    let v2 = [half_diff + hh, c];
    let n1 = v1[0].norm_sqr() + v1[1].norm_sqr();
    let n2 = v2[0].norm_sqr() + v2[1].norm_sqr();
    let (v, n) = if n1 >= n2 { (v1, n1) } else { (v2, n2) };

    let scale = j.m.iter().flatten().fold(T::zero(), |acc, z| acc.max(z.norm()));
    let len = n.sqrt();
    if !(len > T::epsilon() * scale) {
        return T::zero();
    }

    let pivot = if v[0].norm() >= v[1].norm() { v[0] } else { v[1] };
    let phase = pivot.conj() / pivot.norm();
    let x = (v[0] * phase).re / len;
    let y = (v[1] * phase).re / len;

    if (x - y).abs() < T::from_float(AZIMUTH_DEGENERACY_TOLERANCE) {
        return T::from_float(THREE_PI_OVER_FOUR);
    }

    let azimuth = y.atan2(x) - T::FRAC_PI_2();
    let azimuth = wrap_angle(azimuth, T::PI());
    debug_assert!(azimuth.is_finite(), "non-finite azimuth from {:?}", j);
    azimuth
}

/// Returns `(retardance, azimuth)` of a matrix. The azimuth is reported as 0
/// when the retardance is numerically zero.
///
/// * `j` - The matrix.
pub fn retardance_azimuth_from_matrix<T: JonesFloat>(j: &JonesMatrix<T>) -> (T, T) {
    let ret = retardance_from_matrix(j);
    if ret.abs() <= T::from_float(RETARDANCE_ZERO_TOLERANCE) {
        (ret, T::zero())
    } else {
        (ret, azimuth_from_matrix(j))
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::*;
    use float_cmp::*;
    use proptest::prelude::*;

    /// Distance between two angles modulo π.
    fn angle_distance_mod_pi(a: Float, b: Float) -> Float {
        let d = wrap_angle(a - b, PI);
        d.min(PI - d)
    }

    #[test]
    fn identity_has_zero_retardance_and_azimuth() {
        let j = JonesMatrixf::identity();
        assert_eq!(retardance_from_matrix(&j), 0.0);
        assert_eq!(azimuth_from_matrix(&j), 0.0);
    }

    #[test]
    fn zero_matrix_extracts_finite_zero_angles() {
        let j = JonesMatrixf::zero();
        assert_eq!(retardance_from_matrix(&j), 0.0);
        assert_eq!(azimuth_from_matrix(&j), 0.0);
    }

    #[test]
    fn scaled_identity_has_zero_retardance() {
        let phase = Complex::new(0.3f64.cos(), 0.3f64.sin());
        let zero = Complex::new(0.0, 0.0);
        let j = JonesMatrixf::new(phase, zero, zero, phase);
        assert!(approx_eq!(Float, retardance_from_matrix(&j), 0.0, epsilon = 1e-12));
        assert_eq!(azimuth_from_matrix(&j), 0.0);
    }

    #[test]
    fn zero_retardance_retarder_round_trips_to_zero_azimuth() {
        let j = jones_from_retardance_azimuth(0.0, 1.0);
        let (ret, azim) = retardance_azimuth_from_matrix(&j);
        assert_eq!(ret, 0.0);
        assert_eq!(azim, 0.0);
    }

    #[test]
    fn degenerate_eigenvector_snaps_to_three_quarter_pi() {
        let j = jones_from_retardance_azimuth(0.7, THREE_PI_OVER_FOUR + 1e-7);
        assert_eq!(azimuth_from_matrix(&j), THREE_PI_OVER_FOUR);
    }

    #[test]
    fn quarter_pi_azimuth_is_not_snapped() {
        let j = jones_from_retardance_azimuth(0.7, PI_OVER_FOUR);
        assert!(approx_eq!(Float, azimuth_from_matrix(&j), PI_OVER_FOUR, epsilon = 1e-9));
    }

    #[test]
    fn half_wave_retardance_round_trips() {
        let j = jones_from_retardance_azimuth(PI, 0.4);
        assert!(approx_eq!(Float, retardance_from_matrix(&j), PI, epsilon = 1e-9));
        assert!(angle_distance_mod_pi(azimuth_from_matrix(&j), 0.4) < 1e-9);
    }

    #[test]
    fn single_precision_agrees_with_double_precision() {
        for &(r, a) in &[(0.3, 0.1), (1.2, 2.0), (2.9, 1.1), (0.05, 0.7)] {
            let j64 = jones_from_retardance_azimuth::<f64>(r, a);
            let j32 = jones_from_retardance_azimuth::<f32>(r as f32, a as f32);
            let (r64, a64) = retardance_azimuth_from_matrix(&j64);
            let (r32, a32) = retardance_azimuth_from_matrix(&j32);
            assert!((r64 - r32 as f64).abs() < 1e-4);
            assert!(angle_distance_mod_pi(a64, a32 as f64) < 1e-4);
        }
    }

    proptest! {
        #[test]
        fn retardance_round_trips(r in 0.0..PI, a in 0.0..PI) {
            let j = jones_from_retardance_azimuth(r, a);
            prop_assert!((retardance_from_matrix(&j) - r).abs() < 1e-5);
        }

        #[test]
        fn azimuth_round_trips_modulo_pi(r in 1e-3..PI, a in 0.0..PI) {
            let j = jones_from_retardance_azimuth(r, a);
            let azim = azimuth_from_matrix(&j);
            prop_assert!(azim >= 0.0 && azim < PI);
            prop_assert!(angle_distance_mod_pi(azim, a) < 1e-5);
        }

        #[test]
        fn composed_retarders_extract_finite_angles(
            r1 in 0.0..PI, a1 in 0.0..PI, r2 in 0.0..PI, a2 in 0.0..PI,
        ) {
            let j = jones_from_retardance_azimuth(r1, a1) * jones_from_retardance_azimuth(r2, a2);
            let (ret, azim) = retardance_azimuth_from_matrix(&j);
            prop_assert!(ret.is_finite() && azim.is_finite());
            prop_assert!(ret >= 0.0 && ret <= TWO_PI + 1e-9);
            prop_assert!(azim >= 0.0 && azim < PI);
        }
    }
}
