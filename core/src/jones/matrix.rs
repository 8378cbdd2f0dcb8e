//! Jones Matrix

use super::*;
use crate::common::Float;
use crate::error::{RaytraceError, Result};
use num_complex::Complex;
use std::ops::{Mul, MulAssign};

/// A 2x2 complex matrix describing how a sequence of optical elements changes
/// the polarization state of a ray.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct JonesMatrix<T> {
    /// Entries in row-major order.
    pub m: [[Complex<T>; 2]; 2],
}

/// Jones matrix containing `Float` values.
pub type JonesMatrixf = JonesMatrix<Float>;

impl<T: JonesFloat> JonesMatrix<T> {
    /// Creates a new matrix from its entries.
    ///
    /// * `m00` - Row 0, column 0.
    /// * `m01` - Row 0, column 1.
    /// * `m10` - Row 1, column 0.
    /// * `m11` - Row 1, column 1.
    pub fn new(m00: Complex<T>, m01: Complex<T>, m10: Complex<T>, m11: Complex<T>) -> Self {
        Self {
            m: [[m00, m01], [m10, m11]],
        }
    }

    /// Returns the identity matrix, the Jones matrix of free space.
    pub fn identity() -> Self {
        let one = Complex::new(T::one(), T::zero());
        let zero = Complex::new(T::zero(), T::zero());
        Self::new(one, zero, zero, one)
    }

    /// Returns the zero matrix. It blocks all light.
    pub fn zero() -> Self {
        let zero = Complex::new(T::zero(), T::zero());
        Self::new(zero, zero, zero, zero)
    }

    /// Returns the determinant.
    pub fn determinant(&self) -> Complex<T> {
        self.m[0][0] * self.m[1][1] - self.m[0][1] * self.m[1][0]
    }

    /// Returns the trace.
    pub fn trace(&self) -> Complex<T> {
        self.m[0][0] + self.m[1][1]
    }

    /// Returns the conjugate transpose.
    pub fn adjoint(&self) -> Self {
        Self::new(
            self.m[0][0].conj(),
            self.m[1][0].conj(),
            self.m[0][1].conj(),
            self.m[1][1].conj(),
        )
    }

    /// Applies the matrix to a polarization state.
    ///
    /// * `v` - The Jones vector.
    pub fn apply(&self, v: &JonesVector<T>) -> JonesVector<T> {
        JonesVector::new(
            self.m[0][0] * v.e[0] + self.m[0][1] * v.e[1],
            self.m[1][0] * v.e[0] + self.m[1][1] * v.e[1],
        )
    }

    /// Returns true if no entry contains NaN or infinity.
    pub fn is_finite(&self) -> bool {
        self.m.iter().flatten().all(|c| c.re.is_finite() && c.im.is_finite())
    }

    /// Reports a non-finite matrix as `RaytraceError::NumericAnomaly`.
    pub fn check_finite(&self) -> Result<()> {
        if self.is_finite() {
            Ok(())
        } else {
            Err(RaytraceError::NumericAnomaly(format!(
                "non-finite Jones matrix {:?}",
                self.m
            )))
        }
    }

    /// Returns the largest entrywise modulus of the difference with another matrix.
    ///
    /// * `other` - The other matrix.
    pub fn max_abs_diff(&self, other: &Self) -> T {
        self.m
            .iter()
            .flatten()
            .zip(other.m.iter().flatten())
            .fold(T::zero(), |acc, (a, b)| acc.max((*a - *b).norm()))
    }

    /// Converts the matrix to another precision.
    pub fn cast<U: JonesFloat>(&self) -> JonesMatrix<U> {
        let c = |z: Complex<T>| Complex::new(U::from_float(z.re.to_float()), U::from_float(z.im.to_float()));
        JonesMatrix::new(c(self.m[0][0]), c(self.m[0][1]), c(self.m[1][0]), c(self.m[1][1]))
    }
}

impl<T: JonesFloat> Default for JonesMatrix<T> {
    fn default() -> Self {
        Self::identity()
    }
}

impl<T: JonesFloat> Mul for JonesMatrix<T> {
    type Output = Self;

    /// Matrix product `self * other`. For two elements traversed in order
    /// `A` then `B` the accumulated matrix is `A * B`.
    ///
    /// * `other` - Right hand side.
    fn mul(self, other: Self) -> Self::Output {
        let a = &self.m;
        let b = &other.m;
        Self::new(
            a[0][0] * b[0][0] + a[0][1] * b[1][0],
            a[0][0] * b[0][1] + a[0][1] * b[1][1],
            a[1][0] * b[0][0] + a[1][1] * b[1][0],
            a[1][0] * b[0][1] + a[1][1] * b[1][1],
        )
    }
}

impl<T: JonesFloat> MulAssign for JonesMatrix<T> {
    /// Performs `self = self * other`.
    ///
    /// * `other` - Right hand side.
    fn mul_assign(&mut self, other: Self) {
        *self = *self * other;
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::*;

    fn c(re: Float, im: Float) -> Complex<Float> {
        Complex::new(re, im)
    }

    #[test]
    fn identity_is_neutral_for_multiplication() {
        let a = JonesMatrixf::new(c(1.0, 2.0), c(0.5, -1.0), c(0.0, 3.0), c(-2.0, 0.25));
        assert_eq!(a * JonesMatrixf::identity(), a);
        assert_eq!(JonesMatrixf::identity() * a, a);
    }

    #[test]
    fn determinant_and_trace_of_diagonal_matrix() {
        let a = JonesMatrixf::new(c(2.0, 0.0), c(0.0, 0.0), c(0.0, 0.0), c(0.0, 3.0));
        assert_eq!(a.determinant(), c(0.0, 6.0));
        assert_eq!(a.trace(), c(2.0, 3.0));
    }

    #[test]
    fn adjoint_conjugates_and_transposes() {
        let a = JonesMatrixf::new(c(1.0, 1.0), c(2.0, -1.0), c(3.0, 0.5), c(0.0, -2.0));
        let h = a.adjoint();
        assert_eq!(h.m[0][1], c(3.0, -0.5));
        assert_eq!(h.m[1][0], c(2.0, 1.0));
        assert_eq!(h.m[1][1], c(0.0, 2.0));
    }

    #[test]
    fn check_finite_flags_nan_entries() {
        let mut a = JonesMatrixf::identity();
        assert!(a.check_finite().is_ok());
        a.m[1][0] = c(Float::NAN, 0.0);
        assert!(matches!(a.check_finite(), Err(RaytraceError::NumericAnomaly(_))));
    }

    #[test]
    fn single_precision_flags_infinite_imaginary_part() {
        let mut a = JonesMatrix::<f32>::identity();
        assert!(a.is_finite());
        a.m[0][1] = Complex::new(0.0, f32::INFINITY);
        assert!(!a.is_finite());
        assert!(a.check_finite().is_err());
    }

    #[test]
    fn cast_to_single_precision_preserves_values() {
        let a = JonesMatrixf::new(c(0.5, 0.25), c(0.0, 1.0), c(-1.0, 0.0), c(0.125, -0.5));
        let b = a.cast::<f32>();
        assert!(approx_eq!(f32, b.m[0][0].im, 0.25));
        assert!(approx_eq!(f32, b.m[1][1].im, -0.5));
    }
}
