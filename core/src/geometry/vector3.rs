//! 3-D vectors
//!
//! Components follow the voxel index order of a volume: component 0 is the
//! axial (z) direction, components 1 and 2 are the lateral y and x directions.

use crate::common::*;
use num_traits::{Num, Zero};
use std::ops::{Add, Div, Index, Mul, Neg, Sub};

/// A 3-D vector containing numeric values.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Vector3<T> {
    /// Axial component.
    pub z: T,

    /// Lateral y-component.
    pub y: T,

    /// Lateral x-component.
    pub x: T,
}

/// 3-D vector containing `Float` values.
pub type Vector3f = Vector3<Float>;

impl Vector3f {
    /// Zero vector.
    pub const ZERO: Self = Self { z: 0.0, y: 0.0, x: 0.0 };
}

impl<T: Num> Vector3<T> {
    /// Creates a new 3-D vector from components in `(z, y, x)` order.
    ///
    /// * `z` - Axial component.
    /// * `y` - Lateral y-component.
    /// * `x` - Lateral x-component.
    pub fn new(z: T, y: T, x: T) -> Self {
        Self { z, y, x }
    }

    /// Creates a new 3-D zero vector.
    pub fn zero() -> Self
    where
        T: Zero,
    {
        Self::new(T::zero(), T::zero(), T::zero())
    }

    /// Returns the dot product with another vector.
    ///
    /// * `other` - The other vector.
    pub fn dot(&self, other: &Self) -> T
    where
        T: Copy,
    {
        self.z * other.z + self.y * other.y + self.x * other.x
    }

    /// Returns the cross product with another vector.
    ///
    /// * `other` - The other vector.
    pub fn cross(&self, other: &Self) -> Self
    where
        T: Copy,
    {
        Self::new(
            self.y * other.x - self.x * other.y,
            self.x * other.z - self.z * other.x,
            self.z * other.y - self.y * other.z,
        )
    }

    /// Returns the square of the vector's length.
    pub fn length_squared(&self) -> T
    where
        T: Copy,
    {
        self.dot(self)
    }

    /// Applies a conversion to every component.
    ///
    /// * `f` - The conversion.
    pub fn map<U, F>(self, f: F) -> Vector3<U>
    where
        F: Fn(T) -> U,
    {
        Vector3 {
            z: f(self.z),
            y: f(self.y),
            x: f(self.x),
        }
    }
}

impl<T: num_traits::Float> Vector3<T> {
    /// Returns true if any component is NaN.
    pub fn has_nans(&self) -> bool {
        self.z.is_nan() || self.y.is_nan() || self.x.is_nan()
    }

    /// Returns the vector's length.
    pub fn length(&self) -> T {
        self.length_squared().sqrt()
    }

    /// Returns the unit vector. A zero vector stays zero instead of turning
    /// into NaNs.
    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len > T::zero() {
            *self / len
        } else {
            Self::zero()
        }
    }
}

/// Returns two unit vectors that together with `v1` form an orthonormal
/// coordinate system. `v1` must be normalized.
///
/// * `v1` - The first basis vector.
pub fn coordinate_system<T: num_traits::Float>(v1: &Vector3<T>) -> (Vector3<T>, Vector3<T>) {
    let v2 = if v1.z.abs() > v1.y.abs() {
        Vector3::new(-v1.x, T::zero(), v1.z) / (v1.z * v1.z + v1.x * v1.x).sqrt()
    } else {
        Vector3::new(T::zero(), v1.x, -v1.y) / (v1.y * v1.y + v1.x * v1.x).sqrt()
    };
    let v3 = v1.cross(&v2);
    (v2, v3)
}

impl<T: Num> Add for Vector3<T> {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self::new(self.z + other.z, self.y + other.y, self.x + other.x)
    }
}

impl<T: Num> Sub for Vector3<T> {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Self::new(self.z - other.z, self.y - other.y, self.x - other.x)
    }
}

impl<T: Num + Copy> Mul<T> for Vector3<T> {
    type Output = Self;

    fn mul(self, f: T) -> Self::Output {
        Self::new(self.z * f, self.y * f, self.x * f)
    }
}

impl<T: Num + Copy> Div<T> for Vector3<T> {
    type Output = Self;

    fn div(self, f: T) -> Self::Output {
        Self::new(self.z / f, self.y / f, self.x / f)
    }
}

impl<T: Num + Neg<Output = T>> Neg for Vector3<T> {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self::new(-self.z, -self.y, -self.x)
    }
}

impl<T> Index<usize> for Vector3<T> {
    type Output = T;

    /// Index the vector in `(z, y, x)` order.
    ///
    /// * `i` - The component index; 0, 1 or 2.
    fn index(&self, i: usize) -> &Self::Output {
        match i {
            0 => &self.z,
            1 => &self.y,
            2 => &self.x,
            _ => panic!("Invalid index for Vector3"),
        }
    }
}

impl<T: Copy> From<[T; 3]> for Vector3<T> {
    /// Convert a `[z, y, x]` array to a vector.
    ///
    /// * `a` - The array.
    fn from(a: [T; 3]) -> Self {
        Self {
            z: a[0],
            y: a[1],
            x: a[2],
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::*;
    use proptest::prelude::*;

    fn unit_vector3f() -> impl Strategy<Value = Vector3f> {
        (-1.0..1.0f64, -1.0..1.0f64, -1.0..1.0f64)
            .prop_filter("non-degenerate", |(z, y, x)| z * z + y * y + x * x > 1e-3)
            .prop_map(|(z, y, x)| Vector3f::new(z, y, x).normalize())
    }

    #[test]
    fn normalize_keeps_zero_vector_finite() {
        let v = Vector3f::ZERO.normalize();
        assert_eq!(v, Vector3f::ZERO);
        assert!(!v.has_nans());
    }

    #[test]
    fn cross_follows_right_hand_rule_in_zyx_order() {
        let z = Vector3f::new(1.0, 0.0, 0.0);
        let y = Vector3f::new(0.0, 1.0, 0.0);
        assert_eq!(z.cross(&y), Vector3f::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn index_returns_components_in_zyx_order() {
        let v = Vector3f::from([1.0, 2.0, 3.0]);
        assert_eq!((v[0], v[1], v[2]), (1.0, 2.0, 3.0));
    }

    proptest! {
        #[test]
        fn coordinate_system_is_orthonormal(v1 in unit_vector3f()) {
            let (v2, v3) = coordinate_system(&v1);
            prop_assert!(approx_eq!(Float, v1.dot(&v2), 0.0, epsilon = 1e-9));
            prop_assert!(approx_eq!(Float, v1.dot(&v3), 0.0, epsilon = 1e-9));
            prop_assert!(approx_eq!(Float, v2.dot(&v3), 0.0, epsilon = 1e-9));
            prop_assert!(approx_eq!(Float, v2.length(), 1.0, epsilon = 1e-9));
            prop_assert!(approx_eq!(Float, v3.length(), 1.0, epsilon = 1e-9));
        }
    }
}
