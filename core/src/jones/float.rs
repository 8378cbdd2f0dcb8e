//! Jones Scalar Type

use crate::common::Float;
use num_traits::FloatConst;
use std::fmt::{Debug, Display};

/// Floating point type the Jones algebra can be evaluated in. Volumes and ray
/// geometry are stored as `Float`; values are converted on the way in and
/// out so single and double precision share one code path.
pub trait JonesFloat:
    num_traits::Float + FloatConst + Default + Debug + Display + Send + Sync + 'static
{
    /// Converts from the storage precision.
    ///
    /// * `v` - The value.
    fn from_float(v: Float) -> Self;

    /// Converts to the storage precision.
    fn to_float(self) -> Float;
}

impl JonesFloat for f32 {
    #[inline(always)]
    fn from_float(v: Float) -> Self {
        v as f32
    }

    #[inline(always)]
    fn to_float(self) -> Float {
        self as Float
    }
}

impl JonesFloat for f64 {
    #[inline(always)]
    fn from_float(v: Float) -> Self {
        v
    }

    #[inline(always)]
    fn to_float(self) -> Float {
        self
    }
}
