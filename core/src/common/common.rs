//! Common

use num_traits::Num;

/// Use 64-bit precision for floating point numbers.
pub type Float = f64;

/// PI (π)
pub const PI: Float = std::f64::consts::PI;

/// PI/2 (π/2)
pub const PI_OVER_TWO: Float = PI * 0.5;

/// PI/4 (π/4)
pub const PI_OVER_FOUR: Float = PI * 0.25;

/// 3*PI/4 (3π/4)
pub const THREE_PI_OVER_FOUR: Float = PI * 0.75;

/// 2*PI (2π)
pub const TWO_PI: Float = PI * 2.0;

/// Returns the minimum of 2 numbers.
///
/// * `a` - First number.
/// * `b` - Second number.
#[inline(always)]
pub fn min<T>(a: T, b: T) -> T
where
    T: Num + PartialOrd + Copy,
{
    if a < b {
        a
    } else {
        b
    }
}

/// Returns the maximum of 2 numbers.
///
/// * `a` - First number.
/// * `b` - Second number.
#[inline(always)]
pub fn max<T>(a: T, b: T) -> T
where
    T: Num + PartialOrd + Copy,
{
    if a > b {
        a
    } else {
        b
    }
}

/// Clamps a value to `[low, high]`.
///
/// * `val`  - The value.
/// * `low`  - Lower bound.
/// * `high` - Upper bound.
#[inline(always)]
pub fn clamp<T>(val: T, low: T, high: T) -> T
where
    T: PartialOrd,
{
    if val < low {
        low
    } else if val > high {
        high
    } else {
        val
    }
}

/// Wraps an angle into `[0, period)`.
///
/// * `theta`  - The angle in radians.
/// * `period` - The period in radians.
#[inline(always)]
pub fn wrap_angle<T>(theta: T, period: T) -> T
where
    T: num_traits::Float,
{
    let r = theta % period;
    let r = if r < T::zero() { r + period } else { r };

    // `r + period` can round up to `period` for tiny negative remainders.
    if r >= period {
        T::zero()
    } else {
        r
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

    #[test]
    fn clamp_limits_values_to_range() {
        assert_eq!(clamp(-1, 0, 5), 0);
        assert_eq!(clamp(7, 0, 5), 5);
        assert_eq!(clamp(3, 0, 5), 3);
    }

    #[test]
    fn wrap_angle_maps_negative_angles_into_period() {
        assert!(approx_eq!(Float, wrap_angle(-PI_OVER_FOUR, PI), THREE_PI_OVER_FOUR, epsilon = 1e-12));
        assert!(approx_eq!(Float, wrap_angle(PI, PI), 0.0, epsilon = 1e-12));
    }

    proptest! {
        #[test]
        fn wrap_angle_stays_in_half_open_range(theta in -20.0..20.0f64) {
            let w = wrap_angle(theta, PI);
            prop_assert!(w >= 0.0 && w < PI);
        }

        #[test]
        fn min_max_are_ordered(a in -100..100i32, b in -100..100i32) {
            prop_assert!(min(a, b) <= max(a, b));
        }
    }
}
