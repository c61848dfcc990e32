use std::fmt::Debug;

use ndarray::{Array, Array2, LinalgScalar};
use num_traits::{Float, FloatConst, FromPrimitive, ToPrimitive};

/// Floating point types the crate computes with
///
/// In practice this is `f32` on the device reading the sensor and `f64` on the calibration host.
pub trait Real: Float + FloatConst + FromPrimitive + LinalgScalar + Debug {}

impl<T: Float + FloatConst + FromPrimitive + LinalgScalar + Debug> Real for T {}

/// Convert a primitive into the working float type
///
/// # Panics
///
/// Panics if `value` cannot be represented by `F`. Every primitive numeric type converts into
/// `f32` and `f64` (possibly with rounding), so this does not occur for the float types the
/// crate is used with.
pub(crate) fn cast<F: Float, T: ToPrimitive>(value: T) -> F {
    F::from(value).expect("primitive value is representable as a float")
}

/// One full revolution in degrees
pub(crate) fn full_turn<F: Float>() -> F {
    cast(360.0)
}

/// Reduce `value` into the half-open range `[0, period)`
///
/// This is the only angular wrap used in the crate. `period` must be positive. Values which
/// round onto the upper bound are folded back to zero, so the result never equals `period`.
///
/// # Examples
///
/// ```
/// use angle_correction::math::wrap;
///
/// approx::assert_relative_eq!(wrap(370., 360.), 10.);
/// approx::assert_relative_eq!(wrap(-90., 360.), 270.);
/// assert_eq!(wrap(-1e-20_f64, 360.), 0.);
/// ```
pub fn wrap<F: Float>(value: F, period: F) -> F {
    let wrapped = value - period * (value / period).floor();
    if wrapped < F::zero() || wrapped >= period {
        F::zero()
    } else {
        wrapped
    }
}

/// Reduce an angle in degrees into `[0, 360)`
pub fn wrap_degrees<F: Float>(degrees: F) -> F {
    wrap(degrees, full_turn())
}

/// The abscissa of knot `index` in a uniform table of `size` entries
pub(crate) fn uniform_angle<F: Float>(index: usize, size: usize) -> F {
    cast::<F, _>(index) * full_turn() / cast(size)
}

/// Index of the bucket of a uniform `size`-entry table which contains `degrees`
///
/// Bucket `i` covers `[i * 360 / size, (i + 1) * 360 / size)`. The angle is wrapped first, so the
/// index is always in `0..size`. The floored estimate is nudged by one where rounding places it
/// on the wrong side of a knot, so the result agrees with a comparison against the knot angles.
pub(crate) fn uniform_bucket<F: Float>(degrees: F, size: usize) -> usize {
    let degrees = wrap_degrees(degrees);
    let position = (degrees * cast(size) / full_turn()).floor();
    let index = position.to_usize().unwrap_or(0) % size;
    if index > 0 && uniform_angle::<F>(index, size) > degrees {
        index - 1
    } else if index + 1 < size && uniform_angle::<F>(index + 1, size) <= degrees {
        index + 1
    } else {
        index
    }
}

/// Generate the `(n x 2)` harmonic basis of `order` for `n` equally spaced samples
///
/// Row `i` holds the cosine and sine of `2π i / period` where `period = n / order` is the number
/// of samples in one cycle of the harmonic. Multiplying the transpose of the basis with a series
/// gives its projection onto that harmonic.
///
/// # Examples
///
/// ```
/// use angle_correction::math::harmonic_basis;
///
/// let basis = harmonic_basis::<f64>(4, 1);
///
/// approx::assert_abs_diff_eq!(basis[[1, 0]], 0., epsilon = 1e-12);
/// approx::assert_abs_diff_eq!(basis[[1, 1]], 1., epsilon = 1e-12);
/// approx::assert_abs_diff_eq!(basis[[2, 0]], -1., epsilon = 1e-12);
/// ```
pub fn harmonic_basis<F: Real>(n: usize, order: usize) -> Array2<F> {
    let step = F::TAU() * cast(order) / cast(n);
    Array::from_shape_fn((n, 2), |(ii, column)| {
        let phase = step * cast(ii);
        if column == 0 {
            phase.cos()
        } else {
            phase.sin()
        }
    })
}
