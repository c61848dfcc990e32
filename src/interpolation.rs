use serde::Serialize;

use crate::config::Bracket;
use crate::math::{full_turn, uniform_bucket, wrap_degrees, Real};
use crate::table::{is_ascending, ConstantSlopeTable, FittedCurveTable, MINIMUM_KNOTS};
use crate::{Error, Result};

/// Outcome of correcting a single measured angle
#[derive(Clone, Copy, Debug, Serialize, PartialEq)]
pub struct CorrectionResult<F> {
    /// `wrap(measured - angle_error + zero_degree_offset, 360)`
    pub corrected_angle: F,
    /// Estimated error of the measurement in degrees, signed and unwrapped
    pub angle_error: F,
}

/// Runtime estimate of the angle error of a measurement
///
/// Implementors only provide [`Corrector::estimate`]; the checked entry points validate the query
/// and apply the correction.
pub trait Corrector<F: Real> {
    /// Estimated angle error at `measured` degrees
    ///
    /// `measured` must be finite. Any finite angle is accepted and reduced to `[0, 360)` first.
    fn estimate(&self, measured: F) -> F;

    /// # Errors
    /// Returns `NumericDegenerate` if `measured` is not finite.
    fn angle_error(&self, measured: F) -> Result<F> {
        check_finite("measured angle", measured)?;
        Ok(self.estimate(measured))
    }

    /// Correct `measured` and shift it by `zero_degree_offset`
    ///
    /// # Errors
    /// Returns `NumericDegenerate` if `measured` or `zero_degree_offset` is not finite.
    fn correct(&self, measured: F, zero_degree_offset: F) -> Result<CorrectionResult<F>> {
        check_finite("zero degree offset", zero_degree_offset)?;
        let angle_error = self.angle_error(measured)?;
        Ok(CorrectionResult {
            corrected_angle: wrap_degrees(measured - angle_error + zero_degree_offset),
            angle_error,
        })
    }
}

fn check_finite<F: Real>(what: &str, value: F) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::NumericDegenerate(format!("{what} is {value:?}")))
    }
}

/// Constant and slope lookup by direct index, in constant time
///
/// The table must have been built on the uniform knots `i * 360 / len`. The stored angles are
/// ignored, so a table with any other spacing silently gives wrong estimates.
#[derive(Clone, Copy, Debug)]
pub struct UniformIndex<'a, F> {
    table: &'a ConstantSlopeTable<F>,
}

impl<'a, F: Real> UniformIndex<'a, F> {
    pub const fn new(table: &'a ConstantSlopeTable<F>) -> Self {
        Self { table }
    }
}

impl<F: Real> Corrector<F> for UniformIndex<'_, F> {
    fn estimate(&self, measured: F) -> F {
        let measured = wrap_degrees(measured);
        let index = uniform_bucket(measured, self.table.len());
        self.table.segment(index, measured)
    }
}

/// Constant and slope lookup by scanning an ascending, possibly non-uniform, table
///
/// The segment is the last knot which precedes the query under the configured [`Bracket`]. A
/// query preceding every knot belongs to the segment leaving the last knot, which is evaluated a
/// full turn later.
#[derive(Clone, Copy, Debug)]
pub struct LinearSearch<'a, F> {
    table: &'a ConstantSlopeTable<F>,
    bracket: Bracket,
}

impl<'a, F: Real> LinearSearch<'a, F> {
    /// # Errors
    /// Returns `InvalidArgument` if the table angles are not in ascending order.
    pub fn new(table: &'a ConstantSlopeTable<F>, bracket: Bracket) -> Result<Self> {
        if !is_ascending(table.angles()) {
            return Err(Error::InvalidArgument(
                "linear search needs table angles in ascending order".into(),
            ));
        }
        Ok(Self { table, bracket })
    }

    fn bucket(&self, measured: F) -> Option<usize> {
        self.table
            .angles()
            .iter()
            .take_while(|&&knot| self.bracket.precedes(knot, measured))
            .count()
            .checked_sub(1)
    }
}

impl<F: Real> Corrector<F> for LinearSearch<'_, F> {
    fn estimate(&self, measured: F) -> F {
        let measured = wrap_degrees(measured);
        match self.bucket(measured) {
            Some(index) => self.table.segment(index, measured),
            None => self
                .table
                .segment(self.table.len() - 1, measured + full_turn()),
        }
    }
}

/// Linear interpolation between the point samples of a uniform fitted curve table
///
/// The bracketing knots are found by direct index, as in [`UniformIndex`], and the estimate is
/// blended by the fractional position of the query between them. The blended error is not
/// wrapped; only the corrected angle is.
#[derive(Clone, Copy, Debug)]
pub struct FittedCurve<'a, F> {
    table: &'a FittedCurveTable<F>,
}

impl<'a, F: Real> FittedCurve<'a, F> {
    /// # Errors
    /// Returns `InvalidArgument` for tables with fewer than two entries and `DivisionByZero` if
    /// two consecutive knots coincide on the circle.
    pub fn new(table: &'a FittedCurveTable<F>) -> Result<Self> {
        if table.len() < MINIMUM_KNOTS {
            return Err(Error::too_few(
                "fitted curve interpolation",
                MINIMUM_KNOTS,
                table.len(),
            ));
        }
        let angles = table.angles();
        for (index, &angle) in angles.iter().enumerate() {
            let next = angles[(index + 1) % angles.len()];
            if wrap_degrees(next - angle) == F::zero() {
                return Err(Error::DivisionByZero { index });
            }
        }
        Ok(Self { table })
    }
}

/// Fractional position of `measured` along the circular segment from `start` to `end`
pub fn mu<F: Real>(start: F, end: F, measured: F) -> F {
    (measured - start) / wrap_degrees(end - start)
}

/// Blend `start` and `end` by the fraction `mu`
pub fn linear_interpolate<F: Real>(start: F, end: F, mu: F) -> F {
    start * (F::one() - mu) + end * mu
}

impl<F: Real> Corrector<F> for FittedCurve<'_, F> {
    fn estimate(&self, measured: F) -> F {
        let measured = wrap_degrees(measured);
        let size = self.table.len();
        let index = uniform_bucket(measured, size);
        let next = (index + 1) % size;

        let angles = self.table.angles();
        let errors = self.table.errors();
        let fraction = mu(angles[index], angles[next], measured);
        linear_interpolate(errors[index], errors[next], fraction)
    }
}
