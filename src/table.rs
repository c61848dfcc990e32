use itertools::Itertools;
use serde::Serialize;

use crate::harmonics::HarmonicSet;
use crate::math::{uniform_angle, wrap_degrees, Real};
use crate::{Error, Result};

/// Fewest knots a piecewise-linear table can be built from
pub const MINIMUM_KNOTS: usize = 2;

/// The `size` evenly spaced angles `i * 360 / size` implied by a uniform table
///
/// # Errors
/// Returns `InvalidArgument` if `size` is zero.
pub fn uniform_angles<F: Real>(size: usize) -> Result<Vec<F>> {
    if size == 0 {
        return Err(Error::too_few("lookup table", 1, 0));
    }
    Ok((0..size).map(|ii| uniform_angle(ii, size)).collect())
}

pub(crate) fn is_ascending<F: Real>(angles: &[F]) -> bool {
    angles
        .iter()
        .tuple_windows()
        .all(|(a, b): (&F, &F)| a <= b)
}

fn check_finite<F: Real>(what: &str, values: &[F]) -> Result<()> {
    match values.iter().position(|value| !value.is_finite()) {
        Some(index) => Err(Error::NumericDegenerate(format!(
            "{what} entry {index} is {:?}",
            values[index]
        ))),
        None => Ok(()),
    }
}

/// Point samples of the synthesized error curve: `angle[i] -> error[i]`
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct FittedCurveTable<F> {
    angles: Vec<F>,
    errors: Vec<F>,
}

impl<F: Real> FittedCurveTable<F> {
    /// Sample the curve described by `harmonics` at each of `angles` (in degrees)
    ///
    /// # Errors
    /// Returns `InvalidArgument` if `angles` is empty and `NumericDegenerate` if an angle is not
    /// finite.
    pub fn synthesize(angles: &[F], harmonics: &HarmonicSet<F>) -> Result<Self> {
        if angles.is_empty() {
            return Err(Error::too_few("lookup table", 1, 0));
        }
        check_finite("angle", angles)?;

        let errors = angles
            .iter()
            .map(|&angle| harmonics.evaluate(angle))
            .collect();
        log::debug!("synthesized {}-entry fitted curve table", angles.len());

        Ok(Self {
            angles: angles.to_vec(),
            errors,
        })
    }

    /// Sample the curve at `size` evenly spaced angles
    ///
    /// # Errors
    /// Returns `InvalidArgument` if `size` is zero.
    pub fn uniform(size: usize, harmonics: &HarmonicSet<F>) -> Result<Self> {
        Self::synthesize(&uniform_angles(size)?, harmonics)
    }

    /// Rebuild a table from previously stored columns
    ///
    /// # Errors
    /// Returns `InvalidArgument` if the columns are empty or differ in length and
    /// `NumericDegenerate` if any entry is not finite.
    pub fn from_parts(angles: Vec<F>, errors: Vec<F>) -> Result<Self> {
        if angles.len() != errors.len() {
            return Err(Error::InvalidArgument(format!(
                "{} table angles but {} error values",
                angles.len(),
                errors.len()
            )));
        }
        if angles.is_empty() {
            return Err(Error::too_few("lookup table", 1, 0));
        }
        check_finite("angle", &angles)?;
        check_finite("error", &errors)?;
        Ok(Self { angles, errors })
    }

    pub fn angles(&self) -> &[F] {
        &self.angles
    }

    pub fn errors(&self) -> &[F] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.angles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.angles.is_empty()
    }
}

/// Piecewise-linear segments of the error curve: `angle[i] -> (constant[i], slope[i])`
///
/// Segment `i` runs from `angle[i]` to the circularly next knot, and within it the error is
/// approximately `constant[i] + slope[i] * x`. For the last segment of an ascending table, `x`
/// is measured past 360 so the line stays continuous across zero.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ConstantSlopeTable<F> {
    angles: Vec<F>,
    constants: Vec<F>,
    slopes: Vec<F>,
}

impl<F: Real> ConstantSlopeTable<F> {
    /// Derive the segment coefficients of the curve described by `harmonics` with knots at
    /// `angles` (in degrees)
    ///
    /// # Errors
    /// Returns `InvalidArgument` for fewer than [`MINIMUM_KNOTS`] angles, `DivisionByZero` if two
    /// consecutive knots coincide on the circle and `NumericDegenerate` if an angle is not
    /// finite.
    pub fn synthesize(angles: &[F], harmonics: &HarmonicSet<F>) -> Result<Self> {
        if angles.len() < MINIMUM_KNOTS {
            return Err(Error::too_few(
                "constant and slope table",
                MINIMUM_KNOTS,
                angles.len(),
            ));
        }
        Self::from_fitted_curve(&FittedCurveTable::synthesize(angles, harmonics)?)
    }

    /// Derive segment coefficients for `size` evenly spaced knots
    ///
    /// # Errors
    /// Returns `InvalidArgument` if `size` is less than [`MINIMUM_KNOTS`].
    pub fn uniform(size: usize, harmonics: &HarmonicSet<F>) -> Result<Self> {
        if size < MINIMUM_KNOTS {
            return Err(Error::too_few("constant and slope table", MINIMUM_KNOTS, size));
        }
        Self::synthesize(&uniform_angles(size)?, harmonics)
    }

    /// Join consecutive points of a fitted curve with straight segments
    ///
    /// The run of each segment is the angular distance to the next knot, so the segment leaving
    /// the last knot climbs through 360 to the first knot rather than running backwards.
    ///
    /// # Errors
    /// Returns `InvalidArgument` for fewer than [`MINIMUM_KNOTS`] points and `DivisionByZero` if
    /// two consecutive knots coincide on the circle.
    pub fn from_fitted_curve(curve: &FittedCurveTable<F>) -> Result<Self> {
        if curve.len() < MINIMUM_KNOTS {
            return Err(Error::too_few(
                "constant and slope table",
                MINIMUM_KNOTS,
                curve.len(),
            ));
        }

        let mut constants = Vec::with_capacity(curve.len());
        let mut slopes = Vec::with_capacity(curve.len());
        for (index, ((&angle, &error), (&next_angle, &next_error))) in curve
            .angles
            .iter()
            .zip(&curve.errors)
            .circular_tuple_windows::<((&F, &F), (&F, &F))>()
            .enumerate()
        {
            let run = wrap_degrees(next_angle - angle);
            if run == F::zero() {
                return Err(Error::DivisionByZero { index });
            }
            let slope = (next_error - error) / run;
            slopes.push(slope);
            constants.push(error - slope * angle);
        }
        log::debug!("derived {} constant and slope segments", slopes.len());

        Ok(Self {
            angles: curve.angles.clone(),
            constants,
            slopes,
        })
    }

    /// Rebuild a table from previously stored columns
    ///
    /// # Errors
    /// Returns `InvalidArgument` if the columns differ in length or hold fewer than
    /// [`MINIMUM_KNOTS`] entries and `NumericDegenerate` if any entry is not finite.
    pub fn from_parts(angles: Vec<F>, constants: Vec<F>, slopes: Vec<F>) -> Result<Self> {
        if angles.len() != constants.len() || angles.len() != slopes.len() {
            return Err(Error::InvalidArgument(format!(
                "table columns differ in length: {} angles, {} constants, {} slopes",
                angles.len(),
                constants.len(),
                slopes.len()
            )));
        }
        if angles.len() < MINIMUM_KNOTS {
            return Err(Error::too_few(
                "constant and slope table",
                MINIMUM_KNOTS,
                angles.len(),
            ));
        }
        check_finite("angle", &angles)?;
        check_finite("constant", &constants)?;
        check_finite("slope", &slopes)?;
        Ok(Self {
            angles,
            constants,
            slopes,
        })
    }

    /// Error estimate of segment `index` at `x` degrees
    pub(crate) fn segment(&self, index: usize, x: F) -> F {
        self.constants[index] + self.slopes[index] * x
    }

    pub fn angles(&self) -> &[F] {
        &self.angles
    }

    pub fn constants(&self) -> &[F] {
        &self.constants
    }

    pub fn slopes(&self) -> &[F] {
        &self.slopes
    }

    pub fn len(&self) -> usize {
        self.angles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.angles.is_empty()
    }
}
