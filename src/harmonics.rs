use itertools::Itertools;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::math::{cast, full_turn, harmonic_basis, wrap, wrap_degrees, Real};
use crate::{Error, Result};

/// Fewest samples from which an error series can be extracted
pub const MINIMUM_SAMPLES: usize = 2;

/// A single sinusoidal component of the periodic angle error
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
pub struct Harmonic<F> {
    /// Cycles per revolution
    pub order: usize,
    /// Amplitude in degrees, never negative
    pub amplitude: F,
    /// Phase in radians, in `(-π, π]`
    pub phase: F,
}

impl<F: Real> Harmonic<F> {
    /// Contribution of this harmonic at `radians`
    pub fn evaluate(&self, radians: F) -> F {
        self.amplitude * (cast::<F, _>(self.order) * radians - self.phase).cos()
    }
}

/// The harmonics of orders `1..=len` describing one calibration run
///
/// Serialises as a sequence of harmonics; reload with [`HarmonicSet::from_components`].
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(transparent)]
pub struct HarmonicSet<F>(Vec<Harmonic<F>>);

impl<F: Real> HarmonicSet<F> {
    /// Build a set from `(amplitude, phase)` pairs, the first pair being order one
    ///
    /// # Errors
    /// Returns `InvalidArgument` if `components` is empty or an amplitude is negative, and
    /// `NumericDegenerate` if any value is not finite.
    pub fn from_components(components: &[(F, F)]) -> Result<Self> {
        if components.is_empty() {
            return Err(Error::too_few("harmonic set", 1, 0));
        }
        let mut harmonics = Vec::with_capacity(components.len());
        for (ii, &(amplitude, phase)) in components.iter().enumerate() {
            if !amplitude.is_finite() || !phase.is_finite() {
                return Err(Error::NumericDegenerate(format!(
                    "harmonic {} has amplitude {amplitude:?} and phase {phase:?}",
                    ii + 1
                )));
            }
            if amplitude < F::zero() {
                return Err(Error::InvalidArgument(format!(
                    "harmonic {} has negative amplitude {amplitude:?}",
                    ii + 1
                )));
            }
            harmonics.push(Harmonic {
                order: ii + 1,
                amplitude,
                phase: normalise_phase(phase),
            });
        }
        Ok(Self(harmonics))
    }

    pub fn harmonics(&self) -> &[Harmonic<F>] {
        &self.0
    }

    /// The highest harmonic order in the set
    pub fn order(&self) -> usize {
        self.0.len()
    }

    pub fn amplitudes(&self) -> Vec<F> {
        self.0.iter().map(|harmonic| harmonic.amplitude).collect()
    }

    pub fn phases(&self) -> Vec<F> {
        self.0.iter().map(|harmonic| harmonic.phase).collect()
    }

    /// The synthesized angle error, in degrees, at an angle given in degrees
    pub fn evaluate(&self, degrees: F) -> F {
        let radians = degrees.to_radians();
        self.0
            .iter()
            .map(|harmonic| harmonic.evaluate(radians))
            .fold(F::zero(), |a, b| a + b)
    }
}

/// The zero-mean error series of a calibration run and its harmonic decomposition
#[derive(Clone, Debug)]
pub struct Extraction<F> {
    pub errors: Array1<F>,
    pub harmonics: HarmonicSet<F>,
    /// Whether the series was shifted by half a turn to remove a wraparound jump
    pub jump_corrected: bool,
}

/// Extract the angle error series and its first `config.harmonic_order` harmonics
///
/// The error at each sample is `wrap(measured - reference, 360)`. When jump correction is
/// enabled and consecutive errors (taken circularly) differ by more than half a turn, every error
/// is shifted by half a turn before the mean is removed.
///
/// # Errors
/// Returns `InvalidArgument` if the slices differ in length, hold fewer than
/// [`MINIMUM_SAMPLES`] samples or the configuration is invalid, and `NumericDegenerate` if any
/// angle is not finite.
pub fn extract<F: Real>(
    reference: &[F],
    measured: &[F],
    config: &Config,
) -> Result<Extraction<F>> {
    config.validate()?;
    if reference.len() != measured.len() {
        return Err(Error::length_mismatch(reference.len(), measured.len()));
    }
    let n = reference.len();
    if n < MINIMUM_SAMPLES {
        return Err(Error::too_few("calibration run", MINIMUM_SAMPLES, n));
    }

    let mut errors: Array1<F> = reference
        .iter()
        .zip(measured)
        .map(|(&reference, &measured)| wrap_degrees(measured - reference))
        .collect();
    if let Some(position) = errors.iter().position(|error| !error.is_finite()) {
        return Err(Error::NumericDegenerate(format!(
            "sample {position} has reference {:?} and measured {:?}",
            reference[position], measured[position]
        )));
    }

    let half_turn = full_turn::<F>() / cast(2);
    let jump_corrected = config.jump_correction && has_jump(&errors, half_turn);
    if jump_corrected {
        log::warn!("angle error wraps across 0/360, shifting the series by half a turn");
        errors.mapv_inplace(|error| wrap_degrees(error + half_turn));
    }

    let mean = errors.sum() / cast(n);
    errors.mapv_inplace(|error| error - mean);

    let tolerance = rounding_floor(reference, measured);
    let harmonics = HarmonicSet(
        (1..=config.harmonic_order)
            .map(|order| project(&errors, order, tolerance))
            .collect(),
    );
    log::debug!(
        "extracted {} harmonics from {n} samples, mean error {mean:?}, amplitudes {:?}",
        harmonics.order(),
        harmonics.amplitudes()
    );

    Ok(Extraction {
        errors,
        harmonics,
        jump_corrected,
    })
}

fn has_jump<F: Real>(errors: &Array1<F>, half_turn: F) -> bool {
    errors
        .iter()
        .circular_tuple_windows::<(&F, &F)>()
        .any(|(previous, next): (&F, &F)| (*next - *previous).abs() > half_turn)
}

/// Largest amplitude that rounding alone can leave in the projection of a constant series
///
/// Each wrapped error carries a few ulps of the largest input angle, and projecting onto a
/// harmonic at most doubles that.
fn rounding_floor<F: Real>(reference: &[F], measured: &[F]) -> F {
    let magnitude = reference
        .iter()
        .chain(measured)
        .fold(full_turn::<F>(), |largest, angle| largest.max(angle.abs()));
    F::epsilon() * magnitude * cast(8)
}

/// Project a zero-mean series onto the harmonic of `order`
///
/// Harmonics no larger than `tolerance` are reported with zero amplitude and zero phase.
fn project<F: Real>(errors: &Array1<F>, order: usize, tolerance: F) -> Harmonic<F> {
    let n = errors.len();
    let sums = harmonic_basis::<F>(n, order).t().dot(errors);
    let scale = cast::<F, _>(2) / cast(n);
    let x = sums[0] * scale;
    let y = sums[1] * scale;

    // The phase of rounding residue is arbitrary, so a vanishing harmonic gets a fixed one
    let (amplitude, phase) = if x.hypot(y) <= tolerance {
        (F::zero(), F::zero())
    } else {
        (x.hypot(y), normalise_phase(y.atan2(x)))
    };
    log::trace!("harmonic {order}: amplitude {amplitude:?}, phase {phase:?}");

    Harmonic {
        order,
        amplitude,
        phase,
    }
}

/// Map a phase in radians into `(-π, π]`
fn normalise_phase<F: Real>(phase: F) -> F {
    let shifted = wrap(phase + F::PI(), F::TAU()) - F::PI();
    if shifted <= -F::PI() {
        shifted + F::TAU()
    } else {
        shifted
    }
}

#[cfg(test)]
mod test {
    use std::f64::consts::PI;

    use ndarray_rand::rand::{Rng, SeedableRng};
    use rand_isaac::Isaac64Rng;

    use super::{extract, normalise_phase, HarmonicSet};
    use crate::config::Config;
    use crate::math::wrap_degrees;
    use crate::Error;

    const REFERENCE: [f64; 4] = [0., 90., 180., 270.];
    const MEASURED: [f64; 4] = [1., 91., 179., 271.];

    #[test]
    fn quarter_turn_samples_match_regression_baseline() {
        let extraction = extract(&REFERENCE, &MEASURED, &Config::default()).unwrap();

        // [1, 1, -1, 1] with mean 0.5 removed
        assert!(extraction.jump_corrected);
        for (calculated, expected) in extraction.errors.iter().zip([0.5, 0.5, -1.5, 0.5]) {
            approx::assert_abs_diff_eq!(*calculated, expected, epsilon = 1e-9);
        }

        let amplitudes = extraction.harmonics.amplitudes();
        for (calculated, expected) in amplitudes.iter().zip([1., 1., 1., 0.]) {
            approx::assert_abs_diff_eq!(*calculated, expected, epsilon = 1e-9);
        }
        let phases = extraction.harmonics.phases();
        approx::assert_abs_diff_eq!(phases[0], 0., epsilon = 1e-9);
        approx::assert_abs_diff_eq!(phases[2], 0., epsilon = 1e-9);
        approx::assert_abs_diff_eq!(phases[1].abs(), PI, epsilon = 1e-9);
    }

    #[test]
    fn disabled_jump_correction_keeps_the_raw_wrapped_series() {
        let config = Config {
            jump_correction: false,
            ..Config::default()
        };
        let extraction = extract(&REFERENCE, &MEASURED, &config).unwrap();

        assert!(!extraction.jump_corrected);
        for (calculated, expected) in extraction.errors.iter().zip([-89.5, -89.5, 268.5, -89.5]) {
            approx::assert_abs_diff_eq!(*calculated, expected, epsilon = 1e-9);
        }
    }

    #[test]
    fn single_sample_is_rejected() {
        let result = extract(&[10.0_f64], &[11.], &Config::default());
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn empty_and_mismatched_inputs_are_rejected() {
        let empty: [f64; 0] = [];
        assert!(matches!(
            extract(&empty, &empty, &Config::default()),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            extract(&REFERENCE, &MEASURED[..3], &Config::default()),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn non_finite_samples_are_numeric_degenerate() {
        let measured = [1., f64::NAN, 179., 271.];
        let result = extract(&REFERENCE, &measured, &Config::default());
        assert!(matches!(result, Err(Error::NumericDegenerate(_))));
    }

    #[test]
    fn error_free_samples_give_zero_amplitude_and_zero_phase() {
        let extraction = extract(&REFERENCE, &REFERENCE, &Config::default()).unwrap();

        assert!(!extraction.jump_corrected);
        for harmonic in extraction.harmonics.harmonics() {
            assert_eq!(harmonic.amplitude, 0.);
            assert_eq!(harmonic.phase, 0.);
        }
    }

    #[test]
    fn constant_offset_gives_zero_amplitude_and_zero_phase() {
        for n in [5_i32, 7, 10, 13, 32] {
            let reference = (0..n)
                .map(|ii| f64::from(ii) * 360. / f64::from(n))
                .collect::<Vec<_>>();
            let measured = reference.iter().map(|angle| angle + 0.1).collect::<Vec<_>>();

            let extraction = extract(&reference, &measured, &Config::default()).unwrap();

            assert!(!extraction.jump_corrected);
            for harmonic in extraction.harmonics.harmonics() {
                assert_eq!(harmonic.amplitude, 0., "order {} of {n}", harmonic.order);
                assert_eq!(harmonic.phase, 0., "order {} of {n}", harmonic.order);
            }
        }
    }

    #[test]
    fn harmonic_order_is_configurable() {
        let config = Config {
            harmonic_order: 6,
            ..Config::default()
        };
        let reference = (0..32_i32).map(|ii| f64::from(ii) * 11.25).collect::<Vec<_>>();
        let measured = reference.iter().map(|r| r + 0.5).collect::<Vec<_>>();

        let extraction = extract(&reference, &measured, &config).unwrap();

        assert_eq!(extraction.harmonics.order(), 6);
        let orders = extraction
            .harmonics
            .harmonics()
            .iter()
            .map(|harmonic| harmonic.order)
            .collect::<Vec<_>>();
        assert_eq!(orders, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn synthesized_curve_is_recovered_by_extraction() {
        let seed = 40;
        let mut rng = Isaac64Rng::seed_from_u64(seed);
        let n = rng.gen_range(32..256);

        let components = (0..4)
            .map(|_| (rng.gen_range(0.05..0.5), rng.gen_range(-3.0..3.0)))
            .collect::<Vec<(f64, f64)>>();
        let harmonics = HarmonicSet::from_components(&components).unwrap();

        let reference = (0..n)
            .map(|ii| ii as f64 * 360. / n as f64)
            .collect::<Vec<_>>();
        let measured = reference
            .iter()
            .map(|&r| wrap_degrees(r + harmonics.evaluate(r)))
            .collect::<Vec<_>>();

        let extraction = extract(&reference, &measured, &Config::default()).unwrap();

        for (expected, calculated) in harmonics
            .harmonics()
            .iter()
            .zip(extraction.harmonics.harmonics())
        {
            assert_eq!(expected.order, calculated.order);
            approx::assert_abs_diff_eq!(expected.amplitude, calculated.amplitude, epsilon = 1e-3);
            approx::assert_abs_diff_eq!(expected.phase, calculated.phase, epsilon = 1e-3);
        }
    }

    #[test]
    fn extraction_runs_in_single_precision() {
        let reference = REFERENCE.map(|r| r as f32);
        let measured = MEASURED.map(|m| m as f32);

        let extraction = extract(&reference, &measured, &Config::default()).unwrap();

        approx::assert_abs_diff_eq!(extraction.harmonics.amplitudes()[0], 1., epsilon = 1e-4);
    }

    #[test]
    fn negative_amplitudes_are_rejected() {
        let result = HarmonicSet::from_components(&[(0.1, 0.), (-0.1, 0.)]);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn phases_are_normalised_into_half_open_interval() {
        approx::assert_relative_eq!(normalise_phase(-PI), PI);
        approx::assert_relative_eq!(normalise_phase(PI), PI);
        approx::assert_relative_eq!(normalise_phase(3. * PI / 2.), -PI / 2.);
        approx::assert_abs_diff_eq!(normalise_phase(0.0_f64), 0.);
    }
}
