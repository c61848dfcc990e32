use std::marker::PhantomData;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::harmonics::{extract, Extraction, HarmonicSet};
use crate::interpolation::LinearSearch;
use crate::math::{full_turn, Real};
use crate::table::{ConstantSlopeTable, FittedCurveTable};
use crate::{Error, Result};

/// A reference angle and the angle the sensor reported for it, both in degrees
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
pub struct AngleSample<F> {
    pub reference: F,
    pub measured: F,
}

impl<F: Real> AngleSample<F> {
    pub const fn new(reference: F, measured: F) -> Self {
        Self {
            reference,
            measured,
        }
    }

    /// Convert raw sensor counts into degrees
    ///
    /// `full_scale` is the count corresponding to a full turn, for example `512` for 9-bit data.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if `full_scale` is not a positive finite number.
    pub fn from_raw(reference: F, measured: F, full_scale: F) -> Result<Self> {
        if !full_scale.is_finite() || full_scale <= F::zero() {
            return Err(Error::InvalidArgument(format!(
                "full scale value {full_scale:?} must be positive"
            )));
        }
        let degrees_per_count = full_turn::<F>() / full_scale;
        Ok(Self::new(
            reference * degrees_per_count,
            measured * degrees_per_count,
        ))
    }
}

/// Number of harmonics written on every row of the calibration curve report
pub const REPORT_HARMONICS: usize = 4;

/// One line of the host's calibration curve report
///
/// Every row repeats the first [`REPORT_HARMONICS`] amplitudes and phases and the number of
/// samples. Orders the calibration did not extract are written as zero.
#[derive(Clone, Copy, Debug, Serialize, PartialEq)]
pub struct ReportRow<F> {
    #[serde(rename = "Reference Angle")]
    pub reference: F,
    #[serde(rename = "Measured Angle")]
    pub measured: F,
    #[serde(rename = "Angle Error")]
    pub error: F,
    #[serde(rename = "Angle Error Fitting")]
    pub fitted: F,
    #[serde(rename = "H1")]
    pub h1: F,
    #[serde(rename = "H2")]
    pub h2: F,
    #[serde(rename = "H3")]
    pub h3: F,
    #[serde(rename = "H4")]
    pub h4: F,
    #[serde(rename = "Ph1")]
    pub ph1: F,
    #[serde(rename = "Ph2")]
    pub ph2: F,
    #[serde(rename = "Ph3")]
    pub ph3: F,
    #[serde(rename = "Ph4")]
    pub ph4: F,
    #[serde(rename = "Number of points")]
    pub points: usize,
}

pub enum Set {}
pub enum Unset {}

/// Collects the samples of a calibration run
///
/// ```
/// use angle_correction::calibration::{AngleSample, CalibrationBuilder};
/// use angle_correction::config::Config;
///
/// let samples = [(0., 1.), (90., 91.), (180., 179.), (270., 271.)]
///     .map(|(reference, measured)| AngleSample::new(reference, measured));
/// let calibration = CalibrationBuilder::new(Config::default())
///     .with_samples(&samples)
///     .build()
///     .unwrap();
///
/// assert_eq!(calibration.harmonics().order(), 4);
/// ```
pub struct CalibrationBuilder<F, S> {
    config: Config,
    reference: Vec<F>,
    measured: Vec<F>,
    phantom_data: PhantomData<S>,
}

impl<F: Real> CalibrationBuilder<F, Unset> {
    pub const fn new(config: Config) -> Self {
        Self {
            config,
            reference: vec![],
            measured: vec![],
            phantom_data: PhantomData,
        }
    }

    pub fn with_samples(self, samples: &[AngleSample<F>]) -> CalibrationBuilder<F, Set> {
        let (reference, measured) = samples
            .iter()
            .map(|sample| (sample.reference, sample.measured))
            .unzip();
        self.with_angles(reference, measured)
    }

    pub fn with_angles(self, reference: Vec<F>, measured: Vec<F>) -> CalibrationBuilder<F, Set> {
        CalibrationBuilder {
            config: self.config,
            reference,
            measured,
            phantom_data: PhantomData,
        }
    }
}

impl<F: Real> CalibrationBuilder<F, Set> {
    /// Extract the error series and harmonics of the collected samples
    ///
    /// # Errors
    /// Propagates the validation errors of [`extract`].
    pub fn build(self) -> Result<Calibration<F>> {
        log::info!("calibrating from {} samples", self.reference.len());
        let extraction = extract(&self.reference, &self.measured, &self.config)?;
        Ok(Calibration {
            config: self.config,
            reference: self.reference,
            measured: self.measured,
            extraction,
        })
    }
}

/// The error model of one calibration run
pub struct Calibration<F> {
    config: Config,
    reference: Vec<F>,
    measured: Vec<F>,
    extraction: Extraction<F>,
}

impl<F: Real> Calibration<F> {
    pub const fn config(&self) -> &Config {
        &self.config
    }

    pub const fn harmonics(&self) -> &HarmonicSet<F> {
        &self.extraction.harmonics
    }

    /// The zero-mean error series, one entry per sample
    pub const fn errors(&self) -> &Array1<F> {
        &self.extraction.errors
    }

    pub const fn jump_corrected(&self) -> bool {
        self.extraction.jump_corrected
    }

    pub fn samples(&self) -> impl Iterator<Item = AngleSample<F>> + '_ {
        self.reference
            .iter()
            .zip(&self.measured)
            .map(|(&reference, &measured)| AngleSample::new(reference, measured))
    }

    /// # Errors
    /// Returns `InvalidArgument` if `size` is zero.
    pub fn fitted_curve(&self, size: usize) -> Result<FittedCurveTable<F>> {
        FittedCurveTable::uniform(size, self.harmonics())
    }

    /// # Errors
    /// Returns `InvalidArgument` if `size` is less than two.
    pub fn constant_slope(&self, size: usize) -> Result<ConstantSlopeTable<F>> {
        ConstantSlopeTable::uniform(size, self.harmonics())
    }

    /// The fitted curve sampled at the measured angles of the run
    ///
    /// # Errors
    /// Returns `NumericDegenerate` if a measured angle is not finite.
    pub fn fitted_curve_at_measured(&self) -> Result<FittedCurveTable<F>> {
        FittedCurveTable::synthesize(&self.measured, self.harmonics())
    }

    /// Constant and slope segments with knots at the measured angles of the run
    ///
    /// # Errors
    /// Returns `DivisionByZero` if two consecutive measured angles coincide.
    pub fn constant_slope_at_measured(&self) -> Result<ConstantSlopeTable<F>> {
        ConstantSlopeTable::synthesize(&self.measured, self.harmonics())
    }

    /// A linear-search corrector over `table` using the configured bracket
    ///
    /// # Errors
    /// Returns `InvalidArgument` if the table angles are not ascending.
    pub fn linear_search<'a>(
        &self,
        table: &'a ConstantSlopeTable<F>,
    ) -> Result<LinearSearch<'a, F>> {
        LinearSearch::new(table, self.config.bracket)
    }

    pub fn zero_degree_offset(&self) -> F {
        self.config.zero_degree_offset()
    }

    /// Per-sample rows of the calibration report, with the fitted error at each measured angle
    pub fn report(&self) -> Vec<ReportRow<F>> {
        let harmonics = self.harmonics();
        let mut amplitudes = [F::zero(); REPORT_HARMONICS];
        let mut phases = [F::zero(); REPORT_HARMONICS];
        for (ii, harmonic) in harmonics
            .harmonics()
            .iter()
            .take(REPORT_HARMONICS)
            .enumerate()
        {
            amplitudes[ii] = harmonic.amplitude;
            phases[ii] = harmonic.phase;
        }
        let [h1, h2, h3, h4] = amplitudes;
        let [ph1, ph2, ph3, ph4] = phases;
        let points = self.reference.len();

        self.samples()
            .zip(self.errors())
            .map(|(sample, &error)| ReportRow {
                reference: sample.reference,
                measured: sample.measured,
                error,
                fitted: harmonics.evaluate(sample.measured),
                h1,
                h2,
                h3,
                h4,
                ph1,
                ph2,
                ph3,
                ph4,
                points,
            })
            .collect()
    }
}
