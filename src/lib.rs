#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
// #![warn(clippy::cargo)]

//! Harmonic angle error models for angle sensor calibration
//!
//! A calibration run pairs reference angles with the angles a sensor reported. The error series
//! is decomposed into its first few harmonics ([`harmonics`]), the harmonics are compressed into
//! a lookup table ([`table`]) and the table is used on the device to correct readings
//! ([`interpolation`]). Every operation is a pure function of its inputs and performs no I/O.

pub mod calibration;
pub mod config;
mod error;
pub mod harmonics;
pub mod interpolation;
pub mod math;
pub mod table;

pub use calibration::{AngleSample, Calibration, CalibrationBuilder};
pub use config::{Bracket, Config};
pub use error::Error;
pub use harmonics::{extract, Extraction, Harmonic, HarmonicSet};
pub use interpolation::{CorrectionResult, Corrector, FittedCurve, LinearSearch, UniformIndex};
pub use table::{uniform_angles, ConstantSlopeTable, FittedCurveTable};

pub type Result<T> = ::std::result::Result<T, Error>;
