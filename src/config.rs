use serde::{Deserialize, Serialize};

use crate::math::{cast, Real};
use crate::{Error, Result};

/// Number of harmonics extracted unless configured otherwise
pub const DEFAULT_HARMONIC_ORDER: usize = 4;

/// Comparison used by the linear search to decide whether a table knot precedes the query
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Bracket {
    /// A knot at exactly the query angle owns the query: `angle[i] <= x`
    #[default]
    Inclusive,
    /// A knot at exactly the query angle belongs to the following segment: `angle[i] < x`
    Exclusive,
}

impl Bracket {
    pub(crate) fn precedes<F: PartialOrd>(self, knot: F, query: F) -> bool {
        match self {
            Self::Inclusive => knot <= query,
            Self::Exclusive => knot < query,
        }
    }
}

/// Options for a calibration run and for runtime correction
///
/// Every field has a default, so a partial TOML document is accepted:
///
/// ```toml
/// harmonic_order = 4
/// jump_correction = true
/// bracket = "inclusive"
/// zero_degree_offset = 0.0
/// ```
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Highest harmonic extracted from the error series
    pub harmonic_order: usize,
    /// Shift the error series by half a turn when it straddles the 0/360 boundary
    pub jump_correction: bool,
    /// Boundary comparison for the linear-search interpolator
    pub bracket: Bracket,
    /// Added to every corrected angle to align the logical zero with the physical zero
    pub zero_degree_offset: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            harmonic_order: DEFAULT_HARMONIC_ORDER,
            jump_correction: true,
            bracket: Bracket::default(),
            zero_degree_offset: 0.,
        }
    }
}

impl Config {
    /// Parse and validate a configuration from a TOML document
    ///
    /// # Errors
    /// Returns an error if the document is malformed or fails [`Config::validate`].
    pub fn from_toml(document: &str) -> Result<Self> {
        let config: Self = toml::from_str(document)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// Returns `InvalidArgument` for a zero harmonic order and `NumericDegenerate` for a
    /// non-finite zero degree offset.
    pub fn validate(&self) -> Result<()> {
        if self.harmonic_order == 0 {
            return Err(Error::InvalidArgument(
                "harmonic order must be at least one".into(),
            ));
        }
        if !self.zero_degree_offset.is_finite() {
            return Err(Error::NumericDegenerate(format!(
                "zero degree offset {} is not finite",
                self.zero_degree_offset
            )));
        }
        Ok(())
    }

    /// The zero degree offset in the working float type
    pub fn zero_degree_offset<F: Real>(&self) -> F {
        cast(self.zero_degree_offset)
    }
}
