use thiserror::Error;

/// Errors raised at the boundary of every public operation
#[derive(Debug, Error)]
pub enum Error {
    /// Empty or undersized inputs, mismatched lengths, unsorted tables
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Two consecutive table knots share an abscissa, so the segment slope is undefined
    #[error("duplicate table angle at index {index}, segment slope is undefined")]
    DivisionByZero { index: usize },
    /// A NaN or infinite value reached the computation
    #[error("numeric degenerate input: {0}")]
    NumericDegenerate(String),
    /// The TOML configuration document could not be parsed
    #[error("failed to parse configuration: {0}")]
    Config(#[from] toml::de::Error),
}

impl Error {
    pub(crate) fn too_few(what: &str, required: usize, available: usize) -> Self {
        Self::InvalidArgument(format!(
            "{what} needs at least {required} entries, got {available}"
        ))
    }

    pub(crate) fn length_mismatch(left: usize, right: usize) -> Self {
        Self::InvalidArgument(format!(
            "{left} reference angles but {right} measured angles"
        ))
    }
}
