//! Errors for the conditional mixture model.
//!
//! [`MCBMError`] covers invalid construction arguments, data batches that do
//! not match the model, malformed parameter or gradient buffers, and errors
//! raised by the optimizer. Optimizer errors are wrapped unchanged; going the
//! other way, model errors raised inside an objective become
//! [`OptError::Model`] so they can travel through `argmin`.
use crate::optimization::errors::OptError;
use ndarray::ShapeError;
use thiserror::Error;

/// Result alias for conditional mixture operations.
pub type MCBMResult<T> = Result<T, MCBMError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MCBMError {
    // ---- Construction ----
    /// Number of experts must be positive.
    #[error("Invalid number of components {value}: must be > 0")]
    InvalidNumComponents { value: usize },

    /// Number of features must be positive.
    #[error("Invalid number of features {value}: must be > 0")]
    InvalidNumFeatures { value: usize },

    // ---- Data ----
    /// Input row count differs from the model's input dimensionality.
    #[error("Input has wrong dimensionality: expected {expected} rows, found {found}")]
    InputDimMismatch { expected: usize, found: usize },

    /// Output must be a single row of bits.
    #[error("Output has wrong dimensionality: expected {expected} rows, found {found}")]
    OutputDimMismatch { expected: usize, found: usize },

    /// Inputs and outputs must have the same number of columns.
    #[error("Number of inputs ({inputs}) and outputs ({outputs}) should be the same")]
    SampleCountMismatch { inputs: usize, outputs: usize },

    /// Training data needs at least one column.
    #[error("Data batch is empty")]
    EmptyData,

    /// Input entries must be finite.
    #[error("Invalid input at ({row}, {col}): {value}, must be finite")]
    InvalidInput { row: usize, col: usize, value: f64 },

    /// Output entries must be exactly 0 or 1.
    #[error("Invalid output at column {index}: {value}, must be 0 or 1")]
    InvalidOutput { index: usize, value: f64 },

    // ---- Parameters ----
    /// A parameter array has the wrong shape for this model.
    #[error("Invalid shape for '{name}': expected {expected:?}, found {found:?}")]
    ShapeMismatch { name: &'static str, expected: Vec<usize>, found: Vec<usize> },

    /// Feature weights scale squared projections and must stay non-negative.
    #[error("Invalid weight at ({row}, {col}): {value}, must be finite and >= 0")]
    NegativeWeight { row: usize, col: usize, value: f64 },

    /// Flattened parameter vector does not match the trainable layout.
    #[error("Parameter vector has length {found}, expected {expected}")]
    ParameterLengthMismatch { expected: usize, found: usize },

    /// Gradient buffer does not match the trainable layout.
    #[error("Gradient buffer has length {found}, expected {expected}")]
    GradientLengthMismatch { expected: usize, found: usize },

    /// Invalid training parameter value.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParam { name: &'static str, reason: &'static str },

    /// Finite-difference step for the gradient check.
    #[error("Invalid epsilon {value}: must be finite and > 0")]
    InvalidEpsilon { value: f64 },

    /// Buffer could not be viewed with the expected shape.
    #[error("Shape error: {text}")]
    Shape { text: String },

    // ---- Optimizer ----
    #[error("Optimization failed: {0}")]
    Optimization(#[from] OptError),
}

impl From<ShapeError> for MCBMError {
    fn from(err: ShapeError) -> Self {
        MCBMError::Shape { text: err.to_string() }
    }
}

impl From<MCBMError> for OptError {
    fn from(err: MCBMError) -> Self {
        match err {
            MCBMError::Optimization(inner) => inner,
            other => OptError::Model { text: other.to_string() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Errors crossing the optimizer boundary must not lose information.
    //
    // Given
    // -----
    // - A wrapped `OptError` and a plain model error.
    //
    // Expect
    // ------
    // - The wrapped error is unwrapped to its original variant; the model
    //   error becomes `OptError::Model` carrying its message.
    fn conversion_into_opt_error() {
        let wrapped = MCBMError::Optimization(OptError::NoTolerancesProvided);
        assert_eq!(OptError::from(wrapped), OptError::NoTolerancesProvided);

        let model = MCBMError::EmptyData;
        assert_eq!(OptError::from(model), OptError::Model { text: "Data batch is empty".into() });
    }

    #[test]
    fn shape_error_is_captured_as_text() {
        let err = ndarray::Array2::<f64>::from_shape_vec((2, 2), vec![1.0]).unwrap_err();
        assert!(matches!(MCBMError::from(err), MCBMError::Shape { .. }));
    }
}
