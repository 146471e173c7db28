//! optimization::errors: unified error surface for the optimizer layer.
//!
//! Optimizer configuration problems, gradient validation failures, argmin
//! backend errors and model failures raised from inside an objective all
//! normalize into [`OptError`]. Model crates convert their own error enums
//! into [`OptError::Model`] so the adapter can pass them through argmin and
//! recover them afterwards.
use argmin::core::{ArgminError, Error as BackendError};
use thiserror::Error;

/// Crate-wide result alias for optimizer operations.
pub type OptResult<T> = Result<T, OptError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptError {
    // ---- Gradient ----
    /// Implies that FD should be used
    #[error("Gradient optimization not implemented")]
    GradientNotImplemented,

    /// Gradient dimensions do not match parameter dimensions.
    #[error("Gradient dimension mismatch: expected {expected}, found {found}")]
    GradientDimMismatch { expected: usize, found: usize },

    /// Gradient elements need to be finite
    #[error("Invalid gradient at index {index}: {value}: {reason}")]
    InvalidGradient { index: usize, value: f64, reason: &'static str },

    /// Finite-difference step must be finite and > 0.
    #[error("Invalid finite-difference step {step}: {reason}")]
    InvalidStep { step: f64, reason: &'static str },

    // ---- MLEOptions ----
    /// Gradient tolerance needs to be positive and finite.
    #[error("Invalid gradient tolerance {tol}: {reason}")]
    InvalidTolGrad { tol: f64, reason: &'static str },

    /// Cost change tolerance needs to be positive and finite.
    #[error("Invalid cost function change tolerance {tol}: {reason}")]
    InvalidTolCost { tol: f64, reason: &'static str },

    /// Maximum iterations needs to be positive.
    #[error("Invalid maximum iterations {max_iter}: {reason}")]
    InvalidMaxIter { max_iter: usize, reason: &'static str },

    /// At least one tolerance must be provided.
    #[error("No tolerances provided")]
    NoTolerancesProvided,

    /// Invalid line searcher name.
    #[error("Invalid line searcher '{name}': {reason}")]
    InvalidLineSearch { name: String, reason: &'static str },

    /// lbfgs_mem needs to be at least 1.
    #[error("Invalid L-BFGS memory {mem}: {reason}")]
    InvalidLBFGSMem { mem: usize, reason: &'static str },

    // ---- Cost function ----
    /// Cost function returned a non-finite value.
    #[error("Non-finite cost value: {value}")]
    NonFiniteCost { value: f64 },

    /// Parameter vectors handed to the optimizer must be finite.
    #[error("Invalid parameter at index {index}: {value}, must be finite")]
    InvalidTheta { index: usize, value: f64 },

    /// Parameter vector handed to the objective is not contiguous.
    #[error("Parameter vector must be stored contiguously")]
    NonContiguousTheta,

    // ---- Optimizer outcome ----
    /// Estimated parameters must be finite.
    #[error("Invalid estimated parameter at index {index}: {value}: {reason}")]
    InvalidThetaHat { index: usize, value: f64, reason: &'static str },

    /// Theta hat is missing
    #[error("Missing estimated parameters (theta hat)")]
    MissingThetaHat,

    // ---- Argmin ---
    /// Wrapper for argmin::InvalidParameter
    #[error("Invalid parameter: {text}")]
    InvalidParameter { text: String },
    /// Wrapper for argmin::NotImplemented
    #[error("Not implemented: {text}")]
    NotImplemented { text: String },
    /// Wrapper for argmin::NotInitialized
    #[error("Not initialized: {text}")]
    NotInitialized { text: String },
    /// Wrapper for argmin::ConditionViolated
    #[error("Condition violated: {text}")]
    ConditionViolated { text: String },
    /// Wrapper for argmin::CheckPointNotFound
    #[error("Checkpoint not found: {text}")]
    CheckPointNotFound { text: String },
    /// Wrapper for argmin::PotentialBug
    #[error("Potential bug: {text}")]
    PotentialBug { text: String },
    /// Wrapper for argmin::ImpossibleError
    #[error("Impossible error: {text}")]
    ImpossibleError { text: String },
    /// Wrapper for other argmin::Error types
    #[error("Backend error: {text}")]
    BackendError { text: String },

    // ---- Model ----
    /// Failure raised by the model while evaluating the objective.
    #[error("Model error: {text}")]
    Model { text: String },

    // ---- Fallback ----
    #[error("Unknown error")]
    UnknownError,
}

impl From<BackendError> for OptError {
    fn from(original_err: BackendError) -> Self {
        // Errors we raised ourselves inside the adapter come back unchanged.
        let original_err = match original_err.downcast::<OptError>() {
            Ok(opt_err) => return opt_err,
            Err(err) => err,
        };
        match original_err.downcast() {
            Ok(argmin_err) => match argmin_err {
                ArgminError::InvalidParameter { text } => OptError::InvalidParameter { text },
                ArgminError::NotImplemented { text } => OptError::NotImplemented { text },
                ArgminError::NotInitialized { text } => OptError::NotInitialized { text },
                ArgminError::ConditionViolated { text } => OptError::ConditionViolated { text },
                ArgminError::CheckpointNotFound { text } => OptError::CheckPointNotFound { text },
                ArgminError::PotentialBug { text } => OptError::PotentialBug { text },
                ArgminError::ImpossibleError { text } => OptError::ImpossibleError { text },
                _ => OptError::UnknownError,
            },
            Err(err) => OptError::BackendError { text: err.to_string() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // An `OptError` that travelled through argmin's boxed error type must be
    // recovered as the same variant.
    //
    // Given
    // -----
    // - `OptError::NonFiniteCost` converted into `argmin::core::Error`.
    //
    // Expect
    // ------
    // - Converting back yields the identical variant.
    fn opt_error_round_trips_through_argmin_error() {
        // Arrange
        let original = OptError::NonFiniteCost { value: f64::INFINITY };
        let boxed: BackendError = original.clone().into();

        // Act
        let recovered = OptError::from(boxed);

        // Assert
        assert_eq!(recovered, original);
    }

    #[test]
    // Purpose
    // -------
    // Argmin's own error enum maps onto the wrapper variants.
    //
    // Given
    // -----
    // - `ArgminError::ConditionViolated` boxed as `argmin::core::Error`.
    //
    // Expect
    // ------
    // - `OptError::ConditionViolated` carrying the same text.
    fn argmin_condition_violated_maps_to_wrapper() {
        // Arrange
        let boxed: BackendError =
            ArgminError::ConditionViolated { text: "line search".to_string() }.into();

        // Act
        let mapped = OptError::from(boxed);

        // Assert
        assert_eq!(mapped, OptError::ConditionViolated { text: "line search".to_string() });
    }
}
