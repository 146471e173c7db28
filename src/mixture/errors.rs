//! Errors for mixture models and their components.
//!
//! [`MixtureError`] covers the three failure families of the mixture layer:
//! dimensionality mismatches between batches and models, invalid
//! construction or configuration values, and out-of-range component
//! indexing. Slow or failed EM convergence is **not** an error; `train`
//! reports it through its boolean return value.
use thiserror::Error;

/// Result alias for mixture and component operations.
pub type MixtureResult<T> = Result<T, MixtureError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MixtureError {
    // ---- Indexing ----
    /// Component index outside `[0, num_components)`.
    #[error("Invalid component index {index}: mixture has {len} components")]
    ComponentIndexOutOfRange { index: usize, len: usize },

    /// Operation needs at least one component.
    #[error("Mixture has no components")]
    NoComponents,

    // ---- Data validation ----
    /// Batch row count differs from the model dimensionality.
    #[error("Data has wrong dimensionality: expected {expected} rows, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// Per-sample vectors (weights) do not match the number of data columns.
    #[error("Sample count mismatch: expected {expected}, found {found}")]
    SampleCountMismatch { expected: usize, found: usize },

    /// Batch has no columns.
    #[error("Data batch is empty")]
    EmptyData,

    /// Responsibility weights must be finite and non-negative.
    #[error("Invalid weight at index {index}: {value}, must be finite and >= 0")]
    InvalidWeights { index: usize, value: f64 },

    // ---- Model state ----
    /// `train` was called on an uninitialized mixture with `initialize = false`.
    #[error("Mixture has not been initialized")]
    NotInitialized,

    /// Mixing weights must be a probability vector of the right length.
    #[error("Invalid priors: {reason}")]
    InvalidPriors { reason: String },

    // ---- Configuration ----
    /// Invalid training parameter value.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParam { name: &'static str, reason: &'static str },

    /// Invalid component construction value.
    #[error("Invalid component parameter '{name}' = {value}: {reason}")]
    InvalidComponentParam { name: &'static str, value: f64, reason: &'static str },

    /// Failure constructing a backing distribution.
    #[error("Distribution error: {text}")]
    Distribution { text: String },
}
