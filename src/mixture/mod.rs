//! mixture: finite mixtures of interchangeable components.
//!
//! Purpose
//! -------
//! Provide a mixture container that owns an arbitrary number of boxed
//! components under learned mixing weights, computes responsibilities and
//! likelihoods in the log domain, and fits everything with EM.
//!
//! Key behaviors
//! -------------
//! - [`core`] defines the [`Component`] contract (sampling and likelihood
//!   through [`Distribution`](crate::distribution::Distribution), plus
//!   `initialize` / `train` / `train_weighted`) and the configuration
//!   bundles [`MixtureParams`] / [`ComponentParams`].
//! - [`models`] holds [`Mixture`] and the [`DiagonalGaussian`] reference
//!   component.
//! - [`errors`] carries [`MixtureError`] / [`MixtureResult`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Priors always form a probability vector of length `num_components()`.
//! - Components are owned exclusively by their mixture; copying a mixture
//!   deep-copies every component.
//! - Data batches are `dim × N`, one sample per column.
//!
//! Conventions
//! -----------
//! - Non-convergence is reported by `train`'s boolean result, never as an
//!   error.
//! - Logging goes through the `log` facade: one `info` line per EM
//!   iteration when `verbosity > 0`, component detail at `debug`.
//!
//! Testing notes
//! -------------
//! - Unit tests next to each model cover posterior normalization, error
//!   paths, and EM on well-separated clusters. Integration tests exercise a
//!   trimodal fit with an application-defined component, validation early
//!   stopping, and a mixture of mixtures.

pub mod core;
pub mod errors;
pub mod models;

pub use self::core::{Component, ComponentParams, MixtureParams};
pub use self::errors::{MixtureError, MixtureResult};
pub use self::models::{DiagonalGaussian, Mixture};

pub mod prelude {
    pub use super::core::{Component, ComponentParams, MixtureParams};
    pub use super::errors::{MixtureError, MixtureResult};
    pub use super::models::{DiagonalGaussian, Mixture};
}
