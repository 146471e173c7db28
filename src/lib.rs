//! cmix: mixture models and conditional mixtures of experts.
//!
//! Purpose
//! -------
//! Serve as the crate root for density and conditional-density estimation
//! with mixture-structured models over fixed-dimensional vectors.
//!
//! Key behaviors
//! -------------
//! - [`distribution`]: the `Distribution` / `ConditionalDistribution`
//!   capability traits shared by every model.
//! - [`mixture`]: a container of boxed, interchangeable components with
//!   learned priors, trained by EM with optional validation early stopping.
//! - [`mcbm`]: the MCBM conditional mixture of experts for binary outputs,
//!   with an analytic gradient engine, a finite-difference gradient checker
//!   and L-BFGS training.
//! - [`optimization`]: the argmin-backed L-BFGS driver and log-domain
//!   numerical helpers.
//!
//! Invariants & assumptions
//! ------------------------
//! - Data batches are `ndarray` matrices with one sample per column.
//! - All computation is single-threaded; models are mutated only by their
//!   own training and setter calls.
//! - Randomness is passed in explicitly as `&mut dyn RngCore`.
//!
//! Conventions
//! -----------
//! - Fallible operations return `Result` with a per-domain error enum
//!   (`MixtureError`, `MCBMError`, `OptError`).
//! - Logging goes through the `log` facade; the embedding application
//!   installs a logger.

pub mod distribution;
pub mod mcbm;
pub mod mixture;
pub mod optimization;

pub mod prelude {
    pub use crate::distribution::{ConditionalDistribution, Distribution};
    pub use crate::mcbm::prelude::*;
    pub use crate::mixture::prelude::*;
}
