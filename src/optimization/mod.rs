//! optimization: L-BFGS stack, numerical helpers, and unified error surface.
//!
//! Purpose
//! -------
//! Provide the optimization layer used for gradient-based model fitting:
//! an Argmin-backed log-likelihood optimizer, log-domain numerical
//! primitives, and a single error/result surface.
//!
//! Key behaviors
//! -------------
//! - `loglik_optimizer`: maximize a log-likelihood `ℓ(θ)` with L-BFGS,
//!   finite-difference fallbacks, and a central-difference gradient checker.
//! - `numerical_stability`: stable log-sum-exp / log-mean-exp over batch
//!   columns, used by every mixture likelihood in the crate.
//! - `errors`: `OptError` / `OptResult<T>`.
//!
//! Conventions
//! -----------
//! - All solvers conceptually maximize `ℓ(θ)` by minimizing `c(θ) = -ℓ(θ)`;
//!   user-facing values are expressed in terms of `ℓ`.
//! - Batches are stored column-wise: one sample per column.

pub mod errors;
pub mod loglik_optimizer;
pub mod numerical_stability;

pub mod prelude {
    pub use super::errors::{OptError, OptResult};
    pub use super::loglik_optimizer::prelude::*;
    pub use super::numerical_stability::prelude::*;
}
