//! numerical_stability: log-domain reductions shared by all mixture models.
//!
//! Purpose
//! -------
//! Collect the overflow-safe reductions used wherever probabilities are
//! combined across mixture components or experts: pairwise and column-wise
//! log-sum-exp, and column-wise log-mean-exp.
//!
//! Conventions
//! -----------
//! - Matrix inputs are batches laid out one sample per column; reductions
//!   run over rows and return one value per column.
//! - Pure functions over `ndarray` views; no logging, no global state.
//!
//! Testing notes
//! -------------
//! - Unit tests in [`log_sum_exp`] check agreement with naive formulas on
//!   safe inputs, behavior for huge energies, and the all-`-∞` edge case.

pub mod log_sum_exp;

pub use self::log_sum_exp::{log_mean_exp_cols, log_sum_exp, log_sum_exp_cols, log_sum_exp_pair};

pub mod prelude {
    pub use super::log_sum_exp::{
        log_mean_exp_cols, log_sum_exp, log_sum_exp_cols, log_sum_exp_pair,
    };
}
