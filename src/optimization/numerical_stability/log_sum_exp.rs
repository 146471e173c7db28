//! Log-domain reductions.
//!
//! Mixture likelihoods are sums of exponentials of energies that easily
//! exceed the `f64` range (`exp(710)` overflows). Every reduction here
//! shifts by the running maximum before exponentiating:
//!
//!   `log Σ exp(x_i) = m + log Σ exp(x_i − m)`, `m = max_i x_i`.
//!
//! Batches are laid out column-wise (one sample per column), so the
//! matrix reductions collapse axis 0 and return one value per column.
//!
//! Edge cases
//! ----------
//! - If every entry of a column is `-∞` the result is `-∞` (empty mass),
//!   never `NaN`.
//! - A `+∞` entry yields `+∞`.
//! - A matrix with zero rows yields `-∞` for every column.
use ndarray::{Array1, ArrayView1, ArrayView2, Axis};

/// Stable `log(exp(a) + exp(b))`.
pub fn log_sum_exp_pair(a: f64, b: f64) -> f64 {
    let m = a.max(b);
    if m == f64::NEG_INFINITY || m == f64::INFINITY {
        return m;
    }
    m + ((a - m).exp() + (b - m).exp()).ln()
}

/// Stable `log Σ_i exp(x_i)` over a vector.
pub fn log_sum_exp(values: ArrayView1<f64>) -> f64 {
    let m = values.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v));
    if m == f64::NEG_INFINITY || m == f64::INFINITY {
        return m;
    }
    m + values.fold(0.0, |acc, &v| acc + (v - m).exp()).ln()
}

/// Column-wise log-sum-exp: `out[j] = log Σ_i exp(values[i, j])`.
pub fn log_sum_exp_cols(values: ArrayView2<f64>) -> Array1<f64> {
    values.map_axis(Axis(0), log_sum_exp)
}

/// Column-wise log-mean-exp: `out[j] = log (1/n) Σ_i exp(values[i, j])`,
/// with `n = values.nrows()`.
pub fn log_mean_exp_cols(values: ArrayView2<f64>) -> Array1<f64> {
    let log_n = (values.nrows() as f64).ln();
    log_sum_exp_cols(values).mapv(|v| v - log_n)
}
