//! distribution: sampling / likelihood capabilities shared by all models.
//!
//! Purpose
//! -------
//! Define the two capability traits every model in the crate satisfies:
//! [`Distribution`] for densities over fixed-dimensional vectors (mixture
//! components and mixtures themselves, enabling mixtures of mixtures), and
//! [`ConditionalDistribution`] for models of an output given an input (the
//! conditional mixture of experts).
//!
//! Conventions
//! -----------
//! - Batches are matrices with one sample per **column**; the number of rows
//!   is the dimensionality.
//! - Log-likelihoods are natural-log values, one per column.
//! - `evaluate` reports the average negative log-likelihood in bits per
//!   dimension, the usual cross-entropy style metric.
//! - Randomness is injected as `&mut dyn RngCore` so callers control seeds
//!   and the traits stay object safe.
use ndarray::{Array1, Array2, ArrayView2};
use rand::RngCore;
use std::f64::consts::LN_2;

/// Unconditional density over `dim()`-dimensional column vectors.
pub trait Distribution {
    /// Error type raised for invalid input batches.
    type Error;

    /// Dimensionality of a single sample.
    fn dim(&self) -> usize;

    /// Draw `num_samples` samples, returned as a `dim × num_samples` batch.
    fn sample(&self, num_samples: usize, rng: &mut dyn RngCore)
    -> Result<Array2<f64>, Self::Error>;

    /// Per-column log-density of `data` (`dim × N`).
    fn log_likelihood(&self, data: ArrayView2<f64>) -> Result<Array1<f64>, Self::Error>;

    /// Average negative log-likelihood in bits per dimension.
    fn evaluate(&self, data: ArrayView2<f64>) -> Result<f64, Self::Error> {
        let loglik = self.log_likelihood(data)?;
        Ok(-loglik.mean().unwrap_or(f64::NAN) / LN_2 / self.dim() as f64)
    }
}

/// Density of an output batch conditioned on an input batch.
pub trait ConditionalDistribution {
    /// Error type raised for invalid input batches.
    type Error;

    /// Input dimensionality.
    fn dim_in(&self) -> usize;

    /// Output dimensionality.
    fn dim_out(&self) -> usize;

    /// Draw one output column per input column.
    fn sample(
        &self, input: ArrayView2<f64>, rng: &mut dyn RngCore,
    ) -> Result<Array2<f64>, Self::Error>;

    /// Per-column conditional log-probability of `output` given `input`.
    fn log_likelihood(
        &self, input: ArrayView2<f64>, output: ArrayView2<f64>,
    ) -> Result<Array1<f64>, Self::Error>;

    /// Average negative log-likelihood in bits per output dimension:
    /// `−mean(log p(y|x)) / ln 2 / dim_out`.
    fn evaluate(
        &self, input: ArrayView2<f64>, output: ArrayView2<f64>,
    ) -> Result<f64, Self::Error> {
        let loglik = self.log_likelihood(input, output)?;
        Ok(-loglik.mean().unwrap_or(f64::NAN) / LN_2 / self.dim_out() as f64)
    }
}
