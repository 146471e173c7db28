//! Axis-aligned Gaussian mixture component.
//!
//! `DiagonalGaussian` is the reference [`Component`]: a Gaussian with a
//! diagonal covariance whose weighted maximum-likelihood update is closed
//! form, so `train` / `train_weighted` always report convergence after one
//! step.
//!
//! - `initialize` centers the component on a randomly drawn data column and
//!   sets each variance to the variance of the corresponding data row, so
//!   several components initialized on the same data start at different
//!   points but with a common spread.
//! - `regularize_covariance` is added to every variance after an update,
//!   and variances never drop below [`VARIANCE_FLOOR`].
//! - `train_mean` / `train_covariance` select which moments are updated.
use crate::{
    distribution::Distribution,
    mixture::{
        core::{component::Component, options::ComponentParams},
        errors::{MixtureError, MixtureResult},
    },
};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::{Rng, RngCore};
use statrs::distribution::{Continuous, Normal};

/// Smallest variance a component is allowed to keep.
pub const VARIANCE_FLOOR: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq)]
pub struct DiagonalGaussian {
    mean: Array1<f64>,
    variance: Array1<f64>,
}

impl DiagonalGaussian {
    /// Standard normal in `dim` dimensions.
    ///
    /// # Errors
    /// - [`MixtureError::InvalidComponentParam`] if `dim == 0`.
    pub fn new(dim: usize) -> MixtureResult<Self> {
        if dim == 0 {
            return Err(MixtureError::InvalidComponentParam {
                name: "dim",
                value: 0.0,
                reason: "dimensionality must be positive",
            });
        }
        Ok(Self { mean: Array1::zeros(dim), variance: Array1::ones(dim) })
    }

    /// Gaussian with the given mean and per-dimension variances.
    ///
    /// # Errors
    /// - `DimensionMismatch` if the lengths differ.
    /// - `InvalidComponentParam` for an empty mean, a non-finite mean entry,
    ///   or a variance that is not finite and strictly positive.
    pub fn from_moments(mean: Array1<f64>, variance: Array1<f64>) -> MixtureResult<Self> {
        if mean.is_empty() {
            return Err(MixtureError::InvalidComponentParam {
                name: "dim",
                value: 0.0,
                reason: "dimensionality must be positive",
            });
        }
        if variance.len() != mean.len() {
            return Err(MixtureError::DimensionMismatch {
                expected: mean.len(),
                found: variance.len(),
            });
        }
        if let Some(&value) = mean.iter().find(|m| !m.is_finite()) {
            return Err(MixtureError::InvalidComponentParam {
                name: "mean",
                value,
                reason: "must be finite",
            });
        }
        if let Some(&value) = variance.iter().find(|v| !(v.is_finite() && **v > 0.0)) {
            return Err(MixtureError::InvalidComponentParam {
                name: "variance",
                value,
                reason: "must be finite and > 0",
            });
        }
        Ok(Self { mean, variance })
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    pub fn variance(&self) -> &Array1<f64> {
        &self.variance
    }

    fn check_data(&self, data: &ArrayView2<f64>) -> MixtureResult<()> {
        if data.nrows() != self.dim() {
            return Err(MixtureError::DimensionMismatch {
                expected: self.dim(),
                found: data.nrows(),
            });
        }
        if data.ncols() == 0 {
            return Err(MixtureError::EmptyData);
        }
        Ok(())
    }

    fn marginals(&self) -> MixtureResult<Vec<Normal>> {
        self.mean
            .iter()
            .zip(self.variance.iter())
            .map(|(&m, &v)| {
                Normal::new(m, v.sqrt())
                    .map_err(|e| MixtureError::Distribution { text: e.to_string() })
            })
            .collect()
    }
}

impl Distribution for DiagonalGaussian {
    type Error = MixtureError;

    fn dim(&self) -> usize {
        self.mean.len()
    }

    fn sample(&self, num_samples: usize, rng: &mut dyn RngCore) -> MixtureResult<Array2<f64>> {
        let mut samples = Array2::zeros((self.dim(), num_samples));
        for (d, mut row) in samples.axis_iter_mut(Axis(0)).enumerate() {
            let normal = rand_distr::Normal::new(self.mean[d], self.variance[d].sqrt())
                .map_err(|e| MixtureError::Distribution { text: e.to_string() })?;
            row.iter_mut().for_each(|x| *x = rng.sample(normal));
        }
        Ok(samples)
    }

    fn log_likelihood(&self, data: ArrayView2<f64>) -> MixtureResult<Array1<f64>> {
        if data.nrows() != self.dim() {
            return Err(MixtureError::DimensionMismatch {
                expected: self.dim(),
                found: data.nrows(),
            });
        }
        let marginals = self.marginals()?;
        Ok(data
            .columns()
            .into_iter()
            .map(|col| col.iter().zip(marginals.iter()).map(|(&x, n)| n.ln_pdf(x)).sum())
            .collect())
    }
}

impl Component for DiagonalGaussian {
    fn initialize(
        &mut self, data: ArrayView2<f64>, params: &ComponentParams, rng: &mut dyn RngCore,
    ) -> MixtureResult<()> {
        self.check_data(&data)?;
        params.validate()?;
        let pick = rng.random_range(0..data.ncols());
        if params.train_mean {
            self.mean.assign(&data.column(pick));
        }
        if params.train_covariance {
            let spread = data.var_axis(Axis(1), 0.0);
            self.variance =
                spread.mapv(|v| (v + params.regularize_covariance).max(VARIANCE_FLOOR));
        }
        Ok(())
    }

    fn train(&mut self, data: ArrayView2<f64>, params: &ComponentParams) -> MixtureResult<bool> {
        let weights = Array1::ones(data.ncols());
        self.train_weighted(data, weights.view(), params)
    }

    /// Weighted moment update. A component that receives no responsibility
    /// mass keeps its parameters and reports `false`.
    fn train_weighted(
        &mut self, data: ArrayView2<f64>, weights: ArrayView1<f64>, params: &ComponentParams,
    ) -> MixtureResult<bool> {
        self.check_data(&data)?;
        params.validate()?;
        if weights.len() != data.ncols() {
            return Err(MixtureError::SampleCountMismatch {
                expected: data.ncols(),
                found: weights.len(),
            });
        }
        if let Some((index, &value)) =
            weights.iter().enumerate().find(|(_, w)| !(w.is_finite() && **w >= 0.0))
        {
            return Err(MixtureError::InvalidWeights { index, value });
        }
        let total = weights.sum();
        if total <= f64::MIN_POSITIVE {
            log::debug!("gaussian component received no responsibility mass; skipping update");
            return Ok(false);
        }

        if params.train_mean {
            self.mean = data.dot(&weights) / total;
        }
        if params.train_covariance {
            let centered = &data - &self.mean.view().insert_axis(Axis(1));
            let second = (&centered * &centered).dot(&weights) / total;
            self.variance =
                second.mapv(|v| (v + params.regularize_covariance).max(VARIANCE_FLOOR));
        }
        Ok(true)
    }

    fn clone_box(&self) -> Box<dyn Component> {
        Box::new(self.clone())
    }
}
