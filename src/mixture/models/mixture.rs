//! Finite mixture of interchangeable components trained by EM.
//!
//! A [`Mixture`] owns an ordered list of boxed [`Component`]s and a linear
//! domain prior vector over them. Densities are combined in the log domain:
//!
//! ```text
//! log p(x)      = lse_k [ log π_k + log p_k(x) ]
//! log p(k | x)  = log π_k + log p_k(x) − log p(x)
//! ```
//!
//! Training alternates an E-step (responsibilities via [`Mixture::posterior`])
//! with an M-step that re-estimates the priors and calls every component's
//! `train_weighted` with its responsibility row. The loop stops on a small
//! relative improvement of the average negative log-likelihood, on the
//! iteration cap, or (with a validation set) after `val_look_ahead`
//! validation checks without improvement, in which case the best snapshot
//! is restored.
//!
//! `Mixture` is itself a [`Component`], so mixtures can be nested.
use crate::{
    distribution::Distribution,
    mixture::{
        core::{
            component::Component,
            options::{ComponentParams, MixtureParams},
        },
        errors::{MixtureError, MixtureResult},
    },
    optimization::numerical_stability::log_sum_exp_cols,
};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::{RngCore, distr::weighted::WeightedIndex};

/// Tolerance on `Σ priors = 1` accepted by [`Mixture::set_priors`].
const PRIOR_SUM_TOL: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct Mixture {
    dim: usize,
    priors: Array1<f64>,
    components: Vec<Box<dyn Component>>,
    initialized: bool,
    train_params: MixtureParams,
}

impl Mixture {
    /// Empty mixture over `dim`-dimensional data.
    ///
    /// # Errors
    /// - [`MixtureError::InvalidParam`] if `dim == 0`.
    pub fn new(dim: usize) -> MixtureResult<Self> {
        if dim == 0 {
            return Err(MixtureError::InvalidParam { name: "dim", reason: "must be > 0" });
        }
        Ok(Self {
            dim,
            priors: Array1::zeros(0),
            components: Vec::new(),
            initialized: false,
            train_params: MixtureParams::default(),
        })
    }

    pub fn num_components(&self) -> usize {
        self.components.len()
    }

    pub fn initialized(&self) -> bool {
        self.initialized
    }

    /// Mark the current components and priors as a valid starting point, so
    /// `train` skips initialization.
    pub fn set_initialized(&mut self, initialized: bool) {
        self.initialized = initialized;
    }

    pub fn priors(&self) -> &Array1<f64> {
        &self.priors
    }

    /// Replace the mixing weights.
    ///
    /// The vector is renormalized after validation so it sums to one
    /// exactly.
    ///
    /// # Errors
    /// - [`MixtureError::InvalidPriors`] for a wrong length, a negative or
    ///   non-finite entry, or a sum further than `1e-6` from one.
    pub fn set_priors(&mut self, priors: Array1<f64>) -> MixtureResult<()> {
        if priors.len() != self.num_components() {
            return Err(MixtureError::InvalidPriors {
                reason: format!(
                    "expected {} entries, found {}",
                    self.num_components(),
                    priors.len()
                ),
            });
        }
        if let Some(p) = priors.iter().find(|p| !(p.is_finite() && **p >= 0.0)) {
            return Err(MixtureError::InvalidPriors {
                reason: format!("entry {p} is not a finite non-negative number"),
            });
        }
        let total = priors.sum();
        if (total - 1.0).abs() > PRIOR_SUM_TOL {
            return Err(MixtureError::InvalidPriors {
                reason: format!("entries sum to {total}, expected 1"),
            });
        }
        self.priors = priors / total;
        Ok(())
    }

    /// Parameters used when this mixture is trained as a component of
    /// another mixture.
    pub fn train_params(&self) -> &MixtureParams {
        &self.train_params
    }

    pub fn set_train_params(&mut self, params: MixtureParams) -> MixtureResult<()> {
        params.validate()?;
        self.train_params = params;
        Ok(())
    }

    /// # Errors
    /// - [`MixtureError::ComponentIndexOutOfRange`] if `index >= num_components()`.
    pub fn component(&self, index: usize) -> MixtureResult<&dyn Component> {
        self.components
            .get(index)
            .map(|c| c.as_ref())
            .ok_or(MixtureError::ComponentIndexOutOfRange { index, len: self.components.len() })
    }

    /// # Errors
    /// - [`MixtureError::ComponentIndexOutOfRange`] if `index >= num_components()`.
    pub fn component_mut(&mut self, index: usize) -> MixtureResult<&mut dyn Component> {
        let len = self.components.len();
        match self.components.get_mut(index) {
            Some(c) => Ok(c.as_mut()),
            None => Err(MixtureError::ComponentIndexOutOfRange { index, len }),
        }
    }

    /// Take ownership of `component`. Priors are reset to uniform and the
    /// mixture is marked uninitialized.
    pub fn add_component(&mut self, component: Box<dyn Component>) {
        self.components.push(component);
        let k = self.components.len();
        self.priors = Array1::from_elem(k, 1.0 / k as f64);
        self.initialized = false;
    }

    /// Component responsibilities, `num_components × N`. Every column sums
    /// to one.
    ///
    /// # Errors
    /// - `NoComponents`, or `DimensionMismatch` for a wrong row count.
    pub fn posterior(&self, data: ArrayView2<f64>) -> MixtureResult<Array2<f64>> {
        let joint = self.log_joint(data)?;
        let evidence = log_sum_exp_cols(joint.view());
        Ok((joint - &evidence.insert_axis(Axis(0))).mapv(f64::exp))
    }

    /// Run every component's `initialize` on `data` and reset the priors to
    /// uniform.
    ///
    /// # Errors
    /// - Data validation errors (see [`Mixture::train`]).
    /// - Parameter validation errors, and any error raised by a component.
    pub fn initialize(
        &mut self, data: ArrayView2<f64>, params: &MixtureParams,
        component_params: &ComponentParams, rng: &mut dyn RngCore,
    ) -> MixtureResult<()> {
        self.check_training_data(data)?;
        params.validate()?;
        component_params.validate()?;
        for component in self.components.iter_mut() {
            component.initialize(data, component_params, rng)?;
        }
        let k = self.components.len();
        self.priors = Array1::from_elem(k, 1.0 / k as f64);
        self.initialized = true;
        if params.verbosity > 0 {
            log::info!("initialized mixture with {k} components on {} samples", data.ncols());
        }
        Ok(())
    }

    /// Fit the mixture to `data` (`dim × N`) with EM.
    ///
    /// Returns `true` when the relative improvement of the average negative
    /// log-likelihood dropped below `params.threshold`, and `false` when
    /// `params.max_iter` iterations ran without converging.
    ///
    /// # Errors
    /// - `NoComponents` if the mixture is empty.
    /// - `DimensionMismatch` if `data.nrows() != dim`, `EmptyData` if
    ///   `data` has no columns.
    /// - `NotInitialized` if the mixture is uninitialized and
    ///   `params.initialize` is `false`.
    /// - Parameter validation errors and component errors.
    pub fn train(
        &mut self, data: ArrayView2<f64>, params: &MixtureParams,
        component_params: &ComponentParams, rng: &mut dyn RngCore,
    ) -> MixtureResult<bool> {
        self.prepare(data, params, component_params, rng)?;
        self.expectation_maximization(data, None, None, params, component_params)
    }

    /// EM with early stopping on `data_valid`.
    ///
    /// The validation set is scored every `params.val_iter` iterations and
    /// after the final iteration. A
    /// check that improves on the best score by less than
    /// `params.threshold` (relative) ends training as converged. After
    /// `params.val_look_ahead` consecutive checks without improvement the
    /// best snapshot is restored and `true` is returned. When `max_iter` is
    /// reached the best snapshot is restored and `false` is returned.
    ///
    /// # Errors
    /// - As [`Mixture::train`], plus `DimensionMismatch` / `EmptyData` for
    ///   `data_valid`.
    pub fn train_with_validation(
        &mut self, data: ArrayView2<f64>, data_valid: ArrayView2<f64>, params: &MixtureParams,
        component_params: &ComponentParams, rng: &mut dyn RngCore,
    ) -> MixtureResult<bool> {
        self.check_training_data(data_valid)?;
        self.prepare(data, params, component_params, rng)?;
        self.expectation_maximization(data, None, Some(data_valid), params, component_params)
    }

    fn prepare(
        &mut self, data: ArrayView2<f64>, params: &MixtureParams,
        component_params: &ComponentParams, rng: &mut dyn RngCore,
    ) -> MixtureResult<()> {
        self.check_training_data(data)?;
        params.validate()?;
        component_params.validate()?;
        if !self.initialized {
            if !params.initialize {
                return Err(MixtureError::NotInitialized);
            }
            self.initialize(data, params, component_params, rng)?;
        }
        Ok(())
    }

    /// Preconditions for training as a component, where no rng is
    /// available for initialization.
    fn check_nested(
        &self, data: ArrayView2<f64>, params: &MixtureParams, component_params: &ComponentParams,
    ) -> MixtureResult<()> {
        self.check_training_data(data)?;
        params.validate()?;
        component_params.validate()?;
        if !self.initialized {
            return Err(MixtureError::NotInitialized);
        }
        Ok(())
    }

    fn check_data(&self, data: &ArrayView2<f64>) -> MixtureResult<()> {
        if self.components.is_empty() {
            return Err(MixtureError::NoComponents);
        }
        if data.nrows() != self.dim {
            return Err(MixtureError::DimensionMismatch { expected: self.dim, found: data.nrows() });
        }
        Ok(())
    }

    fn check_training_data(&self, data: ArrayView2<f64>) -> MixtureResult<()> {
        self.check_data(&data)?;
        if data.ncols() == 0 {
            return Err(MixtureError::EmptyData);
        }
        Ok(())
    }

    /// `log π_k + log p_k(x_n)` for every component and column.
    fn log_joint(&self, data: ArrayView2<f64>) -> MixtureResult<Array2<f64>> {
        self.check_data(&data)?;
        let n = data.ncols();
        let mut joint = Array2::zeros((self.components.len(), n));
        for ((mut row, component), &prior) in
            joint.axis_iter_mut(Axis(0)).zip(self.components.iter()).zip(self.priors.iter())
        {
            let loglik = component.log_likelihood(data)?;
            if loglik.len() != n {
                return Err(MixtureError::SampleCountMismatch { expected: n, found: loglik.len() });
            }
            let log_prior = prior.ln();
            row.zip_mut_with(&loglik, |j, &l| *j = log_prior + l);
        }
        Ok(joint)
    }

    /// Weighted average negative log-likelihood in nats.
    fn average_nll(&self, data: ArrayView2<f64>, weights: Option<ArrayView1<f64>>) -> MixtureResult<f64> {
        let loglik = self.log_likelihood(data)?;
        Ok(match weights {
            Some(w) => -loglik.dot(&w) / w.sum(),
            None => -loglik.sum() / loglik.len() as f64,
        })
    }

    fn expectation_maximization(
        &mut self, data: ArrayView2<f64>, weights: Option<ArrayView1<f64>>,
        data_valid: Option<ArrayView2<f64>>, params: &MixtureParams,
        component_params: &ComponentParams,
    ) -> MixtureResult<bool> {
        let mut cost = self.average_nll(data, weights)?;
        let mut best = match data_valid {
            Some(valid) => Some((self.average_nll(valid, None)?, self.clone())),
            None => None,
        };
        let mut stalled = 0usize;

        for iter in 1..=params.max_iter {
            // E-step
            let mut responsibilities = self.posterior(data)?;
            if let Some(w) = weights {
                responsibilities *= &w.insert_axis(Axis(0));
            }

            // M-step
            if params.train_priors {
                let mass = responsibilities.sum_axis(Axis(1)) + params.regularize_priors;
                let total = mass.sum();
                if total > 0.0 && total.is_finite() {
                    self.priors = mass / total;
                } else {
                    log::warn!("EM iteration {iter}: degenerate responsibilities, priors kept");
                }
            }
            if params.train_components {
                for (k, component) in self.components.iter_mut().enumerate() {
                    let converged =
                        component.train_weighted(data, responsibilities.row(k), component_params)?;
                    log::debug!("EM iteration {iter}: component {k} converged = {converged}");
                }
            }

            let previous = cost;
            cost = self.average_nll(data, weights)?;
            if params.verbosity > 0 {
                log::info!("EM iteration {iter:>4}: average negative log-likelihood {cost:.8}");
            }

            match (data_valid, best.as_mut()) {
                (Some(valid), Some((best_cost, snapshot))) => {
                    // The final iterate is always scored.
                    if iter % params.val_iter != 0 && iter != params.max_iter {
                        continue;
                    }
                    let valid_cost = self.average_nll(valid, None)?;
                    if params.verbosity > 0 {
                        log::info!("EM iteration {iter:>4}: validation cost {valid_cost:.8}");
                    }
                    if valid_cost < *best_cost {
                        let improvement = relative_improvement(*best_cost, valid_cost);
                        *best_cost = valid_cost;
                        *snapshot = self.clone();
                        stalled = 0;
                        if improvement < params.threshold {
                            return Ok(true);
                        }
                    } else {
                        stalled += 1;
                        if stalled >= params.val_look_ahead {
                            log::debug!("validation cost stalled for {stalled} checks, stopping");
                            *self = snapshot.clone();
                            return Ok(true);
                        }
                    }
                }
                _ => {
                    if relative_improvement(previous, cost) < params.threshold {
                        return Ok(true);
                    }
                }
            }
        }

        if let Some((_, snapshot)) = best {
            *self = snapshot;
        }
        Ok(false)
    }
}

fn relative_improvement(old: f64, new: f64) -> f64 {
    (old - new) / old.abs().max(1e-12)
}

impl Distribution for Mixture {
    type Error = MixtureError;

    fn dim(&self) -> usize {
        self.dim
    }

    /// Draw component indices from the priors, then one sample from each
    /// drawn component. Column `n` of the result comes from the `n`-th
    /// drawn index.
    fn sample(&self, num_samples: usize, rng: &mut dyn RngCore) -> MixtureResult<Array2<f64>> {
        if self.components.is_empty() {
            return Err(MixtureError::NoComponents);
        }
        let picker = WeightedIndex::new(self.priors.iter())
            .map_err(|e| MixtureError::InvalidPriors { reason: e.to_string() })?;
        let labels: Vec<usize> =
            (0..num_samples).map(|_| rand::distr::Distribution::sample(&picker, rng)).collect();

        let mut samples = Array2::zeros((self.dim, num_samples));
        for (k, component) in self.components.iter().enumerate() {
            let columns: Vec<usize> =
                labels.iter().enumerate().filter(|(_, l)| **l == k).map(|(n, _)| n).collect();
            if columns.is_empty() {
                continue;
            }
            let drawn = component.sample(columns.len(), rng)?;
            if drawn.nrows() != self.dim {
                return Err(MixtureError::DimensionMismatch {
                    expected: self.dim,
                    found: drawn.nrows(),
                });
            }
            if drawn.ncols() != columns.len() {
                return Err(MixtureError::SampleCountMismatch {
                    expected: columns.len(),
                    found: drawn.ncols(),
                });
            }
            for (src, &dst) in columns.iter().enumerate() {
                samples.column_mut(dst).assign(&drawn.column(src));
            }
        }
        Ok(samples)
    }

    fn log_likelihood(&self, data: ArrayView2<f64>) -> MixtureResult<Array1<f64>> {
        let joint = self.log_joint(data)?;
        Ok(log_sum_exp_cols(joint.view()))
    }
}

impl Component for Mixture {
    fn initialize(
        &mut self, data: ArrayView2<f64>, params: &ComponentParams, rng: &mut dyn RngCore,
    ) -> MixtureResult<()> {
        let mixture_params = self.train_params.clone();
        Mixture::initialize(self, data, &mixture_params, params, rng)
    }

    /// # Errors
    /// - `NotInitialized` unless [`Component::initialize`] ran first; a
    ///   nested mixture is initialized by its parent with the caller's rng.
    fn train(&mut self, data: ArrayView2<f64>, params: &ComponentParams) -> MixtureResult<bool> {
        let mixture_params = self.train_params.clone();
        self.check_nested(data, &mixture_params, params)?;
        self.expectation_maximization(data, None, None, &mixture_params, params)
    }

    /// # Errors
    /// - As [`Component::train`], plus `SampleCountMismatch` and
    ///   `InvalidWeights` for the weight vector.
    fn train_weighted(
        &mut self, data: ArrayView2<f64>, weights: ArrayView1<f64>, params: &ComponentParams,
    ) -> MixtureResult<bool> {
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
        let mixture_params = self.train_params.clone();
        self.check_nested(data, &mixture_params, params)?;
        if weights.sum() <= f64::MIN_POSITIVE {
            return Ok(false);
        }
        self.expectation_maximization(data, Some(weights), None, &mixture_params, params)
    }

    fn clone_box(&self) -> Box<dyn Component> {
        Box::new(self.clone())
    }
}
