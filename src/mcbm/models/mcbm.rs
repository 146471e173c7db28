//! MCBM: conditional mixture of experts for a binary output.
//!
//! Each of `K` experts scores an input `x ∈ ℝᴰ` with a quadratic energy
//! through a shared bank of `F` feature directions plus linear terms:
//!
//! ```text
//! e⁰_k(x) = priors_k + Σ_f weights_kf (features_·fᵀ x)² + input_bias_·kᵀ x
//! e¹_k(x) = e⁰_k(x) + predictors_k· x + output_bias_k
//! p(y = 1 | x) = σ( lse_k e¹_k(x) − lse_k e⁰_k(x) )
//! ```
//!
//! Training maximizes the average log-likelihood in bits per sample with
//! L-BFGS through [`MCBMObjective`]. The trainable parameter groups are
//! selected per call by [`MCBMParams`]; their flattened layout is owned by
//! [`ParamLayout`].
use crate::{
    distribution::ConditionalDistribution,
    mcbm::{
        core::{
            data::{MCBMData, validate_pair},
            forward::ForwardPass,
            layout::{MCBMDims, ParamGroup, ParamLayout, ParamViews},
            options::MCBMParams,
        },
        errors::{MCBMError, MCBMResult},
        models::objective::MCBMObjective,
    },
    optimization::{
        errors::OptError,
        loglik_optimizer::{OptimOutcome, Theta, gradient_check_error, maximize},
    },
};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, s};
use rand::{Rng, RngCore};
use rand_distr::StandardNormal;
use std::f64::consts::LN_2;

/// Columns per forward pass when sampling or scoring outside of training.
pub const DEFAULT_BATCH_SIZE: usize = 2000;

#[derive(Debug, Clone, PartialEq)]
pub struct MCBM {
    dim_in: usize,
    num_components: usize,
    num_features: usize,
    priors: Array1<f64>,
    weights: Array2<f64>,
    features: Array2<f64>,
    predictors: Array2<f64>,
    input_bias: Array2<f64>,
    output_bias: Array1<f64>,
    /// Outcome of the most recent optimizer run.
    pub results: Option<OptimOutcome>,
}

impl MCBM {
    /// Randomly initialized model with `num_features` defaulting to
    /// `dim_in`.
    ///
    /// Weights are drawn as `|U(−1, 1)| / 100 + 0.01`, features and
    /// predictors as `N(0, 1) / 100`; priors and both biases start at zero.
    ///
    /// # Errors
    /// - `InvalidParam` for `dim_in == 0`.
    /// - `InvalidNumComponents` / `InvalidNumFeatures` for zero counts.
    pub fn new(
        dim_in: usize, num_components: usize, num_features: Option<usize>, rng: &mut dyn RngCore,
    ) -> MCBMResult<Self> {
        if dim_in == 0 {
            return Err(MCBMError::InvalidParam { name: "dim_in", reason: "must be > 0" });
        }
        if num_components == 0 {
            return Err(MCBMError::InvalidNumComponents { value: num_components });
        }
        let num_features = num_features.unwrap_or(dim_in);
        if num_features == 0 {
            return Err(MCBMError::InvalidNumFeatures { value: num_features });
        }

        let weights = Array2::from_shape_simple_fn((num_components, num_features), || {
            rng.random_range(-1.0..1.0f64).abs() / 100.0 + 0.01
        });
        let mut small_normal = |shape: (usize, usize)| {
            Array2::from_shape_simple_fn(shape, || rng.sample::<f64, _>(StandardNormal) / 100.0)
        };
        let features = small_normal((dim_in, num_features));
        let predictors = small_normal((num_components, dim_in));

        Ok(Self {
            dim_in,
            num_components,
            num_features,
            priors: Array1::zeros(num_components),
            weights,
            features,
            predictors,
            input_bias: Array2::zeros((dim_in, num_components)),
            output_bias: Array1::zeros(num_components),
            results: None,
        })
    }

    pub fn dims(&self) -> MCBMDims {
        MCBMDims {
            dim_in: self.dim_in,
            num_components: self.num_components,
            num_features: self.num_features,
        }
    }

    pub fn num_components(&self) -> usize {
        self.num_components
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    pub fn priors(&self) -> &Array1<f64> {
        &self.priors
    }

    pub fn weights(&self) -> &Array2<f64> {
        &self.weights
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    pub fn predictors(&self) -> &Array2<f64> {
        &self.predictors
    }

    pub fn input_bias(&self) -> &Array2<f64> {
        &self.input_bias
    }

    pub fn output_bias(&self) -> &Array1<f64> {
        &self.output_bias
    }

    pub fn set_priors(&mut self, priors: Array1<f64>) -> MCBMResult<()> {
        self.check_shape(ParamGroup::Priors, priors.shape())?;
        self.priors = priors;
        Ok(())
    }

    /// # Errors
    /// - `ShapeMismatch` unless `weights` is `K × F`.
    /// - `NegativeWeight` for a negative or non-finite entry.
    pub fn set_weights(&mut self, weights: Array2<f64>) -> MCBMResult<()> {
        self.check_shape(ParamGroup::Weights, weights.shape())?;
        if let Some(((row, col), &value)) =
            weights.indexed_iter().find(|(_, w)| !(w.is_finite() && **w >= 0.0))
        {
            return Err(MCBMError::NegativeWeight { row, col, value });
        }
        self.weights = weights;
        Ok(())
    }

    pub fn set_features(&mut self, features: Array2<f64>) -> MCBMResult<()> {
        self.check_shape(ParamGroup::Features, features.shape())?;
        self.features = features;
        Ok(())
    }

    pub fn set_predictors(&mut self, predictors: Array2<f64>) -> MCBMResult<()> {
        self.check_shape(ParamGroup::Predictors, predictors.shape())?;
        self.predictors = predictors;
        Ok(())
    }

    pub fn set_input_bias(&mut self, input_bias: Array2<f64>) -> MCBMResult<()> {
        self.check_shape(ParamGroup::InputBias, input_bias.shape())?;
        self.input_bias = input_bias;
        Ok(())
    }

    pub fn set_output_bias(&mut self, output_bias: Array1<f64>) -> MCBMResult<()> {
        self.check_shape(ParamGroup::OutputBias, output_bias.shape())?;
        self.output_bias = output_bias;
        Ok(())
    }

    fn check_shape(&self, group: ParamGroup, found: &[usize]) -> MCBMResult<()> {
        let (rows, cols) = self.dims().shape(group);
        let expected = match group {
            ParamGroup::Priors | ParamGroup::OutputBias => vec![rows],
            _ => vec![rows, cols],
        };
        if found != expected.as_slice() {
            return Err(MCBMError::ShapeMismatch {
                name: group.name(),
                expected,
                found: found.to_vec(),
            });
        }
        Ok(())
    }

    /// Length of the flattened vector for the groups `params` trains.
    pub fn num_parameters(&self, params: &MCBMParams) -> usize {
        ParamLayout::new(self.dims(), params).len()
    }

    /// The trainable groups, flattened.
    pub fn parameters(&self, params: &MCBMParams) -> Array1<f64> {
        Array1::from(ParamLayout::new(self.dims(), params).pack(self))
    }

    /// Overwrite the trainable groups from `x`; frozen groups are left
    /// untouched.
    ///
    /// # Errors
    /// - `ParameterLengthMismatch` if `x.len() != num_parameters(params)`.
    pub fn set_parameters(&mut self, x: &[f64], params: &MCBMParams) -> MCBMResult<()> {
        let layout = ParamLayout::new(self.dims(), params);
        layout.check_params(x)?;
        for group in ParamGroup::ALL {
            let Some(src) = layout.buffer_view(x, group)? else {
                continue;
            };
            match group {
                ParamGroup::Priors => self.priors.assign(&src.column(0)),
                ParamGroup::Weights => self.weights.assign(&src),
                ParamGroup::Features => self.features.assign(&src),
                ParamGroup::Predictors => self.predictors.assign(&src),
                ParamGroup::InputBias => self.input_bias.assign(&src),
                ParamGroup::OutputBias => self.output_bias.assign(&src.column(0)),
            }
        }
        Ok(())
    }

    fn check_input(&self, input: &ArrayView2<f64>) -> MCBMResult<()> {
        if input.nrows() != self.dim_in {
            return Err(MCBMError::InputDimMismatch { expected: self.dim_in, found: input.nrows() });
        }
        Ok(())
    }

    /// Average log-likelihood of `data` in bits per sample at the point `x`,
    /// minus `Σ_g λ_g‖θ_g‖²` over regularized trainable groups.
    ///
    /// Trainable groups are read from `x`, frozen ones from the model. The
    /// data are processed in column batches of `min(batch_size, N)`. When
    /// `g` is given it receives the gradient of the returned value, laid out
    /// like `x`.
    ///
    /// # Errors
    /// - Parameter validation errors, `InputDimMismatch`,
    ///   `ParameterLengthMismatch`, `GradientLengthMismatch`.
    pub fn compute_gradient(
        &self, data: &MCBMData, x: &[f64], g: Option<&mut [f64]>, params: &MCBMParams,
    ) -> MCBMResult<f64> {
        params.validate()?;
        self.check_input(&data.input())?;
        let layout = ParamLayout::new(self.dims(), params);
        let views = layout.bind(self, x)?;
        let mut g = g;
        if let Some(grad) = g.as_deref_mut() {
            layout.check_grad(grad)?;
            grad.fill(0.0);
        }

        let num_data = data.num_data();
        let batch_size = params.batch_size.min(num_data);
        let mut loglik = 0.0;
        for start in (0..num_data).step_by(batch_size) {
            let end = (start + batch_size).min(num_data);
            let input = data.input().slice_move(s![.., start..end]);
            let output = data.output().slice_move(s![0, start..end]);
            let pass = ForwardPass::new(&views, input);
            loglik += pass.log_likelihood(output).sum();
            if let Some(grad) = g.as_deref_mut() {
                accumulate_gradient(&layout, &views, &pass, input, output, grad)?;
            }
        }

        let normalizer = num_data as f64 * LN_2;
        let mut value = loglik / normalizer;
        if let Some(grad) = g.as_deref_mut() {
            grad.iter_mut().for_each(|v| *v /= normalizer);
        }

        for group in ParamGroup::ALL {
            let lambda = params.regularizer(group);
            let Some(range) = layout.buffer_range(group) else {
                continue;
            };
            if lambda <= 0.0 {
                continue;
            }
            let theta = &x[range.clone()];
            value -= lambda * theta.iter().map(|t| t * t).sum::<f64>();
            if let Some(grad) = g.as_deref_mut() {
                grad[range].iter_mut().zip(theta).for_each(|(gi, &t)| *gi -= 2.0 * lambda * t);
            }
        }
        Ok(value)
    }

    /// Euclidean distance between the analytic gradient at the current
    /// parameters and its central-difference estimate with step `epsilon`.
    ///
    /// # Errors
    /// - `InvalidEpsilon` if `epsilon` is not finite and positive.
    /// - Errors from [`MCBM::compute_gradient`].
    pub fn check_gradient(
        &self, data: &MCBMData, epsilon: f64, params: &MCBMParams,
    ) -> MCBMResult<f64> {
        if !(epsilon.is_finite() && epsilon > 0.0) {
            return Err(MCBMError::InvalidEpsilon { value: epsilon });
        }
        let theta = self.parameters(params);
        let mut analytic = vec![0.0; theta.len()];
        let theta_slice = theta.as_slice().ok_or(OptError::NonContiguousTheta)?;
        self.compute_gradient(data, theta_slice, Some(analytic.as_mut_slice()), params)?;
        let analytic = Array1::from(analytic);
        let err = gradient_check_error(&theta, &analytic, epsilon, |t: &Theta| {
            let x = t.as_slice().ok_or(OptError::NonContiguousTheta)?;
            Ok(self.compute_gradient(data, x, None, params)?)
        })?;
        Ok(err)
    }

    /// Fit the trainable groups with L-BFGS.
    ///
    /// Without a callback the optimizer runs once for up to `max_iter`
    /// iterations. With one, it runs in legs of `cb_iter` iterations; after
    /// each leg the model is updated and the callback is invoked with the
    /// number of optimizer iterations run so far. A callback returning `false`
    /// stops training. Every leg restarts the L-BFGS history.
    ///
    /// Returns whether the optimizer reported convergence. Running out of
    /// iterations or being stopped by the callback yields `false`; the
    /// model keeps the best parameters found either way.
    ///
    /// L-BFGS itself is unconstrained, so a leg can end with negative
    /// entries in `weights`. Those are clipped to zero before the model is
    /// written back or handed to the callback, keeping the same
    /// non-negativity that [`MCBM::set_weights`] enforces.
    ///
    /// # Errors
    /// - Parameter validation errors, `InputDimMismatch`.
    /// - Optimizer failures wrapped in [`MCBMError::Optimization`].
    pub fn train(&mut self, data: &MCBMData, params: &MCBMParams) -> MCBMResult<bool> {
        params.validate()?;
        self.check_input(&data.input())?;
        if self.num_parameters(params) == 0 {
            log::warn!("no trainable parameter groups selected; nothing to train");
            return Ok(true);
        }

        let mut callback = params.callback.clone();
        let leg = match callback {
            Some(_) => params.cb_iter.min(params.max_iter),
            None => params.max_iter,
        };
        let mut used = 0;
        let mut converged = false;
        while used < params.max_iter {
            let budget = leg.min(params.max_iter - used);
            let opts = params.mle_options(budget)?;
            let theta0 = self.parameters(params);
            let outcome = {
                let objective = MCBMObjective::new(self, params);
                maximize(&objective, theta0, data, &opts)?
            };
            used += outcome.iterations.max(1);
            let theta_hat = outcome.theta_hat.as_slice().ok_or(OptError::NonContiguousTheta)?;
            self.set_parameters(theta_hat, params)?;
            if params.train_weights {
                let clipped = self.clip_negative_weights();
                if clipped > 0 {
                    log::warn!(
                        "clipped {clipped} negative expert weights to zero after {used} iterations"
                    );
                }
            }
            converged = outcome.converged;
            if params.verbosity > 0 {
                log::info!(
                    "MCBM iteration {used:>5}: {:.6} bits/sample ({})",
                    outcome.value,
                    outcome.status
                );
            }
            self.results = Some(outcome);
            if converged {
                break;
            }
            if let Some(cb) = callback.as_mut() {
                if !cb.call(used, self) {
                    log::info!("training stopped by callback after {used} iterations");
                    break;
                }
            }
        }
        Ok(converged)
    }

    /// Set every negative weight to zero and return how many were changed.
    fn clip_negative_weights(&mut self) -> usize {
        let mut clipped = 0;
        self.weights.mapv_inplace(|w| {
            if w < 0.0 {
                clipped += 1;
                0.0
            } else {
                w
            }
        });
        clipped
    }

    fn frozen_views(&self) -> MCBMResult<ParamViews<'_>> {
        ParamLayout::frozen(self.dims()).bind(self, &[])
    }
}

/// Add this batch's contribution to every trainable group's gradient.
fn accumulate_gradient(
    layout: &ParamLayout, views: &ParamViews<'_>, pass: &ForwardPass, input: ArrayView2<f64>,
    output: ArrayView1<f64>, grad: &mut [f64],
) -> MCBMResult<()> {
    let residual = pass.residual(output).insert_axis(Axis(0));
    let post0 = pass.log_post0.mapv(f64::exp) * &residual;
    let post1 = pass.log_post1.mapv(f64::exp) * &residual;
    let diff = &post1 - &post0;

    if let Some(mut g) = layout.buffer_slice_mut(grad, ParamGroup::Priors)? {
        g.column_mut(0).scaled_add(1.0, &diff.sum_axis(Axis(1)));
    }
    if let Some(mut g) = layout.buffer_slice_mut(grad, ParamGroup::Weights)? {
        g.scaled_add(1.0, &diff.dot(&pass.feature_energy.t()));
    }
    if let Some(mut g) = layout.buffer_slice_mut(grad, ParamGroup::Features)? {
        let scaled = &pass.feature_output * &views.weights.t().dot(&diff);
        g.scaled_add(2.0, &input.dot(&scaled.t()));
    }
    if let Some(mut g) = layout.buffer_slice_mut(grad, ParamGroup::Predictors)? {
        g.scaled_add(1.0, &post1.dot(&input.t()));
    }
    if let Some(mut g) = layout.buffer_slice_mut(grad, ParamGroup::InputBias)? {
        g.scaled_add(1.0, &input.dot(&diff.t()));
    }
    if let Some(mut g) = layout.buffer_slice_mut(grad, ParamGroup::OutputBias)? {
        g.column_mut(0).scaled_add(1.0, &post1.sum_axis(Axis(1)));
    }
    Ok(())
}

impl ConditionalDistribution for MCBM {
    type Error = MCBMError;

    fn dim_in(&self) -> usize {
        self.dim_in
    }

    fn dim_out(&self) -> usize {
        1
    }

    /// One Bernoulli draw per input column: `y = 1` iff `u < p(y = 1 | x)`
    /// for `u ~ U(0, 1)`.
    fn sample(&self, input: ArrayView2<f64>, rng: &mut dyn RngCore) -> MCBMResult<Array2<f64>> {
        self.check_input(&input)?;
        let views = self.frozen_views()?;
        let num_data = input.ncols();
        let mut output = Array2::zeros((1, num_data));
        for start in (0..num_data).step_by(DEFAULT_BATCH_SIZE) {
            let end = (start + DEFAULT_BATCH_SIZE).min(num_data);
            let pass = ForwardPass::new(&views, input.slice(s![.., start..end]));
            output.slice_mut(s![0, start..end]).zip_mut_with(&pass.log_prob1, |y, &lp1| {
                *y = if rng.random::<f64>() < lp1.exp() { 1.0 } else { 0.0 };
            });
        }
        Ok(output)
    }

    /// # Errors
    /// - `InputDimMismatch`, `OutputDimMismatch`, `SampleCountMismatch`,
    ///   `InvalidOutput`.
    fn log_likelihood(
        &self, input: ArrayView2<f64>, output: ArrayView2<f64>,
    ) -> MCBMResult<Array1<f64>> {
        self.check_input(&input)?;
        validate_pair(input, output)?;
        let views = self.frozen_views()?;
        let num_data = input.ncols();
        let mut loglik = Array1::zeros(num_data);
        for start in (0..num_data).step_by(DEFAULT_BATCH_SIZE) {
            let end = (start + DEFAULT_BATCH_SIZE).min(num_data);
            let pass = ForwardPass::new(&views, input.slice(s![.., start..end]));
            loglik
                .slice_mut(s![start..end])
                .assign(&pass.log_likelihood(output.slice(s![0, start..end])));
        }
        Ok(loglik)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use rand::{SeedableRng, rngs::StdRng};

    fn toy_data(rng: &mut StdRng, dim_in: usize, n: usize) -> MCBMData {
        let input = Array2::from_shape_simple_fn((dim_in, n), || {
            if rng.random::<bool>() { 1.0 } else { -1.0 }
        });
        let output = Array2::from_shape_simple_fn((1, n), || {
            if rng.random::<bool>() { 1.0 } else { 0.0 }
        });
        MCBMData::new(input, output).unwrap()
    }

    /// Model with every group away from its zero start, so that no
    /// gradient term vanishes trivially.
    fn perturbed_model(rng: &mut StdRng) -> MCBM {
        let mut model = MCBM::new(3, 2, Some(4), rng).unwrap();
        model.set_priors(array![0.3, -0.2]).unwrap();
        model
            .set_input_bias(Array2::from_shape_simple_fn((3, 2), || rng.random_range(-0.5..0.5)))
            .unwrap();
        model.set_output_bias(array![0.1, -0.4]).unwrap();
        model
            .set_features(Array2::from_shape_simple_fn((3, 4), || rng.random_range(-0.8..0.8)))
            .unwrap();
        model
            .set_predictors(Array2::from_shape_simple_fn((2, 3), || rng.random_range(-1.0..1.0)))
            .unwrap();
        model
    }

    #[test]
    // Purpose
    // -------
    // Construction validates counts and defaults `F` to `D`.
    //
    // Given
    // -----
    // - `new(3, 2, None)` and the three invalid count combinations.
    //
    // Expect
    // ------
    // - Shapes `(K)`, `(K, D)`, `(D, D)`, `(K, D)`, `(D, K)`, `(K)`;
    //   non-negative weights; the matching errors otherwise.
    fn new_sets_shapes_and_validates_counts() {
        let mut rng = StdRng::seed_from_u64(1);
        let model = MCBM::new(3, 2, None, &mut rng).unwrap();
        assert_eq!(model.num_features(), 3);
        assert_eq!(model.priors().len(), 2);
        assert_eq!(model.weights().dim(), (2, 3));
        assert_eq!(model.features().dim(), (3, 3));
        assert_eq!(model.predictors().dim(), (2, 3));
        assert_eq!(model.input_bias().dim(), (3, 2));
        assert_eq!(model.output_bias().len(), 2);
        assert!(model.weights().iter().all(|&w| (0.01..=0.02).contains(&w)));

        assert!(matches!(MCBM::new(0, 2, None, &mut rng), Err(MCBMError::InvalidParam { .. })));
        assert_eq!(
            MCBM::new(3, 0, None, &mut rng).err(),
            Some(MCBMError::InvalidNumComponents { value: 0 })
        );
        assert_eq!(
            MCBM::new(3, 2, Some(0), &mut rng).err(),
            Some(MCBMError::InvalidNumFeatures { value: 0 })
        );
    }

    #[test]
    fn setters_check_shape_and_weight_sign() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut model = MCBM::new(2, 2, Some(3), &mut rng).unwrap();
        assert_eq!(
            model.set_features(Array2::zeros((3, 2))),
            Err(MCBMError::ShapeMismatch {
                name: "features",
                expected: vec![2, 3],
                found: vec![3, 2],
            })
        );
        assert_eq!(
            model.set_weights(array![[0.1, 0.2, 0.3], [0.0, -1.0, 0.0]]),
            Err(MCBMError::NegativeWeight { row: 1, col: 1, value: -1.0 })
        );
        assert!(model.set_output_bias(array![1.0, 2.0]).is_ok());
    }

    #[test]
    // Purpose
    // -------
    // Packing then unpacking restores every trainable group exactly and
    // leaves frozen groups alone.
    //
    // Given
    // -----
    // - A perturbed model, parameters with priors, predictors and output
    //   biases trainable, and a copy whose arrays are changed afterwards.
    //
    // Expect
    // ------
    // - After `set_parameters(parameters())` the trainable groups equal the
    //   original ones and the frozen groups keep the copy's own values.
    fn set_parameters_round_trips_trainable_groups() {
        // Arrange
        let mut rng = StdRng::seed_from_u64(3);
        let model = perturbed_model(&mut rng);
        let params = MCBMParams {
            train_priors: true,
            train_predictors: true,
            train_output_bias: true,
            ..MCBMParams::frozen()
        };
        let x = model.parameters(&params);
        let mut other = MCBM::new(3, 2, Some(4), &mut rng).unwrap();
        let other_features = other.features().clone();

        // Act
        other.set_parameters(x.as_slice().unwrap(), &params).unwrap();

        // Assert
        assert_eq!(x.len(), model.num_parameters(&params));
        assert_eq!(other.priors(), model.priors());
        assert_eq!(other.predictors(), model.predictors());
        assert_eq!(other.output_bias(), model.output_bias());
        assert_eq!(other.features(), &other_features);
        assert!(matches!(
            other.set_parameters(&[0.0; 2], &params),
            Err(MCBMError::ParameterLengthMismatch { expected: 10, found: 2 })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Without regularization the objective equals minus the reported
    // cross-entropy.
    //
    // Given
    // -----
    // - Random ±1 data with N = 20 and a perturbed model.
    //
    // Expect
    // ------
    // - `compute_gradient(parameters) == -evaluate` up to rounding.
    fn objective_matches_negative_evaluate() {
        let mut rng = StdRng::seed_from_u64(4);
        let data = toy_data(&mut rng, 3, 20);
        let model = perturbed_model(&mut rng);
        let params = MCBMParams::default();
        let x = model.parameters(&params);
        let value = model.compute_gradient(&data, x.as_slice().unwrap(), None, &params).unwrap();
        let bits = model.evaluate(data.input(), data.output()).unwrap();
        assert_abs_diff_eq!(value, -bits, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // The analytic gradient, including regularization, agrees with central
    // differences.
    //
    // Given
    // -----
    // - All groups trainable and every regularizer set to 0.01.
    //
    // Expect
    // ------
    // - `check_gradient(1e-5) < 1e-6`.
    fn check_gradient_with_regularization() {
        let mut rng = StdRng::seed_from_u64(5);
        let data = toy_data(&mut rng, 3, 20);
        let model = perturbed_model(&mut rng);
        let params = MCBMParams {
            regularize_weights: 0.01,
            regularize_features: 0.01,
            regularize_predictors: 0.01,
            regularize_input_bias: 0.01,
            ..MCBMParams::default()
        };
        let err = model.check_gradient(&data, 1e-5, &params).unwrap();
        assert!(err < 1e-6, "gradient error {err}");
        assert_eq!(
            model.check_gradient(&data, 0.0, &params),
            Err(MCBMError::InvalidEpsilon { value: 0.0 })
        );
    }

    #[test]
    fn compute_gradient_rejects_bad_buffers() {
        let mut rng = StdRng::seed_from_u64(6);
        let data = toy_data(&mut rng, 3, 5);
        let model = perturbed_model(&mut rng);
        let params = MCBMParams::default();
        let x = model.parameters(&params);
        let x = x.as_slice().unwrap();
        let mut short = vec![0.0; 3];
        assert!(matches!(
            model.compute_gradient(&data, x, Some(short.as_mut_slice()), &params),
            Err(MCBMError::GradientLengthMismatch { .. })
        ));
        let wrong_dim = toy_data(&mut rng, 2, 5);
        assert!(matches!(
            model.compute_gradient(&wrong_dim, x, None, &params),
            Err(MCBMError::InputDimMismatch { expected: 3, found: 2 })
        ));
    }

    #[test]
    // Purpose
    // -------
    // The two conditional probabilities of every input sum to one, and
    // every log-likelihood is a true log-probability.
    //
    // Given
    // -----
    // - 30 random inputs scored once with all-zero and once with all-one
    //   outputs.
    //
    // Expect
    // ------
    // - `p(0|x) + p(1|x) = 1` and `log p ≤ 0` for every column.
    fn conditional_probabilities_normalize() {
        let mut rng = StdRng::seed_from_u64(7);
        let model = perturbed_model(&mut rng);
        let input = Array2::from_shape_simple_fn((3, 30), || rng.random_range(-2.0..2.0));
        let zeros = Array2::<f64>::zeros((1, 30));
        let ones = Array2::<f64>::ones((1, 30));
        let ll0 = model.log_likelihood(input.view(), zeros.view()).unwrap();
        let ll1 = model.log_likelihood(input.view(), ones.view()).unwrap();
        for (a, b) in ll0.iter().zip(ll1.iter()) {
            assert!(*a <= 0.0 && *b <= 0.0);
            assert_abs_diff_eq!(a.exp() + b.exp(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn sample_produces_bits_and_validates_input() {
        let mut rng = StdRng::seed_from_u64(8);
        let model = perturbed_model(&mut rng);
        let input = Array2::from_shape_simple_fn((3, 50), || rng.random_range(-1.0..1.0));
        let out = model.sample(input.view(), &mut rng).unwrap();
        assert_eq!(out.dim(), (1, 50));
        assert!(out.iter().all(|&y| y == 0.0 || y == 1.0));
        assert_eq!(
            model.sample(Array2::<f64>::zeros((2, 4)).view(), &mut rng).err(),
            Some(MCBMError::InputDimMismatch { expected: 3, found: 2 })
        );
    }

    #[test]
    fn train_without_trainable_groups_is_a_no_op() {
        let mut rng = StdRng::seed_from_u64(9);
        let data = toy_data(&mut rng, 3, 10);
        let mut model = perturbed_model(&mut rng);
        let before = model.clone();
        assert!(model.train(&data, &MCBMParams::frozen()).unwrap());
        assert_eq!(model, before);
    }

    #[test]
    // Purpose
    // -------
    // Negative weights produced by an unconstrained step are projected back
    // onto the non-negative orthant.
    //
    // Given
    // -----
    // - Weights overwritten through `set_parameters`, which does not check
    //   signs, with two negative entries.
    //
    // Expect
    // ------
    // - Exactly those two entries become zero; the others are untouched.
    fn clip_negative_weights_zeroes_only_negative_entries() {
        // Arrange
        let mut rng = StdRng::seed_from_u64(10);
        let mut model = MCBM::new(2, 2, Some(2), &mut rng).unwrap();
        let params = MCBMParams { train_weights: true, ..MCBMParams::frozen() };
        model.set_parameters(&[0.3, -0.2, -1e-3, 0.0], &params).unwrap();

        // Act
        let clipped = model.clip_negative_weights();

        // Assert
        assert_eq!(clipped, 2);
        assert_eq!(model.weights(), &array![[0.3, 0.0], [0.0, 0.0]]);
        assert!(model.set_weights(model.weights().clone()).is_ok());
    }

    #[test]
    // Purpose
    // -------
    // The callback's iteration index is the number of optimizer iterations
    // actually run, and trained weights stay non-negative.
    //
    // Given
    // -----
    // - A callback that records `iter` together with the iterations the
    //   last leg reported, `cb_iter = 4`, `max_iter = 12`.
    //
    // Expect
    // ------
    // - Every reported `iter` equals the running sum of leg iterations.
    // - No negative weight after any leg.
    fn callback_sees_iterations_actually_run() {
        use std::sync::{Arc, Mutex};

        // Arrange
        let mut rng = StdRng::seed_from_u64(11);
        let data = toy_data(&mut rng, 3, 40);
        let mut model = perturbed_model(&mut rng);
        let log = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&log);
        let params = MCBMParams { max_iter: 12, cb_iter: 4, threshold: 1e-14, ..MCBMParams::default() }
            .with_callback(move |iter: usize, model: &MCBM| {
                let leg = model.results.as_ref().map_or(0, |r| r.iterations);
                let min_weight = model.weights().fold(f64::INFINITY, |a, &b| a.min(b));
                seen.lock().unwrap().push((iter, leg, min_weight));
                true
            });

        // Act
        model.train(&data, &params).unwrap();

        // Assert
        let log = log.lock().unwrap();
        assert!(!log.is_empty());
        let mut total = 0;
        for &(iter, leg, min_weight) in log.iter() {
            total += leg.max(1);
            assert_eq!(iter, total);
            assert!(min_weight >= 0.0);
        }
        assert!(model.weights().iter().all(|&w| w >= 0.0));
    }
}
