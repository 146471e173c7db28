//! Training configuration for the conditional mixture model.
//!
//! [`MCBMParams`] bundles everything `train`, `compute_gradient` and
//! `check_gradient` need: which parameter groups are trainable, quadratic
//! regularization strengths, batching, optimizer limits, and an optional
//! progress callback. It converts into the optimizer's own [`MLEOptions`]
//! via [`MCBMParams::mle_options`].
use crate::{
    mcbm::{
        core::{callback::TrainingCallback, layout::ParamGroup},
        errors::{MCBMError, MCBMResult},
    },
    optimization::loglik_optimizer::{LineSearcher, MLEOptions, Tolerances},
};

/// Fields
/// ------
/// - `verbosity`: `0` silent, `1` logs one `info` line per training leg,
///   `> 1` also enables the optimizer's observer (feature `obs_slog`).
/// - `max_iter`: total L-BFGS iteration budget.
/// - `threshold`: gradient-norm and cost-change tolerance of L-BFGS.
/// - `num_grad`: number of past gradients kept by L-BFGS.
/// - `batch_size`: columns processed per forward pass.
/// - `callback` / `cb_iter`: optional callback invoked every `cb_iter`
///   iterations.
/// - `train_*`: trainable groups, in layout order.
/// - `regularize_*`: strength `λ` of the penalty `λ‖θ_g‖²` for each
///   regularizable group, applied only while the group is trainable.
/// - `line_searcher`: line search used by L-BFGS.
#[derive(Debug, Clone)]
pub struct MCBMParams {
    pub verbosity: usize,
    pub max_iter: usize,
    pub threshold: f64,
    pub num_grad: usize,
    pub batch_size: usize,
    pub callback: Option<Box<dyn TrainingCallback>>,
    pub cb_iter: usize,
    pub train_priors: bool,
    pub train_weights: bool,
    pub train_features: bool,
    pub train_predictors: bool,
    pub train_input_bias: bool,
    pub train_output_bias: bool,
    pub regularize_weights: f64,
    pub regularize_features: f64,
    pub regularize_predictors: f64,
    pub regularize_input_bias: f64,
    pub line_searcher: LineSearcher,
}

impl Default for MCBMParams {
    fn default() -> Self {
        Self {
            verbosity: 0,
            max_iter: 1000,
            threshold: 1e-5,
            num_grad: 20,
            batch_size: 2000,
            callback: None,
            cb_iter: 25,
            train_priors: true,
            train_weights: true,
            train_features: true,
            train_predictors: true,
            train_input_bias: true,
            train_output_bias: true,
            regularize_weights: 0.0,
            regularize_features: 0.0,
            regularize_predictors: 0.0,
            regularize_input_bias: 0.0,
            line_searcher: LineSearcher::MoreThuente,
        }
    }
}

impl MCBMParams {
    /// Parameters with every group frozen. Combine with struct update
    /// syntax to select a subset.
    pub fn frozen() -> Self {
        Self::default().with_trainable(|_| false)
    }

    /// Set every `train_*` flag from `select`.
    pub fn with_trainable(mut self, select: impl Fn(ParamGroup) -> bool) -> Self {
        self.train_priors = select(ParamGroup::Priors);
        self.train_weights = select(ParamGroup::Weights);
        self.train_features = select(ParamGroup::Features);
        self.train_predictors = select(ParamGroup::Predictors);
        self.train_input_bias = select(ParamGroup::InputBias);
        self.train_output_bias = select(ParamGroup::OutputBias);
        self
    }

    /// Install `callback`, replacing any previous one.
    pub fn with_callback<C: TrainingCallback + 'static>(mut self, callback: C) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }

    pub fn is_trainable(&self, group: ParamGroup) -> bool {
        match group {
            ParamGroup::Priors => self.train_priors,
            ParamGroup::Weights => self.train_weights,
            ParamGroup::Features => self.train_features,
            ParamGroup::Predictors => self.train_predictors,
            ParamGroup::InputBias => self.train_input_bias,
            ParamGroup::OutputBias => self.train_output_bias,
        }
    }

    /// Penalty strength for `group`; priors and output biases are never
    /// regularized.
    pub fn regularizer(&self, group: ParamGroup) -> f64 {
        match group {
            ParamGroup::Weights => self.regularize_weights,
            ParamGroup::Features => self.regularize_features,
            ParamGroup::Predictors => self.regularize_predictors,
            ParamGroup::InputBias => self.regularize_input_bias,
            ParamGroup::Priors | ParamGroup::OutputBias => 0.0,
        }
    }

    /// # Errors
    /// - [`MCBMError::InvalidParam`] for a zero `max_iter`, `num_grad`,
    ///   `batch_size` or `cb_iter`, a `threshold` that is not finite and
    ///   positive, or a negative / non-finite regularizer.
    pub fn validate(&self) -> MCBMResult<()> {
        let counts = [
            ("max_iter", self.max_iter),
            ("num_grad", self.num_grad),
            ("batch_size", self.batch_size),
            ("cb_iter", self.cb_iter),
        ];
        for (name, value) in counts {
            if value == 0 {
                return Err(MCBMError::InvalidParam { name, reason: "must be > 0" });
            }
        }
        if !(self.threshold.is_finite() && self.threshold > 0.0) {
            return Err(MCBMError::InvalidParam {
                name: "threshold",
                reason: "must be finite and > 0",
            });
        }
        let regularizers = [
            ("regularize_weights", self.regularize_weights),
            ("regularize_features", self.regularize_features),
            ("regularize_predictors", self.regularize_predictors),
            ("regularize_input_bias", self.regularize_input_bias),
        ];
        for (name, value) in regularizers {
            if !(value.is_finite() && value >= 0.0) {
                return Err(MCBMError::InvalidParam { name, reason: "must be finite and >= 0" });
            }
        }
        Ok(())
    }

    /// Optimizer options for a run of at most `max_iter` iterations.
    ///
    /// `threshold` is used as both the gradient and the cost-change
    /// tolerance, `num_grad` as the L-BFGS memory, and the optimizer
    /// observer is enabled for `verbosity > 1`.
    pub fn mle_options(&self, max_iter: usize) -> MCBMResult<MLEOptions> {
        let tols = Tolerances::new(Some(self.threshold), Some(self.threshold), Some(max_iter))?;
        Ok(MLEOptions::new(tols, self.line_searcher, self.verbosity > 1, Some(self.num_grad))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate_and_train_everything() {
        let params = MCBMParams::default();
        assert!(params.validate().is_ok());
        assert!(ParamGroup::ALL.iter().all(|&g| params.is_trainable(g)));
        assert!(params.callback.is_none());
    }

    #[test]
    // Purpose
    // -------
    // Optimizer options carry the training limits.
    //
    // Given
    // -----
    // - Default parameters with `num_grad = 5`, asked for a 30-iteration leg.
    //
    // Expect
    // ------
    // - `max_iter = 30`, both tolerances equal to `threshold`, memory 5.
    fn mle_options_forward_limits() {
        let params = MCBMParams { num_grad: 5, ..MCBMParams::default() };
        let opts = params.mle_options(30).unwrap();
        assert_eq!(opts.tols.max_iter, Some(30));
        assert_eq!(opts.tols.tol_grad, Some(1e-5));
        assert_eq!(opts.tols.tol_cost, Some(1e-5));
        assert_eq!(opts.lbfgs_mem, Some(5));
        assert!(!opts.verbose);
    }

    #[test]
    fn validate_names_offending_field() {
        let params = MCBMParams { batch_size: 0, ..MCBMParams::default() };
        assert_eq!(
            params.validate(),
            Err(MCBMError::InvalidParam { name: "batch_size", reason: "must be > 0" })
        );
        let params = MCBMParams { regularize_features: -0.1, ..MCBMParams::default() };
        assert!(matches!(
            params.validate(),
            Err(MCBMError::InvalidParam { name: "regularize_features", .. })
        ));
    }

    #[test]
    fn frozen_then_select_subset() {
        let params = MCBMParams { train_weights: true, ..MCBMParams::frozen() };
        let trainable: Vec<_> =
            ParamGroup::ALL.iter().copied().filter(|&g| params.is_trainable(g)).collect();
        assert_eq!(trainable, vec![ParamGroup::Weights]);
        assert_eq!(params.regularizer(ParamGroup::Priors), 0.0);
    }
}
