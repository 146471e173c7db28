//! Shared forward pass of the conditional mixture model.
//!
//! For a batch `x` (`D × B`) and bound parameters the pass computes
//!
//! ```text
//! u   = featuresᵀ x                                    (F × B)
//! a⁰  = weights · u² + input_biasᵀ x + priors          (K × B)
//! a¹  = a⁰ + predictors · x + output_bias              (K × B)
//! ℓ⁰  = lse_k a⁰,   ℓ¹ = lse_k a¹                      (B)
//! log p(y = j | x) = ℓʲ − lse(ℓ⁰, ℓ¹)
//! ```
//!
//! together with the per-expert log-responsibilities `a^j − ℓ^j`. Sampling,
//! the likelihood and the gradient engine all consume the same
//! [`ForwardPass`], so they describe one probability model.
use crate::{
    mcbm::core::layout::ParamViews,
    optimization::numerical_stability::{log_sum_exp_cols, log_sum_exp_pair},
};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, Zip};

#[derive(Debug, Clone)]
pub struct ForwardPass {
    /// `featuresᵀ x`, `F × B`.
    pub feature_output: Array2<f64>,
    /// Element-wise square of `feature_output`.
    pub feature_energy: Array2<f64>,
    /// `a⁰ − ℓ⁰` per expert, `K × B`.
    pub log_post0: Array2<f64>,
    /// `a¹ − ℓ¹` per expert, `K × B`.
    pub log_post1: Array2<f64>,
    /// Normalized `log p(y = 0 | x)`, `B`.
    pub log_prob0: Array1<f64>,
    /// Normalized `log p(y = 1 | x)`, `B`.
    pub log_prob1: Array1<f64>,
}

impl ForwardPass {
    pub fn new(params: &ParamViews<'_>, input: ArrayView2<f64>) -> Self {
        let feature_output = params.features.t().dot(&input);
        let feature_energy = feature_output.mapv(|u| u * u);

        let mut joint0 = params.weights.dot(&feature_energy) + params.input_bias.t().dot(&input);
        joint0 += &params.priors.insert_axis(Axis(1));
        let mut joint1 = &joint0 + &params.predictors.dot(&input);
        joint1 += &params.output_bias.insert_axis(Axis(1));

        let mut log_prob0 = log_sum_exp_cols(joint0.view());
        let mut log_prob1 = log_sum_exp_cols(joint1.view());
        let log_post0 = joint0 - &log_prob0.view().insert_axis(Axis(0));
        let log_post1 = joint1 - &log_prob1.view().insert_axis(Axis(0));

        Zip::from(&mut log_prob0).and(&mut log_prob1).for_each(|lp0, lp1| {
            let norm = log_sum_exp_pair(*lp0, *lp1);
            *lp0 -= norm;
            *lp1 -= norm;
        });

        Self { feature_output, feature_energy, log_post0, log_post1, log_prob0, log_prob1 }
    }

    /// Number of columns in the batch.
    pub fn len(&self) -> usize {
        self.log_prob0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log_prob0.is_empty()
    }

    /// `log p(y_n | x_n)` for every column of the batch.
    pub fn log_likelihood(&self, output: ArrayView1<f64>) -> Array1<f64> {
        Zip::from(&output)
            .and(&self.log_prob0)
            .and(&self.log_prob1)
            .map_collect(|&y, &lp0, &lp1| if y == 1.0 { lp1 } else { lp0 })
    }

    /// Per-sample residual `y·p(0|x) − (1 − y)·p(1|x)`, the derivative of
    /// the log-likelihood with respect to the `y = 1` class energy.
    pub fn residual(&self, output: ArrayView1<f64>) -> Array1<f64> {
        Zip::from(&output)
            .and(&self.log_prob0)
            .and(&self.log_prob1)
            .map_collect(|&y, &lp0, &lp1| y * lp0.exp() - (1.0 - y) * lp1.exp())
    }
}
