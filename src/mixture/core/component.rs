//! The mixture component contract.
//!
//! A [`Component`] is any [`Distribution`] that can also be (re-)fitted to
//! data, optionally with per-sample responsibility weights from an E-step.
//! The mixture owns its components as `Box<dyn Component>` and never looks
//! inside them; concrete variants are supplied by the embedding crate (see
//! [`DiagonalGaussian`](crate::mixture::models::gaussian::DiagonalGaussian)
//! for a reference implementation, and [`Mixture`](crate::mixture::models::mixture::Mixture)
//! itself, which makes mixtures of mixtures possible).
//!
//! Components keep internal state across EM iterations, so they are always
//! moved or deep-cloned as a unit (`clone_box`), never shared.
use crate::{
    distribution::Distribution,
    mixture::{core::options::ComponentParams, errors::MixtureResult},
};
use ndarray::{ArrayView1, ArrayView2};
use rand::RngCore;

pub trait Component: Distribution<Error = crate::mixture::errors::MixtureError> {
    /// Set a starting point from `data` (`dim × N`). How the data is
    /// partitioned or sampled is up to the component.
    fn initialize(
        &mut self, data: ArrayView2<f64>, params: &ComponentParams, rng: &mut dyn RngCore,
    ) -> MixtureResult<()>;

    /// Fit to `data` with equal weights. Returns whether the component's
    /// own optimization converged.
    fn train(&mut self, data: ArrayView2<f64>, params: &ComponentParams) -> MixtureResult<bool>;

    /// Fit to `data` where column `n` carries non-negative weight
    /// `weights[n]`. Weights need not sum to one.
    fn train_weighted(
        &mut self, data: ArrayView2<f64>, weights: ArrayView1<f64>, params: &ComponentParams,
    ) -> MixtureResult<bool>;

    /// Deep copy behind a fresh box.
    fn clone_box(&self) -> Box<dyn Component>;
}

impl Clone for Box<dyn Component> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl std::fmt::Debug for dyn Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Component(dim = {})", self.dim())
    }
}
