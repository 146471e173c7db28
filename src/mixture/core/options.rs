//! Training configuration for mixtures and their components.
//!
//! - [`MixtureParams`] drives the EM loop: iteration cap, relative
//!   convergence threshold, validation spacing / look-ahead for early
//!   stopping, and which parts of the mixture are re-estimated.
//! - [`ComponentParams`] is a single bundle forwarded unchanged to every
//!   component. It already carries the toggles used by common components
//!   (means, covariances, scales, inner priors); each component reads the
//!   fields it understands and ignores the rest.
//!
//! Both are plain value types with public fields, `Default` impls, and a
//! `validate()` hook run at the start of every training call.
use crate::mixture::errors::{MixtureError, MixtureResult};

/// EM configuration for [`Mixture`](crate::mixture::models::mixture::Mixture).
///
/// Fields
/// ------
/// - `verbosity`: `0` silent, `> 0` logs one line per EM iteration at `info`.
/// - `max_iter`: maximum number of EM iterations.
/// - `threshold`: stop once the relative improvement of the average negative
///   log-likelihood falls below this value.
/// - `val_iter`: with a validation set, evaluate it every `val_iter`
///   iterations.
/// - `val_look_ahead`: stop after this many consecutive validation checks
///   without improvement, restoring the best snapshot.
/// - `initialize`: let `train` run `initialize` when the mixture is not yet
///   initialized.
/// - `train_priors` / `train_components`: which parts the M-step updates.
/// - `regularize_priors`: pseudo-count added to every component's
///   responsibility mass before renormalizing the priors.
#[derive(Debug, Clone, PartialEq)]
pub struct MixtureParams {
    pub verbosity: usize,
    pub max_iter: usize,
    pub threshold: f64,
    pub val_iter: usize,
    pub val_look_ahead: usize,
    pub initialize: bool,
    pub train_priors: bool,
    pub train_components: bool,
    pub regularize_priors: f64,
}

impl Default for MixtureParams {
    fn default() -> Self {
        Self {
            verbosity: 0,
            max_iter: 100,
            threshold: 1e-8,
            val_iter: 2,
            val_look_ahead: 5,
            initialize: true,
            train_priors: true,
            train_components: true,
            regularize_priors: 0.0,
        }
    }
}

impl MixtureParams {
    /// Check numeric fields.
    ///
    /// # Errors
    /// - [`MixtureError::InvalidParam`] for a zero `val_iter` /
    ///   `val_look_ahead`, a non-finite or negative `threshold`, or a
    ///   non-finite or negative `regularize_priors`.
    pub fn validate(&self) -> MixtureResult<()> {
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(MixtureError::InvalidParam {
                name: "threshold",
                reason: "must be finite and >= 0",
            });
        }
        if self.val_iter == 0 {
            return Err(MixtureError::InvalidParam { name: "val_iter", reason: "must be > 0" });
        }
        if self.val_look_ahead == 0 {
            return Err(MixtureError::InvalidParam {
                name: "val_look_ahead",
                reason: "must be > 0",
            });
        }
        if !self.regularize_priors.is_finite() || self.regularize_priors < 0.0 {
            return Err(MixtureError::InvalidParam {
                name: "regularize_priors",
                reason: "must be finite and >= 0",
            });
        }
        Ok(())
    }
}

/// Configuration forwarded to each component's `initialize` / `train`.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentParams {
    pub verbosity: usize,
    pub max_iter: usize,
    pub threshold: f64,
    pub train_priors: bool,
    pub train_covariance: bool,
    pub train_scales: bool,
    pub train_mean: bool,
    pub regularize_priors: f64,
    pub regularize_covariance: f64,
    pub regularize_scales: f64,
    pub regularize_mean: f64,
}

impl Default for ComponentParams {
    fn default() -> Self {
        Self {
            verbosity: 0,
            max_iter: 10,
            threshold: 1e-8,
            train_priors: true,
            train_covariance: true,
            train_scales: true,
            train_mean: true,
            regularize_priors: 0.0,
            regularize_covariance: 0.0,
            regularize_scales: 0.0,
            regularize_mean: 0.0,
        }
    }
}

impl ComponentParams {
    /// Regularizers must be finite and non-negative.
    pub fn validate(&self) -> MixtureResult<()> {
        let checks = [
            ("regularize_priors", self.regularize_priors),
            ("regularize_covariance", self.regularize_covariance),
            ("regularize_scales", self.regularize_scales),
            ("regularize_mean", self.regularize_mean),
        ];
        for (name, value) in checks {
            if !value.is_finite() || value < 0.0 {
                return Err(MixtureError::InvalidParam { name, reason: "must be finite and >= 0" });
            }
        }
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(MixtureError::InvalidParam {
                name: "threshold",
                reason: "must be finite and >= 0",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(MixtureParams::default().validate().is_ok());
        assert!(ComponentParams::default().validate().is_ok());
    }

    #[test]
    // Purpose
    // -------
    // Zero validation spacing would never check the validation set.
    //
    // Given
    // -----
    // - `val_iter = 0`, and separately a negative covariance regularizer.
    //
    // Expect
    // ------
    // - `InvalidParam` naming the offending field.
    fn invalid_fields_are_named_in_the_error() {
        let params = MixtureParams { val_iter: 0, ..MixtureParams::default() };
        assert_eq!(
            params.validate(),
            Err(MixtureError::InvalidParam { name: "val_iter", reason: "must be > 0" })
        );

        let cparams = ComponentParams { regularize_covariance: -1.0, ..Default::default() };
        assert!(matches!(
            cparams.validate(),
            Err(MixtureError::InvalidParam { name: "regularize_covariance", .. })
        ));
    }
}
