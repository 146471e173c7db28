//! Optimizer adapter for the conditional mixture model.
//!
//! [`MCBMObjective`] exposes [`MCBM::compute_gradient`] through the crate's
//! [`LogLikelihood`] trait so the L-BFGS driver can maximize it. The
//! objective borrows the model for its frozen groups and the training
//! parameters for the layout; `θ` holds exactly the trainable groups.
use crate::{
    mcbm::{core::data::MCBMData, core::options::MCBMParams, models::mcbm::MCBM},
    optimization::{
        errors::{OptError, OptResult},
        loglik_optimizer::{Grad, LogLikelihood, Theta, validation::validate_theta},
    },
};

#[derive(Debug, Clone, Copy)]
pub struct MCBMObjective<'a> {
    model: &'a MCBM,
    params: &'a MCBMParams,
}

impl<'a> MCBMObjective<'a> {
    pub fn new(model: &'a MCBM, params: &'a MCBMParams) -> Self {
        Self { model, params }
    }
}

impl LogLikelihood for MCBMObjective<'_> {
    type Data = MCBMData;

    /// Average log-likelihood in bits per sample minus the regularizers.
    fn value(&self, theta: &Theta, data: &MCBMData) -> OptResult<f64> {
        let x = theta.as_slice().ok_or(OptError::NonContiguousTheta)?;
        Ok(self.model.compute_gradient(data, x, None, self.params)?)
    }

    /// `θ` must match the trainable layout and be finite.
    fn check(&self, theta: &Theta, data: &MCBMData) -> OptResult<()> {
        let expected = self.model.num_parameters(self.params);
        if theta.len() != expected {
            return Err(OptError::Model {
                text: format!("parameter vector has length {}, expected {expected}", theta.len()),
            });
        }
        validate_theta(theta)?;
        if data.dim_in() != self.model.dims().dim_in {
            return Err(OptError::Model {
                text: format!(
                    "input has {} rows, model expects {}",
                    data.dim_in(),
                    self.model.dims().dim_in
                ),
            });
        }
        Ok(())
    }

    fn grad(&self, theta: &Theta, data: &MCBMData) -> OptResult<Grad> {
        let x = theta.as_slice().ok_or(OptError::NonContiguousTheta)?;
        let mut g = vec![0.0; x.len()];
        self.model.compute_gradient(data, x, Some(g.as_mut_slice()), self.params)?;
        Ok(Grad::from(g))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::loglik_optimizer::adapter::ArgMinAdapter;
    use approx::assert_abs_diff_eq;
    use argmin::core::{CostFunction, Gradient};
    use ndarray::{Array1, array};
    use rand::{SeedableRng, rngs::StdRng};

    fn setup() -> (MCBM, MCBMData) {
        let mut rng = StdRng::seed_from_u64(21);
        let model = MCBM::new(2, 2, Some(2), &mut rng).unwrap();
        let data = MCBMData::new(
            array![[1.0, -1.0, 0.5, -0.5], [0.2, 0.1, -0.3, 0.0]],
            array![[1.0, 0.0, 1.0, 0.0]],
        )
        .unwrap();
        (model, data)
    }

    #[test]
    // Purpose
    // -------
    // The argmin cost is minus the model objective and its gradient is the
    // negated analytic gradient.
    //
    // Given
    // -----
    // - A small model, all groups trainable, wrapped in `ArgMinAdapter`.
    //
    // Expect
    // ------
    // - `cost(θ) = -compute_gradient(θ)` and `∇cost = -g`.
    fn adapter_negates_value_and_gradient() {
        // Arrange
        let (model, data) = setup();
        let params = MCBMParams::default();
        let objective = MCBMObjective::new(&model, &params);
        let theta = model.parameters(&params);
        let mut g = vec![0.0; theta.len()];
        let value = model
            .compute_gradient(&data, theta.as_slice().unwrap(), Some(g.as_mut_slice()), &params)
            .unwrap();

        // Act
        let problem = ArgMinAdapter::new(&objective, &data);
        let cost = problem.cost(&theta).unwrap();
        let grad = problem.gradient(&theta).unwrap();

        // Assert
        assert_abs_diff_eq!(cost, -value, epsilon = 1e-15);
        for (a, b) in grad.iter().zip(g.iter()) {
            assert_abs_diff_eq!(*a, -*b, epsilon = 1e-15);
        }
    }

    #[test]
    fn check_rejects_wrong_length_and_non_finite() {
        let (model, data) = setup();
        let params = MCBMParams::default();
        let objective = MCBMObjective::new(&model, &params);
        assert!(matches!(
            objective.check(&Array1::zeros(3), &data),
            Err(OptError::Model { .. })
        ));
        let mut theta = model.parameters(&params);
        theta[0] = f64::NAN;
        assert!(objective.check(&theta, &data).is_err());
        assert!(objective.check(&model.parameters(&params), &data).is_ok());
    }
}
