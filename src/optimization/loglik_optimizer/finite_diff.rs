//! loglik_optimizer::finite_diff: finite-difference gradients and checks.
//!
//! Purpose
//! -------
//! Provide numerical gradients for objectives without analytic derivatives,
//! and a central-difference oracle that measures how far an analytic
//! gradient is from its numerical counterpart.
//!
//! Key behaviors
//! -------------
//! - [`numerical_gradient`] uses `finitediff`'s central differences and
//!   falls back to forward differences when an evaluation fails or the
//!   central estimate is not finite.
//! - [`run_fd_diff`] performs the forward-difference fallback with error
//!   capture and validation.
//! - [`gradient_check_error`] perturbs every coordinate by `±epsilon`,
//!   evaluates the same objective the optimizer sees, and returns the
//!   Euclidean norm of the difference between the numerical and analytic
//!   gradients.
//!
//! Invariants & assumptions
//! ------------------------
//! - Closures handed to `finitediff` must return `f64`; errors raised inside
//!   them are stored in a shared `RefCell` and surfaced afterwards.
//! - The checker never mutates the caller's `theta`; it perturbs a private
//!   copy one coordinate at a time and restores it before moving on.
//!
//! Testing notes
//! -------------
//! - Unit tests cover quadratic objectives with known gradients, the error
//!   capture path, and sensitivity of the checker to a deliberately wrong
//!   gradient.
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        Grad, Theta,
        validation::{validate_grad, verify_step},
    },
};
use argmin::core::Error;
use finitediff::FiniteDiff;
use std::cell::RefCell;

/// run_fd_diff: forward-difference gradient with error capture and validation.
///
/// Clears `closure_err`, runs `forward_diff`, and returns any error captured
/// while `func` was being evaluated; otherwise validates the gradient.
///
/// # Errors
/// - The error captured in `closure_err`, converted into `OptError`.
/// - `GradientDimMismatch` / `InvalidGradient` from [`validate_grad`].
pub fn run_fd_diff<G: Fn(&Theta) -> f64>(
    theta: &Theta, func: &G, closure_err: &RefCell<Option<Error>>,
) -> OptResult<Grad> {
    closure_err.replace(None);
    let fd_grad = theta.forward_diff(func);
    let dim = theta.len();
    if let Some(err) = closure_err.take() {
        return Err(err.into());
    }
    validate_grad(&fd_grad, dim)?;
    Ok(fd_grad)
}

/// numerical_gradient: central differences with a forward-difference fallback.
///
/// `func` follows the same capture convention as [`run_fd_diff`]: on failure
/// it stores the error in `closure_err` and returns `NaN`.
///
/// # Errors
/// - Any error raised by `func` during the forward-difference retry.
/// - Validation errors of the forward-difference gradient.
pub fn numerical_gradient<G: Fn(&Theta) -> f64>(
    theta: &Theta, func: &G, closure_err: &RefCell<Option<Error>>,
) -> OptResult<Grad> {
    let central = theta.central_diff(func);
    if closure_err.borrow().is_some() {
        return run_fd_diff(theta, func, closure_err);
    }
    match validate_grad(&central, theta.len()) {
        Ok(()) => Ok(central),
        Err(_) => run_fd_diff(theta, func, closure_err),
    }
}

/// gradient_check_error: distance between analytic and numerical gradients.
///
/// For every coordinate `i` the objective is evaluated at `θ + ε·e_i` and
/// `θ − ε·e_i` and the central estimate `(f₊ − f₋) / 2ε` is compared with
/// `analytic[i]`.
///
/// Returns `‖analytic − numerical‖₂`, which tends to zero with `ε` for a
/// correct gradient.
///
/// # Errors
/// - `InvalidStep` if `epsilon` is non-finite or not positive.
/// - `GradientDimMismatch` if `analytic.len() != theta.len()`.
/// - Any error returned by `func`.
pub fn gradient_check_error<G>(
    theta: &Theta, analytic: &Grad, epsilon: f64, mut func: G,
) -> OptResult<f64>
where
    G: FnMut(&Theta) -> OptResult<f64>,
{
    verify_step(epsilon)?;
    if analytic.len() != theta.len() {
        return Err(crate::optimization::errors::OptError::GradientDimMismatch {
            expected: theta.len(),
            found: analytic.len(),
        });
    }
    let mut perturbed = theta.clone();
    let mut sq_err = 0.0;
    for i in 0..theta.len() {
        perturbed[i] = theta[i] + epsilon;
        let upper = func(&perturbed)?;
        perturbed[i] = theta[i] - epsilon;
        let lower = func(&perturbed)?;
        perturbed[i] = theta[i];
        let numerical = (upper - lower) / (2.0 * epsilon);
        let diff = analytic[i] - numerical;
        sq_err += diff * diff;
    }
    Ok(sq_err.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::errors::OptError;
    use approx::assert_abs_diff_eq;
    use argmin::core::ArgminError;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // Central differences reproduce the gradient of a smooth quadratic.
    //
    // Given
    // -----
    // - f(θ) = θ₀² + 3θ₁ at θ = (1, 2).
    //
    // Expect
    // ------
    // - ∇f ≈ (2, 3).
    fn numerical_gradient_matches_quadratic() {
        // Arrange
        let theta = array![1.0, 2.0];
        let closure_err: RefCell<Option<Error>> = RefCell::new(None);
        let f = |x: &Theta| x[0] * x[0] + 3.0 * x[1];

        // Act
        let grad = numerical_gradient(&theta, &f, &closure_err).unwrap();

        // Assert
        assert_abs_diff_eq!(grad[0], 2.0, epsilon = 1e-6);
        assert_abs_diff_eq!(grad[1], 3.0, epsilon = 1e-6);
    }

    #[test]
    // Purpose
    // -------
    // An error recorded by the objective closure must surface instead of a
    // NaN gradient.
    //
    // Given
    // -----
    // - A closure that always records `ArgminError::PotentialBug`.
    //
    // Expect
    // ------
    // - `OptError::PotentialBug`.
    fn numerical_gradient_surfaces_captured_error() {
        // Arrange
        let theta = array![0.0];
        let closure_err: RefCell<Option<Error>> = RefCell::new(None);
        let f = |_: &Theta| {
            closure_err
                .borrow_mut()
                .get_or_insert_with(|| ArgminError::PotentialBug { text: "boom".into() }.into());
            f64::NAN
        };

        // Act
        let err = numerical_gradient(&theta, &f, &closure_err).unwrap_err();

        // Assert
        assert_eq!(err, OptError::PotentialBug { text: "boom".into() });
    }

    #[test]
    // Purpose
    // -------
    // The checker reports ~0 for a correct gradient and a clearly positive
    // value for a wrong one.
    //
    // Given
    // -----
    // - f(θ) = sin(θ₀)·θ₁ at θ = (0.3, -1.2), analytic gradient computed by
    //   hand, and a copy with the second entry off by 0.1.
    //
    // Expect
    // ------
    // - error < 1e-8 for the correct gradient, ≈ 0.1 for the wrong one.
    fn gradient_check_error_separates_right_from_wrong() {
        // Arrange
        let theta: Theta = array![0.3, -1.2];
        let f = |x: &Theta| -> OptResult<f64> { Ok(x[0].sin() * x[1]) };
        let good = array![theta[0].cos() * theta[1], theta[0].sin()];
        let mut bad = good.clone();
        bad[1] += 0.1;

        // Act
        let e_good = gradient_check_error(&theta, &good, 1e-5, f).unwrap();
        let e_bad = gradient_check_error(&theta, &bad, 1e-5, f).unwrap();

        // Assert
        assert!(e_good < 1e-8, "correct gradient flagged: {e_good}");
        assert_abs_diff_eq!(e_bad, 0.1, epsilon = 1e-6);
    }

    #[test]
    fn gradient_check_error_rejects_bad_inputs() {
        let theta = array![1.0, 2.0];
        let f = |x: &Theta| -> OptResult<f64> { Ok(x.sum()) };
        assert!(matches!(
            gradient_check_error(&theta, &array![1.0, 1.0], 0.0, f),
            Err(OptError::InvalidStep { .. })
        ));
        assert_eq!(
            gradient_check_error(&theta, &array![1.0], 1e-4, f),
            Err(OptError::GradientDimMismatch { expected: 2, found: 1 })
        );
    }
}
