//! Progress callbacks for conditional mixture training.
//!
//! A [`TrainingCallback`] is invoked by [`MCBM::train`](crate::mcbm::models::MCBM::train)
//! every `cb_iter` optimizer iterations with the iteration count reached so
//! far and the model, whose parameters already hold the latest iterate.
//! Returning `false` stops training.
//!
//! Callbacks live inside [`MCBMParams`](crate::mcbm::core::options::MCBMParams)
//! as `Option<Box<dyn TrainingCallback>>`; cloning the parameters deep-clones
//! the callback through `clone_box`, and each box is dropped exactly once.
//! Any `FnMut(usize, &MCBM) -> bool` closure that is `Clone + Send` can be
//! used directly.
use crate::mcbm::models::mcbm::MCBM;

pub trait TrainingCallback: Send {
    /// Observe the model after `iter` iterations. `false` requests a stop.
    fn call(&mut self, iter: usize, model: &MCBM) -> bool;

    fn clone_box(&self) -> Box<dyn TrainingCallback>;
}

impl<F> TrainingCallback for F
where
    F: FnMut(usize, &MCBM) -> bool + Clone + Send + 'static,
{
    fn call(&mut self, iter: usize, model: &MCBM) -> bool {
        self(iter, model)
    }

    fn clone_box(&self) -> Box<dyn TrainingCallback> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn TrainingCallback> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl std::fmt::Debug for dyn TrainingCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TrainingCallback")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    #[test]
    // Purpose
    // -------
    // Cloning a boxed callback produces an independent copy that still
    // reaches shared state the closure captured.
    //
    // Given
    // -----
    // - A closure with a private call counter and a shared `Arc` counter.
    //
    // Expect
    // ------
    // - Both boxes observe their own private count, and the shared count
    //   sees every call.
    fn clone_box_deep_copies_closure_state() {
        // Arrange
        let shared = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&shared);
        let mut private = 0usize;
        let closure = move |_iter: usize, _model: &MCBM| {
            private += 1;
            seen.fetch_add(1, Ordering::SeqCst);
            private < 2
        };
        let mut original: Box<dyn TrainingCallback> = Box::new(closure);
        let mut rng = rand::rng();
        let model = MCBM::new(1, 1, None, &mut rng).unwrap();

        // Act
        assert!(original.call(1, &model));
        let mut copy = original.clone();
        let original_second = original.call(2, &model);
        let copy_second = copy.call(2, &model);

        // Assert
        assert!(!original_second);
        assert!(!copy_second);
        assert_eq!(shared.load(Ordering::SeqCst), 3);
    }
}
