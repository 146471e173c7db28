//! mixture::models: the mixture container and a reference component.
//!
//! - [`mixture`]: [`Mixture`], EM training with optional validation-based
//!   early stopping. Also usable as a component (mixtures of mixtures).
//! - [`gaussian`]: [`DiagonalGaussian`], an axis-aligned Gaussian with
//!   closed-form weighted updates.

pub mod gaussian;
pub mod mixture;

pub use self::gaussian::DiagonalGaussian;
pub use self::mixture::Mixture;
