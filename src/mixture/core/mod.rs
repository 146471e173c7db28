//! mixture::core: component contract and training configuration.
//!
//! - [`component`]: the [`Component`] trait every mixture member implements,
//!   plus deep-cloning of boxed components.
//! - [`options`]: [`MixtureParams`] for the EM loop and [`ComponentParams`]
//!   forwarded to each component.

pub mod component;
pub mod options;

pub use self::component::Component;
pub use self::options::{ComponentParams, MixtureParams};
