//! mcbm::core: data, configuration and numerics behind the MCBM model.
//!
//! - [`data`]: [`MCBMData`], the validated `(input, output)` training pair.
//! - [`options`]: [`MCBMParams`], trainable groups, regularization,
//!   batching and optimizer limits.
//! - [`callback`]: [`TrainingCallback`] invoked during training.
//! - [`layout`]: [`ParamGroup`] / [`ParamLayout`], the flattened-parameter
//!   contract shared by packing, unpacking and the gradient engine.
//! - [`forward`]: [`ForwardPass`], the single forward computation used by
//!   sampling, likelihood and gradients.

pub mod callback;
pub mod data;
pub mod forward;
pub mod layout;
pub mod options;

pub use self::callback::TrainingCallback;
pub use self::data::MCBMData;
pub use self::forward::ForwardPass;
pub use self::layout::{GroupSource, MCBMDims, ParamGroup, ParamLayout, ParamViews};
pub use self::options::MCBMParams;
