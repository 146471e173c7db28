//! mcbm::models: the MCBM estimator and its optimizer adapter.

pub mod mcbm;
pub mod objective;

pub use self::mcbm::MCBM;
pub use self::objective::MCBMObjective;
