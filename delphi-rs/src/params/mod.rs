//! Parameters consumed by the forecasting core.
//!
//! Fitted parameters come from an external optimizer, fixed parameters are
//! derived from history and global constants, and policy maps come from the
//! decision-tree analysis of intervention data. All of them are read-only once
//! a run starts.
pub mod constants;
mod fitted;
mod fixed;
mod policy;

pub use fitted::*;
pub use fixed::*;
pub use policy::*;
