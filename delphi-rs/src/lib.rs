//! Policy-scenario forecasts for a DELPHI-style compartmental epidemic model.
//!
//! Given a fitted parameter vector for each location, this crate integrates
//! the 16-compartment model forward under every (future policy, enactment
//! delay) scenario and assembles the resulting time series.
pub mod config;
pub mod error;
pub mod inputs;
pub mod model;
pub mod params;
pub mod prelude;
pub mod scenario;
pub mod solver;
pub mod utils;

pub use crate::config::RunConfig;
pub use crate::error::{DelphiError, Result};
pub use crate::scenario::{run_batch, BatchOutput, RunReport};
