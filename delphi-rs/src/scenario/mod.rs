//! Scenario orchestration.
//!
//! Each location is validated once, then integrated under every
//! (future policy, enactment delay) pair. The (location, scenario) units are
//! independent and run on the rayon pool.
mod dataset;
mod location;
mod runner;
mod task;

pub use dataset::*;
pub use location::*;
pub use runner::*;
pub use task::*;
