//! The DELPHI compartmental model: state vector, government-response curve,
//! policy overlay, derivatives and initial conditions.
mod derivatives;
mod initial;
mod overlay;
pub mod response;
mod state;

pub use derivatives::*;
pub use initial::*;
pub use overlay::*;
pub use state::*;
