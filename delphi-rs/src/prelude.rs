pub use crate::error::{DelphiError, Result};
pub use crate::model::{Compartment, EpiState, N_COMPARTMENTS};
pub use crate::params::{
    CurrentPolicyMap, FittedParams, GlobalParamsFixed, PolicyGammaMap, RateConstants,
};

/// Basic representation of simulated time, measured in days since the
/// location's anchor date.
pub type Time = Real;

/// Base Real type used by this crate. Uses an alias to easily change precision
/// if necessary.
pub type Real = f64;

/// Calendar dates used at the input/output boundary.
pub type Date = chrono::NaiveDate;
