use crate::prelude::Real;
use std::io;
use thiserror::Error;

/// Errors raised while preparing or running forecasts.
///
/// Variants map to three policies: per-location skips (`MissingInput`,
/// `InsufficientHistory`, `InvalidParameter`), per-scenario failures
/// (`NumericalDivergence`, `Timeout`) and fatal run errors (everything else).
#[derive(Debug, Error)]
pub enum DelphiError {
    #[error("missing {what} for {location}")]
    MissingInput { location: String, what: String },

    #[error("not enough historical data for {location}: {found} valid points, more than {required} required")]
    InsufficientHistory {
        location: String,
        found: usize,
        required: usize,
    },

    #[error("solver diverged at t = {t:.3}: {reason}")]
    NumericalDivergence { t: Real, reason: String },

    #[error("solver exceeded the {secs:.1}s wall-clock guard at t = {t:.3}")]
    Timeout { t: Real, secs: Real },

    #[error("invalid parameter {name} = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: Real,
        reason: &'static str,
    },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Date(#[from] chrono::ParseError),
}

impl DelphiError {
    pub fn missing(location: impl ToString, what: impl ToString) -> Self {
        DelphiError::MissingInput {
            location: location.to_string(),
            what: what.to_string(),
        }
    }

    pub fn invalid(name: &'static str, value: Real, reason: &'static str) -> Self {
        DelphiError::InvalidParameter {
            name,
            value,
            reason,
        }
    }

    /// True for conditions that skip a single location and let the batch go on.
    pub fn is_location_skip(&self) -> bool {
        matches!(
            self,
            DelphiError::MissingInput { .. }
                | DelphiError::InsufficientHistory { .. }
                | DelphiError::InvalidParameter { .. }
        )
    }

    /// True for conditions that fail a single (location, scenario) unit.
    pub fn is_scenario_failure(&self) -> bool {
        matches!(
            self,
            DelphiError::NumericalDivergence { .. } | DelphiError::Timeout { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, DelphiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classes() {
        assert!(DelphiError::missing("US/Texas", "fitted parameters").is_location_skip());
        assert!(DelphiError::invalid("alpha", -1.0, "must be positive").is_location_skip());
        let err = DelphiError::NumericalDivergence {
            t: 3.0,
            reason: "step size underflow".into(),
        };
        assert!(err.is_scenario_failure());
        assert!(!err.is_location_skip());
        let timeout = DelphiError::Timeout { t: 12.5, secs: 60.0 };
        assert!(timeout.is_scenario_failure());
        assert!(!timeout.is_location_skip());
        let fatal = DelphiError::Configuration("no policies".into());
        assert!(!fatal.is_location_skip() && !fatal.is_scenario_failure());
    }

    #[test]
    fn messages_name_the_location() {
        let err = DelphiError::missing("Europe/France/None", "history table");
        assert_eq!(err.to_string(), "missing history table for Europe/France/None");
    }
}
