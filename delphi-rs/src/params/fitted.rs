use crate::prelude::{DelphiError, Real, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::LN_2;

/// Number of scalars in a fitted parameter vector.
pub const N_FITTED: usize = 12;

/// Column layout of an externally fitted parameter vector.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamLayout {
    /// Rates are stored directly.
    Python,
    /// Older runs store the death-rate slot as a half-life, in days.
    Mathematica,
}

impl Default for ParamLayout {
    fn default() -> Self {
        ParamLayout::Python
    }
}

impl ParamLayout {
    /// Column of the first fitted value in a parameter table row.
    pub fn column_offset(self) -> usize {
        match self {
            ParamLayout::Python => 5,
            ParamLayout::Mathematica => 4,
        }
    }
}

/// The 12 fitted parameters of a location, in their canonical order.
///
/// Instances are built once at the input boundary with [`FittedParams::from_values`]
/// and are read-only afterwards.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedParams {
    /// Infection rate.
    pub alpha: Real,
    /// Median day of governmental action.
    pub days: Real,
    /// Median rate of governmental action.
    pub r_s: Real,
    /// Death rate.
    pub r_dth: Real,
    /// Initial mortality fraction.
    pub p_dth: Real,
    /// Decay rate of the mortality fraction.
    pub r_dthdecay: Real,
    /// Share of exposed individuals in the initial state.
    pub k1: Real,
    /// Share of infected individuals in the initial state.
    pub k2: Real,
    /// Amplitude of the resurgence bump.
    pub jump: Real,
    /// Time at which the resurgence bump peaks.
    pub t_jump: Real,
    /// Spread of the resurgence bump.
    pub std_normal: Real,
    /// Scale of the initially active detected cases.
    pub k3: Real,
}

impl FittedParams {
    /// Build from an ordered slice of exactly 12 values and validate the result.
    pub fn from_values(values: &[Real], layout: ParamLayout) -> Result<Self> {
        if values.len() != N_FITTED {
            return Err(DelphiError::invalid(
                "parameter count",
                values.len() as Real,
                "expected 12 fitted values",
            ));
        }
        let r_dth = match layout {
            ParamLayout::Python => values[3],
            ParamLayout::Mathematica => LN_2 / values[3],
        };
        let params = FittedParams {
            alpha: values[0],
            days: values[1],
            r_s: values[2],
            r_dth,
            p_dth: values[4],
            r_dthdecay: values[5],
            k1: values[6],
            k2: values[7],
            jump: values[8],
            t_jump: values[9],
            std_normal: values[10],
            k3: values[11],
        };
        params.validate()?;
        Ok(params)
    }

    /// Return parameters in canonical order.
    pub fn to_array(&self) -> [Real; N_FITTED] {
        [
            self.alpha,
            self.days,
            self.r_s,
            self.r_dth,
            self.p_dth,
            self.r_dthdecay,
            self.k1,
            self.k2,
            self.jump,
            self.t_jump,
            self.std_normal,
            self.k3,
        ]
    }

    /// Check every parameter against its physical domain.
    pub fn validate(&self) -> Result<()> {
        let names = [
            "alpha",
            "days",
            "r_s",
            "r_dth",
            "p_dth",
            "r_dthdecay",
            "k1",
            "k2",
            "jump",
            "t_jump",
            "std_normal",
            "k3",
        ];
        for (name, value) in names.into_iter().zip(self.to_array()) {
            if !value.is_finite() {
                return Err(DelphiError::invalid(name, value, "must be finite"));
            }
        }

        let non_negative = [
            ("alpha", self.alpha),
            ("r_s", self.r_s),
            ("r_dthdecay", self.r_dthdecay),
            ("k1", self.k1),
            ("k2", self.k2),
            ("jump", self.jump),
            ("k3", self.k3),
        ];
        for (name, value) in non_negative {
            if value < 0.0 {
                return Err(DelphiError::invalid(name, value, "must be non-negative"));
            }
        }
        if self.r_dth <= 0.0 {
            return Err(DelphiError::invalid("r_dth", self.r_dth, "must be positive"));
        }
        if self.std_normal <= 0.0 {
            return Err(DelphiError::invalid(
                "std_normal",
                self.std_normal,
                "must be positive",
            ));
        }
        if !(0.0..=1.0).contains(&self.p_dth) {
            return Err(DelphiError::invalid("p_dth", self.p_dth, "must be in [0, 1]"));
        }
        Ok(())
    }
}
