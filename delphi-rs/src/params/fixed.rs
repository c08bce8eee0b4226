use super::constants as cte;
use crate::prelude::{DelphiError, Real, Result};
use getset::CopyGetters;
use serde::{Deserialize, Serialize};
use std::f64::consts::LN_2;

/// Half-lives (in days) of the transitions that are not fitted per location.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HalfLives {
    pub incubation: Real,
    pub detection: Real,
    pub recovery_infected: Real,
    pub recovery_hospitalized: Real,
    pub recovery_ventilated: Real,
}

impl Default for HalfLives {
    fn default() -> Self {
        HalfLives {
            incubation: cte::INCUBATION_DAYS,
            detection: cte::DETECTION_DAYS,
            recovery_infected: cte::RECOVERY_INFECTED_DAYS,
            recovery_hospitalized: cte::RECOVERY_HOSPITALIZED_DAYS,
            recovery_ventilated: cte::RECOVERY_VENTILATED_DAYS,
        }
    }
}

impl HalfLives {
    pub fn validate(&self) -> Result<()> {
        let all = [
            self.incubation,
            self.detection,
            self.recovery_infected,
            self.recovery_hospitalized,
            self.recovery_ventilated,
        ];
        if all.iter().any(|&x| !(x.is_finite() && x > 0.0)) {
            return Err(DelphiError::Configuration(format!(
                "half-lives must be positive, got {:?}",
                self
            )));
        }
        Ok(())
    }

    /// Convert half-lives into exponential transition rates.
    pub fn rates(&self) -> RateConstants {
        RateConstants {
            r_i: LN_2 / self.incubation,
            r_d: LN_2 / self.detection,
            r_ri: LN_2 / self.recovery_infected,
            r_rh: LN_2 / self.recovery_hospitalized,
            r_rv: LN_2 / self.recovery_ventilated,
        }
    }
}

/// Transition rates derived once from [`HalfLives`].
#[derive(Debug, Copy, Clone, PartialEq, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct RateConstants {
    /// Rate of leaving the incubation phase.
    r_i: Real,
    /// Rate of detection.
    r_d: Real,
    /// Rate of recovery outside the hospital.
    r_ri: Real,
    /// Rate of recovery under hospitalization.
    r_rh: Real,
    /// Rate of recovery under ventilation.
    r_rv: Real,
}

impl Default for RateConstants {
    fn default() -> Self {
        HalfLives::default().rates()
    }
}

/// Detection, hospitalization and ventilation fractions shared by all locations.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fractions {
    pub p_d: Real,
    pub p_h: Real,
    pub p_v: Real,
}

impl Default for Fractions {
    fn default() -> Self {
        Fractions {
            p_d: cte::PROB_DETECTED,
            p_h: cte::PROB_HOSPITALIZED,
            p_v: cte::PROB_VENTILATED,
        }
    }
}

impl Fractions {
    pub fn validate(&self) -> Result<()> {
        for (name, x) in [("p_d", self.p_d), ("p_h", self.p_h), ("p_v", self.p_v)] {
            if !(x > 0.0 && x <= 1.0) {
                return Err(DelphiError::Configuration(format!(
                    "fraction {} must be in (0, 1], got {}",
                    name, x
                )));
            }
        }
        Ok(())
    }
}

/// Per-location constants that are not fitted.
#[derive(Debug, Copy, Clone, PartialEq, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct GlobalParamsFixed {
    /// Population size.
    population: Real,
    /// Upper bound for the initially recovered population.
    r_upperbound: Real,
    /// Heuristic estimate of the initially recovered population.
    r_heuristic: Real,
    /// Recovered population taken from a previous run or from the deaths heuristic.
    r_0: Real,
    /// Detected deaths at simulation start.
    deaths_0: Real,
    /// Detected cases at simulation start.
    cases_0: Real,
    p_d: Real,
    p_h: Real,
    p_v: Real,
}

/// Counts read from the history table that seed the recovered compartment.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct HistorySeeds {
    /// Cumulative cases on the first valid day.
    pub cases_0: Real,
    /// Cumulative deaths on the first valid day.
    pub deaths_0: Real,
    /// Cumulative cases two weeks before the first valid day.
    pub cases_lag_14: Real,
    /// Cumulative deaths nine days before the first valid day.
    pub deaths_lag_9: Real,
}

impl GlobalParamsFixed {
    pub fn new(
        population: Real,
        r_upperbound: Real,
        r_heuristic: Real,
        r_0: Real,
        deaths_0: Real,
        cases_0: Real,
        fractions: Fractions,
    ) -> Self {
        GlobalParamsFixed {
            population,
            r_upperbound,
            r_heuristic,
            r_0,
            deaths_0,
            cases_0,
            p_d: fractions.p_d,
            p_h: fractions.p_h,
            p_v: fractions.p_v,
        }
    }

    /// Derive the recovered bounds from history counts.
    ///
    /// `prior_r` is the recovered compartment of a previous model state for
    /// this location, if one exists. Otherwise five recoveries per death are
    /// assumed when the active cases allow it.
    pub fn from_history(
        population: Real,
        seeds: HistorySeeds,
        prior_r: Option<Real>,
        fractions: Fractions,
    ) -> Self {
        let HistorySeeds {
            cases_0,
            deaths_0,
            cases_lag_14,
            deaths_lag_9,
        } = seeds;
        let r_0 = prior_r.unwrap_or(if cases_0 - deaths_0 > deaths_0 * 5.0 {
            deaths_0 * 5.0
        } else {
            0.0
        });
        Self::new(
            population,
            cases_0 - deaths_0,
            cases_lag_14 - deaths_lag_9,
            r_0,
            deaths_0,
            cases_0,
            fractions,
        )
    }

    /// Detected recoveries at simulation start.
    pub fn population_r(&self) -> Real {
        let r_detected = (self.r_0 * self.p_d).floor();
        (self.r_upperbound - 1.0).min(r_detected.min(self.r_heuristic))
    }

    /// Fractions as a standalone record.
    pub fn fractions(&self) -> Fractions {
        Fractions {
            p_d: self.p_d,
            p_h: self.p_h,
            p_v: self.p_v,
        }
    }
}
