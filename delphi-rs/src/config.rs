//! Run configuration, read from a TOML file.
//!
//! Every field has a default, so an empty file is a valid configuration.
//! Dates must be quoted strings (`"2021-03-15"`).
use crate::{
    params::{constants as cte, Fractions, HalfLives, ParamLayout, PolicyMaps, RateConstants},
    prelude::{Date, DelphiError, Result},
    solver::SolverOptions,
};
use log::info;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    /// Half-lives of the transitions that are not fitted.
    pub half_lives: HalfLives,
    /// Detected, hospitalized and ventilated fractions.
    pub fractions: Fractions,
    /// Policy labels simulated for every location.
    pub future_policies: Vec<String>,
    /// Enactment delays, in days after the last observed day.
    pub future_times: Vec<u32>,
    /// Last simulated date.
    pub max_horizon_date: Date,
    /// History before this date is ignored.
    pub fitting_start_date: Date,
    /// First forecast day. Defaults to the day after the last history row.
    pub forecast_date: Option<Date>,
    /// A location needs strictly more valid history rows than this.
    pub min_history_points: usize,
    /// Trailing window of the recent fit score.
    pub recent_window: usize,
    /// Column layout of the fitted parameter table.
    pub param_layout: ParamLayout,
    /// Normalized policy gammas for countries and U.S. states.
    pub policy_gamma: PolicyMaps,
    /// Force the first policy's gamma to equal the second's in both maps.
    pub tied_policies: Option<(String, String)>,
    pub solver: SolverOptions,
    /// Run scenarios on the rayon thread pool.
    pub parallel: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            half_lives: HalfLives::default(),
            fractions: Fractions::default(),
            future_policies: cte::FUTURE_POLICIES.iter().map(|s| s.to_string()).collect(),
            future_times: cte::FUTURE_TIMES.to_vec(),
            max_horizon_date: Date::from_ymd_opt(2021, 3, 15).unwrap_or(Date::MIN),
            fitting_start_date: Date::from_ymd_opt(2020, 9, 1).unwrap_or(Date::MIN),
            forecast_date: None,
            min_history_points: cte::MIN_HISTORY_POINTS,
            recent_window: cte::RECENT_WINDOW,
            param_layout: ParamLayout::default(),
            policy_gamma: PolicyMaps::default(),
            tied_policies: None,
            solver: SolverOptions::default(),
            parallel: true,
        }
    }
}

impl RunConfig {
    /// Parse configuration from TOML text, apply policy ties and validate.
    pub fn from_toml_str(data: &str) -> Result<Self> {
        let mut cfg: RunConfig = toml::from_str(data)?;
        cfg.prepare()?;
        Ok(cfg)
    }

    /// Read configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)?;
        let cfg = Self::from_toml_str(&data)?;
        info!("loaded run configuration from {}", path.display());
        Ok(cfg)
    }

    /// Apply policy ties and validate.
    pub fn prepare(&mut self) -> Result<&mut Self> {
        if let Some((policy, source)) = &self.tied_policies {
            self.policy_gamma.countries.tie(policy, source)?;
            self.policy_gamma.us.tie(policy, source)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Fail on settings that would make every location fail.
    pub fn validate(&self) -> Result<()> {
        self.half_lives.validate()?;
        self.fractions.validate()?;
        if self.future_policies.is_empty() {
            return Err(DelphiError::Configuration(
                "no future policies configured".into(),
            ));
        }
        if self.future_times.is_empty() {
            return Err(DelphiError::Configuration(
                "no enactment delays configured".into(),
            ));
        }
        let labels = self.future_policies.iter().map(|s| s.as_str());
        self.policy_gamma.countries.ensure_covers(labels.clone())?;
        self.policy_gamma.us.ensure_covers(labels)?;
        if self.max_horizon_date < self.fitting_start_date {
            return Err(DelphiError::Configuration(format!(
                "horizon {} precedes fitting start {}",
                self.max_horizon_date, self.fitting_start_date
            )));
        }
        let solver = &self.solver;
        if !(solver.rtol > 0.0 && solver.atol > 0.0 && solver.max_step > 0.0) {
            return Err(DelphiError::Configuration(format!(
                "invalid solver tolerances {:?}",
                solver
            )));
        }
        Ok(())
    }

    pub fn rates(&self) -> RateConstants {
        self.half_lives.rates()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn empty_file_uses_defaults() {
        let cfg = RunConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, RunConfig::default());
        assert_eq!(cfg.future_policies.len(), 7);
        assert_eq!(cfg.future_times, vec![0, 7, 14, 28, 42]);
    }

    #[test]
    fn partial_override() {
        let data = r#"
            future_times = [0, 14]
            max_horizon_date = "2021-01-31"
            min_history_points = 7

            [fractions]
            p_d = 0.25

            [solver]
            rtol = 1e-6
            timeout_secs = 30.0

            [policy_gamma.us]
            No_Measure = 1.0
            Restrict_Mass_Gatherings = 0.9
            Mass_Gatherings_Authorized_But_Others_Restricted = 0.7
            Restrict_Mass_Gatherings_and_Schools = 0.5
            Authorize_Schools_but_Restrict_Mass_Gatherings_and_Others = 0.8
            Restrict_Mass_Gatherings_and_Schools_and_Others = 0.4
            Lockdown = 0.3
        "#;
        let cfg = RunConfig::from_toml_str(data).unwrap();
        assert_eq!(cfg.future_times, vec![0, 14]);
        assert_eq!(cfg.max_horizon_date, Date::from_ymd_opt(2021, 1, 31).unwrap());
        assert_approx_eq!(cfg.fractions.p_d, 0.25, 1e-12);
        assert_approx_eq!(cfg.fractions.p_h, 0.03, 1e-12);
        assert_eq!(cfg.solver.timeout_secs, Some(30.0));
        assert_eq!(cfg.policy_gamma.us.get("Lockdown"), Some(0.3));
        assert_eq!(cfg.policy_gamma.countries.get("Lockdown"), Some(0.239));
    }

    #[test]
    fn ties_are_applied_to_both_maps() {
        let data = r#"
            tied_policies = ["Restrict_Mass_Gatherings_and_Schools", "Restrict_Mass_Gatherings_and_Schools_and_Others"]
        "#;
        let cfg = RunConfig::from_toml_str(data).unwrap();
        for map in [&cfg.policy_gamma.countries, &cfg.policy_gamma.us] {
            assert_eq!(map.get("Restrict_Mass_Gatherings_and_Schools"), Some(0.423));
        }
    }

    #[test]
    fn unknown_policy_fails_the_run() {
        let data = r#"future_policies = ["Lockdown", "Curfew"]"#;
        assert!(matches!(
            RunConfig::from_toml_str(data),
            Err(DelphiError::Configuration(_))
        ));
    }

    #[test]
    fn malformed_toml_is_reported() {
        assert!(matches!(
            RunConfig::from_toml_str("future_times = ["),
            Err(DelphiError::Toml(_))
        ));
    }
}
