use crate::{
    config::RunConfig,
    model::{initial_state, EpiState},
    params::{AggregationKind, FittedParams, GlobalParamsFixed, HistorySeeds},
    prelude::{Date, DelphiError, Real, Result, Time},
};
use chrono::Duration;
use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a location as (continent, country, province).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocationKey {
    pub continent: String,
    pub country: String,
    pub province: String,
}

impl LocationKey {
    pub fn new(
        continent: impl Into<String>,
        country: impl Into<String>,
        province: impl Into<String>,
    ) -> Self {
        LocationKey {
            continent: continent.into(),
            country: country.into(),
            province: province.into(),
        }
    }

    pub fn aggregation_kind(&self) -> AggregationKind {
        AggregationKind::for_country(&self.country)
    }
}

impl fmt::Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.continent, self.country, self.province)
    }
}

/// A row of the cumulative case/death table of a location.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub date: Date,
    pub day_since100: i64,
    #[serde(rename = "case_cnt")]
    pub cases: Real,
    #[serde(rename = "death_cnt")]
    pub deaths: Real,
}

/// Cumulative history of a location, sorted by date.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct History(Vec<HistoryRow>);

impl History {
    pub fn new(mut rows: Vec<HistoryRow>) -> Self {
        rows.sort_by_key(|r| r.date);
        History(rows)
    }

    pub fn rows(&self) -> &[HistoryRow] {
        &self.0
    }

    pub fn last_date(&self) -> Option<Date> {
        self.0.last().map(|r| r.date)
    }

    pub fn max_day_since100(&self) -> Option<i64> {
        self.0.iter().map(|r| r.day_since100).max()
    }

    /// First row dated on or after `date`.
    pub fn first_on_or_after(&self, date: Date) -> Option<&HistoryRow> {
        self.0.iter().find(|r| r.date >= date)
    }

    /// Rows with `start <= date <= end`.
    pub fn between(&self, start: Date, end: Date) -> Vec<HistoryRow> {
        self.0
            .iter()
            .filter(|r| r.date >= start && r.date <= end)
            .copied()
            .collect()
    }
}

/// Fitted parameters of a location as read from the parameter table.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterRecord {
    /// Date at which the fitted model starts.
    pub anchor_date: Date,
    /// The 12 fitted values, in table order.
    pub values: Vec<Real>,
}

/// Everything the collaborators provide for one location. Missing pieces are
/// `None` and cause the location to be skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationInput {
    pub key: LocationKey,
    pub population: Option<Real>,
    pub parameters: Option<ParameterRecord>,
    pub history: Option<History>,
    /// Recovered compartment of a previous model state, if any.
    pub prior_recovered: Option<Real>,
}

impl LocationInput {
    pub fn new(key: LocationKey) -> Self {
        LocationInput {
            key,
            population: None,
            parameters: None,
            history: None,
            prior_recovered: None,
        }
    }
}

/// A location validated and reduced to what the scenario fan-out needs.
#[derive(Debug, Clone, Getters, CopyGetters)]
pub struct PreparedLocation {
    #[getset(get = "pub")]
    key: LocationKey,
    #[getset(get = "pub")]
    current_policy: String,
    #[getset(get = "pub")]
    params: FittedParams,
    #[getset(get = "pub")]
    fixed: GlobalParamsFixed,
    #[getset(get = "pub")]
    initial_state: EpiState,
    /// Valid history rows, starting at simulated day 0.
    #[getset(get = "pub")]
    window: Vec<HistoryRow>,
    /// Date of simulated day 0.
    #[getset(get_copy = "pub")]
    start_date: Date,
    /// Index of the first forecast day.
    #[getset(get_copy = "pub")]
    forecast_offset: usize,
    /// Number of simulated days.
    #[getset(get_copy = "pub")]
    max_t: usize,
}

impl PreparedLocation {
    /// Validate the inputs of a location and derive its fixed parameters and
    /// initial state.
    pub fn prepare(input: &LocationInput, current_policy: Option<&str>, cfg: &RunConfig) -> Result<Self> {
        let key = &input.key;
        let history = input
            .history
            .as_ref()
            .ok_or_else(|| DelphiError::missing(key, "historical case table"))?;
        let current_policy =
            current_policy.ok_or_else(|| DelphiError::missing(key, "current policy"))?;
        let record = input
            .parameters
            .as_ref()
            .ok_or_else(|| DelphiError::missing(key, "fitted parameters"))?;
        let population = input
            .population
            .ok_or_else(|| DelphiError::missing(key, "population"))?;

        match history.max_day_since100() {
            Some(day) if day >= 0 => {}
            _ => {
                return Err(DelphiError::InsufficientHistory {
                    location: key.to_string(),
                    found: 0,
                    required: cfg.min_history_points,
                })
            }
        }

        cfg.policy_gamma
            .for_kind(key.aggregation_kind())
            .gamma(current_policy)?;

        let params = FittedParams::from_values(&record.values, cfg.param_layout)?;
        let start_date = cfg.fitting_start_date.max(record.anchor_date);
        let forecast_date = match (cfg.forecast_date, history.last_date()) {
            (Some(date), _) => date,
            (None, Some(last)) => last + Duration::days(1),
            (None, None) => start_date,
        };
        let window = history.between(start_date, forecast_date);
        if window.len() <= cfg.min_history_points {
            return Err(DelphiError::InsufficientHistory {
                location: key.to_string(),
                found: window.len(),
                required: cfg.min_history_points,
            });
        }

        let first = window[0];
        let lagged = |days: i64| history.first_on_or_after(first.date - Duration::days(days));
        let seeds = HistorySeeds {
            cases_0: first.cases,
            deaths_0: first.deaths,
            cases_lag_14: lagged(14).map_or(first.cases, |r| r.cases),
            deaths_lag_9: lagged(9).map_or(first.deaths, |r| r.deaths),
        };
        let fixed =
            GlobalParamsFixed::from_history(population, seeds, input.prior_recovered, cfg.fractions);
        let initial_state = initial_state(&params, &fixed)?;

        // Counted from day 0, the first valid row, rather than the anchor
        // date. The two only differ when the anchor precedes the fitting start.
        let max_t = (cfg.max_horizon_date - first.date).num_days() + 1;
        let last_t = window.len() as i64;
        if max_t < last_t {
            return Err(DelphiError::missing(
                key,
                format!("forecast horizon after {}", cfg.max_horizon_date),
            ));
        }
        let forecast_offset = (forecast_date - first.date).num_days().clamp(0, max_t);

        Ok(PreparedLocation {
            key: key.clone(),
            current_policy: current_policy.to_string(),
            params,
            fixed,
            initial_state,
            window,
            start_date: first.date,
            forecast_offset: forecast_offset as usize,
            max_t: max_t as usize,
        })
    }

    /// Observed day indexes relative to the first valid row.
    pub fn t_cases(&self) -> Vec<Time> {
        let first = self.window[0].day_since100;
        self.window
            .iter()
            .map(|r| (r.day_since100 - first) as Time)
            .collect()
    }

    /// Last simulated day with observed data.
    pub fn last_observed(&self) -> Time {
        self.t_cases().last().copied().unwrap_or(0.0)
    }

    /// Integer days 0..max_t.
    pub fn prediction_times(&self) -> Vec<Time> {
        (0..self.max_t).map(|i| i as Time).collect()
    }

    pub fn observed_cases(&self) -> Vec<Real> {
        self.window.iter().map(|r| r.cases).collect()
    }

    pub fn observed_deaths(&self) -> Vec<Real> {
        self.window.iter().map(|r| r.deaths).collect()
    }

    pub fn aggregation_kind(&self) -> AggregationKind {
        self.key.aggregation_kind()
    }
}
