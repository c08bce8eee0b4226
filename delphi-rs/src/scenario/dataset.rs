use super::{location::PreparedLocation, task::ScenarioKey};
use crate::{
    model::EpiState,
    prelude::{Date, Real},
    solver::Trajectory,
    utils::FitScore,
};
use chrono::Duration;
use serde::Serialize;

/// One simulated day of a (location, scenario) forecast.
///
/// Field names follow the column names of the published prediction tables.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionRow {
    #[serde(rename = "Continent")]
    pub continent: String,
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "Province")]
    pub province: String,
    #[serde(rename = "Policy")]
    pub policy: String,
    #[serde(rename = "Time")]
    pub time: String,
    #[serde(rename = "Day")]
    pub day: Date,
    #[serde(rename = "Total Detected")]
    pub total_detected: i64,
    #[serde(rename = "Active")]
    pub active: i64,
    #[serde(rename = "Active Hospitalized")]
    pub active_hospitalized: i64,
    #[serde(rename = "Cumulative Hospitalized")]
    pub cumulative_hospitalized: i64,
    #[serde(rename = "Total Detected Deaths")]
    pub total_detected_deaths: i64,
    #[serde(rename = "Active Ventilated")]
    pub active_ventilated: i64,
    /// Observed cumulative cases on that day, if any.
    #[serde(rename = "Total Detected True")]
    pub observed_cases: Option<Real>,
    /// Observed cumulative deaths on that day, if any.
    #[serde(rename = "Total Detected Deaths True")]
    pub observed_deaths: Option<Real>,
    /// Unrounded model state.
    #[serde(skip)]
    pub state: EpiState,
}

impl PredictionRow {
    fn new(loc: &PreparedLocation, scenario: &ScenarioKey, day: Date, state: EpiState) -> Self {
        let key = loc.key();
        PredictionRow {
            continent: key.continent.clone(),
            country: key.country.clone(),
            province: key.province.clone(),
            policy: scenario.policy_label(),
            time: scenario.time_label(),
            day,
            total_detected: round(state.detected_total()),
            active: round(state.active()),
            active_hospitalized: round(state.active_hospitalized()),
            cumulative_hospitalized: round(state.total_hospitalized()),
            total_detected_deaths: round(state.detected_dead()),
            active_ventilated: round(state.active_ventilated()),
            observed_cases: None,
            observed_deaths: None,
            state,
        }
    }
}

fn round(x: Real) -> i64 {
    x.round() as i64
}

/// Fit score of a (location, scenario), flattened for tabular output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreRow {
    #[serde(rename = "Continent")]
    pub continent: String,
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "Province")]
    pub province: String,
    #[serde(rename = "Policy")]
    pub policy: String,
    #[serde(rename = "Time")]
    pub time: String,
    #[serde(rename = "MAPE")]
    pub mape: Real,
    #[serde(rename = "MAPE Recent")]
    pub mape_recent: Real,
}

impl ScoreRow {
    pub fn new(loc: &PreparedLocation, scenario: &ScenarioKey, score: FitScore) -> Self {
        let key = loc.key();
        ScoreRow {
            continent: key.continent.clone(),
            country: key.country.clone(),
            province: key.province.clone(),
            policy: scenario.policy_label(),
            time: scenario.time_label(),
            mape: score.full(),
            mape_recent: score.recent(),
        }
    }
}

/// Build the two views of a scenario trajectory.
///
/// The first holds the forecast days only (from the first forecast day to the
/// horizon). The second holds every simulated day and carries the observed
/// counts on days with history.
pub fn prediction_rows(
    loc: &PreparedLocation,
    scenario: &ScenarioKey,
    trajectory: &Trajectory,
) -> (Vec<PredictionRow>, Vec<PredictionRow>) {
    let start = loc.start_date();
    let mut observed = vec![None; trajectory.len()];
    for row in loc.window() {
        let k = (row.date - start).num_days();
        if k >= 0 && (k as usize) < observed.len() {
            observed[k as usize] = Some(*row);
        }
    }

    let mut since_forecast = vec![];
    let mut since_100 = Vec::with_capacity(trajectory.len());
    for k in 0..trajectory.len() {
        let state: EpiState = trajectory.at(k).iter().copied().collect();
        let mut row = PredictionRow::new(loc, scenario, start + Duration::days(k as i64), state);
        if k >= loc.forecast_offset() {
            since_forecast.push(row.clone());
        }
        if let Some(obs) = observed[k] {
            row.observed_cases = Some(obs.cases);
            row.observed_deaths = Some(obs.deaths);
        }
        since_100.push(row);
    }
    (since_forecast, since_100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::N_COMPARTMENTS;
    use crate::scenario::location::tests::{date, sample_config, sample_input};
    use assert_approx_eq::assert_approx_eq;
    use ndarray::Array2;

    fn fake_trajectory(n: usize) -> Trajectory {
        let values =
            Array2::from_shape_fn((N_COMPARTMENTS, n), |(i, k)| (i * 1000 + k) as Real + 0.4);
        Trajectory::new((0..n).map(|k| k as Real).collect(), values)
    }

    #[test]
    fn views_split_at_forecast_day() {
        let cfg = sample_config();
        let loc = PreparedLocation::prepare(&sample_input("France", 20), Some("Lockdown"), &cfg)
            .unwrap();
        let key = ScenarioKey::new("Restrict_Mass_Gatherings", 7);
        let traj = fake_trajectory(loc.max_t());
        let (forecast, full) = prediction_rows(&loc, &key, &traj);

        assert_eq!(full.len(), 92);
        assert_eq!(forecast.len(), 72);
        assert_eq!(full[0].day, date(2020, 10, 1));
        assert_eq!(forecast[0].day, date(2020, 10, 21));
        assert_eq!(full.last().unwrap().day, date(2020, 12, 31));
        assert_eq!(forecast[0].policy, "Restrict Mass Gatherings");
        assert_eq!(forecast[0].time, "One Week");
    }

    #[test]
    fn observed_counts_only_on_history_days() {
        let cfg = sample_config();
        let loc = PreparedLocation::prepare(&sample_input("France", 20), Some("Lockdown"), &cfg)
            .unwrap();
        let traj = fake_trajectory(loc.max_t());
        let (forecast, full) = prediction_rows(&loc, &ScenarioKey::new("Lockdown", 0), &traj);
        assert_eq!(full[0].observed_cases, Some(1000.0));
        assert!(full[19].observed_deaths.is_some());
        assert!(full[20].observed_cases.is_none());
        assert!(forecast.iter().all(|r| r.observed_cases.is_none()));
    }

    #[test]
    fn projections_are_rounded() {
        let cfg = sample_config();
        let loc = PreparedLocation::prepare(&sample_input("France", 20), Some("Lockdown"), &cfg)
            .unwrap();
        let traj = fake_trajectory(loc.max_t());
        let (_, full) = prediction_rows(&loc, &ScenarioKey::new("Lockdown", 0), &traj);
        let row = &full[3];
        assert_eq!(row.total_detected, 15003);
        assert_eq!(row.total_detected_deaths, 14003);
        assert_eq!(row.cumulative_hospitalized, 11003);
        // DHR + DQR + DHD + DQD
        assert_eq!(row.active, 24014);
        assert_approx_eq!(row.state.detected_total(), 15003.4, 1e-9);
    }
}
