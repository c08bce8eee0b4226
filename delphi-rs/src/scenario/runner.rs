use super::{
    dataset::{prediction_rows, PredictionRow, ScoreRow},
    location::{LocationInput, LocationKey, PreparedLocation},
    task::{scenario_keys, ScenarioKey},
};
use crate::{
    config::RunConfig,
    model::{Compartment, DelphiModel, PolicyOverlay},
    params::CurrentPolicyMap,
    prelude::{Real, Result},
    solver::solve,
    utils::FitScore,
};
use getset::{CopyGetters, Getters};
use log::{debug, info, warn};
use rayon::prelude::*;

/// Forecast of one location under one scenario.
#[derive(Debug, Clone, PartialEq, Getters, CopyGetters)]
pub struct ScenarioForecast {
    #[getset(get = "pub")]
    scenario: ScenarioKey,
    #[getset(get_copy = "pub")]
    score: FitScore,
    /// Days from the first forecast day to the horizon.
    #[getset(get = "pub")]
    since_forecast: Vec<PredictionRow>,
    /// Every simulated day, with observed counts where available.
    #[getset(get = "pub")]
    since_100: Vec<PredictionRow>,
}

/// All successful scenarios of a location, in configuration order.
#[derive(Debug, Clone)]
pub struct LocationForecast {
    pub location: PreparedLocation,
    pub scenarios: Vec<ScenarioForecast>,
}

/// Locations and scenarios that did not produce a forecast.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunReport {
    pub skipped: Vec<(LocationKey, String)>,
    pub failed: Vec<(LocationKey, ScenarioKey, String)>,
}

impl RunReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.failed.is_empty()
    }

    pub fn log(&self) {
        info!(
            "{} locations skipped, {} scenarios failed",
            self.skipped.len(),
            self.failed.len()
        );
        for (loc, reason) in &self.skipped {
            info!("  skipped {}: {}", loc, reason);
        }
        for (loc, scenario, reason) in &self.failed {
            info!("  failed {} ({}): {}", loc, scenario, reason);
        }
    }
}

/// Result of a batch run.
#[derive(Debug, Clone)]
pub struct BatchOutput {
    pub locations: Vec<LocationForecast>,
    pub report: RunReport,
}

impl BatchOutput {
    fn rows<'a, F>(&'a self, view: F) -> impl Iterator<Item = &'a PredictionRow>
    where
        F: Fn(&'a ScenarioForecast) -> &'a Vec<PredictionRow> + 'a,
    {
        self.locations
            .iter()
            .flat_map(|loc| loc.scenarios.iter())
            .flat_map(move |s| view(s).iter())
    }

    /// Forecast-only rows of every (location, scenario), concatenated.
    pub fn since_forecast_rows(&self) -> impl Iterator<Item = &PredictionRow> {
        self.rows(|s| s.since_forecast())
    }

    /// Full-range rows of every (location, scenario), concatenated.
    pub fn since_100_rows(&self) -> impl Iterator<Item = &PredictionRow> {
        self.rows(|s| s.since_100())
    }

    pub fn score_rows(&self) -> Vec<ScoreRow> {
        self.locations
            .iter()
            .flat_map(|loc| {
                loc.scenarios
                    .iter()
                    .map(move |s| ScoreRow::new(&loc.location, s.scenario(), s.score()))
            })
            .collect()
    }
}

/// Integrate a prepared location under a single scenario.
pub fn run_scenario(
    loc: &PreparedLocation,
    scenario: &ScenarioKey,
    cfg: &RunConfig,
) -> Result<ScenarioForecast> {
    let gammas = cfg.policy_gamma.for_kind(loc.aggregation_kind());
    let future_gamma = gammas.gamma(&scenario.policy)?;
    let current_gamma = gammas.gamma(loc.current_policy())?;
    let overlay = PolicyOverlay::new(
        loc.params(),
        loc.last_observed(),
        scenario.delay as Real,
        future_gamma,
        current_gamma,
    );
    let fixed = loc.fixed();
    let model = DelphiModel::new(
        *loc.params(),
        cfg.rates(),
        fixed.fractions(),
        fixed.population(),
        overlay,
    );

    let trajectory = solve(
        &model,
        *loc.initial_state().as_array(),
        &loc.prediction_times(),
        &cfg.solver,
    )?;

    let sim_cases = trajectory
        .component(Compartment::DetectedTotal.index())
        .to_vec();
    let sim_deaths = trajectory
        .component(Compartment::DetectedDead.index())
        .to_vec();
    let score = FitScore::new(
        &loc.observed_cases(),
        &loc.observed_deaths(),
        &sim_cases,
        &sim_deaths,
        cfg.recent_window,
    );
    debug!(
        "{} [{}]: MAPE {:.2} (recent {:.2})",
        loc.key(),
        scenario,
        score.full(),
        score.recent()
    );

    let (since_forecast, since_100) = prediction_rows(loc, scenario, &trajectory);
    Ok(ScenarioForecast {
        scenario: scenario.clone(),
        score,
        since_forecast,
        since_100,
    })
}

/// Forecast every location under every configured scenario.
///
/// Locations with missing or unusable inputs are skipped and scenarios whose
/// integration fails are dropped; both are listed in the report. Configuration
/// and I/O errors abort the whole batch. Output order follows input order and
/// configuration order regardless of how work is scheduled.
pub fn run_batch(
    inputs: &[LocationInput],
    current: &CurrentPolicyMap,
    cfg: &RunConfig,
) -> Result<BatchOutput> {
    // Ties are idempotent, so a configuration that was already prepared
    // comes out unchanged.
    let mut cfg = cfg.clone();
    cfg.prepare()?;
    let cfg = &cfg;
    let mut report = RunReport::default();

    let mut prepared = vec![];
    for input in inputs {
        let policy = current.get(&input.key.country, &input.key.province);
        match PreparedLocation::prepare(input, policy, cfg) {
            Ok(loc) => prepared.push(loc),
            Err(e) if e.is_location_skip() => {
                warn!("skipping {}: {}", input.key, e);
                report.skipped.push((input.key.clone(), e.to_string()));
            }
            Err(e) => return Err(e),
        }
    }

    let keys = scenario_keys(&cfg.future_policies, &cfg.future_times);
    let tasks: Vec<(usize, usize)> = (0..prepared.len())
        .flat_map(|i| (0..keys.len()).map(move |k| (i, k)))
        .collect();
    info!(
        "running {} scenarios for {} locations",
        tasks.len(),
        prepared.len()
    );

    let run = |&(i, k): &(usize, usize)| run_scenario(&prepared[i], &keys[k], cfg);
    let results: Vec<Result<ScenarioForecast>> = if cfg.parallel {
        tasks.par_iter().map(run).collect()
    } else {
        tasks.iter().map(run).collect()
    };

    let mut scenarios: Vec<Vec<ScenarioForecast>> = prepared.iter().map(|_| vec![]).collect();
    for (&(i, k), result) in tasks.iter().zip(results) {
        match result {
            Ok(forecast) => scenarios[i].push(forecast),
            Err(e) if e.is_scenario_failure() => {
                warn!("{} [{}] failed: {}", prepared[i].key(), keys[k], e);
                report
                    .failed
                    .push((prepared[i].key().clone(), keys[k].clone(), e.to_string()));
            }
            Err(e) => return Err(e),
        }
    }

    let locations = prepared
        .into_iter()
        .zip(scenarios)
        .map(|(location, scenarios)| {
            info!(
                "{}: {} of {} scenarios done",
                location.key(),
                scenarios.len(),
                keys.len()
            );
            LocationForecast {
                location,
                scenarios,
            }
        })
        .collect();

    Ok(BatchOutput { locations, report })
}
