use crate::prelude::Real;
use getset::CopyGetters;
use serde::{Deserialize, Serialize};

pub trait Stats {
    fn add(&mut self, x: Real);
    fn add_many<I>(&mut self, xs: I)
    where
        I: IntoIterator<Item = Real>,
    {
        for x in xs {
            self.add(x);
        }
    }
    fn size(&self) -> usize;
    fn total(&self) -> Real;
    fn mean(&self) -> Real {
        self.total() / self.size() as Real
    }
}

/// Running sum of observations.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct PointStatsAcc {
    n: usize,
    m1: Real,
}

impl PointStatsAcc {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Stats for PointStatsAcc {
    fn add(&mut self, x: Real) {
        self.n += 1;
        self.m1 += x;
    }

    fn total(&self) -> Real {
        self.m1
    }

    fn size(&self) -> usize {
        self.n
    }
}

/// Mean absolute percentage error of `simulated` relative to `observed`.
///
/// Points whose observed value is not positive are skipped, so zero counts
/// never produce infinities. If every point is skipped the error is 0.
/// Sequences are paired up to the shorter length.
pub fn mape<O, S>(observed: O, simulated: S) -> Real
where
    O: IntoIterator<Item = Real>,
    S: IntoIterator<Item = Real>,
{
    let mut acc = PointStatsAcc::new();
    for (obs, sim) in observed.into_iter().zip(simulated) {
        if obs > 0.0 {
            acc.add(((obs - sim) / obs).abs());
        }
    }
    if acc.size() == 0 {
        0.0
    } else {
        acc.mean() * 100.0
    }
}

/// Fit quality of a simulated trajectory against the observed history.
#[derive(Debug, Copy, Clone, PartialEq, CopyGetters, Serialize, Deserialize)]
#[getset(get_copy = "pub")]
pub struct FitScore {
    /// Mean of cases and deaths MAPE over the whole history.
    full: Real,
    /// Same score restricted to the trailing window.
    recent: Real,
}

impl FitScore {
    /// Score observed against simulated cumulative cases and deaths.
    ///
    /// Simulated series are aligned with the observed ones from their first
    /// element; extra simulated days are ignored. With fewer than `window`
    /// observed points, `recent` equals `full`.
    pub fn new(
        cases: &[Real],
        deaths: &[Real],
        sim_cases: &[Real],
        sim_deaths: &[Real],
        window: usize,
    ) -> Self {
        let score = |from: usize| {
            let from_d = from.min(deaths.len());
            (mape(
                cases[from..].iter().copied(),
                sim_cases.iter().skip(from).copied(),
            ) + mape(
                deaths[from_d..].iter().copied(),
                sim_deaths.iter().skip(from_d).copied(),
            )) / 2.0
        };
        let full = score(0);
        let recent = if cases.len() < window || deaths.len() < window || window == 0 {
            full
        } else {
            score(cases.len() - window)
        };
        FitScore { full, recent }
    }
}
