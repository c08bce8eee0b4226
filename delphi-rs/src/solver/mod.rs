//! Numerical integration of ODE systems.
//!
//! The model is handed to an explicit adaptive Runge-Kutta integrator and the
//! solution is sampled at a fixed list of output times, much like
//! `solve_ivp(..., t_eval=...)`.
mod dopri;

pub use dopri::*;

use crate::prelude::{Real, Time};
use getset::Getters;
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A system of first-order ODEs with N state variables.
pub trait OdeSystem<const N: usize> {
    /// Instantaneous derivatives of state `x` at time `t`.
    fn derivatives(&self, t: Time, x: &[Real; N]) -> [Real; N];
}

impl<F, const N: usize> OdeSystem<N> for F
where
    F: Fn(Time, &[Real; N]) -> [Real; N],
{
    fn derivatives(&self, t: Time, x: &[Real; N]) -> [Real; N] {
        self(t, x)
    }
}

/// Tolerances and guards for the adaptive integrator.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    /// Relative tolerance.
    pub rtol: Real,
    /// Absolute tolerance.
    pub atol: Real,
    /// Upper bound on the step size.
    pub max_step: Real,
    /// Maximum number of attempted steps before giving up.
    pub max_steps: usize,
    /// Wall-clock guard for a single integration, in seconds.
    pub timeout_secs: Option<Real>,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            rtol: 1e-3,
            atol: 1e-6,
            max_step: Real::INFINITY,
            max_steps: 1_000_000,
            timeout_secs: None,
        }
    }
}

impl SolverOptions {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs
            .filter(|s| s.is_finite() && *s > 0.0)
            .map(Duration::from_secs_f64)
    }
}

/// Solution sampled at the requested output times.
///
/// Values are stored as a (dimension × times) matrix, so each row is the time
/// series of one state variable.
#[derive(Debug, Clone, PartialEq, Getters)]
#[getset(get = "pub")]
pub struct Trajectory {
    times: Vec<Time>,
    values: Array2<Real>,
}

impl Trajectory {
    pub(crate) fn new(times: Vec<Time>, values: Array2<Real>) -> Self {
        Trajectory { times, values }
    }

    /// Number of output times.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Time series of the i-th state variable.
    pub fn component(&self, i: usize) -> ArrayView1<'_, Real> {
        self.values.row(i)
    }

    /// State at the k-th output time.
    pub fn at(&self, k: usize) -> ArrayView1<'_, Real> {
        self.values.column(k)
    }
}
