use super::{OdeSystem, SolverOptions, Trajectory};
use crate::prelude::{DelphiError, Real, Result, Time};
use log::trace;
use ndarray::Array2;
use std::time::Instant;

// Dormand-Prince 5(4) tableau.
const C: [Real; 6] = [1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0, 1.0];
const A2: [Real; 1] = [1.0 / 5.0];
const A3: [Real; 2] = [3.0 / 40.0, 9.0 / 40.0];
const A4: [Real; 3] = [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0];
const A5: [Real; 4] = [
    19372.0 / 6561.0,
    -25360.0 / 2187.0,
    64448.0 / 6561.0,
    -212.0 / 729.0,
];
const A6: [Real; 5] = [
    9017.0 / 3168.0,
    -355.0 / 33.0,
    46732.0 / 5247.0,
    49.0 / 176.0,
    -5103.0 / 18656.0,
];
const B: [Real; 6] = [
    35.0 / 384.0,
    0.0,
    500.0 / 1113.0,
    125.0 / 192.0,
    -2187.0 / 6784.0,
    11.0 / 84.0,
];
// Difference between the 5th and embedded 4th order weights.
const E: [Real; 7] = [
    71.0 / 57600.0,
    0.0,
    -71.0 / 16695.0,
    71.0 / 1920.0,
    -17253.0 / 339200.0,
    22.0 / 525.0,
    -1.0 / 40.0,
];

const SAFETY: Real = 0.9;
const MIN_FACTOR: Real = 0.2;
const MAX_FACTOR: Real = 10.0;
const ERROR_EXPONENT: Real = -1.0 / 5.0;

/// Integrate `system` from `y0` at `t_eval[0]` and sample the solution at every
/// time in `t_eval`.
///
/// Uses an adaptive Dormand-Prince 5(4) scheme. Steps are shortened to land
/// exactly on output times, so discontinuities placed at output times (like a
/// policy switch) never fall inside a step. Divergence, step-size underflow and
/// the wall-clock guard are reported as errors; a partial trajectory is never
/// returned.
pub fn solve<S, const N: usize>(
    system: &S,
    y0: [Real; N],
    t_eval: &[Time],
    options: &SolverOptions,
) -> Result<Trajectory>
where
    S: OdeSystem<N> + ?Sized,
{
    if t_eval.is_empty() {
        return Err(DelphiError::Configuration(
            "cannot integrate over an empty time grid".into(),
        ));
    }
    if t_eval.windows(2).any(|w| !(w[1] > w[0])) {
        return Err(DelphiError::Configuration(
            "output times must be strictly increasing".into(),
        ));
    }
    if !y0.iter().all(|x| x.is_finite()) {
        return Err(DelphiError::NumericalDivergence {
            t: t_eval[0],
            reason: "non-finite initial state".into(),
        });
    }

    let mut values = Array2::<Real>::zeros((N, t_eval.len()));
    for (i, &x) in y0.iter().enumerate() {
        values[[i, 0]] = x;
    }

    let started = Instant::now();
    let timeout = options.timeout();
    let mut t = t_eval[0];
    let mut y = y0;
    let mut f = system.derivatives(t, &y);
    let mut h = initial_step(system, t, &y, &f, options).min(options.max_step);
    let mut n_steps = 0usize;

    for (k, &target) in t_eval.iter().enumerate().skip(1) {
        while t < target {
            n_steps += 1;
            if n_steps > options.max_steps {
                return Err(DelphiError::NumericalDivergence {
                    t,
                    reason: format!("exceeded {} steps", options.max_steps),
                });
            }
            if let Some(limit) = timeout {
                if started.elapsed() > limit {
                    return Err(DelphiError::Timeout {
                        t,
                        secs: limit.as_secs_f64(),
                    });
                }
            }
            let min_step = 10.0 * Real::EPSILON * t.abs().max(1.0);
            if !(h >= min_step) {
                return Err(DelphiError::NumericalDivergence {
                    t,
                    reason: format!("step size {:e} below minimum", h),
                });
            }

            let landing = t + h >= target;
            let step = if landing { target - t } else { h };
            let (y_new, f_new, err) = dopri_step(system, t, &y, &f, step);
            let error = error_norm(&err, &y, &y_new, options);

            if !error.is_finite() {
                // Non-finite error estimates are treated as a rejection; the
                // step size will shrink until it either recovers or underflows.
                h = step * MIN_FACTOR;
                continue;
            }
            if error <= 1.0 {
                t = if landing { target } else { t + step };
                y = y_new;
                f = f_new;
                if !y.iter().all(|x| x.is_finite()) {
                    return Err(DelphiError::NumericalDivergence {
                        t,
                        reason: "state became non-finite".into(),
                    });
                }
                let factor = if error == 0.0 {
                    MAX_FACTOR
                } else {
                    (SAFETY * error.powf(ERROR_EXPONENT)).min(MAX_FACTOR)
                };
                // A step truncated by an output time says little about the
                // natural step size, so never shrink after one.
                h = if landing { h.max(step * factor) } else { step * factor };
                h = h.min(options.max_step);
            } else {
                h = step * (SAFETY * error.powf(ERROR_EXPONENT)).max(MIN_FACTOR);
            }
        }
        for (i, &x) in y.iter().enumerate() {
            values[[i, k]] = x;
        }
    }
    trace!("integrated {} outputs in {} steps", t_eval.len(), n_steps);

    Ok(Trajectory::new(t_eval.to_vec(), values))
}

/// Single Dormand-Prince step. Return the new state, the derivative at the new
/// state and the local error estimate.
fn dopri_step<S, const N: usize>(
    system: &S,
    t: Time,
    y: &[Real; N],
    f: &[Real; N],
    h: Real,
) -> ([Real; N], [Real; N], [Real; N])
where
    S: OdeSystem<N> + ?Sized,
{
    let stage = |ks: &[&[Real; N]], a: &[Real]| -> [Real; N] {
        let mut out = *y;
        for (i, x) in out.iter_mut().enumerate() {
            let incr: Real = ks.iter().zip(a).map(|(k, a)| a * k[i]).sum();
            *x += h * incr;
        }
        out
    };

    let k1 = *f;
    let k2 = system.derivatives(t + C[0] * h, &stage(&[&k1], &A2));
    let k3 = system.derivatives(t + C[1] * h, &stage(&[&k1, &k2], &A3));
    let k4 = system.derivatives(t + C[2] * h, &stage(&[&k1, &k2, &k3], &A4));
    let k5 = system.derivatives(t + C[3] * h, &stage(&[&k1, &k2, &k3, &k4], &A5));
    let k6 = system.derivatives(t + C[4] * h, &stage(&[&k1, &k2, &k3, &k4, &k5], &A6));
    let y_new = stage(&[&k1, &k2, &k3, &k4, &k5, &k6], &B);
    let k7 = system.derivatives(t + C[5] * h, &y_new);

    let ks = [&k1, &k2, &k3, &k4, &k5, &k6, &k7];
    let mut err = [0.0; N];
    for (i, e) in err.iter_mut().enumerate() {
        *e = h * ks.iter().zip(E.iter()).map(|(k, c)| c * k[i]).sum::<Real>();
    }
    (y_new, k7, err)
}

/// RMS norm of the error scaled by the mixed absolute/relative tolerance.
fn error_norm<const N: usize>(
    err: &[Real; N],
    y: &[Real; N],
    y_new: &[Real; N],
    options: &SolverOptions,
) -> Real {
    scaled_norm(err, |i| {
        options.atol + y[i].abs().max(y_new[i].abs()) * options.rtol
    })
}

fn scaled_norm<const N: usize>(v: &[Real; N], scale: impl Fn(usize) -> Real) -> Real {
    if N == 0 {
        return 0.0;
    }
    let total: Real = v
        .iter()
        .enumerate()
        .map(|(i, x)| {
            let r = x / scale(i);
            r * r
        })
        .sum();
    (total / N as Real).sqrt()
}

/// Heuristic for the first step size (Hairer, Nørsett & Wanner, II.4).
fn initial_step<S, const N: usize>(
    system: &S,
    t: Time,
    y: &[Real; N],
    f: &[Real; N],
    options: &SolverOptions,
) -> Real
where
    S: OdeSystem<N> + ?Sized,
{
    let scale = |i: usize| options.atol + y[i].abs() * options.rtol;
    let d0 = scaled_norm(y, scale);
    let d1 = scaled_norm(f, scale);
    let h0 = if d0 < 1e-5 || d1 < 1e-5 {
        1e-6
    } else {
        0.01 * d0 / d1
    };

    let mut y1 = *y;
    for (i, x) in y1.iter_mut().enumerate() {
        *x += h0 * f[i];
    }
    let f1 = system.derivatives(t + h0, &y1);
    let mut df = [0.0; N];
    for (i, x) in df.iter_mut().enumerate() {
        *x = f1[i] - f[i];
    }
    let d2 = scaled_norm(&df, scale) / h0;

    let h1 = if d1 <= 1e-15 && d2 <= 1e-15 {
        (h0 * 1e-3).max(1e-6)
    } else {
        (0.01 / d1.max(d2)).powf(1.0 / 5.0)
    };
    let h = (100.0 * h0).min(h1);
    if h.is_finite() && h > 0.0 {
        h
    } else {
        1e-6
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn exponential_decay() {
        let decay = |_t: Time, x: &[Real; 1]| [-0.5 * x[0]];
        let times: Vec<Time> = (0..=20).map(|i| i as Real).collect();
        let options = SolverOptions {
            rtol: 1e-8,
            atol: 1e-10,
            ..Default::default()
        };
        let sol = solve(&decay, [2.0], &times, &options).unwrap();
        assert_eq!(sol.len(), 21);
        for (k, &t) in times.iter().enumerate() {
            assert_approx_eq!(sol.values()[[0, k]], 2.0 * (-0.5 * t).exp(), 1e-6);
        }
    }

    #[test]
    fn harmonic_oscillator_with_default_tolerance() {
        let osc = |_t: Time, x: &[Real; 2]| [x[1], -x[0]];
        let times: Vec<Time> = (0..=10).map(|i| i as Real).collect();
        let sol = solve(&osc, [1.0, 0.0], &times, &SolverOptions::default()).unwrap();
        assert_approx_eq!(sol.component(0)[10], (10.0 as Real).cos(), 1e-2);
        assert_approx_eq!(sol.at(5)[1], -(5.0 as Real).sin(), 1e-2);
    }

    #[test]
    fn deterministic_output() {
        let logistic = |t: Time, x: &[Real; 1]| [(0.3 + 0.1 * (t / 3.0).sin()) * x[0] * (1.0 - x[0])];
        let times: Vec<Time> = (0..50).map(|i| i as Real).collect();
        let a = solve(&logistic, [0.01], &times, &SolverOptions::default()).unwrap();
        let b = solve(&logistic, [0.01], &times, &SolverOptions::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn blow_up_is_reported() {
        // x' = x^2 explodes at t = 1.
        let blow_up = |_t: Time, x: &[Real; 1]| [x[0] * x[0]];
        let times = [0.0, 0.5, 2.0];
        let res = solve(&blow_up, [1.0], &times, &SolverOptions::default());
        assert!(matches!(res, Err(DelphiError::NumericalDivergence { .. })));
    }

    #[test]
    fn step_budget_is_enforced() {
        let fast = |_t: Time, x: &[Real; 1]| [(50.0 * x[0]).cos()];
        let options = SolverOptions {
            max_steps: 3,
            rtol: 1e-10,
            atol: 1e-12,
            ..Default::default()
        };
        let res = solve(&fast, [0.0], &[0.0, 100.0], &options);
        assert!(matches!(res, Err(DelphiError::NumericalDivergence { .. })));
    }

    #[test]
    fn slow_systems_hit_the_wall_clock_guard() {
        let slow = |_t: Time, x: &[Real; 1]| {
            std::thread::sleep(std::time::Duration::from_millis(1));
            [-x[0]]
        };
        let times: Vec<Time> = (0..=200).map(|i| i as Real).collect();
        let options = SolverOptions {
            timeout_secs: Some(0.01),
            ..Default::default()
        };
        let res = solve(&slow, [1.0], &times, &options);
        assert!(matches!(
            res,
            Err(DelphiError::Timeout { secs, .. }) if (secs - 0.01).abs() < 1e-9
        ));
        assert!(res.unwrap_err().is_scenario_failure());
    }

    #[test]
    fn rejects_bad_grids() {
        let f = |_t: Time, x: &[Real; 1]| [x[0]];
        let opts = SolverOptions::default();
        assert!(solve(&f, [1.0], &[], &opts).is_err());
        assert!(solve(&f, [1.0], &[0.0, 2.0, 1.0], &opts).is_err());
        assert!(matches!(
            solve(&f, [Real::NAN], &[0.0, 1.0], &opts),
            Err(DelphiError::NumericalDivergence { .. })
        ));
    }
}
