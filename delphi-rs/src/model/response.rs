use crate::params::{constants::MIN_MORTALITY, FittedParams};
use crate::prelude::{Real, Time};
use std::f64::consts::{FRAC_2_PI, FRAC_PI_2};

/// Government-response multiplier on transmission at time `t`.
///
/// An arctan step that falls from ~2 to ~0 around day `days` with steepness
/// `r_s`, plus a Gaussian bump of height `jump` centred at `t_jump` that models
/// a resurgence.
pub fn gamma(t: Time, params: &FittedParams) -> Real {
    action_curve(t, params) + resurgence(t, params)
}

/// The arctan part of [`gamma`], bounded in [0, 2].
pub fn action_curve(t: Time, params: &FittedParams) -> Real {
    FRAC_2_PI * (-(t - params.days) / 20.0 * params.r_s).atan() + 1.0
}

/// The Gaussian part of [`gamma`], bounded in [0, jump].
pub fn resurgence(t: Time, params: &FittedParams) -> Real {
    let dt = t - params.t_jump;
    params.jump * (-dt * dt / (2.0 * params.std_normal * params.std_normal)).exp()
}

/// Mortality fraction at time `t`.
///
/// Starts at `p_dth` and decays towards 1% at rate `r_dthdecay` as detection
/// and treatment improve.
pub fn mortality(t: Time, params: &FittedParams) -> Real {
    FRAC_2_PI
        * (params.p_dth - MIN_MORTALITY)
        * ((-t / 20.0 * params.r_dthdecay).atan() + FRAC_PI_2)
        + MIN_MORTALITY
}
