use super::response;
use crate::params::{constants::OVERLAY_EPSILON, FittedParams};
use crate::prelude::{Real, Time};

/// Counterfactual policy correction applied to the response curve once a
/// scenario's policy takes effect.
///
/// The overlay is fixed per (location, scenario): it stores the switch time,
/// the value of the response curve at that time and the normalized gammas of
/// the current and future policies.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PolicyOverlay {
    switch_time: Time,
    gamma_at_switch: Real,
    future_gamma: Real,
    current_gamma: Real,
}

impl PolicyOverlay {
    /// Create overlay for a policy enacted `future_time` days after the last
    /// day with observed data.
    pub fn new(
        params: &FittedParams,
        last_observed: Time,
        future_time: Real,
        future_gamma: Real,
        current_gamma: Real,
    ) -> Self {
        let switch_time = last_observed + future_time;
        PolicyOverlay {
            switch_time,
            gamma_at_switch: response::gamma(switch_time, params),
            future_gamma,
            current_gamma,
        }
    }

    /// An overlay that never changes the curve.
    pub fn disabled() -> Self {
        PolicyOverlay {
            switch_time: Time::INFINITY,
            gamma_at_switch: 1.0,
            future_gamma: 1.0,
            current_gamma: 1.0,
        }
    }

    pub fn switch_time(&self) -> Time {
        self.switch_time
    }

    /// Additive correction to the response curve at time `t`.
    ///
    /// Zero up to and including the switch time. Afterwards, the smaller of the
    /// headroom to the curve's ceiling (scaled by how restrictive the future
    /// policy is) and the relative change between future and current policy.
    /// The result is not clamped and may be negative.
    pub fn correction(&self, t: Time) -> Real {
        if !(t > self.switch_time) || self.future_gamma == self.current_gamma {
            return 0.0;
        }
        let headroom =
            (2.0 - self.gamma_at_switch) / (1.0 - self.future_gamma + OVERLAY_EPSILON);
        let shift =
            self.gamma_at_switch / self.current_gamma * (self.future_gamma - self.current_gamma);
        headroom.min(shift)
    }

    /// Response curve at time `t` with the correction applied.
    pub fn gamma(&self, t: Time, params: &FittedParams) -> Real {
        response::gamma(t, params) + self.correction(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamLayout;
    use assert_approx_eq::assert_approx_eq;

    fn params() -> FittedParams {
        FittedParams::from_values(
            &[0.3, 25.0, 2.0, 0.2, 0.1, 0.8, 0.5, 0.5, 0.2, 80.0, 6.0, 1.0],
            ParamLayout::Python,
        )
        .unwrap()
    }

    #[test]
    fn no_correction_before_switch() {
        let p = params();
        let overlay = PolicyOverlay::new(&p, 40.0, 14.0, 0.239, 1.0);
        assert_eq!(overlay.switch_time(), 54.0);
        assert_eq!(overlay.correction(0.0), 0.0);
        assert_eq!(overlay.correction(54.0 - 1e-9), 0.0);
        assert_eq!(overlay.correction(54.0), 0.0);
        assert!(overlay.correction(54.0 + 1e-9) != 0.0);
    }

    #[test]
    fn status_quo_is_a_no_op() {
        let p = params();
        for gamma in [0.239, 0.668, 1.0, 1.4] {
            let overlay = PolicyOverlay::new(&p, 40.0, 0.0, gamma, gamma);
            for i in 0..200 {
                assert_eq!(overlay.correction(i as Real), 0.0);
            }
        }
    }

    #[test]
    fn restriction_lowers_transmission() {
        let p = params();
        // Lockdown while the location currently has no measures.
        let overlay = PolicyOverlay::new(&p, 40.0, 0.0, 0.239, 1.0);
        let g = response::gamma(40.0, &p);
        let expected = (g / 1.0 * (0.239 - 1.0)).min((2.0 - g) / (1.0 - 0.239 + 1e-4));
        assert_approx_eq!(overlay.correction(41.0), expected, 1e-12);
        assert!(overlay.correction(41.0) < 0.0);
    }

    #[test]
    fn relaxation_is_not_clamped() {
        let p = params();
        // Lifting a lockdown: the shift term is positive but bounded by headroom.
        let overlay = PolicyOverlay::new(&p, 40.0, 7.0, 1.0, 0.239);
        let g = response::gamma(47.0, &p);
        let headroom = (2.0 - g) / 1e-4;
        let shift = g / 0.239 * (1.0 - 0.239);
        assert_approx_eq!(overlay.correction(60.0), headroom.min(shift), 1e-9);
        assert!(overlay.correction(60.0) > 0.0);
    }

    #[test]
    fn disabled_overlay() {
        let p = params();
        let overlay = PolicyOverlay::disabled();
        assert_eq!(overlay.gamma(1e5, &p), response::gamma(1e5, &p));
    }
}
