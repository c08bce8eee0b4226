use super::{overlay::PolicyOverlay, response, state::N_COMPARTMENTS};
use crate::{
    params::{FittedParams, Fractions, RateConstants},
    prelude::{Real, Time},
    solver::OdeSystem,
};
use getset::{CopyGetters, Getters};

/// The 16-compartment DELPHI model for a single (location, scenario).
///
/// All location and scenario context is carried explicitly by this struct;
/// evaluating derivatives never touches shared mutable state.
#[derive(Debug, Clone, Getters, CopyGetters)]
pub struct DelphiModel {
    #[getset(get = "pub")]
    params: FittedParams,
    #[getset(get = "pub")]
    rates: RateConstants,
    #[getset(get_copy = "pub")]
    fractions: Fractions,
    #[getset(get_copy = "pub")]
    population: Real,
    #[getset(get = "pub")]
    overlay: PolicyOverlay,
}

impl DelphiModel {
    pub fn new(
        params: FittedParams,
        rates: RateConstants,
        fractions: Fractions,
        population: Real,
        overlay: PolicyOverlay,
    ) -> Self {
        DelphiModel {
            params,
            rates,
            fractions,
            population,
            overlay,
        }
    }

    /// Transmission multiplier at time `t`, including the policy overlay.
    pub fn gamma(&self, t: Time) -> Real {
        self.overlay.gamma(t, &self.params)
    }
}

impl OdeSystem<N_COMPARTMENTS> for DelphiModel {
    fn derivatives(&self, t: Time, x: &[Real; N_COMPARTMENTS]) -> [Real; N_COMPARTMENTS] {
        let FittedParams {
            alpha, r_dth, ..
        } = self.params;
        let Fractions { p_d, p_h, p_v } = self.fractions;
        let (r_i, r_d) = (self.rates.r_i(), self.rates.r_d());
        let (r_ri, r_rh, r_rv) = (self.rates.r_ri(), self.rates.r_rh(), self.rates.r_rv());
        let n = self.population;

        let gamma_t = self.gamma(t);
        let p_dth = response::mortality(t, &self.params);

        let [s, e, i, ar, dhr, dqr, ad, dhd, dqd, _r, _d, _th, dvr, dvd, _dd, _dt] = *x;

        let infections = alpha * gamma_t * s * i / n;
        let resolved = r_d * i;

        [
            // S, E, I
            -infections,
            infections - r_i * e,
            r_i * e - resolved,
            // Recovering: undetected, hospitalized, quarantined
            resolved * (1.0 - p_dth) * (1.0 - p_d) - r_ri * ar,
            resolved * (1.0 - p_dth) * p_d * p_h - r_rh * dhr,
            resolved * (1.0 - p_dth) * p_d * (1.0 - p_h) - r_ri * dqr,
            // Dying: undetected, hospitalized, quarantined
            resolved * p_dth * (1.0 - p_d) - r_dth * ad,
            resolved * p_dth * p_d * p_h - r_dth * dhd,
            resolved * p_dth * p_d * (1.0 - p_h) - r_dth * dqd,
            // R, D
            r_ri * (ar + dqr) + r_rh * dhr,
            r_dth * (ad + dqd + dhd),
            // Helper states
            resolved * p_d * p_h,
            resolved * (1.0 - p_dth) * p_d * p_h * p_v - r_rv * dvr,
            resolved * p_dth * p_d * p_h * p_v - r_dth * dvd,
            r_dth * (dhd + dqd),
            resolved * p_d,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Compartment;
    use crate::params::ParamLayout;
    use assert_approx_eq::assert_approx_eq;

    fn model(overlay: PolicyOverlay) -> DelphiModel {
        let params = FittedParams::from_values(
            &[0.3, 25.0, 2.0, 0.2, 0.1, 0.8, 0.5, 0.5, 0.2, 80.0, 6.0, 1.0],
            ParamLayout::Python,
        )
        .unwrap();
        DelphiModel::new(
            params,
            RateConstants::default(),
            Fractions::default(),
            1e6,
            overlay,
        )
    }

    fn state() -> [Real; N_COMPARTMENTS] {
        [
            9e5, 1e4, 2e4, 3e3, 50.0, 800.0, 30.0, 5.0, 40.0, 6e4, 700.0, 90.0, 10.0, 2.0, 300.0,
            2500.0,
        ]
    }

    #[test]
    fn population_flows_balance() {
        let m = model(PolicyOverlay::disabled());
        for t in [0.0, 10.0, 25.0, 80.0, 300.0] {
            let dx = m.derivatives(t, &state());
            let total: Real = dx[..=Compartment::Dead.index()].iter().sum();
            assert_approx_eq!(total, 0.0, 1e-9);
        }
    }

    #[test]
    fn cumulative_flows_are_non_negative() {
        let m = model(PolicyOverlay::disabled());
        let dx = m.derivatives(12.0, &state());
        for c in [
            Compartment::Recovered,
            Compartment::Dead,
            Compartment::TotalHospitalized,
            Compartment::DetectedDead,
            Compartment::DetectedTotal,
        ] {
            assert!(dx[c.index()] >= 0.0, "{:?} decreased", c);
        }
    }

    #[test]
    fn overlay_changes_only_transmission() {
        let base = model(PolicyOverlay::disabled());
        let overlay = PolicyOverlay::new(base.params(), 10.0, 0.0, 0.239, 1.0);
        let policy = model(overlay);
        let x = state();
        let (d0, d1) = (base.derivatives(20.0, &x), policy.derivatives(20.0, &x));
        assert!(d1[0] > d0[0]);
        for k in 2..N_COMPARTMENTS {
            assert_eq!(d0[k], d1[k]);
        }
        // Before the switch both models agree everywhere.
        assert_eq!(base.derivatives(5.0, &x), policy.derivatives(5.0, &x));
    }

    #[test]
    fn invalid_input_propagates_nan() {
        let m = model(PolicyOverlay::disabled());
        let mut x = state();
        x[2] = Real::NAN;
        let dx = m.derivatives(1.0, &x);
        assert!(dx[0].is_nan());
    }
}
