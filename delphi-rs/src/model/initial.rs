use super::state::EpiState;
use crate::{
    params::{FittedParams, GlobalParamsFixed},
    prelude::{DelphiError, Result},
};

/// Derive the model state at day 0 from fitted and fixed parameters.
///
/// Known detected cases and deaths are scaled up by the detection fraction and
/// split into the detected/undetected and fatal/non-fatal sub-compartments
/// with the same fractions the derivatives use, so the flows are balanced
/// from the first step.
pub fn initial_state(params: &FittedParams, fixed: &GlobalParamsFixed) -> Result<EpiState> {
    let n = fixed.population();
    if !(n > 0.0) {
        return Err(DelphiError::invalid(
            "population",
            n,
            "must be positive",
        ));
    }
    if fixed.cases_0() > n {
        return Err(DelphiError::invalid(
            "cases_0",
            fixed.cases_0(),
            "detected cases exceed the population",
        ));
    }

    let FittedParams {
        p_dth, k1, k2, k3, ..
    } = *params;
    let (p_d, p_h, p_v) = (fixed.p_d(), fixed.p_h(), fixed.p_v());
    let deaths = fixed.deaths_0();
    let recovered = fixed.population_r();

    // Active detected cases and their undetected counterpart.
    let ci = (fixed.cases_0() - deaths - recovered) * k3;
    let undetected = ci / p_d - ci;

    let state = EpiState([
        n - ci / p_d - ci / p_d * (k1 + k2) - recovered / p_d - deaths / p_d,
        ci / p_d * k1,
        ci / p_d * k2,
        undetected * (1.0 - p_dth),
        ci * p_h * (1.0 - p_dth),
        ci * (1.0 - p_h) * (1.0 - p_dth),
        undetected * p_dth,
        ci * p_h * p_dth,
        ci * (1.0 - p_h) * p_dth,
        recovered / p_d,
        deaths / p_d,
        ci * p_h,
        ci * p_h * p_v * (1.0 - p_dth),
        ci * p_h * p_v * p_dth,
        deaths,
        fixed.cases_0(),
    ]);
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{Fractions, HistorySeeds, ParamLayout};
    use crate::prelude::Real;
    use assert_approx_eq::assert_approx_eq;

    fn params() -> FittedParams {
        FittedParams::from_values(
            &[0.3, 25.0, 2.0, 0.2, 0.1, 0.8, 0.5, 0.5, 0.2, 80.0, 6.0, 1.2],
            ParamLayout::Python,
        )
        .unwrap()
    }

    fn fixed(population: Real, cases: Real) -> GlobalParamsFixed {
        let seeds = HistorySeeds {
            cases_0: cases,
            deaths_0: 30.0,
            cases_lag_14: 300.0,
            deaths_lag_9: 10.0,
        };
        GlobalParamsFixed::from_history(population, seeds, None, Fractions::default())
    }

    #[test]
    fn partitions_the_population() {
        let x = initial_state(&params(), &fixed(1e6, 1000.0)).unwrap();
        assert_approx_eq!(x.population_total(), 1e6, 1e-6);
        assert!(x.as_array().iter().all(|&v| v >= 0.0));
        assert_eq!(x.detected_total(), 1000.0);
        assert_eq!(x.detected_dead(), 30.0);
    }

    #[test]
    fn splits_match_model_fractions() {
        let p = params();
        let x = initial_state(&p, &fixed(1e6, 1000.0)).unwrap();
        let fr = Fractions::default();
        let dying = x.hospitalized_dying() + x.quarantined_dying();
        assert_approx_eq!(dying / (dying + x.hospitalized_recovering() + x.quarantined_recovering()), p.p_dth, 1e-12);
        assert_approx_eq!(x.active_hospitalized() / x.active(), fr.p_h, 1e-12);
        assert_approx_eq!(x.active_ventilated() / x.active_hospitalized(), fr.p_v, 1e-12);
        assert_approx_eq!(x.total_hospitalized(), x.active_hospitalized(), 1e-9);
    }

    #[test]
    fn rejects_invalid_population() {
        let res = initial_state(&params(), &fixed(0.0, 100.0));
        assert!(matches!(
            res,
            Err(DelphiError::InvalidParameter { name: "population", .. })
        ));
        let res = initial_state(&params(), &fixed(500.0, 1000.0));
        assert!(matches!(
            res,
            Err(DelphiError::InvalidParameter { name: "cases_0", .. })
        ));
    }
}
