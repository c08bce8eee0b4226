use crate::prelude::Real;

///////////////////////////////////////////////////////////////////////////////
// Default params for COVID-19 (meta-analysis values)
///////////////////////////////////////////////////////////////////////////////

/// Median incubation period, in days.
pub const INCUBATION_DAYS: Real = 5.0;
/// Median time from infectiousness to detection, in days.
pub const DETECTION_DAYS: Real = 2.0;
/// Median recovery time outside the hospital, in days.
pub const RECOVERY_INFECTED_DAYS: Real = 10.0;
/// Median recovery time for hospitalized patients, in days.
pub const RECOVERY_HOSPITALIZED_DAYS: Real = 15.0;
/// Median time on ventilation for patients that recover, in days.
pub const RECOVERY_VENTILATED_DAYS: Real = 10.0;

/// Fraction of true cases that are detected.
pub const PROB_DETECTED: Real = 0.2;
/// Fraction of detected cases that are hospitalized.
pub const PROB_HOSPITALIZED: Real = 0.03;
/// Fraction of hospitalized cases that are ventilated.
pub const PROB_VENTILATED: Real = 0.25;

/// Floor of the time-varying mortality fraction.
pub const MIN_MORTALITY: Real = 0.01;

/// Guards the overlay's headroom term against a policy gamma of exactly 1.
pub const OVERLAY_EPSILON: Real = 1e-4;

/// Minimum number of valid history rows required to forecast a location.
pub const MIN_HISTORY_POINTS: usize = 15;

/// Number of trailing history days used by the "recent" fit score.
pub const RECENT_WINDOW: usize = 15;

///////////////////////////////////////////////////////////////////////////////
// Scenario universe
///////////////////////////////////////////////////////////////////////////////

pub const FUTURE_POLICIES: [&str; 7] = [
    "No_Measure",
    "Restrict_Mass_Gatherings",
    "Mass_Gatherings_Authorized_But_Others_Restricted",
    "Restrict_Mass_Gatherings_and_Schools",
    "Authorize_Schools_but_Restrict_Mass_Gatherings_and_Others",
    "Restrict_Mass_Gatherings_and_Schools_and_Others",
    "Lockdown",
];

/// Enactment delays, in days after the forecast start.
pub const FUTURE_TIMES: [u32; 5] = [0, 7, 14, 28, 42];

/// Normalized policy gammas used when no decision-tree estimate is supplied.
pub const DEFAULT_POLICY_GAMMA: [(&str, Real); 7] = [
    ("No_Measure", 1.0),
    ("Restrict_Mass_Gatherings", 0.873),
    ("Authorize_Schools_but_Restrict_Mass_Gatherings_and_Others", 0.794),
    ("Mass_Gatherings_Authorized_But_Others_Restricted", 0.668),
    ("Restrict_Mass_Gatherings_and_Schools", 0.479),
    ("Restrict_Mass_Gatherings_and_Schools_and_Others", 0.423),
    ("Lockdown", 0.239),
];
