use serde::{Deserialize, Serialize};
use std::fmt;

/// A hypothetical future policy and the delay (in days after the last
/// observation) at which it takes effect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScenarioKey {
    pub policy: String,
    pub delay: u32,
}

impl ScenarioKey {
    pub fn new(policy: impl Into<String>, delay: u32) -> Self {
        ScenarioKey {
            policy: policy.into(),
            delay,
        }
    }

    /// Human readable policy name.
    pub fn policy_label(&self) -> String {
        self.policy.replace('_', " ")
    }

    /// Human readable enactment delay.
    pub fn time_label(&self) -> String {
        match self.delay {
            0 => "Now".to_string(),
            7 => "One Week".to_string(),
            14 => "Two Weeks".to_string(),
            28 => "Four Weeks".to_string(),
            42 => "Six Weeks".to_string(),
            n => format!("{} Days", n),
        }
    }
}

impl fmt::Display for ScenarioKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {} days", self.policy, self.delay)
    }
}

/// Cartesian product of policies and delays, policy-major.
pub fn scenario_keys<P, S>(policies: P, delays: &[u32]) -> Vec<ScenarioKey>
where
    P: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut keys = vec![];
    for policy in policies {
        for &delay in delays {
            keys.push(ScenarioKey::new(policy.as_ref(), delay));
        }
    }
    keys
}
