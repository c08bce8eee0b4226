use super::constants::DEFAULT_POLICY_GAMMA;
use crate::prelude::{DelphiError, Real, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Normalized effect of each policy label on the response curve.
///
/// A value of 1.0 means no suppression relative to the absence of measures;
/// smaller values are more restrictive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyGammaMap(BTreeMap<String, Real>);

impl Default for PolicyGammaMap {
    fn default() -> Self {
        DEFAULT_POLICY_GAMMA
            .iter()
            .map(|&(label, gamma)| (label.to_string(), gamma))
            .collect()
    }
}

impl FromIterator<(String, Real)> for PolicyGammaMap {
    fn from_iter<I: IntoIterator<Item = (String, Real)>>(iter: I) -> Self {
        PolicyGammaMap(iter.into_iter().collect())
    }
}

impl PolicyGammaMap {
    pub fn get(&self, policy: &str) -> Option<Real> {
        self.0.get(policy).copied()
    }

    /// Gamma of a policy, or a configuration error if the label is unknown.
    pub fn gamma(&self, policy: &str) -> Result<Real> {
        self.get(policy).ok_or_else(|| {
            DelphiError::Configuration(format!("policy {:?} has no normalized gamma", policy))
        })
    }

    pub fn insert(&mut self, policy: impl Into<String>, gamma: Real) -> &mut Self {
        self.0.insert(policy.into(), gamma);
        self
    }

    /// Force `policy` to share the gamma of `source`.
    ///
    /// The decision tree that produces these values cannot separate some pairs
    /// of policies, so both labels must carry the same effect.
    pub fn tie(&mut self, policy: &str, source: &str) -> Result<&mut Self> {
        let gamma = self.gamma(source)?;
        self.0.insert(policy.to_string(), gamma);
        Ok(self)
    }

    /// Fail unless every label has a finite, positive gamma.
    pub fn ensure_covers<'a>(&self, labels: impl IntoIterator<Item = &'a str>) -> Result<()> {
        for label in labels {
            let gamma = self.gamma(label)?;
            if !(gamma.is_finite() && gamma > 0.0) {
                return Err(DelphiError::Configuration(format!(
                    "policy {:?} has invalid gamma {}",
                    label, gamma
                )));
            }
        }
        Ok(())
    }
}

/// Which policy-effect map applies to a location.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AggregationKind {
    Countries,
    UsStates,
}

impl AggregationKind {
    pub fn for_country(country: &str) -> Self {
        if country == "US" {
            AggregationKind::UsStates
        } else {
            AggregationKind::Countries
        }
    }
}

/// Country-level and U.S.-state-level gamma maps.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyMaps {
    pub countries: PolicyGammaMap,
    pub us: PolicyGammaMap,
}

impl PolicyMaps {
    pub fn for_kind(&self, kind: AggregationKind) -> &PolicyGammaMap {
        match kind {
            AggregationKind::Countries => &self.countries,
            AggregationKind::UsStates => &self.us,
        }
    }
}

/// Policy currently in force, keyed by (country, province).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CurrentPolicyMap(HashMap<(String, String), String>);

impl CurrentPolicyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        country: impl Into<String>,
        province: impl Into<String>,
        policy: impl Into<String>,
    ) -> &mut Self {
        self.0
            .insert((country.into(), province.into()), policy.into());
        self
    }

    pub fn get(&self, country: &str, province: &str) -> Option<&str> {
        self.0
            .get(&(country.to_string(), province.to_string()))
            .map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<((String, String), String)> for CurrentPolicyMap {
    fn from_iter<I: IntoIterator<Item = ((String, String), String)>>(iter: I) -> Self {
        CurrentPolicyMap(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::constants::FUTURE_POLICIES;

    #[test]
    fn default_map_covers_all_policies() {
        let map = PolicyGammaMap::default();
        assert!(map.ensure_covers(FUTURE_POLICIES.iter().copied()).is_ok());
        assert_eq!(map.get("Lockdown"), Some(0.239));
        assert_eq!(map.get("No_Measure"), Some(1.0));
    }

    #[test]
    fn unknown_policy_is_configuration_error() {
        let map = PolicyGammaMap::default();
        assert!(matches!(
            map.gamma("Curfew"),
            Err(DelphiError::Configuration(_))
        ));
        assert!(map.ensure_covers(vec!["Lockdown", "Curfew"]).is_err());
    }

    #[test]
    fn tie_copies_source_gamma() {
        let mut map = PolicyGammaMap::default();
        map.tie(
            "Restrict_Mass_Gatherings_and_Schools",
            "Restrict_Mass_Gatherings_and_Schools_and_Others",
        )
        .unwrap();
        assert_eq!(map.get("Restrict_Mass_Gatherings_and_Schools"), Some(0.423));
    }

    #[test]
    fn map_selection_by_country() {
        let mut maps = PolicyMaps::default();
        maps.us.insert("Lockdown", 0.3);
        assert_eq!(AggregationKind::for_country("US"), AggregationKind::UsStates);
        assert_eq!(
            maps.for_kind(AggregationKind::for_country("US")).get("Lockdown"),
            Some(0.3)
        );
        assert_eq!(
            maps.for_kind(AggregationKind::for_country("Brazil")).get("Lockdown"),
            Some(0.239)
        );
    }

    #[test]
    fn current_policy_lookup() {
        let mut current = CurrentPolicyMap::new();
        current.insert("France", "None", "Lockdown");
        assert_eq!(current.get("France", "None"), Some("Lockdown"));
        assert_eq!(current.get("France", "Corsica"), None);
    }
}
