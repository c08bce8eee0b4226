use crate::prelude::Real;
use paste::paste;
use std::ops::{Index, IndexMut};

/// Number of compartments in the model.
pub const N_COMPARTMENTS: usize = 16;

/// Declare compartments, their positions in the state vector and the
/// corresponding accessors in EpiState.
macro_rules! compartments {
    ($($idx:literal => $name:ident($label:literal): $doc:literal),* $(,)?) => {
        /// Compartments of the model, in state-vector order.
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
        pub enum Compartment {
            $(
                #[doc = $doc]
                $name = $idx,
            )*
        }

        impl Compartment {
            pub const ALL: [Compartment; N_COMPARTMENTS] = [$(Compartment::$name),*];

            /// Short label used in tables.
            pub fn label(self) -> &'static str {
                match self {
                    $(Compartment::$name => $label,)*
                }
            }

            #[inline]
            pub fn index(self) -> usize {
                self as usize
            }
        }

        impl EpiState {
            paste! {
                $(
                    #[doc = $doc]
                    #[inline]
                    pub fn [<$name:snake>](&self) -> Real {
                        self.0[$idx]
                    }
                )*
            }
        }
    };
}

compartments! {
    0 => Susceptible("S"): "Susceptible population.",
    1 => Exposed("E"): "Exposed, still incubating.",
    2 => Infected("I"): "Infected, not yet resolved into a detection path.",
    3 => UndetectedRecovering("AR"): "Undetected cases that will recover.",
    4 => HospitalizedRecovering("DHR"): "Detected hospitalized cases that will recover.",
    5 => QuarantinedRecovering("DQR"): "Detected non-hospitalized cases that will recover.",
    6 => UndetectedDying("AD"): "Undetected cases that will die.",
    7 => HospitalizedDying("DHD"): "Detected hospitalized cases that will die.",
    8 => QuarantinedDying("DQD"): "Detected non-hospitalized cases that will die.",
    9 => Recovered("R"): "Cumulative recovered.",
    10 => Dead("D"): "Cumulative dead.",
    11 => TotalHospitalized("TH"): "Cumulative hospitalized.",
    12 => VentilatedRecovering("DVR"): "Ventilated cases that will recover.",
    13 => VentilatedDying("DVD"): "Ventilated cases that will die.",
    14 => DetectedDead("DD"): "Cumulative deaths among detected cases.",
    15 => DetectedTotal("DT"): "Cumulative detected cases.",
}

/// The 16-compartment state vector of the model at a given day.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct EpiState(pub [Real; N_COMPARTMENTS]);

impl EpiState {
    pub fn as_array(&self) -> &[Real; N_COMPARTMENTS] {
        &self.0
    }

    /// Sum of the compartments that partition the population (S through D).
    ///
    /// Hospitalization, ventilation and detection totals are helper states that
    /// overlap with these and are not part of the balance.
    pub fn population_total(&self) -> Real {
        self.0[..=Compartment::Dead.index()].iter().sum()
    }

    /// Detected cases that have not resolved yet.
    pub fn active(&self) -> Real {
        self.hospitalized_recovering()
            + self.quarantined_recovering()
            + self.hospitalized_dying()
            + self.quarantined_dying()
    }

    pub fn active_hospitalized(&self) -> Real {
        self.hospitalized_recovering() + self.hospitalized_dying()
    }

    pub fn active_ventilated(&self) -> Real {
        self.ventilated_recovering() + self.ventilated_dying()
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|x| x.is_finite())
    }
}

impl From<[Real; N_COMPARTMENTS]> for EpiState {
    fn from(data: [Real; N_COMPARTMENTS]) -> Self {
        EpiState(data)
    }
}

/// Fill compartments in order. Missing values are zero and extra values are
/// ignored.
impl FromIterator<Real> for EpiState {
    fn from_iter<I: IntoIterator<Item = Real>>(iter: I) -> Self {
        let mut data = [0.0; N_COMPARTMENTS];
        for (x, value) in data.iter_mut().zip(iter) {
            *x = value;
        }
        EpiState(data)
    }
}

impl Index<Compartment> for EpiState {
    type Output = Real;

    fn index(&self, c: Compartment) -> &Real {
        &self.0[c.index()]
    }
}

impl IndexMut<Compartment> for EpiState {
    fn index_mut(&mut self, c: Compartment) -> &mut Real {
        &mut self.0[c.index()]
    }
}
