use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, VariantArray};

use crate::error::ConfigurationError;

pub mod fqi;
pub mod tabular;

/// The control algorithms a sweep can compare
///
/// The string form is the short name used in array file names and plot legends.
/// Parsing also accepts the long name, ignoring ASCII case.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    VariantArray,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
#[serde(try_from = "String", into = "String")]
pub enum Algorithm {
    #[strum(to_string = "Q", serialize = "QLearning")]
    Q,
    #[strum(to_string = "DQ", serialize = "DoubleQLearning")]
    DoubleQ,
    #[strum(to_string = "WQ", serialize = "WeightedQLearning")]
    WeightedQ,
    #[strum(to_string = "SPQ", serialize = "SpeedyQLearning")]
    SpeedyQ,
    #[strum(to_string = "SARSA")]
    Sarsa,
    #[strum(to_string = "SARSAL", serialize = "SARSALambda")]
    SarsaLambda,
    #[strum(to_string = "ESARSA", serialize = "ExpectedSARSA")]
    ExpectedSarsa,
    #[strum(to_string = "QL", serialize = "QLambda")]
    QLambda,
    #[strum(to_string = "RL", serialize = "RLearning")]
    RLearning,
    #[strum(to_string = "MMQ", serialize = "MaxminQLearning")]
    MaxminQ,
    #[strum(to_string = "RQ", serialize = "RQLearning")]
    RQ,
    #[strum(to_string = "FQI", serialize = "FittedQIteration")]
    Fqi,
}

impl Algorithm {
    /// Every temporal-difference algorithm, in the order they are compared by default
    pub const TD: [Algorithm; 11] = [
        Algorithm::Q,
        Algorithm::DoubleQ,
        Algorithm::WeightedQ,
        Algorithm::SpeedyQ,
        Algorithm::Sarsa,
        Algorithm::SarsaLambda,
        Algorithm::ExpectedSarsa,
        Algorithm::QLambda,
        Algorithm::RLearning,
        Algorithm::MaxminQ,
        Algorithm::RQ,
    ];

    /// Parse a short or long algorithm name
    pub fn parse(name: &str) -> Result<Self, ConfigurationError> {
        Self::from_str(name.trim())
            .map_err(|_| ConfigurationError::UnknownAlgorithm(name.to_string()))
    }

    /// Whether the algorithm learns a table with one update per step
    ///
    /// The only other kind is [`Fqi`](Algorithm::Fqi), which fits an approximator
    /// every few episodes.
    pub fn is_tabular(&self) -> bool {
        !matches!(self, Algorithm::Fqi)
    }
}

impl TryFrom<String> for Algorithm {
    type Error = ConfigurationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Algorithm> for String {
    fn from(value: Algorithm) -> Self {
        value.to_string()
    }
}
