//! Per-algorithm hyperparameter selection

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::{algo::Algorithm, decay::Polynomial, ensure_interval, error::ConfigurationError};

/// Names of the hyperparameters an algorithm can require
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Param {
    LearningRate,
    LambdaCoeff,
    Beta,
    NTables,
}

/// A `v / n^exp` step-size schedule
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub initial: f32,
    pub exp: f32,
}

impl Schedule {
    pub fn polynomial(&self) -> Result<Polynomial, ConfigurationError> {
        Polynomial::new(self.initial, self.exp)
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/n^{}", self.initial, self.exp)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Schedule(Schedule),
    Coefficient(f32),
    Count(usize),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Schedule(s) => s.fmt(f),
            ParamValue::Coefficient(c) => c.fmt(f),
            ParamValue::Count(n) => n.fmt(f),
        }
    }
}

/// Values every selected [`HyperparameterSet`] draws from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    /// **Default**: `1/n^1`
    pub learning_rate: Schedule,
    /// Eligibility trace decay of SARSA(λ) and Q(λ)
    ///
    /// **Default**: `0.5`
    pub lambda: f32,
    /// Rate of the average-reward (R-learning) and next-value (RQ-learning) estimates
    ///
    /// **Default**: `0.5`
    pub beta: f32,
    /// Number of tables of Maxmin Q-learning
    ///
    /// **Default**: `2`
    pub n_tables: usize,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            learning_rate: Schedule {
                initial: 1.0,
                exp: 1.0,
            },
            lambda: 0.5,
            beta: 0.5,
            n_tables: 2,
        }
    }
}

impl Defaults {
    /// These defaults with the learning rate decaying as `1/n^exp`
    pub fn with_exponent(self, exp: f32) -> Self {
        Self {
            learning_rate: Schedule {
                exp,
                ..self.learning_rate
            },
            ..self
        }
    }

    fn value(&self, param: Param) -> ParamValue {
        match param {
            Param::LearningRate => ParamValue::Schedule(self.learning_rate),
            Param::LambdaCoeff => ParamValue::Coefficient(self.lambda),
            Param::Beta => ParamValue::Coefficient(self.beta),
            Param::NTables => ParamValue::Count(self.n_tables),
        }
    }
}

impl Algorithm {
    /// Hyperparameters shared by a whole family of algorithms
    pub fn base_params(&self) -> &'static [Param] {
        match self {
            Algorithm::Fqi => &[],
            _ => &[Param::LearningRate],
        }
    }

    /// Hyperparameters this algorithm needs on top of [`base_params`](Algorithm::base_params)
    pub fn extra_params(&self) -> &'static [Param] {
        match self {
            Algorithm::SarsaLambda | Algorithm::QLambda => &[Param::LambdaCoeff],
            Algorithm::RLearning | Algorithm::RQ => &[Param::Beta],
            Algorithm::MaxminQ => &[Param::NTables],
            Algorithm::Q
            | Algorithm::DoubleQ
            | Algorithm::WeightedQ
            | Algorithm::SpeedyQ
            | Algorithm::Sarsa
            | Algorithm::ExpectedSarsa
            | Algorithm::Fqi => &[],
        }
    }
}

/// The validated hyperparameters of one algorithm in one sweep cell
#[derive(Debug, Clone, PartialEq)]
pub struct HyperparameterSet {
    algorithm: Algorithm,
    params: BTreeMap<Param, ParamValue>,
}

impl HyperparameterSet {
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn get(&self, param: Param) -> Option<ParamValue> {
        self.params.get(&param).copied()
    }

    pub fn keys(&self) -> impl Iterator<Item = Param> + '_ {
        self.params.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    fn missing(&self, param: Param) -> ConfigurationError {
        ConfigurationError::MissingHyperparameter {
            algorithm: self.algorithm,
            param,
        }
    }

    pub fn learning_rate(&self) -> Result<Polynomial, ConfigurationError> {
        match self.get(Param::LearningRate) {
            Some(ParamValue::Schedule(s)) => s.polynomial(),
            _ => Err(self.missing(Param::LearningRate)),
        }
    }

    pub fn lambda(&self) -> Result<f32, ConfigurationError> {
        self.coefficient(Param::LambdaCoeff)
    }

    pub fn beta(&self) -> Result<f32, ConfigurationError> {
        self.coefficient(Param::Beta)
    }

    pub fn n_tables(&self) -> Result<usize, ConfigurationError> {
        match self.get(Param::NTables) {
            Some(ParamValue::Count(n)) => Ok(n),
            _ => Err(self.missing(Param::NTables)),
        }
    }

    fn coefficient(&self, param: Param) -> Result<f32, ConfigurationError> {
        match self.get(param) {
            Some(ParamValue::Coefficient(c)) => Ok(c),
            _ => Err(self.missing(param)),
        }
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        for (&param, &value) in &self.params {
            match (param, value) {
                (_, ParamValue::Schedule(s)) => {
                    s.polynomial()?;
                }
                (Param::LambdaCoeff, ParamValue::Coefficient(lambda)) => {
                    ensure_interval!(lambda, 0.0, 1.0);
                }
                (_, ParamValue::Coefficient(c)) => {
                    if !c.is_finite() || c < 0.0 {
                        return Err(ConfigurationError::InvalidValue {
                            field: "beta",
                            reason: format!("must be finite and non-negative, got {c}"),
                        });
                    }
                }
                (_, ParamValue::Count(0)) => {
                    return Err(ConfigurationError::InvalidValue {
                        field: "n_tables",
                        reason: "must be at least 1".into(),
                    });
                }
                (_, ParamValue::Count(_)) => {}
            }
        }
        Ok(())
    }
}

impl fmt::Display for HyperparameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (param, value)) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{param}={value}")?;
        }
        Ok(())
    }
}

/// Build the hyperparameters of `algorithm`: its family's base keys plus exactly its extra keys
pub fn select(
    algorithm: Algorithm,
    defaults: &Defaults,
) -> Result<HyperparameterSet, ConfigurationError> {
    let params = algorithm
        .base_params()
        .iter()
        .chain(algorithm.extra_params())
        .map(|&p| (p, defaults.value(p)))
        .collect();
    let set = HyperparameterSet { algorithm, params };
    set.validate()?;
    Ok(set)
}

/// [`select`] for an algorithm given by short or long name
pub fn select_by_name(
    name: &str,
    defaults: &Defaults,
) -> Result<HyperparameterSet, ConfigurationError> {
    select(Algorithm::parse(name)?, defaults)
}

#[cfg(test)]
mod tests {
    use strum::VariantArray;

    use super::*;

    #[test]
    fn keys_per_algorithm() {
        use Algorithm::*;
        use Param::*;

        let expected: [(Algorithm, &[Param]); 12] = [
            (Q, &[LearningRate]),
            (DoubleQ, &[LearningRate]),
            (WeightedQ, &[LearningRate]),
            (SpeedyQ, &[LearningRate]),
            (Sarsa, &[LearningRate]),
            (SarsaLambda, &[LearningRate, LambdaCoeff]),
            (ExpectedSarsa, &[LearningRate]),
            (QLambda, &[LearningRate, LambdaCoeff]),
            (RLearning, &[LearningRate, Beta]),
            (MaxminQ, &[LearningRate, NTables]),
            (RQ, &[LearningRate, Beta]),
            (Fqi, &[]),
        ];
        assert_eq!(expected.len(), Algorithm::VARIANTS.len(), "Every algorithm listed");

        let defaults = Defaults::default();
        for (algorithm, keys) in expected {
            let set = select(algorithm, &defaults).unwrap();
            assert_eq!(set.keys().collect::<Vec<_>>(), keys, "Keys of {algorithm}");
        }
    }

    #[test]
    fn family_extras() {
        let defaults = Defaults::default();
        let q = select(Algorithm::Q, &defaults).unwrap();
        assert_eq!(q.keys().collect::<Vec<_>>(), [Param::LearningRate]);

        let sl = select(Algorithm::SarsaLambda, &defaults).unwrap();
        assert_eq!(sl.lambda(), Ok(0.5));

        let rl = select(Algorithm::RLearning, &defaults).unwrap();
        assert_eq!(rl.beta(), Ok(0.5));

        let mmq = select(Algorithm::MaxminQ, &defaults).unwrap();
        assert_eq!(mmq.n_tables(), Ok(2));

        assert!(select(Algorithm::Fqi, &defaults).unwrap().is_empty());
    }

    #[test]
    fn exponent_reaches_schedule() {
        let set = select(Algorithm::Q, &Defaults::default().with_exponent(0.8)).unwrap();
        let lr = set.learning_rate().unwrap();
        assert_eq!(lr.initial(), 1.0);
        assert_eq!(lr.exponent(), 0.8);
    }

    #[test]
    fn missing_key_is_reported() {
        let set = select(Algorithm::Q, &Defaults::default()).unwrap();
        assert_eq!(
            set.lambda(),
            Err(ConfigurationError::MissingHyperparameter {
                algorithm: Algorithm::Q,
                param: Param::LambdaCoeff,
            })
        );
    }

    #[test]
    fn unknown_name_is_an_error() {
        assert_eq!(
            select_by_name("Dyna", &Defaults::default()),
            Err(ConfigurationError::UnknownAlgorithm("Dyna".into()))
        );
    }

    #[test]
    fn invalid_values_fail_fast() {
        let defaults = Defaults {
            n_tables: 0,
            ..Default::default()
        };
        assert!(select(Algorithm::MaxminQ, &defaults).is_err());
        assert!(
            select(Algorithm::Q, &defaults).is_ok(),
            "Unused values are not checked"
        );

        let defaults = Defaults {
            lambda: 1.5,
            ..Default::default()
        };
        assert!(select(Algorithm::QLambda, &defaults).is_err());

        let defaults = Defaults {
            beta: f32::NAN,
            ..Default::default()
        };
        assert!(select(Algorithm::RQ, &defaults).is_err());
    }

    #[test]
    fn display_lists_values() {
        let set = select(Algorithm::SarsaLambda, &Defaults::default().with_exponent(0.8)).unwrap();
        assert_eq!(set.to_string(), "learning_rate=1/n^0.8, lambda_coeff=0.5");
    }
}
