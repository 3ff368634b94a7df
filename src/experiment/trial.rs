use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{
    agent::Agent,
    algo::{
        fqi::{FittedQIteration, FqiConfig},
        tabular::{
            DoubleQLearning, ExpectedSarsa, MaxminQLearning, QLambda, QLearning, RLearning,
            RQLearning, Sarsa, SarsaLambda, SpeedyQLearning, TdAgent, TdPolicy, TdRule,
            WeightedQLearning,
        },
        Algorithm,
    },
    core::{Budget, CollectMaxQ, CollectRewards, Core, Deadline, Record},
    decay::Polynomial,
    env::FiniteEnvironment,
    error::{ConfigurationError, TrialExecutionError},
    exploration::EpsilonGreedy,
    gym::GridWorld,
};

use super::hyperparams::HyperparameterSet;

/// The two sequences recorded by one repetition
#[derive(Debug, Clone, PartialEq)]
pub struct TrialResult {
    /// Reward of every step, or return of every episode
    pub rewards: Vec<f64>,
    /// `max_a Q(start, a)` at the same points
    pub max_q: Vec<f64>,
}

/// Runs one independent repetition of an algorithm
///
/// Implementations must not share mutable state between calls: the sweep
/// calls `run_trial` from many threads at once.
pub trait TrialRunner: Send + Sync {
    fn run_trial(
        &self,
        algorithm: Algorithm,
        params: &HyperparameterSet,
        seed: u64,
        deadline: &Deadline,
    ) -> Result<TrialResult, TrialExecutionError>;

    /// Length of both sequences returned for `algorithm`
    fn trial_length(&self, algorithm: Algorithm) -> usize;
}

/// Training on the Van Hasselt [`GridWorld`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridWorldTrial {
    /// Steps per repetition of a tabular algorithm
    pub n_steps: usize,
    /// Exploration decays as `1/n(s)^epsilon_exp`
    pub epsilon_exp: f32,
    /// Samples per weight estimate of Weighted Q-learning
    pub weighted_precision: usize,
    pub fqi: FqiConfig,
}

impl Default for GridWorldTrial {
    fn default() -> Self {
        Self {
            n_steps: 10_000,
            epsilon_exp: 0.5,
            weighted_precision: 1000,
            fqi: FqiConfig::default(),
        }
    }
}

impl GridWorldTrial {
    fn policy(&self, env: &GridWorld) -> Result<TdPolicy, ConfigurationError> {
        Ok(EpsilonGreedy::new(
            Polynomial::new(1.0, self.epsilon_exp)?,
            env.num_states(),
        ))
    }

    fn td_agent<R: TdRule + 'static>(
        rule: R,
        policy: TdPolicy,
        env: &GridWorld,
    ) -> Box<dyn Agent<GridWorld>> {
        Box::new(TdAgent::new(rule, policy, env.gamma()))
    }

    fn build_agent(
        &self,
        algorithm: Algorithm,
        params: &HyperparameterSet,
        env: &GridWorld,
    ) -> Result<Box<dyn Agent<GridWorld>>, ConfigurationError> {
        let policy = self.policy(env)?;
        let (ns, na) = (env.num_states(), env.num_actions());

        let lr = || params.learning_rate();
        let agent: Box<dyn Agent<GridWorld>> = match algorithm {
            Algorithm::Q => Self::td_agent(QLearning::new(ns, na, lr()?), policy, env),
            Algorithm::DoubleQ => Self::td_agent(DoubleQLearning::new(ns, na, lr()?), policy, env),
            Algorithm::WeightedQ => Self::td_agent(
                WeightedQLearning::new(ns, na, lr()?, self.weighted_precision),
                policy,
                env,
            ),
            Algorithm::SpeedyQ => Self::td_agent(SpeedyQLearning::new(ns, na, lr()?), policy, env),
            Algorithm::Sarsa => Self::td_agent(Sarsa::new(ns, na, lr()?), policy, env),
            Algorithm::SarsaLambda => Self::td_agent(
                SarsaLambda::new(ns, na, lr()?, params.lambda()?),
                policy,
                env,
            ),
            Algorithm::ExpectedSarsa => {
                Self::td_agent(ExpectedSarsa::new(ns, na, lr()?), policy, env)
            }
            Algorithm::QLambda => {
                Self::td_agent(QLambda::new(ns, na, lr()?, params.lambda()?), policy, env)
            }
            Algorithm::RLearning => {
                Self::td_agent(RLearning::new(ns, na, lr()?, params.beta()?), policy, env)
            }
            Algorithm::MaxminQ => Self::td_agent(
                MaxminQLearning::new(ns, na, lr()?, params.n_tables()?),
                policy,
                env,
            ),
            Algorithm::RQ => {
                Self::td_agent(RQLearning::new(ns, na, lr()?, params.beta()?), policy, env)
            }
            Algorithm::Fqi => Box::new(FittedQIteration::new(na, policy, env.gamma(), &self.fqi)),
        };
        Ok(agent)
    }
}

impl TrialRunner for GridWorldTrial {
    fn run_trial(
        &self,
        algorithm: Algorithm,
        params: &HyperparameterSet,
        seed: u64,
        deadline: &Deadline,
    ) -> Result<TrialResult, TrialExecutionError> {
        let mut rng = StdRng::seed_from_u64(seed);
        let env = GridWorld::new(rng.gen());
        let start = env.start_state();
        let agent = self.build_agent(algorithm, params, &env)?;

        let (budget, fit_every, record) = if algorithm.is_tabular() {
            (Budget::Steps(self.n_steps), 1, Record::Step)
        } else {
            (
                Budget::Episodes(self.fqi.n_episodes),
                self.fqi.episodes_per_fit,
                Record::Episode,
            )
        };

        let mut rewards = CollectRewards::new(record);
        let mut max_q = CollectMaxQ::new(record, start);
        let mut core = Core::new(agent, env, rng);
        core.learn(budget, fit_every, &mut [&mut rewards, &mut max_q], deadline)?;

        Ok(TrialResult {
            rewards: rewards.into_values(),
            max_q: max_q.into_values(),
        })
    }

    fn trial_length(&self, algorithm: Algorithm) -> usize {
        if algorithm.is_tabular() {
            self.n_steps
        } else {
            self.fqi.n_episodes
        }
    }
}
