//! Temporal-difference control on finite MDPs
//!
//! Each algorithm is a [`TdRule`]: how the table(s) change after one transition.
//! [`TdAgent`] wraps a rule with an [epsilon greedy](EpsilonGreedy) policy and
//! implements [`Agent`] for every [`FiniteEnvironment`].

use rand::RngCore;

use crate::{
    agent::Agent,
    decay::Polynomial,
    env::FiniteEnvironment,
    exploration::EpsilonGreedy,
    memory::Exp,
};

pub mod double_q;
pub mod lambda;
pub mod maxmin_q;
pub mod q_learning;
pub mod r_learning;
pub mod sarsa;
pub mod speedy_q;
pub mod table;
pub mod weighted_q;

pub use double_q::DoubleQLearning;
pub use lambda::{QLambda, SarsaLambda};
pub use maxmin_q::MaxminQLearning;
pub use q_learning::QLearning;
pub use r_learning::{RLearning, RQLearning};
pub use sarsa::{ExpectedSarsa, Sarsa};
pub use speedy_q::SpeedyQLearning;
pub use table::{Ensemble, Prediction, QTable};
pub use weighted_q::WeightedQLearning;

/// Exploration policy shared by all tabular agents
pub type TdPolicy = EpsilonGreedy<Polynomial>;

/// What a rule may use while updating: the policy, the trial's generator and the discount
pub struct TdContext<'a> {
    pub policy: &'a mut TdPolicy,
    pub rng: &'a mut dyn RngCore,
    pub gamma: f32,
    next_action: Option<usize>,
}

impl<'a> TdContext<'a> {
    /// Draw the action the agent will take in `state`, for on-policy targets
    ///
    /// The agent replays this action on its next step instead of drawing again.
    pub fn draw_next(&mut self, state: usize, q_values: &[f32]) -> usize {
        let action = self.policy.choose(state, q_values, &mut *self.rng);
        self.next_action = Some(action);
        action
    }
}

/// One tabular temporal-difference update rule
pub trait TdRule: Send {
    /// Action values of `state` the policy acts on and the sweep reports
    fn values(&self, state: usize, out: &mut Vec<f32>);

    /// Update after taking `action` in `state`; `next_state` is `None` if the episode ended
    fn update(
        &mut self,
        state: usize,
        action: usize,
        reward: f32,
        next_state: Option<usize>,
        ctx: &mut TdContext<'_>,
    );

    /// Called whenever the environment is reset
    fn episode_start(&mut self) {}
}

/// An [`Agent`] driven by a [`TdRule`]
pub struct TdAgent<R: TdRule> {
    rule: R,
    policy: TdPolicy,
    gamma: f32,
    /// Action drawn for `.0` during the last update, taken on the next step
    pending: Option<(usize, usize)>,
    buf: Vec<f32>,
}

impl<R: TdRule> TdAgent<R> {
    pub fn new(rule: R, policy: TdPolicy, gamma: f32) -> Self {
        Self {
            rule,
            policy,
            gamma,
            pending: None,
            buf: Vec::new(),
        }
    }

    pub fn rule(&self) -> &R {
        &self.rule
    }
}

impl<E, R> Agent<E> for TdAgent<R>
where
    E: FiniteEnvironment,
    R: TdRule,
{
    fn act(&mut self, state: &usize, rng: &mut dyn RngCore) -> usize {
        if let Some((s, a)) = self.pending.take() {
            if s == *state {
                return a;
            }
        }
        self.rule.values(*state, &mut self.buf);
        self.policy.choose(*state, &self.buf, rng)
    }

    fn learn(&mut self, dataset: &[Exp<E>], rng: &mut dyn RngCore) {
        for exp in dataset {
            let mut ctx = TdContext {
                policy: &mut self.policy,
                rng: &mut *rng,
                gamma: self.gamma,
                next_action: None,
            };
            self.rule
                .update(exp.state, exp.action, exp.reward, exp.next_state, &mut ctx);
            self.pending = exp.next_state.zip(ctx.next_action);
        }
    }

    fn episode_start(&mut self) {
        self.pending = None;
        self.rule.episode_start();
    }

    fn max_q(&self, state: &usize) -> f32 {
        let mut values = Vec::new();
        self.rule.values(*state, &mut values);
        values.into_iter().fold(f32::NEG_INFINITY, f32::max)
    }
}

/// `max_a values[a]`
pub(crate) fn max_of(values: &[f32]) -> f32 {
    values.iter().copied().fold(f32::NEG_INFINITY, f32::max)
}
