//! The agent/environment interaction loop

use std::time::{Duration, Instant};

use rand::{rngs::StdRng, RngCore};

use crate::{agent::Agent, env::FiniteEnvironment, error::TrialExecutionError, memory::Exp};

/// Steps between two deadline checks
const DEADLINE_CHECK_INTERVAL: usize = 256;

/// How long [`Core::learn`] runs for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Budget {
    Steps(usize),
    Episodes(usize),
}

/// A point in time after which a trial gives up
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    pub fn after(limit: Duration) -> Self {
        Self {
            start: Instant::now(),
            limit: Some(limit),
        }
    }

    /// A deadline that never expires
    pub fn never() -> Self {
        Self {
            start: Instant::now(),
            limit: None,
        }
    }

    pub fn limit(&self) -> Option<Duration> {
        self.limit
    }

    pub fn expired(&self) -> bool {
        self.limit.is_some_and(|l| self.start.elapsed() >= l)
    }

    /// Time left, `None` if unbounded
    pub fn remaining(&self) -> Option<Duration> {
        self.limit.map(|l| l.saturating_sub(self.start.elapsed()))
    }
}

/// When a collector records a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Record {
    Step,
    Episode,
}

/// Hooks run by [`Core::learn`]
pub trait Callback<E: FiniteEnvironment> {
    /// After every step, once the agent has learned from it if it was due to
    fn on_step(&mut self, _agent: &dyn Agent<E>, _reward: f32) {}

    /// At the end of every episode, with its undiscounted return
    fn on_episode_end(&mut self, _agent: &dyn Agent<E>, _ret: f32) {}
}

/// Collects rewards per step or returns per episode
#[derive(Debug, Clone)]
pub struct CollectRewards {
    record: Record,
    values: Vec<f64>,
}

impl CollectRewards {
    pub fn new(record: Record) -> Self {
        Self {
            record,
            values: Vec::new(),
        }
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }
}

impl<E: FiniteEnvironment> Callback<E> for CollectRewards {
    fn on_step(&mut self, _agent: &dyn Agent<E>, reward: f32) {
        if self.record == Record::Step {
            self.values.push(reward as f64);
        }
    }

    fn on_episode_end(&mut self, _agent: &dyn Agent<E>, ret: f32) {
        if self.record == Record::Episode {
            self.values.push(ret as f64);
        }
    }
}

/// Collects `max_a Q(state, a)` of one fixed state
#[derive(Debug, Clone)]
pub struct CollectMaxQ {
    record: Record,
    state: usize,
    values: Vec<f64>,
}

impl CollectMaxQ {
    pub fn new(record: Record, state: usize) -> Self {
        Self {
            record,
            state,
            values: Vec::new(),
        }
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }
}

impl<E: FiniteEnvironment> Callback<E> for CollectMaxQ {
    fn on_step(&mut self, agent: &dyn Agent<E>, _reward: f32) {
        if self.record == Record::Step {
            self.values.push(agent.max_q(&self.state) as f64);
        }
    }

    fn on_episode_end(&mut self, agent: &dyn Agent<E>, _ret: f32) {
        if self.record == Record::Episode {
            self.values.push(agent.max_q(&self.state) as f64);
        }
    }
}

/// Runs an agent in an environment
pub struct Core<E, A> {
    agent: A,
    env: E,
    rng: StdRng,
}

impl<E, A> Core<E, A>
where
    E: FiniteEnvironment,
    A: Agent<E>,
{
    pub fn new(agent: A, env: E, rng: StdRng) -> Self {
        Self { agent, env, rng }
    }

    pub fn agent(&self) -> &A {
        &self.agent
    }

    /// Interact until `budget` is spent, letting the agent learn from the last
    /// `fit_every` steps (step budget) or episodes (episode budget) at a time
    ///
    /// Transitions collected after the last fit of an episode budget are discarded.
    pub fn learn(
        &mut self,
        budget: Budget,
        fit_every: usize,
        callbacks: &mut [&mut dyn Callback<E>],
        deadline: &Deadline,
    ) -> Result<(), TrialExecutionError> {
        let fit_every = fit_every.max(1);
        let mut dataset: Vec<Exp<E>> = Vec::new();
        let mut steps = 0;
        let mut episodes = 0;
        let mut episodes_since_fit = 0;
        let mut episode_return = 0.0;

        let mut state = self.env.reset();
        self.agent.episode_start();

        loop {
            let done = match budget {
                Budget::Steps(n) => steps >= n,
                Budget::Episodes(n) => episodes >= n,
            };
            if done {
                return Ok(());
            }
            if steps % DEADLINE_CHECK_INTERVAL == 0 && deadline.expired() {
                return Err(TrialExecutionError::DeadlineExceeded(
                    deadline.limit().unwrap_or_default(),
                ));
            }

            let rng: &mut dyn RngCore = &mut self.rng;
            let action = self.agent.act(&state, &mut *rng);
            let (next_state, reward) = self.env.step(action);
            steps += 1;
            episode_return += reward;
            dataset.push(Exp {
                state,
                action,
                next_state,
                reward,
            });

            if matches!(budget, Budget::Steps(_)) && dataset.len() >= fit_every {
                self.agent.learn(&dataset, &mut *rng);
                dataset.clear();
            }
            for cb in callbacks.iter_mut() {
                cb.on_step(&self.agent, reward);
            }

            match next_state {
                Some(s) => state = s,
                None => {
                    episodes += 1;
                    if matches!(budget, Budget::Episodes(_)) {
                        episodes_since_fit += 1;
                        if episodes_since_fit == fit_every {
                            self.agent.learn(&dataset, &mut *rng);
                            dataset.clear();
                            episodes_since_fit = 0;
                        }
                    }
                    for cb in callbacks.iter_mut() {
                        cb.on_episode_end(&self.agent, episode_return);
                    }
                    episode_return = 0.0;
                    state = self.env.reset();
                    self.agent.episode_start();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::{
        algo::tabular::{tests::uniform, QLearning, TdAgent},
        decay::Polynomial,
        env::tests::MockEnv,
    };

    /// Counts the calls it receives
    #[derive(Default)]
    struct Counter {
        acts: usize,
        fits: Vec<usize>,
        episode_starts: usize,
    }

    impl Agent<MockEnv> for Counter {
        fn act(&mut self, _state: &usize, _rng: &mut dyn RngCore) -> usize {
            self.acts += 1;
            1
        }

        fn learn(&mut self, dataset: &[Exp<MockEnv>], _rng: &mut dyn RngCore) {
            self.fits.push(dataset.len());
        }

        fn episode_start(&mut self) {
            self.episode_starts += 1;
        }

        fn max_q(&self, _state: &usize) -> f32 {
            self.fits.len() as f32
        }
    }

    fn core<A: Agent<MockEnv>>(agent: A) -> Core<MockEnv, A> {
        Core::new(agent, MockEnv::new(3), StdRng::seed_from_u64(0))
    }

    #[test]
    fn step_budget_fits_every_step() {
        let mut core = core(Counter::default());
        let mut rewards = CollectRewards::new(Record::Step);
        let mut max_q = CollectMaxQ::new(Record::Step, 0);
        core.learn(
            Budget::Steps(7),
            1,
            &mut [&mut rewards, &mut max_q],
            &Deadline::never(),
        )
        .unwrap();

        assert_eq!(core.agent().acts, 7);
        assert_eq!(core.agent().fits, [1; 7]);
        // Always moving right, the chain of 3 ends every 2 steps
        assert_eq!(rewards.into_values(), [0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0]);
        assert_eq!(
            max_q.into_values(),
            [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0],
            "Values recorded after learning"
        );
        assert_eq!(core.agent().episode_starts, 4, "Initial reset plus 3 episodes");
    }

    #[test]
    fn episode_budget_fits_in_batches() {
        let mut core = core(Counter::default());
        let mut returns = CollectRewards::new(Record::Episode);
        let mut max_q = CollectMaxQ::new(Record::Episode, 0);
        core.learn(
            Budget::Episodes(5),
            2,
            &mut [&mut returns, &mut max_q],
            &Deadline::never(),
        )
        .unwrap();

        assert_eq!(core.agent().fits, [4, 4], "Two fits of two episodes each");
        assert_eq!(returns.into_values(), [1.0; 5]);
        assert_eq!(max_q.into_values(), [0.0, 1.0, 1.0, 2.0, 2.0]);
    }

    #[test]
    fn expired_deadline_stops_learning() {
        let mut core = core(Counter::default());
        let deadline = Deadline::after(Duration::ZERO);
        let result = core.learn(Budget::Steps(10), 1, &mut [], &deadline);
        assert!(matches!(
            result,
            Err(TrialExecutionError::DeadlineExceeded(_))
        ));
        assert_eq!(core.agent().acts, 0);
    }

    #[test]
    fn boxed_agents_run() {
        let agent: Box<dyn Agent<MockEnv>> = Box::new(TdAgent::new(
            QLearning::new(3, 2, Polynomial::new(1.0, 1.0).unwrap()),
            uniform(3),
            0.9,
        ));
        let mut core = core(agent);
        let mut rewards = CollectRewards::new(Record::Step);
        core.learn(Budget::Steps(50), 1, &mut [&mut rewards], &Deadline::never())
            .unwrap();
        assert_eq!(rewards.into_values().len(), 50);
    }
}
