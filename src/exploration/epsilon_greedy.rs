use rand::{seq::SliceRandom, Rng, RngCore};

use crate::decay::{Decay, Visits};

use super::Choice;

/// Epsilon greedy exploration policy with a per-state decaying epsilon
///
/// Each state keeps its own visit counter, so epsilon shrinks as a state is
/// revisited no matter how much of the rest of the space has been explored.
pub struct EpsilonGreedy<D: Decay> {
    epsilon: Visits<D>,
}

impl<D: Decay> EpsilonGreedy<D> {
    /// Initialize epsilon greedy policy with a decay strategy and the number of states
    pub fn new(decay: D, num_states: usize) -> Self {
        Self {
            epsilon: Visits::new(decay, num_states),
        }
    }

    /// Current epsilon of `state`
    pub fn epsilon(&self, state: usize) -> f32 {
        self.epsilon.peek(state)
    }

    /// Record a visit to `state` and decide between exploring and exploiting
    pub fn decide(&mut self, state: usize, rng: &mut dyn RngCore) -> Choice {
        let epsilon = self.epsilon.next(state);
        if rng.gen::<f32>() < epsilon {
            Choice::Explore
        } else {
            Choice::Exploit
        }
    }

    /// Pick an action in `state` given its action values
    ///
    /// Ties between greedy actions are broken uniformly at random.
    pub fn choose(&mut self, state: usize, q_values: &[f32], rng: &mut dyn RngCore) -> usize {
        match self.decide(state, rng) {
            Choice::Explore => rng.gen_range(0..q_values.len()),
            Choice::Exploit => *greedy_actions(q_values)
                .choose(rng)
                .expect("There is always at least one action available"),
        }
    }

    /// Probability of each action in `state` under the current epsilon
    pub fn probabilities(&self, state: usize, q_values: &[f32]) -> Vec<f32> {
        let epsilon = self.epsilon(state);
        let n = q_values.len() as f32;
        let greedy = greedy_actions(q_values);
        let bonus = (1.0 - epsilon) / greedy.len() as f32;

        let mut probs = vec![epsilon / n; q_values.len()];
        for a in greedy {
            probs[a] += bonus;
        }
        probs
    }
}

/// Indices of the maximal values
pub fn greedy_actions(q_values: &[f32]) -> Vec<usize> {
    let max = q_values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    q_values
        .iter()
        .enumerate()
        .filter(|&(_, &q)| q == max)
        .map(|(a, _)| a)
        .collect()
}

/// Index of a maximal value, breaking ties uniformly at random
pub fn argmax_random(q_values: &[f32], rng: &mut dyn RngCore) -> usize {
    *greedy_actions(q_values)
        .choose(rng)
        .expect("`q_values` is not empty")
}
