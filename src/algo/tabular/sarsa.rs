use crate::decay::{Polynomial, Visits};

use super::{QTable, TdContext, TdRule};

/// On-policy SARSA
///
/// The next action is drawn from the policy during the update and taken on the next step.
pub struct Sarsa {
    q: QTable,
    alpha: Visits<Polynomial>,
}

impl Sarsa {
    pub fn new(num_states: usize, num_actions: usize, learning_rate: Polynomial) -> Self {
        Self {
            q: QTable::new(num_states, num_actions),
            alpha: Visits::new(learning_rate, num_states * num_actions),
        }
    }
}

impl TdRule for Sarsa {
    fn values(&self, state: usize, out: &mut Vec<f32>) {
        out.clear();
        out.extend_from_slice(self.q.row(state));
    }

    fn update(
        &mut self,
        state: usize,
        action: usize,
        reward: f32,
        next_state: Option<usize>,
        ctx: &mut TdContext<'_>,
    ) {
        let q_current = self.q[(state, action)];
        let q_next = match next_state {
            Some(s) => {
                let next_action = ctx.draw_next(s, self.q.row(s));
                self.q[(s, next_action)]
            }
            None => 0.0,
        };
        let alpha = self.alpha.next(self.q.flat(state, action));

        self.q[(state, action)] = q_current + alpha * (reward + ctx.gamma * q_next - q_current);
    }
}

/// Expected SARSA
///
/// Bootstraps from the expectation of the next action values under the current policy.
pub struct ExpectedSarsa {
    q: QTable,
    alpha: Visits<Polynomial>,
}

impl ExpectedSarsa {
    pub fn new(num_states: usize, num_actions: usize, learning_rate: Polynomial) -> Self {
        Self {
            q: QTable::new(num_states, num_actions),
            alpha: Visits::new(learning_rate, num_states * num_actions),
        }
    }
}

impl TdRule for ExpectedSarsa {
    fn values(&self, state: usize, out: &mut Vec<f32>) {
        out.clear();
        out.extend_from_slice(self.q.row(state));
    }

    fn update(
        &mut self,
        state: usize,
        action: usize,
        reward: f32,
        next_state: Option<usize>,
        ctx: &mut TdContext<'_>,
    ) {
        let q_current = self.q[(state, action)];
        let q_next = next_state.map_or(0.0, |s| {
            let row = self.q.row(s);
            ctx.policy
                .probabilities(s, row)
                .iter()
                .zip(row)
                .map(|(p, q)| p * q)
                .sum()
        });
        let alpha = self.alpha.next(self.q.flat(state, action));

        self.q[(state, action)] = q_current + alpha * (reward + ctx.gamma * q_next - q_current);
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::algo::tabular::tests::{sample_average, train_on_chain, uniform};

    #[test]
    fn sarsa_learns_chain() {
        let q = train_on_chain(Sarsa::new(3, 2, sample_average()), 2000);
        assert!(q > 0.3, "max Q(start) = {q}");
    }

    #[test]
    fn expected_sarsa_learns_chain() {
        let q = train_on_chain(ExpectedSarsa::new(3, 2, sample_average()), 2000);
        assert!(q > 0.3, "max Q(start) = {q}");
    }

    #[test]
    fn sarsa_draws_next_action() {
        let mut rule = Sarsa::new(2, 2, sample_average());
        let mut policy = uniform(2);
        let mut rng = StdRng::seed_from_u64(0);
        let mut ctx = TdContext {
            policy: &mut policy,
            rng: &mut rng,
            gamma: 0.9,
            next_action: None,
        };
        rule.update(0, 1, 1.0, Some(1), &mut ctx);
        assert!(ctx.next_action.is_some_and(|a| a < 2));
        assert_eq!(rule.q[(0, 1)], 1.0);
    }

    #[test]
    fn expected_sarsa_uses_policy_mean() {
        let mut rule = ExpectedSarsa::new(2, 2, sample_average());
        let mut policy = uniform(2);
        let mut rng = StdRng::seed_from_u64(0);
        let mut ctx = TdContext {
            policy: &mut policy,
            rng: &mut rng,
            gamma: 1.0,
            next_action: None,
        };
        rule.q[(1, 0)] = 2.0;
        rule.q[(1, 1)] = 4.0;
        // epsilon = 1: each action has probability 1/2
        rule.update(0, 0, 0.0, Some(1), &mut ctx);
        assert!((rule.q[(0, 0)] - 3.0).abs() < 1e-6);
    }
}
