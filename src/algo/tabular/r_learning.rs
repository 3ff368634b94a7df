use crate::decay::{Constant, Decay, Polynomial, Visits};

use super::{QTable, TdContext, TdRule};

/// R-learning (Schwartz, 1993), an average-reward method
///
/// The action values are relative to the running average reward ρ, which is
/// moved with rate β whenever the updated action is greedy.
pub struct RLearning {
    q: QTable,
    alpha: Visits<Polynomial>,
    beta: Constant,
    rho: f32,
}

impl RLearning {
    pub fn new(
        num_states: usize,
        num_actions: usize,
        learning_rate: Polynomial,
        beta: f32,
    ) -> Self {
        Self {
            q: QTable::new(num_states, num_actions),
            alpha: Visits::new(learning_rate, num_states * num_actions),
            beta: Constant::new(beta),
            rho: 0.0,
        }
    }

    /// Current estimate of the average reward
    pub fn rho(&self) -> f32 {
        self.rho
    }
}

impl TdRule for RLearning {
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
        _ctx: &mut TdContext<'_>,
    ) {
        let idx = self.q.flat(state, action);
        let q_current = self.q[(state, action)];
        let q_next = next_state.map_or(0.0, |s| self.q.max(s));

        let delta = reward - self.rho + q_next - q_current;
        let q_new = q_current + self.alpha.next(idx) * delta;
        self.q[(state, action)] = q_new;

        let q_max = self.q.max(state);
        if q_new == q_max {
            let delta = reward + q_next - q_max - self.rho;
            self.rho += self.beta.evaluate(0.0) * delta;
        }
    }
}

/// RQ-learning (D'Eramo et al.)
///
/// Learns the expected reward R̃ and the expected next value Q̃ separately and
/// recombines them as Q = R̃ + γ Q̃. Q̃ bootstraps on-policy from the action the
/// agent will take next and moves with rate β.
pub struct RQLearning {
    q: QTable,
    r_tilde: QTable,
    q_tilde: QTable,
    alpha: Visits<Polynomial>,
    beta: Constant,
}

impl RQLearning {
    pub fn new(
        num_states: usize,
        num_actions: usize,
        learning_rate: Polynomial,
        beta: f32,
    ) -> Self {
        Self {
            q: QTable::new(num_states, num_actions),
            r_tilde: QTable::new(num_states, num_actions),
            q_tilde: QTable::new(num_states, num_actions),
            alpha: Visits::new(learning_rate, num_states * num_actions),
            beta: Constant::new(beta),
        }
    }
}

impl TdRule for RQLearning {
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
        let sa = (state, action);
        let alpha = self.alpha.next(self.q.flat(state, action));
        self.r_tilde[sa] += alpha * (reward - self.r_tilde[sa]);

        if let Some(s) = next_state {
            let next_action = ctx.draw_next(s, self.q.row(s));
            let q_next = self.q[(s, next_action)];
            let beta = self.beta.evaluate(0.0);
            self.q_tilde[sa] += beta * (q_next - self.q_tilde[sa]);
        }

        self.q[sa] = self.r_tilde[sa] + ctx.gamma * self.q_tilde[sa];
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::algo::tabular::tests::{greedy, sample_average, train_on_chain};

    #[test]
    fn rq_learns_chain() {
        let q = train_on_chain(RQLearning::new(3, 2, sample_average(), 0.5), 2000);
        assert!(q > 0.3, "max Q(start) = {q}");
    }

    #[test]
    fn r_learning_tracks_average_reward() {
        let mut rule = RLearning::new(1, 1, sample_average(), 0.5);
        let mut policy = greedy(1);
        let mut rng = StdRng::seed_from_u64(0);
        let mut ctx = TdContext {
            policy: &mut policy,
            rng: &mut rng,
            gamma: 1.0,
            next_action: None,
        };
        for _ in 0..200 {
            rule.update(0, 0, 1.0, Some(0), &mut ctx);
        }
        assert!((rule.rho() - 1.0).abs() < 0.05, "rho = {}", rule.rho());
    }

    #[test]
    fn rq_recombines_tables() {
        let mut rule = RQLearning::new(2, 1, sample_average(), 0.5);
        let mut policy = greedy(2);
        let mut rng = StdRng::seed_from_u64(0);
        let mut ctx = TdContext {
            policy: &mut policy,
            rng: &mut rng,
            gamma: 0.5,
            next_action: None,
        };
        rule.q[(1, 0)] = 4.0;
        rule.update(0, 0, 2.0, Some(1), &mut ctx);
        // R̃ = 2, Q̃ = 0.5 * 4 = 2, Q = 2 + 0.5 * 2
        assert_eq!(rule.q[(0, 0)], 3.0);
        assert_eq!(ctx.next_action, Some(0));
    }
}
