use rand::Rng;

use crate::decay::{Polynomial, Visits};

use super::{max_of, Ensemble, Prediction, TdContext, TdRule};

/// Maxmin Q-learning (Lan et al., 2020)
///
/// Keeps `n` tables and bootstraps from `max_a min_i Q_i(s', a)`, which trades
/// the overestimation of Q-learning for underestimation as `n` grows. One
/// randomly chosen table is updated per step.
pub struct MaxminQLearning {
    q: Ensemble,
    alpha: Vec<Visits<Polynomial>>,
    buf: Vec<f32>,
}

impl MaxminQLearning {
    /// **Panics** if `n_tables` is zero
    pub fn new(
        num_states: usize,
        num_actions: usize,
        learning_rate: Polynomial,
        n_tables: usize,
    ) -> Self {
        assert!(n_tables > 0, "Maxmin Q-learning needs at least one table");
        let size = num_states * num_actions;
        Self {
            q: Ensemble::new(n_tables, num_states, num_actions, Prediction::Min),
            alpha: (0..n_tables)
                .map(|_| Visits::new(learning_rate, size))
                .collect(),
            buf: Vec::with_capacity(num_actions),
        }
    }
}

impl TdRule for MaxminQLearning {
    fn values(&self, state: usize, out: &mut Vec<f32>) {
        self.q.predict(state, out);
    }

    fn update(
        &mut self,
        state: usize,
        action: usize,
        reward: f32,
        next_state: Option<usize>,
        ctx: &mut TdContext<'_>,
    ) {
        let i = ctx.rng.gen_range(0..self.q.len());
        let q_current = self.q[i][(state, action)];
        let q_next = match next_state {
            Some(s) => {
                self.q.predict(s, &mut self.buf);
                max_of(&self.buf)
            }
            None => 0.0,
        };
        let alpha = self.alpha[i].next(self.q[i].flat(state, action));

        self.q[i][(state, action)] = q_current + alpha * (reward + ctx.gamma * q_next - q_current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::tabular::tests::{sample_average, train_on_chain};

    #[test]
    fn maxmin_learns_chain() {
        let q = train_on_chain(MaxminQLearning::new(3, 2, sample_average(), 2), 3000);
        assert!(q > 0.3, "max Q(start) = {q}");
    }

    #[test]
    fn maxmin_reports_minimum() {
        let mut rule = MaxminQLearning::new(1, 2, sample_average(), 3);
        rule.q[0][(0, 0)] = 5.0;
        rule.q[1][(0, 0)] = 1.0;
        rule.q[2][(0, 0)] = 3.0;
        let mut out = Vec::new();
        rule.values(0, &mut out);
        assert_eq!(out, [1.0, 0.0]);
    }
}
