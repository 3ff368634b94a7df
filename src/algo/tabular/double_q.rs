use rand::Rng;

use crate::{
    decay::{Polynomial, Visits},
    exploration::argmax_random,
};

use super::{Ensemble, Prediction, TdContext, TdRule};

/// Double Q-learning (Van Hasselt, 2010)
///
/// Each update picks one of two tables at random, selects the greedy next
/// action with it and evaluates that action with the other table. The policy
/// acts on the mean of both tables.
pub struct DoubleQLearning {
    q: Ensemble,
    alpha: [Visits<Polynomial>; 2],
}

impl DoubleQLearning {
    pub fn new(num_states: usize, num_actions: usize, learning_rate: Polynomial) -> Self {
        let size = num_states * num_actions;
        Self {
            q: Ensemble::new(2, num_states, num_actions, Prediction::Mean),
            alpha: [
                Visits::new(learning_rate, size),
                Visits::new(learning_rate, size),
            ],
        }
    }
}

impl TdRule for DoubleQLearning {
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
        let i = if ctx.rng.gen::<f32>() < 0.5 { 0 } else { 1 };
        let q_current = self.q[i][(state, action)];
        let q_next = match next_state {
            Some(s) => {
                let best = argmax_random(self.q[i].row(s), &mut *ctx.rng);
                self.q[1 - i][(s, best)]
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
    fn double_q_learns_chain() {
        let q = train_on_chain(DoubleQLearning::new(3, 2, sample_average()), 2000);
        assert!(q > 0.3, "max Q(start) = {q}");
    }

    #[test]
    fn double_q_updates_one_table() {
        use rand::{rngs::StdRng, SeedableRng};

        let mut rule = DoubleQLearning::new(1, 1, sample_average());
        let mut policy = crate::algo::tabular::tests::greedy(1);
        let mut rng = StdRng::seed_from_u64(5);
        let mut ctx = TdContext {
            policy: &mut policy,
            rng: &mut rng,
            gamma: 0.9,
            next_action: None,
        };
        rule.update(0, 0, 2.0, None, &mut ctx);

        let touched = (0..2).filter(|&i| rule.q[i][(0, 0)] == 2.0).count();
        assert_eq!(touched, 1, "Exactly one table updated");
        let mut out = Vec::new();
        rule.values(0, &mut out);
        assert_eq!(out, [1.0], "Policy sees the mean");
    }
}
