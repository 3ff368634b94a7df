use crate::decay::{Polynomial, Visits};

use super::{QTable, TdContext, TdRule};

/// Watkins' Q-learning
///
/// Q(s,a) ← Q(s,a) + α(s,a) [r + γ max<sub>a'</sub> Q(s',a') − Q(s,a)]
pub struct QLearning {
    q: QTable,
    alpha: Visits<Polynomial>,
}

impl QLearning {
    pub fn new(num_states: usize, num_actions: usize, learning_rate: Polynomial) -> Self {
        Self {
            q: QTable::new(num_states, num_actions),
            alpha: Visits::new(learning_rate, num_states * num_actions),
        }
    }

    pub fn q(&self) -> &QTable {
        &self.q
    }
}

impl TdRule for QLearning {
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
        let q_next = next_state.map_or(0.0, |s| self.q.max(s));
        let alpha = self.alpha.next(self.q.flat(state, action));

        self.q[(state, action)] = q_current + alpha * (reward + ctx.gamma * q_next - q_current);
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::algo::tabular::tests::{greedy, sample_average, train_on_chain};

    #[test]
    fn q_learning_update() {
        let mut rule = QLearning::new(2, 2, sample_average());
        let mut policy = greedy(2);
        let mut rng = StdRng::seed_from_u64(0);
        let mut ctx = TdContext {
            policy: &mut policy,
            rng: &mut rng,
            gamma: 0.5,
            next_action: None,
        };

        rule.q[(1, 0)] = 4.0;
        rule.update(0, 1, 1.0, Some(1), &mut ctx);
        assert_eq!(rule.q[(0, 1)], 3.0, "First visit takes the full target");

        rule.update(0, 1, 0.0, None, &mut ctx);
        assert_eq!(rule.q[(0, 1)], 1.5, "Second visit averages");
        assert!(ctx.next_action.is_none(), "Off-policy rule draws nothing");
    }

    #[test]
    fn q_learning_learns_chain() {
        let q = train_on_chain(QLearning::new(3, 2, sample_average()), 2000);
        assert!(q > 0.5, "max Q(start) = {q}");
    }
}
