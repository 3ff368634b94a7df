use crate::decay::{Polynomial, Visits};

use super::{QTable, TdContext, TdRule};

/// Speedy Q-learning (Azar et al., 2011)
///
/// Keeps the table as it was before the previous update and mixes the targets
/// built from both tables:
///
/// Q(s,a) ← Q(s,a) + α (T<sub>old</sub> − Q(s,a)) + (1 − α)(T<sub>cur</sub> − T<sub>old</sub>)
pub struct SpeedyQLearning {
    q: QTable,
    old_q: QTable,
    alpha: Visits<Polynomial>,
}

impl SpeedyQLearning {
    pub fn new(num_states: usize, num_actions: usize, learning_rate: Polynomial) -> Self {
        Self {
            q: QTable::new(num_states, num_actions),
            old_q: QTable::new(num_states, num_actions),
            alpha: Visits::new(learning_rate, num_states * num_actions),
        }
    }
}

impl TdRule for SpeedyQLearning {
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
        let snapshot = self.q.clone();

        let (max_cur, max_old) =
            next_state.map_or((0.0, 0.0), |s| (self.q.max(s), self.old_q.max(s)));
        let target_cur = reward + ctx.gamma * max_cur;
        let target_old = reward + ctx.gamma * max_old;

        let alpha = self.alpha.next(self.q.flat(state, action));
        let q = self.q[(state, action)];
        self.q[(state, action)] =
            q + alpha * (target_old - q) + (1.0 - alpha) * (target_cur - target_old);

        self.old_q = snapshot;
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::algo::tabular::tests::{greedy, sample_average, train_on_chain};

    #[test]
    fn speedy_q_learns_chain() {
        let q = train_on_chain(SpeedyQLearning::new(3, 2, sample_average()), 2000);
        assert!(q > 0.5, "max Q(start) = {q}");
    }

    #[test]
    fn speedy_q_keeps_previous_table() {
        let mut rule = SpeedyQLearning::new(2, 1, sample_average());
        let mut policy = greedy(2);
        let mut rng = StdRng::seed_from_u64(0);
        let mut ctx = TdContext {
            policy: &mut policy,
            rng: &mut rng,
            gamma: 1.0,
            next_action: None,
        };

        rule.update(1, 0, 2.0, None, &mut ctx);
        assert_eq!(rule.q[(1, 0)], 2.0);
        assert_eq!(rule.old_q[(1, 0)], 0.0, "Old table lags one update");

        // T_cur = 2, T_old = 0, alpha = 1 → Q = 0 + (0 - 0) + 0 * (2 - 0)
        rule.update(0, 0, 0.0, Some(1), &mut ctx);
        assert_eq!(rule.q[(0, 0)], 0.0);
        assert_eq!(rule.old_q[(1, 0)], 2.0);

        // alpha = 1/2: T_cur = 2, T_old = 2 → Q = 0 + 1/2 * 2 = 1
        rule.update(0, 0, 0.0, Some(1), &mut ctx);
        assert_eq!(rule.q[(0, 0)], 1.0);
    }
}
