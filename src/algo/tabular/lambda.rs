use crate::decay::{Polynomial, Visits};

use super::{max_of, QTable, TdContext, TdRule};

/// Replacing eligibility traces, decayed by γλ after every update
#[derive(Debug, Clone)]
struct Traces {
    e: QTable,
    lambda: f32,
}

impl Traces {
    fn new(num_states: usize, num_actions: usize, lambda: f32) -> Self {
        Self {
            e: QTable::new(num_states, num_actions),
            lambda,
        }
    }

    /// Replace the trace of `(state, action)` with 1
    fn visit(&mut self, state: usize, action: usize) {
        self.e[(state, action)] = 1.0;
    }

    /// Q ← Q + step · e, then e ← γλ e
    fn apply(&mut self, q: &mut QTable, step: f32, gamma: f32) {
        for (q, e) in q.as_mut_slice().iter_mut().zip(self.e.as_mut_slice()) {
            *q += step * *e;
            *e *= gamma * self.lambda;
        }
    }

    fn clear(&mut self) {
        self.e.fill(0.0);
    }
}

/// SARSA(λ) with replacing traces
pub struct SarsaLambda {
    q: QTable,
    traces: Traces,
    alpha: Visits<Polynomial>,
}

impl SarsaLambda {
    pub fn new(
        num_states: usize,
        num_actions: usize,
        learning_rate: Polynomial,
        lambda: f32,
    ) -> Self {
        Self {
            q: QTable::new(num_states, num_actions),
            traces: Traces::new(num_states, num_actions, lambda),
            alpha: Visits::new(learning_rate, num_states * num_actions),
        }
    }
}

impl TdRule for SarsaLambda {
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
        let delta = reward + ctx.gamma * q_next - q_current;
        let alpha = self.alpha.next(self.q.flat(state, action));

        self.traces.visit(state, action);
        self.traces.apply(&mut self.q, alpha * delta, ctx.gamma);
    }

    fn episode_start(&mut self) {
        self.traces.clear();
    }
}

/// Q(λ) with replacing traces
///
/// Traces are not cut after exploratory actions.
pub struct QLambda {
    q: QTable,
    traces: Traces,
    alpha: Visits<Polynomial>,
}

impl QLambda {
    pub fn new(
        num_states: usize,
        num_actions: usize,
        learning_rate: Polynomial,
        lambda: f32,
    ) -> Self {
        Self {
            q: QTable::new(num_states, num_actions),
            traces: Traces::new(num_states, num_actions, lambda),
            alpha: Visits::new(learning_rate, num_states * num_actions),
        }
    }
}

impl TdRule for QLambda {
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
        let q_next = next_state.map_or(0.0, |s| max_of(self.q.row(s)));
        let delta = reward + ctx.gamma * q_next - q_current;
        let alpha = self.alpha.next(self.q.flat(state, action));

        self.traces.visit(state, action);
        self.traces.apply(&mut self.q, alpha * delta, ctx.gamma);
    }

    fn episode_start(&mut self) {
        self.traces.clear();
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::algo::tabular::tests::{greedy, sample_average, train_on_chain};

    #[test]
    fn sarsa_lambda_learns_chain() {
        let q = train_on_chain(SarsaLambda::new(3, 2, sample_average(), 0.5), 2000);
        assert!(q > 0.3, "max Q(start) = {q}");
    }

    #[test]
    fn q_lambda_learns_chain() {
        let q = train_on_chain(QLambda::new(3, 2, sample_average(), 0.5), 2000);
        assert!(q > 0.3, "max Q(start) = {q}");
    }

    #[test]
    fn traces_propagate_credit_backwards() {
        let mut rule = QLambda::new(3, 1, sample_average(), 1.0);
        let mut policy = greedy(3);
        let mut rng = StdRng::seed_from_u64(0);
        let mut ctx = TdContext {
            policy: &mut policy,
            rng: &mut rng,
            gamma: 0.5,
            next_action: None,
        };

        rule.update(0, 0, 0.0, Some(1), &mut ctx);
        assert_eq!(rule.traces.e[(0, 0)], 0.5, "Trace decays by γλ");

        rule.update(1, 0, 4.0, None, &mut ctx);
        assert_eq!(rule.q[(1, 0)], 4.0);
        assert_eq!(rule.q[(0, 0)], 2.0, "Earlier pair receives decayed credit");

        rule.episode_start();
        assert!(rule.traces.e.as_slice().iter().all(|&e| e == 0.0));
    }

    #[test]
    fn visiting_keeps_other_actions_eligible() {
        let mut rule = QLambda::new(1, 2, sample_average(), 1.0);
        let mut policy = greedy(1);
        let mut rng = StdRng::seed_from_u64(0);
        let mut ctx = TdContext {
            policy: &mut policy,
            rng: &mut rng,
            gamma: 0.5,
            next_action: None,
        };

        rule.update(0, 0, 0.0, Some(0), &mut ctx);
        rule.update(0, 1, 0.0, Some(0), &mut ctx);
        assert_eq!(rule.traces.e[(0, 0)], 0.25, "Trace of the other action only decays");
        assert_eq!(rule.traces.e[(0, 1)], 0.5);
    }
}
