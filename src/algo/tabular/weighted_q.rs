use rand::Rng;
use rand_distr::StandardNormal;

use crate::decay::{Polynomial, Visits};

use super::{QTable, TdContext, TdRule};

const INITIAL_SIGMA: f32 = 1e10;
const MIN_VARIANCE: f32 = 1e-10;

/// Weighted Q-learning (D'Eramo, Restelli and Nuara, 2016)
///
/// The target weighs every next action by the probability that it is the
/// maximal one, estimated by sampling `precision` draws from independent
/// Gaussians centred on the action values with their estimated standard errors.
pub struct WeightedQLearning {
    q: QTable,
    /// Running estimate of the second moment of the targets
    q2: QTable,
    /// Σ of squared step sizes from the second update on, scaling the variance of the sample mean
    w: QTable,
    sigma: QTable,
    updates: Vec<u32>,
    alpha: Visits<Polynomial>,
    precision: usize,
}

impl WeightedQLearning {
    pub fn new(
        num_states: usize,
        num_actions: usize,
        learning_rate: Polynomial,
        precision: usize,
    ) -> Self {
        let size = num_states * num_actions;
        Self {
            q: QTable::new(num_states, num_actions),
            q2: QTable::new(num_states, num_actions),
            w: QTable::new(num_states, num_actions),
            sigma: QTable::filled(num_states, num_actions, INITIAL_SIGMA),
            updates: vec![0; size],
            alpha: Visits::new(learning_rate, size),
            precision: precision.max(1),
        }
    }

    /// `Σ_a P(a is maximal) Q(s,a)`
    fn next_q(&self, state: usize, rng: &mut dyn rand::RngCore) -> f32 {
        let means = self.q.row(state);
        let sigmas = self.sigma.row(state);
        let mut counts = vec![0u32; means.len()];

        for _ in 0..self.precision {
            let mut best = 0;
            let mut best_value = f32::NEG_INFINITY;
            for (a, (&mean, &sigma)) in means.iter().zip(sigmas).enumerate() {
                let z: f32 = rng.sample(StandardNormal);
                let value = mean + sigma * z;
                if value > best_value {
                    best = a;
                    best_value = value;
                }
            }
            counts[best] += 1;
        }

        counts
            .iter()
            .zip(means)
            .map(|(&c, &q)| c as f32 / self.precision as f32 * q)
            .sum()
    }
}

impl TdRule for WeightedQLearning {
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
        let idx = self.q.flat(state, action);
        let q_current = self.q[sa];
        let q2_current = self.q2[sa];
        let alpha = self.alpha.next(idx);

        let q_next = next_state.map_or(0.0, |s| self.next_q(s, &mut *ctx.rng));
        let target = reward + ctx.gamma * q_next;

        let q = q_current + alpha * (target - q_current);
        self.q[sa] = q;
        self.q2[sa] = q2_current + alpha * (target * target - q2_current);

        self.updates[idx] += 1;
        let n = self.updates[idx] as f32;
        if n > 1.0 {
            self.w[sa] = (1.0 - alpha).powi(2) * self.w[sa] + alpha * alpha;
            let variance = n * (self.q2[sa] - q * q) / (n - 1.0);
            self.sigma[sa] = (variance * self.w[sa]).max(MIN_VARIANCE).sqrt();
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::algo::tabular::tests::{greedy, sample_average, train_on_chain};

    #[test]
    fn weighted_q_learns_chain() {
        let q = train_on_chain(WeightedQLearning::new(3, 2, sample_average(), 200), 2000);
        assert!(q > 0.3, "max Q(start) = {q}");
    }

    #[test]
    fn next_q_prefers_confident_maximum() {
        let mut rule = WeightedQLearning::new(1, 2, sample_average(), 1000);
        let mut rng = StdRng::seed_from_u64(2);
        rule.q[(0, 0)] = 10.0;
        rule.q[(0, 1)] = 0.0;
        rule.sigma.fill(0.01);
        let q = rule.next_q(0, &mut rng);
        assert!((q - 10.0).abs() < 1e-3, "weighted target {q}");
    }

    #[test]
    fn sigma_shrinks_after_two_updates() {
        let mut rule = WeightedQLearning::new(1, 1, sample_average(), 10);
        let mut policy = greedy(1);
        let mut rng = StdRng::seed_from_u64(0);
        let mut ctx = TdContext {
            policy: &mut policy,
            rng: &mut rng,
            gamma: 0.9,
            next_action: None,
        };
        rule.update(0, 0, 1.0, None, &mut ctx);
        assert_eq!(rule.sigma[(0, 0)], INITIAL_SIGMA);
        assert_eq!(rule.w[(0, 0)], 0.0, "First update leaves the weight alone");
        rule.update(0, 0, 3.0, None, &mut ctx);
        // mean 2, sample variance 2, weight (1/2)^2
        assert!((rule.q[(0, 0)] - 2.0).abs() < 1e-6);
        assert!((rule.w[(0, 0)] - 0.25).abs() < 1e-6, "w = {}", rule.w[(0, 0)]);
        assert!(
            (rule.sigma[(0, 0)] - 0.5f32.sqrt()).abs() < 1e-5,
            "sigma = {}",
            rule.sigma[(0, 0)]
        );
    }
}
