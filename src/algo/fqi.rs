use ndarray::Array1;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::{
    agent::Agent,
    algo::tabular::TdPolicy,
    approx::{ExtraTrees, ExtraTreesConfig},
    env::FiniteEnvironment,
    memory::{ActionBatch, Exp},
};

/// Configuration for [`FittedQIteration`] and the schedule it is trained on
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FqiConfig {
    /// Bellman backups per fit
    ///
    /// **Default**: `10`
    pub n_iterations: usize,
    /// Episodes of training per repetition
    ///
    /// **Default**: `500`
    pub n_episodes: usize,
    /// Episodes collected between two fits
    ///
    /// **Default**: `10`
    pub episodes_per_fit: usize,
    pub trees: ExtraTreesConfig,
}

impl Default for FqiConfig {
    fn default() -> Self {
        Self {
            n_iterations: 10,
            n_episodes: 500,
            episodes_per_fit: 10,
            trees: ExtraTreesConfig::default(),
        }
    }
}

/// Fitted Q-Iteration (Ernst et al., 2005) with one extra-trees regressor per action
///
/// Each fit runs `n_iterations` backups `y = r + γ max_a Q(s', a)` over the
/// batch it is given. The state index is the only feature; models that were
/// never fitted predict 0.
pub struct FittedQIteration {
    models: Vec<ExtraTrees>,
    policy: TdPolicy,
    gamma: f32,
    n_iterations: usize,
    buf: Vec<f32>,
}

impl FittedQIteration {
    pub fn new(num_actions: usize, policy: TdPolicy, gamma: f32, config: &FqiConfig) -> Self {
        Self {
            models: (0..num_actions)
                .map(|_| ExtraTrees::new(config.trees))
                .collect(),
            policy,
            gamma,
            n_iterations: config.n_iterations,
            buf: Vec::with_capacity(num_actions),
        }
    }

    fn predict(&self, state: usize, out: &mut Vec<f32>) {
        out.clear();
        out.extend(
            self.models
                .iter()
                .map(|m| m.predict(&[state as f32]).unwrap_or(0.0)),
        );
    }

    fn max_predicted(&self, state: usize) -> f32 {
        self.models
            .iter()
            .map(|m| m.predict(&[state as f32]).unwrap_or(0.0))
            .fold(f32::NEG_INFINITY, f32::max)
    }

    fn fit(&mut self, batch: &ActionBatch, rng: &mut dyn RngCore) {
        let features: Vec<_> = (0..self.models.len()).map(|a| batch.features(a)).collect();

        for _ in 0..self.n_iterations {
            let targets: Vec<f32> = batch
                .rewards
                .iter()
                .zip(&batch.next_states)
                .map(|(r, s)| r + s.map_or(0.0, |s| self.gamma * self.max_predicted(s)))
                .collect();

            for (action, model) in self.models.iter_mut().enumerate() {
                let rows = batch.rows(action);
                if rows.is_empty() {
                    continue;
                }
                let y = Array1::from_iter(rows.iter().map(|&i| targets[i]));
                model.fit(features[action].view(), y.view(), &mut *rng);
            }
        }
    }
}

impl<E: FiniteEnvironment> Agent<E> for FittedQIteration {
    fn act(&mut self, state: &usize, rng: &mut dyn RngCore) -> usize {
        let mut values = std::mem::take(&mut self.buf);
        self.predict(*state, &mut values);
        let action = self.policy.choose(*state, &values, rng);
        self.buf = values;
        action
    }

    fn learn(&mut self, dataset: &[Exp<E>], rng: &mut dyn RngCore) {
        if dataset.is_empty() {
            return;
        }
        let batch = ActionBatch::from_slice(dataset, self.models.len());
        self.fit(&batch, rng);
    }

    fn max_q(&self, state: &usize) -> f32 {
        self.max_predicted(*state)
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::{algo::tabular::tests::uniform, env::tests::MockEnv};

    fn small_config() -> FqiConfig {
        FqiConfig {
            n_iterations: 5,
            trees: ExtraTreesConfig {
                n_estimators: 5,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn unfitted_values_are_zero() {
        let fqi = FittedQIteration::new(2, uniform(3), 0.9, &small_config());
        assert_eq!(Agent::<MockEnv>::max_q(&fqi, &0), 0.0);
    }

    #[test]
    fn backs_up_terminal_reward() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut fqi = FittedQIteration::new(2, uniform(3), 0.5, &small_config());
        let mut dataset = Vec::new();
        for _ in 0..10 {
            dataset.push(Exp::<MockEnv> {
                state: 0,
                action: 1,
                next_state: Some(1),
                reward: 0.0,
            });
            dataset.push(Exp::<MockEnv> {
                state: 1,
                action: 1,
                next_state: None,
                reward: 1.0,
            });
            dataset.push(Exp::<MockEnv> {
                state: 0,
                action: 0,
                next_state: Some(0),
                reward: 0.0,
            });
        }
        Agent::<MockEnv>::learn(&mut fqi, &dataset, &mut rng);

        let v1 = Agent::<MockEnv>::max_q(&fqi, &1);
        let v0 = Agent::<MockEnv>::max_q(&fqi, &0);
        assert!((v1 - 1.0).abs() < 1e-4, "Q(1, right) = {v1}");
        assert!((v0 - 0.5).abs() < 1e-4, "Q(0, right) = {v0}");
    }
}
