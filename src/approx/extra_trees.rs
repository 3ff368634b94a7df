use ndarray::{ArrayView1, ArrayView2};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

/// Configuration for [`ExtraTrees`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtraTreesConfig {
    /// Number of trees in the forest
    ///
    /// **Default**: `50`
    pub n_estimators: usize,
    /// Nodes with fewer samples become leaves
    ///
    /// **Default**: `5`
    pub min_samples_split: usize,
    /// Splits leaving fewer samples on either side are rejected
    ///
    /// **Default**: `2`
    pub min_samples_leaf: usize,
}

impl Default for ExtraTreesConfig {
    fn default() -> Self {
        Self {
            n_estimators: 50,
            min_samples_split: 5,
            min_samples_leaf: 2,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf(f32),
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn fit(
        x: &ArrayView2<f32>,
        y: &ArrayView1<f32>,
        config: &ExtraTreesConfig,
        rng: &mut dyn RngCore,
    ) -> Self {
        let mut nodes = vec![Node::Leaf(0.0)];
        let mut stack = vec![(0, (0..y.len()).collect::<Vec<_>>())];

        while let Some((id, samples)) = stack.pop() {
            let mean = mean_of(y, &samples);
            let constant = samples.iter().all(|&i| y[i] == y[samples[0]]);
            if samples.len() < config.min_samples_split || constant {
                nodes[id] = Node::Leaf(mean);
                continue;
            }

            match best_random_split(x, y, &samples, config.min_samples_leaf, rng) {
                Some((feature, threshold, left_samples, right_samples)) => {
                    let left = nodes.len();
                    let right = left + 1;
                    nodes.push(Node::Leaf(0.0));
                    nodes.push(Node::Leaf(0.0));
                    nodes[id] = Node::Split {
                        feature,
                        threshold,
                        left,
                        right,
                    };
                    stack.push((left, left_samples));
                    stack.push((right, right_samples));
                }
                None => nodes[id] = Node::Leaf(mean),
            }
        }

        Self { nodes }
    }

    fn predict(&self, features: &[f32]) -> f32 {
        let mut id = 0;
        loop {
            match self.nodes[id] {
                Node::Leaf(value) => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if features[feature] <= threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

fn mean_of(y: &ArrayView1<f32>, samples: &[usize]) -> f32 {
    samples.iter().map(|&i| y[i]).sum::<f32>() / samples.len() as f32
}

fn sse(y: &ArrayView1<f32>, samples: &[usize]) -> f32 {
    let mean = mean_of(y, samples);
    samples.iter().map(|&i| (y[i] - mean).powi(2)).sum()
}

/// Draw one uniform threshold per non-constant feature and keep the split
/// with the lowest squared error
fn best_random_split(
    x: &ArrayView2<f32>,
    y: &ArrayView1<f32>,
    samples: &[usize],
    min_samples_leaf: usize,
    rng: &mut dyn RngCore,
) -> Option<(usize, f32, Vec<usize>, Vec<usize>)> {
    let mut best: Option<(f32, usize, f32, Vec<usize>, Vec<usize>)> = None;

    for feature in 0..x.ncols() {
        let (lo, hi) = samples
            .iter()
            .map(|&i| x[[i, feature]])
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        if hi <= lo {
            continue;
        }

        let threshold = rng.gen_range(lo..hi);
        let (left, right): (Vec<usize>, Vec<usize>) =
            samples.iter().partition(|&&i| x[[i, feature]] <= threshold);
        if left.len() < min_samples_leaf || right.len() < min_samples_leaf {
            continue;
        }

        let score = sse(y, &left) + sse(y, &right);
        if best.as_ref().map_or(true, |b| score < b.0) {
            best = Some((score, feature, threshold, left, right));
        }
    }

    best.map(|(_, feature, threshold, left, right)| (feature, threshold, left, right))
}

/// Extremely randomized regression trees (Geurts, Ernst and Wehenkel, 2006)
///
/// Every tree sees the whole training set; randomness comes only from the split
/// thresholds. Predictions average the trees.
#[derive(Debug, Clone)]
pub struct ExtraTrees {
    config: ExtraTreesConfig,
    trees: Vec<Tree>,
}

impl ExtraTrees {
    pub fn new(config: ExtraTreesConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
        }
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    /// Fit on samples `x` (one row per sample) and targets `y`, replacing any previous fit
    ///
    /// **Panics** if `x` and `y` have a different number of samples
    pub fn fit(&mut self, x: ArrayView2<f32>, y: ArrayView1<f32>, rng: &mut dyn RngCore) {
        assert_eq!(x.nrows(), y.len(), "one target per sample");
        if y.is_empty() {
            self.trees.clear();
            return;
        }
        self.trees = (0..self.config.n_estimators.max(1))
            .map(|_| Tree::fit(&x, &y, &self.config, &mut *rng))
            .collect();
    }

    /// Predicted value of `features`, or `None` before the first fit
    pub fn predict(&self, features: &[f32]) -> Option<f32> {
        if !self.is_fitted() {
            return None;
        }
        let sum: f32 = self.trees.iter().map(|t| t.predict(features)).sum();
        Some(sum / self.trees.len() as f32)
    }
}
