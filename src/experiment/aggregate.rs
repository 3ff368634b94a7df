use std::fmt;

use ndarray::{Array1, Array2, Axis};

use crate::{algo::Algorithm, error::AggregationError};

use super::trial::TrialResult;

/// Label of a learning-rate exponent in file names: its decimal digits without the point
///
/// `1.0` becomes `"1"` and `0.8` becomes `"08"`.
pub fn exponent_label(exp: f32) -> String {
    exp.to_string().replace('.', "")
}

/// Identifies one sweep cell
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellKey {
    pub algorithm: Algorithm,
    pub label: String,
}

impl CellKey {
    pub fn new(algorithm: Algorithm, exp: f32) -> Self {
        Self {
            algorithm,
            label: exponent_label(exp),
        }
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (exp {})", self.algorithm, self.label)
    }
}

/// The reduced curves of one sweep cell
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedCurve {
    /// Mean reward over repetitions, smoothed by a moving average
    pub rewards: Array1<f64>,
    /// Mean `max_a Q(start, a)` over repetitions
    pub max_q: Array1<f64>,
    /// Repetitions the means are taken over
    pub repetitions: usize,
    /// Repetitions that failed and were left out
    pub dropped: usize,
}

/// Stack `results` into a repetitions × length matrix
fn stack(
    results: &[TrialResult],
    field: impl Fn(&TrialResult) -> &[f64],
) -> Result<Array2<f64>, AggregationError> {
    let expected = results.first().map(|r| field(r).len()).ok_or(AggregationError::Empty)?;
    for (index, r) in results.iter().enumerate() {
        let found = field(r).len();
        if found != expected {
            return Err(AggregationError::LengthMismatch {
                index,
                expected,
                found,
            });
        }
    }
    Ok(Array2::from_shape_fn((results.len(), expected), |(i, j)| {
        field(&results[i])[j]
    }))
}

/// Trailing moving average of width `window` over the positions where it fully fits
pub fn moving_average(values: &Array1<f64>, window: usize) -> Result<Array1<f64>, AggregationError> {
    if window == 0 || window > values.len() {
        return Err(AggregationError::WindowTooLarge {
            window,
            length: values.len(),
        });
    }
    Ok(values
        .windows(window)
        .into_iter()
        .map(|w| w.sum() / window as f64)
        .collect())
}

/// Reduce the results of one cell: column means, then smooth the rewards
///
/// Rewards come out `window - 1` samples shorter than the trials, value
/// estimates keep the trial length.
pub fn aggregate(results: &[TrialResult], window: usize) -> Result<AggregatedCurve, AggregationError> {
    let rewards = stack(results, |r| &r.rewards)?;
    let max_q = stack(results, |r| &r.max_q)?;

    let mean_rewards = rewards.mean_axis(Axis(0)).ok_or(AggregationError::Empty)?;
    let max_q = max_q.mean_axis(Axis(0)).ok_or(AggregationError::Empty)?;

    Ok(AggregatedCurve {
        rewards: moving_average(&mean_rewards, window)?,
        max_q,
        repetitions: results.len(),
        dropped: 0,
    })
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn result(rewards: &[f64], max_q: &[f64]) -> TrialResult {
        TrialResult {
            rewards: rewards.to_vec(),
            max_q: max_q.to_vec(),
        }
    }

    #[test]
    fn labels() {
        assert_eq!(exponent_label(1.0), "1");
        assert_eq!(exponent_label(0.8), "08");
        assert_eq!(exponent_label(0.51), "051");
    }

    #[test]
    fn moving_average_valid_mode() {
        let avg = moving_average(&array![1.0, 2.0, 3.0, 4.0, 5.0], 2).unwrap();
        assert_eq!(avg, array![1.5, 2.5, 3.5, 4.5]);

        let whole = moving_average(&array![1.0, 2.0, 3.0], 3).unwrap();
        assert_eq!(whole, array![2.0]);

        assert_eq!(
            moving_average(&array![1.0, 2.0], 3),
            Err(AggregationError::WindowTooLarge {
                window: 3,
                length: 2
            })
        );
        assert!(moving_average(&array![1.0], 0).is_err());
    }

    #[test]
    fn means_over_repetitions() {
        let results = [
            result(&[0.0, 2.0, 4.0], &[1.0, 1.0, 1.0]),
            result(&[2.0, 4.0, 6.0], &[3.0, 5.0, 7.0]),
        ];
        let curve = aggregate(&results, 2).unwrap();
        assert_eq!(curve.rewards, array![2.0, 4.0]);
        assert_eq!(curve.max_q, array![2.0, 3.0, 4.0]);
        assert_eq!(curve.repetitions, 2);
    }

    #[test]
    fn lengths_must_match() {
        let results = [
            result(&[0.0, 1.0], &[0.0, 1.0]),
            result(&[0.0], &[0.0, 1.0]),
        ];
        assert_eq!(
            aggregate(&results, 1),
            Err(AggregationError::LengthMismatch {
                index: 1,
                expected: 2,
                found: 1
            })
        );
        assert_eq!(aggregate(&[], 1), Err(AggregationError::Empty));
    }
}
