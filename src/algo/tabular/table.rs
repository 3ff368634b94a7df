use std::ops::{Index, IndexMut};

/// A dense table of action values, one row of `num_actions` entries per state
#[derive(Debug, Clone, PartialEq)]
pub struct QTable {
    values: Vec<f32>,
    num_actions: usize,
}

impl QTable {
    pub fn new(num_states: usize, num_actions: usize) -> Self {
        Self::filled(num_states, num_actions, 0.0)
    }

    pub fn filled(num_states: usize, num_actions: usize, value: f32) -> Self {
        Self {
            values: vec![value; num_states * num_actions],
            num_actions,
        }
    }

    pub fn num_actions(&self) -> usize {
        self.num_actions
    }

    /// Number of state-action pairs
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Flat index of a state-action pair, used to key per-pair schedules
    pub fn flat(&self, state: usize, action: usize) -> usize {
        state * self.num_actions + action
    }

    pub fn row(&self, state: usize) -> &[f32] {
        let start = state * self.num_actions;
        &self.values[start..start + self.num_actions]
    }

    /// `max_a Q(state, a)`
    pub fn max(&self, state: usize) -> f32 {
        self.row(state)
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.values
    }

    pub fn fill(&mut self, value: f32) {
        self.values.fill(value);
    }
}

impl Index<(usize, usize)> for QTable {
    type Output = f32;

    fn index(&self, (state, action): (usize, usize)) -> &Self::Output {
        &self.values[state * self.num_actions + action]
    }
}

impl IndexMut<(usize, usize)> for QTable {
    fn index_mut(&mut self, (state, action): (usize, usize)) -> &mut Self::Output {
        &mut self.values[state * self.num_actions + action]
    }
}

/// How an [`Ensemble`] combines its tables into one estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prediction {
    Mean,
    Min,
}

/// Several tables over the same state-action space
#[derive(Debug, Clone)]
pub struct Ensemble {
    tables: Vec<QTable>,
    prediction: Prediction,
}

impl Ensemble {
    pub fn new(n: usize, num_states: usize, num_actions: usize, prediction: Prediction) -> Self {
        Self {
            tables: vec![QTable::new(num_states, num_actions); n],
            prediction,
        }
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn num_actions(&self) -> usize {
        self.tables[0].num_actions()
    }

    /// Combined action values of `state` written into `out`
    pub fn predict(&self, state: usize, out: &mut Vec<f32>) {
        out.clear();
        out.extend_from_slice(self.tables[0].row(state));
        for table in &self.tables[1..] {
            for (o, &q) in out.iter_mut().zip(table.row(state)) {
                *o = match self.prediction {
                    Prediction::Mean => *o + q,
                    Prediction::Min => o.min(q),
                };
            }
        }
        if self.prediction == Prediction::Mean {
            let n = self.tables.len() as f32;
            out.iter_mut().for_each(|o| *o /= n);
        }
    }
}

impl Index<usize> for Ensemble {
    type Output = QTable;

    fn index(&self, index: usize) -> &Self::Output {
        &self.tables[index]
    }
}

impl IndexMut<usize> for Ensemble {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.tables[index]
    }
}
