use ndarray::Array2;

use crate::env::{Environment, FiniteEnvironment};

/// Represents a single experience or transition in the environment
pub struct Exp<E: Environment> {
    /// The state of the environment before taking the action
    pub state: E::State,
    /// The action taken in the given state
    pub action: E::Action,
    /// The state of the environment after the action is taken, or if terminal, `None`
    pub next_state: Option<E::State>,
    /// The reward received after taking the action
    pub reward: f32,
}

impl<E: Environment> Exp<E> {
    pub fn is_terminal(&self) -> bool {
        self.next_state.is_none()
    }
}

impl<E: Environment> Clone for Exp<E>
where
    E::State: Clone,
    E::Action: Clone,
{
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            action: self.action.clone(),
            next_state: self.next_state.clone(),
            reward: self.reward,
        }
    }
}

/// Transitions of a finite environment, indexed by the action taken
///
/// Regressors with one model per action read their training rows from here.
#[derive(Debug, Clone)]
pub struct ActionBatch {
    pub states: Vec<usize>,
    pub next_states: Vec<Option<usize>>,
    pub rewards: Vec<f32>,
    rows: Vec<Vec<usize>>,
}

impl ActionBatch {
    /// Collect `experiences` of an environment with `num_actions` actions
    ///
    /// Panics if an experience holds an action outside `0..num_actions`.
    pub fn from_slice<E: FiniteEnvironment>(experiences: &[Exp<E>], num_actions: usize) -> Self {
        let n = experiences.len();
        let mut batch = Self {
            states: Vec::with_capacity(n),
            next_states: Vec::with_capacity(n),
            rewards: Vec::with_capacity(n),
            rows: vec![Vec::new(); num_actions],
        };
        for (i, e) in experiences.iter().enumerate() {
            batch.states.push(e.state);
            batch.next_states.push(e.next_state);
            batch.rewards.push(e.reward);
            batch.rows[e.action].push(i);
        }
        batch
    }

    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    /// Indices of the transitions that took `action`
    pub fn rows(&self, action: usize) -> &[usize] {
        &self.rows[action]
    }

    /// One row per transition that took `action`, with the state index as the only feature
    pub fn features(&self, action: usize) -> Array2<f32> {
        let rows = self.rows(action);
        Array2::from_shape_fn((rows.len(), 1), |(i, _)| self.states[rows[i]] as f32)
    }
}
