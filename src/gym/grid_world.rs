use rand::{rngs::StdRng, Rng, SeedableRng};
use strum::{EnumIter, FromRepr, VariantArray};

use crate::env::{Environment, FiniteEnvironment};

/// Grid cell as `(row, column)`
pub type Pos = (usize, usize);

#[derive(EnumIter, VariantArray, FromRepr, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Move {
    Up = 0,
    Down = 1,
    Left = 2,
    Right = 3,
}

/// The 3x3 grid world of Van Hasselt, "Double Q-learning" (2010)
///
/// The agent starts in the bottom-left corner. Every action taken outside the
/// goal pays -12 or +10 with equal probability, so the expected reward per step
/// is -1. Any action taken in the top-right goal pays +5 and ends the episode.
/// Moves into the wall leave the agent in place.
pub struct GridWorld {
    height: usize,
    width: usize,
    start: Pos,
    goal: Pos,
    pos: Pos,
    rng: StdRng,
}

impl GridWorld {
    pub const GAMMA: f32 = 0.95;

    /// Initialize the grid world with its own reward noise seeded from `seed`
    pub fn new(seed: u64) -> Self {
        Self {
            height: 3,
            width: 3,
            start: (2, 0),
            goal: (0, 2),
            pos: (2, 0),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Flatten a grid cell into a state index
    pub fn index(&self, pos: Pos) -> usize {
        pos.0 * self.width + pos.1
    }

    pub fn pos(&self) -> Pos {
        self.pos
    }

    fn apply(&self, mv: Move) -> Pos {
        let (r, c) = self.pos;
        match mv {
            Move::Up => (r.saturating_sub(1), c),
            Move::Down => ((r + 1).min(self.height - 1), c),
            Move::Left => (r, c.saturating_sub(1)),
            Move::Right => (r, (c + 1).min(self.width - 1)),
        }
    }
}

impl Environment for GridWorld {
    type State = usize;
    type Action = usize;

    fn step(&mut self, action: Self::Action) -> (Option<Self::State>, f32) {
        if self.pos == self.goal {
            return (None, 5.0);
        }

        let mv = Move::from_repr(action).expect("action index is below `num_actions`");
        self.pos = self.apply(mv);
        let reward = if self.rng.gen_bool(0.5) { -12.0 } else { 10.0 };

        (Some(self.index(self.pos)), reward)
    }

    fn reset(&mut self) -> Self::State {
        self.pos = self.start;
        self.index(self.pos)
    }
}

impl FiniteEnvironment for GridWorld {
    fn num_states(&self) -> usize {
        self.height * self.width
    }

    fn num_actions(&self) -> usize {
        Move::VARIANTS.len()
    }

    fn gamma(&self) -> f32 {
        Self::GAMMA
    }

    fn start_state(&self) -> usize {
        self.index(self.start)
    }
}
