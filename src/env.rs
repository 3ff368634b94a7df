/// Represents a Markov decision process, defining the dynamics of an environment
/// in which an agent can operate.
///
/// This base trait represents the common case of a discrete-time MDP with one agent.
pub trait Environment {
    /// A representation of the state of the environment to be passed to an agent
    type State;

    /// A representation of an action that an agent can take to affect the environment
    type Action;

    /// Update the environment in response to an action taken by an agent, producing a new state and associated reward
    ///
    /// **Returns** `(next_state, reward)`, where `next_state` is `None` if the episode ended
    fn step(&mut self, action: Self::Action) -> (Option<Self::State>, f32);

    /// Reset the environment to an initial state
    ///
    /// **Returns** the state
    fn reset(&mut self) -> Self::State;
}

/// An environment with finitely many states and actions, both indexed from zero
///
/// Every action is available in every state, so tabular agents can store one
/// row of `num_actions` values per state.
pub trait FiniteEnvironment: Environment<State = usize, Action = usize> {
    fn num_states(&self) -> usize;

    fn num_actions(&self) -> usize;

    /// Discount factor
    fn gamma(&self) -> f32;

    /// The state every episode starts from
    fn start_state(&self) -> usize;
}
