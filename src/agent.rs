use rand::RngCore;

use crate::{env::Environment, memory::Exp};

/// A learner that acts in an environment and improves from the transitions it produced
///
/// Agents never own randomness: the caller passes the generator of the trial
/// so that a whole run is reproducible from one seed.
pub trait Agent<E>
where
    E: Environment,
{
    /// Choose an action in `state`
    fn act(&mut self, state: &E::State, rng: &mut dyn RngCore) -> E::Action;

    /// Learn from the transitions collected since the last call
    fn learn(&mut self, dataset: &[Exp<E>], rng: &mut dyn RngCore);

    /// Called whenever the environment is reset
    fn episode_start(&mut self) {}

    /// Current estimate of `max_a Q(state, a)`
    fn max_q(&self, state: &E::State) -> f32;
}

impl<E, A> Agent<E> for Box<A>
where
    E: Environment,
    A: Agent<E> + ?Sized,
{
    fn act(&mut self, state: &E::State, rng: &mut dyn RngCore) -> E::Action {
        (**self).act(state, rng)
    }

    fn learn(&mut self, dataset: &[Exp<E>], rng: &mut dyn RngCore) {
        (**self).learn(dataset, rng)
    }

    fn episode_start(&mut self) {
        (**self).episode_start()
    }

    fn max_q(&self, state: &E::State) -> f32 {
        (**self).max_q(state)
    }
}
