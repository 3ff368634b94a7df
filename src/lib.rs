/// Learning agents
pub mod agent;

/// Implemented RL algorithms
pub mod algo;

/// Function approximators
pub mod approx;

/// Sweep configuration
pub mod config;

/// The interaction loop between an agent and an environment
pub mod core;

/// Implementations of strategies for time-decaying hyperparameters
pub mod decay;

/// Environment
pub mod env;

/// Error types
pub mod error;

/// Repeated-trial experiments
pub mod experiment;

/// Exploration policies
pub mod exploration;

/// Testing environments
pub mod gym;

/// Experience
pub mod memory;

/// Terminal dashboard
#[cfg(feature = "viz")]
pub mod viz;

mod util;
