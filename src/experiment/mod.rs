//! Repeated-trial experiments
//!
//! A [`Sweep`] runs every (exponent, algorithm) cell of a [`SweepConfig`](crate::config::SweepConfig):
//! it [selects](hyperparams::select) the hyperparameters of the cell, runs many
//! independent [trials](TrialRunner) on a [`TrialPool`], [reduces](aggregate::aggregate)
//! them to an [`AggregatedCurve`] and hands it to a [`ResultsSink`].

pub mod aggregate;
pub mod hyperparams;
pub mod pool;
pub mod sink;
pub mod sweep;
pub mod trial;

pub use aggregate::{AggregatedCurve, CellKey};
pub use hyperparams::{Defaults, HyperparameterSet, Param, ParamValue};
pub use pool::TrialPool;
pub use sink::{FileSink, ResultsSink};
pub use sweep::{LogObserver, Sweep, SweepObserver, SweepOutcome, Timing};
pub use trial::{GridWorldTrial, TrialResult, TrialRunner};
