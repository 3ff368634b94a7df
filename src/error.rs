use std::{path::PathBuf, time::Duration};

use thiserror::Error;

use crate::{algo::Algorithm, experiment::hyperparams::Param};

/// Invalid or incomplete experiment configuration
///
/// Always fatal: raised before any trial is started, or while building an agent.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("unknown algorithm `{0}`")]
    UnknownAlgorithm(String),

    #[error("{algorithm} requires hyperparameter `{param}`")]
    MissingHyperparameter { algorithm: Algorithm, param: Param },

    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("smoothing window {window} is longer than the {length}-sample trial of {algorithm}")]
    WindowTooLarge {
        algorithm: Algorithm,
        window: usize,
        length: usize,
    },

    #[error("could not parse configuration: {0}")]
    Parse(String),
}

/// Failure of a single repetition
///
/// Recorded by the sweep; it drops the repetition but never aborts the cell.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrialExecutionError {
    #[error("trial exceeded its {0:?} deadline")]
    DeadlineExceeded(Duration),

    #[error("trial panicked: {0}")]
    Panicked(String),

    #[error("trial could not be configured: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("no result received from worker")]
    Lost,
}

/// Failure to write experiment output
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not write array {path}: {source}")]
    Npy {
        path: PathBuf,
        #[source]
        source: ndarray_npy::WriteNpyError,
    },

    #[error("could not write timing log: {0}")]
    Csv(#[from] csv::Error),

    #[error("could not render figure {path}: {reason}")]
    Plot { path: PathBuf, reason: String },
}

/// Failure to reduce the results of a sweep cell
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AggregationError {
    #[error("no trial results to aggregate")]
    Empty,

    #[error("trial result {index} has {found} samples, expected {expected}")]
    LengthMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("smoothing window {window} does not fit {length} samples")]
    WindowTooLarge { window: usize, length: usize },
}

/// Fatal sweep failure
#[derive(Debug, Error)]
pub enum SweepError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Aggregation(#[from] AggregationError),

    #[error("all {failures} repetitions of {algorithm} (exp {label}) failed")]
    EmptyCell {
        algorithm: Algorithm,
        label: String,
        failures: usize,
    },

    #[error("could not start worker pool: {0}")]
    Pool(String),
}
