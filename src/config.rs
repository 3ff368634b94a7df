//! Sweep configuration
//!
//! Every field has a default reproducing the Van Hasselt grid world
//! experiment, so an empty TOML document is a complete configuration.

use std::{fs, path::Path, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    algo::Algorithm,
    error::ConfigurationError,
    experiment::{
        hyperparams::Defaults,
        trial::{GridWorldTrial, TrialRunner},
    },
};

/// Where and what a [`FileSink`](crate::experiment::sink::FileSink) writes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory of the `.npy` arrays and the timing log
    ///
    /// **Default**: `nps`
    pub array_dir: PathBuf,
    /// Directory of the comparison figures
    ///
    /// **Default**: `.`
    pub figure_dir: PathBuf,
    /// Figures are named `{figure_prefix}{label}.svg`
    ///
    /// **Default**: `test_`
    pub figure_prefix: String,
    /// **Default**: `true`
    pub figures: bool,
    /// Write `times.csv` with the minutes spent per cell and per exponent
    ///
    /// **Default**: `true`
    pub timing_log: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            array_dir: "nps".into(),
            figure_dir: ".".into(),
            figure_prefix: "test_".into(),
            figures: true,
            timing_log: true,
        }
    }
}

/// Configuration for a [`Sweep`](crate::experiment::sweep::Sweep)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SweepConfig {
    /// Algorithms compared in every exponent, in order
    ///
    /// **Default**: every temporal-difference algorithm
    pub algorithms: Vec<Algorithm>,
    /// Learning-rate exponents, the outer loop of the sweep
    ///
    /// **Default**: `[1.0, 0.8]`
    pub exponents: Vec<f32>,
    /// Independent repetitions per cell
    ///
    /// **Default**: `10000`
    pub repetitions: usize,
    /// Width of the moving average applied to mean rewards
    ///
    /// **Default**: `100`
    pub window: usize,
    /// Worker threads; all cores if unset
    pub workers: Option<usize>,
    /// Seeds repetition `i` with `seed + i`; fresh entropy per repetition if unset
    pub seed: Option<u64>,
    /// Per-repetition time limit; unlimited if unset
    ///
    /// **Default**: `600`
    pub trial_timeout_secs: Option<u64>,
    pub defaults: Defaults,
    pub trial: GridWorldTrial,
    pub output: OutputConfig,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            algorithms: Algorithm::TD.to_vec(),
            exponents: vec![1.0, 0.8],
            repetitions: 10_000,
            window: 100,
            workers: None,
            seed: None,
            trial_timeout_secs: Some(600),
            defaults: Defaults::default(),
            trial: GridWorldTrial::default(),
            output: OutputConfig::default(),
        }
    }
}

impl SweepConfig {
    pub fn from_toml(s: &str) -> Result<Self, ConfigurationError> {
        toml::from_str(s).map_err(|e| ConfigurationError::Parse(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let s = fs::read_to_string(path)
            .map_err(|e| ConfigurationError::Parse(format!("{}: {e}", path.display())))?;
        Self::from_toml(&s)
    }

    pub fn trial_timeout(&self) -> Option<Duration> {
        self.trial_timeout_secs.map(Duration::from_secs)
    }

    /// Reject configurations that cannot produce a result, before any trial runs
    pub fn validate(&self, runner: &dyn TrialRunner) -> Result<(), ConfigurationError> {
        let invalid = |field, reason: &str| {
            Err(ConfigurationError::InvalidValue {
                field,
                reason: reason.into(),
            })
        };
        if self.algorithms.is_empty() {
            return invalid("algorithms", "at least one algorithm is required");
        }
        if self.exponents.is_empty() {
            return invalid("exponents", "at least one exponent is required");
        }
        if self.exponents.iter().any(|e| !e.is_finite() || *e < 0.0) {
            return invalid("exponents", "exponents must be finite and non-negative");
        }
        if self.repetitions == 0 {
            return invalid("repetitions", "at least one repetition is required");
        }
        if self.window == 0 {
            return invalid("window", "the window must be at least 1");
        }
        if self.workers == Some(0) {
            return invalid("workers", "at least one worker is required");
        }
        if self.trial_timeout_secs == Some(0) {
            return invalid("trial_timeout_secs", "the timeout must be positive");
        }
        for &algorithm in &self.algorithms {
            let length = runner.trial_length(algorithm);
            if self.window > length {
                return Err(ConfigurationError::WindowTooLarge {
                    algorithm,
                    window: self.window,
                    length,
                });
            }
        }
        Ok(())
    }
}
