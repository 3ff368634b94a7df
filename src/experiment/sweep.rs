use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use crate::{
    algo::Algorithm,
    config::SweepConfig,
    error::{SweepError, TrialExecutionError},
};

use super::{
    aggregate::{aggregate, exponent_label, AggregatedCurve, CellKey},
    hyperparams::{select, HyperparameterSet},
    pool::TrialPool,
    sink::ResultsSink,
    trial::TrialRunner,
};

/// Wall-clock time spent on one cell, or on a whole exponent if `algorithm` is `None`
#[derive(Debug, Clone, PartialEq)]
pub struct Timing {
    pub label: String,
    pub algorithm: Option<Algorithm>,
    pub elapsed: Duration,
}

impl Timing {
    pub fn minutes(&self) -> f64 {
        self.elapsed.as_secs_f64() / 60.0
    }
}

/// Follows the progress of a sweep
pub trait SweepObserver {
    fn cell_started(&mut self, _key: &CellKey, _params: &HyperparameterSet, _repetitions: usize) {}

    fn repetition_finished(&mut self, _key: &CellKey, _done: usize, _total: usize) {}

    fn cell_finished(&mut self, _key: &CellKey, _curve: &AggregatedCurve, _elapsed: Duration) {}

    fn exponent_finished(&mut self, _label: &str, _elapsed: Duration) {}
}

/// Reports progress through the `log` facade
#[derive(Debug, Default)]
pub struct LogObserver {
    step: usize,
}

impl SweepObserver for LogObserver {
    fn cell_started(&mut self, key: &CellKey, params: &HyperparameterSet, repetitions: usize) {
        self.step = (repetitions / 10).max(1);
        log::info!("{key}: {repetitions} repetitions [{params}]");
    }

    fn repetition_finished(&mut self, key: &CellKey, done: usize, total: usize) {
        if done % self.step.max(1) == 0 && done < total {
            log::debug!("{key}: {done}/{total}");
        }
    }

    fn cell_finished(&mut self, key: &CellKey, curve: &AggregatedCurve, elapsed: Duration) {
        log::info!(
            "{key} took {:.2} minutes; final r {:.3}, final max Q {:.3}",
            elapsed.as_secs_f64() / 60.0,
            curve.rewards.last().copied().unwrap_or(f64::NAN),
            curve.max_q.last().copied().unwrap_or(f64::NAN),
        );
    }

    fn exponent_finished(&mut self, label: &str, elapsed: Duration) {
        log::info!("Exp {label} overall: {:.2} minutes", elapsed.as_secs_f64() / 60.0);
    }
}

/// Everything a sweep produced, in the order it was produced
#[derive(Debug, Default)]
pub struct SweepOutcome {
    pub curves: Vec<(CellKey, AggregatedCurve)>,
    pub timings: Vec<Timing>,
}

impl SweepOutcome {
    pub fn get(&self, algorithm: Algorithm, label: &str) -> Option<&AggregatedCurve> {
        self.curves
            .iter()
            .find(|(k, _)| k.algorithm == algorithm && k.label == label)
            .map(|(_, c)| c)
    }
}

/// Runs every (exponent, algorithm) cell of a [`SweepConfig`]
///
/// Cells run one after the other; the repetitions of a cell run in parallel
/// on a bounded pool, and the sweep waits for all of them before reducing.
pub struct Sweep {
    config: SweepConfig,
    runner: Arc<dyn TrialRunner>,
    sink: Box<dyn ResultsSink>,
    observer: Box<dyn SweepObserver>,
    pool: TrialPool,
}

impl Sweep {
    /// Validate `config` against `runner` and start the worker pool
    pub fn new(
        config: SweepConfig,
        runner: Arc<dyn TrialRunner>,
        sink: Box<dyn ResultsSink>,
    ) -> Result<Self, SweepError> {
        config.validate(runner.as_ref())?;
        let pool = TrialPool::new(config.workers)?;
        log::info!("Sweep running on {} workers", pool.workers());
        Ok(Self {
            config,
            runner,
            sink,
            observer: Box::new(LogObserver::default()),
            pool,
        })
    }

    pub fn with_observer(mut self, observer: Box<dyn SweepObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    fn seeds(&self) -> Vec<u64> {
        let n = self.config.repetitions as u64;
        match self.config.seed {
            Some(base) => (0..n).map(|i| base.wrapping_add(i)).collect(),
            None => (0..n).map(|_| rand::random()).collect(),
        }
    }

    /// Run all repetitions of one cell and reduce them
    ///
    /// Failed repetitions are left out of the means and counted in
    /// [`AggregatedCurve::dropped`]; the cell fails only if none succeeded.
    pub fn run_cell(&mut self, algorithm: Algorithm, exp: f32) -> Result<AggregatedCurve, SweepError> {
        let key = CellKey::new(algorithm, exp);
        let defaults = self.config.defaults.with_exponent(exp);
        let params = Arc::new(select(algorithm, &defaults)?);
        let total = self.config.repetitions;

        self.observer.cell_started(&key, &params, total);
        let start = Instant::now();

        let seeds = self.seeds();
        let observer = &mut self.observer;
        let outcome = self.pool.run_batch(
            &self.runner,
            algorithm,
            &params,
            &seeds,
            self.config.trial_timeout(),
            |done| observer.repetition_finished(&key, done, total),
        );

        let failures = outcome.failures.len();
        if failures > 0 {
            log::warn!("{key}: dropped {failures} of {total} repetitions");
            for (i, e) in outcome.failures.iter().take(5) {
                log::warn!("{key}: repetition {i}: {e}");
            }
            if let Some((_, e)) = outcome
                .failures
                .iter()
                .find(|(_, e)| matches!(e, TrialExecutionError::Configuration(_)))
            {
                log::error!("{key}: {e}");
            }
        }
        if outcome.results.is_empty() {
            return Err(SweepError::EmptyCell {
                algorithm,
                label: key.label,
                failures,
            });
        }

        let mut curve = aggregate(&outcome.results, self.config.window)?;
        curve.dropped = failures;
        self.observer.cell_finished(&key, &curve, start.elapsed());
        Ok(curve)
    }

    /// Run every cell, handing each curve and timing to the sink as soon as it is ready
    pub fn run(&mut self) -> Result<SweepOutcome, SweepError> {
        let mut outcome = SweepOutcome::default();
        let exponents = self.config.exponents.clone();
        let algorithms = self.config.algorithms.clone();

        for exp in exponents {
            let label = exponent_label(exp);
            log::info!("Exp: {label}");
            let exp_start = Instant::now();

            for &algorithm in &algorithms {
                let start = Instant::now();
                let curve = self.run_cell(algorithm, exp)?;
                let key = CellKey::new(algorithm, exp);
                self.sink.record_cell(&key, &curve)?;

                let timing = Timing {
                    label: label.clone(),
                    algorithm: Some(algorithm),
                    elapsed: start.elapsed(),
                };
                self.sink.record_timing(&timing)?;
                outcome.timings.push(timing);
                outcome.curves.push((key, curve));
            }

            self.sink.finish_exponent(&label)?;
            let overall = Timing {
                label: label.clone(),
                algorithm: None,
                elapsed: exp_start.elapsed(),
            };
            self.observer.exponent_finished(&label, overall.elapsed);
            self.sink.record_timing(&overall)?;
            outcome.timings.push(overall);
        }

        Ok(outcome)
    }
}
