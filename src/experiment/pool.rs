use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::{
        mpsc::{self, RecvTimeoutError},
        Arc,
    },
    time::Duration,
};

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::{
    algo::Algorithm,
    core::Deadline,
    error::{SweepError, TrialExecutionError},
};

use super::{
    hyperparams::HyperparameterSet,
    trial::{TrialResult, TrialRunner},
};

/// Default extra time the collector waits for a result beyond the trial deadline
pub const GRACE: Duration = Duration::from_secs(5);

/// What came back from one batch of repetitions
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Successful results, ordered by repetition
    pub results: Vec<TrialResult>,
    /// Failed repetitions and why
    pub failures: Vec<(usize, TrialExecutionError)>,
}

/// A bounded pool of worker threads running trials
pub struct TrialPool {
    pool: ThreadPool,
    grace: Duration,
}

impl TrialPool {
    /// `workers = None` uses one thread per core
    pub fn new(workers: Option<usize>) -> Result<Self, SweepError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers.unwrap_or(0))
            .thread_name(|i| format!("trial-{i}"))
            .build()
            .map_err(|e| SweepError::Pool(e.to_string()))?;
        Ok(Self { pool, grace: GRACE })
    }

    /// Wait `grace` beyond the trial timeout before giving up on missing results
    ///
    /// **Default**: [`GRACE`]
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run one repetition per seed and wait for all of them
    ///
    /// Each trial gets its own `timeout`, starting when a worker picks it up.
    /// A panicking trial is recorded as a failure. If no result arrives for
    /// longer than `timeout` plus a grace period, the missing repetitions are
    /// recorded as lost and the batch returns without them.
    pub fn run_batch(
        &self,
        runner: &Arc<dyn TrialRunner>,
        algorithm: Algorithm,
        params: &Arc<HyperparameterSet>,
        seeds: &[u64],
        timeout: Option<Duration>,
        mut progress: impl FnMut(usize),
    ) -> BatchOutcome {
        let (tx, rx) = mpsc::channel();
        for (i, &seed) in seeds.iter().enumerate() {
            let tx = tx.clone();
            let runner = Arc::clone(runner);
            let params = Arc::clone(params);
            self.pool.spawn(move || {
                let deadline = timeout.map_or_else(Deadline::never, Deadline::after);
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    runner.run_trial(algorithm, &params, seed, &deadline)
                }))
                .unwrap_or_else(|payload| Err(TrialExecutionError::Panicked(panic_message(payload))));
                // The collector may have given up on this batch
                let _ = tx.send((i, result));
            });
        }
        drop(tx);

        let mut received = vec![false; seeds.len()];
        let mut outcome = BatchOutcome::default();
        let mut indexed = Vec::with_capacity(seeds.len());

        for done in 1..=seeds.len() {
            let message = match timeout {
                Some(t) => rx.recv_timeout(t + self.grace),
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match message {
                Ok((i, result)) => {
                    received[i] = true;
                    match result {
                        Ok(r) => indexed.push((i, r)),
                        Err(e) => outcome.failures.push((i, e)),
                    }
                    progress(done);
                }
                Err(_) => {
                    let lost = received.iter().filter(|&&r| !r).count();
                    log::warn!("Stopped waiting for {lost} unfinished repetitions of {algorithm}");
                    break;
                }
            }
        }

        for i in (0..seeds.len()).filter(|&i| !received[i]) {
            outcome.failures.push((i, TrialExecutionError::Lost));
        }
        indexed.sort_by_key(|&(i, _)| i);
        outcome.results = indexed.into_iter().map(|(_, r)| r).collect();
        outcome.failures.sort_by_key(|&(i, _)| i);
        outcome
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::hyperparams::{select, Defaults};

    /// Returns the seed as its only sample; panics or hangs on request
    struct Echo {
        panic_on: Option<u64>,
        sleep_on: Option<u64>,
    }

    impl TrialRunner for Echo {
        fn run_trial(
            &self,
            _algorithm: Algorithm,
            _params: &HyperparameterSet,
            seed: u64,
            deadline: &Deadline,
        ) -> Result<TrialResult, TrialExecutionError> {
            if self.panic_on == Some(seed) {
                panic!("seed {seed} is cursed");
            }
            if self.sleep_on == Some(seed) {
                std::thread::sleep(Duration::from_millis(300));
                if deadline.expired() {
                    return Err(TrialExecutionError::DeadlineExceeded(
                        deadline.limit().unwrap_or_default(),
                    ));
                }
            }
            Ok(TrialResult {
                rewards: vec![seed as f64],
                max_q: vec![seed as f64],
            })
        }

        fn trial_length(&self, _algorithm: Algorithm) -> usize {
            1
        }
    }

    fn echo(panic_on: Option<u64>, sleep_on: Option<u64>) -> Arc<dyn TrialRunner> {
        Arc::new(Echo {
            panic_on,
            sleep_on,
        })
    }

    fn params() -> Arc<HyperparameterSet> {
        Arc::new(select(Algorithm::Q, &Defaults::default()).unwrap())
    }

    #[test]
    fn results_are_ordered_by_repetition() {
        let pool = TrialPool::new(Some(4)).unwrap();
        let seeds: Vec<u64> = (0..20).collect();
        let mut seen = 0;
        let outcome = pool.run_batch(&echo(None, None), Algorithm::Q, &params(), &seeds, None, |d| {
            seen = d
        });
        assert_eq!(seen, 20, "Progress reported for every repetition");
        assert!(outcome.failures.is_empty());
        let firsts: Vec<f64> = outcome.results.iter().map(|r| r.rewards[0]).collect();
        assert_eq!(firsts, (0..20).map(|s| s as f64).collect::<Vec<_>>());
    }

    #[test]
    fn panics_are_isolated() {
        let pool = TrialPool::new(Some(2)).unwrap();
        let outcome = pool.run_batch(
            &echo(Some(2), None),
            Algorithm::Q,
            &params(),
            &[0, 1, 2, 3],
            None,
            |_| {},
        );
        assert_eq!(outcome.results.len(), 3);
        assert_eq!(outcome.failures.len(), 1);
        assert!(matches!(
            &outcome.failures[0],
            (2, TrialExecutionError::Panicked(msg)) if msg.contains("cursed")
        ));
    }

    #[test]
    fn slow_trials_miss_their_deadline() {
        let pool = TrialPool::new(Some(2)).unwrap();
        let outcome = pool.run_batch(
            &echo(None, Some(1)),
            Algorithm::Q,
            &params(),
            &[0, 1],
            Some(Duration::from_millis(50)),
            |_| {},
        );
        assert_eq!(outcome.results.len(), 1);
        assert!(matches!(
            outcome.failures[..],
            [(1, TrialExecutionError::DeadlineExceeded(_))]
        ));
    }

    /// Ignores its deadline and blocks on one seed
    struct Stall(u64);

    impl TrialRunner for Stall {
        fn run_trial(
            &self,
            _algorithm: Algorithm,
            _params: &HyperparameterSet,
            seed: u64,
            _deadline: &Deadline,
        ) -> Result<TrialResult, TrialExecutionError> {
            if seed == self.0 {
                std::thread::sleep(Duration::from_secs(2));
            }
            Ok(TrialResult {
                rewards: vec![seed as f64],
                max_q: vec![seed as f64],
            })
        }

        fn trial_length(&self, _algorithm: Algorithm) -> usize {
            1
        }
    }

    #[test]
    fn unresponsive_trials_are_lost() {
        let pool = TrialPool::new(Some(2))
            .unwrap()
            .with_grace(Duration::from_millis(100));
        let runner: Arc<dyn TrialRunner> = Arc::new(Stall(1));
        let outcome = pool.run_batch(
            &runner,
            Algorithm::Q,
            &params(),
            &[0, 1, 2],
            Some(Duration::from_millis(10)),
            |_| {},
        );

        assert_eq!(outcome.failures, [(1, TrialExecutionError::Lost)]);
        let seeds: Vec<f64> = outcome.results.iter().map(|r| r.rewards[0]).collect();
        assert_eq!(seeds, [0.0, 2.0], "Results that arrived in time survive");
    }

    #[test]
    fn pool_size() {
        assert_eq!(TrialPool::new(Some(3)).unwrap().workers(), 3);
    }
}
