//! Terminal dashboard for a running sweep
//!
//! The dashboard runs on its own thread and receives [`Update`]s over a
//! channel. Log records are captured by `tui-logger` and shown in the logs tab.

use std::{
    io,
    sync::mpsc::{self, Sender},
    thread::{self, JoinHandle},
    time::Duration,
};

use crate::experiment::{
    aggregate::{AggregatedCurve, CellKey},
    hyperparams::HyperparameterSet,
    sweep::{LogObserver, SweepObserver},
};

mod app;
mod components;
mod tui;

pub use app::{App, Update};

/// Forwards sweep progress to the dashboard and to the log
///
/// Sends fail silently once the dashboard has been closed.
pub struct TuiObserver {
    tx: Sender<Update>,
    log: LogObserver,
}

impl SweepObserver for TuiObserver {
    fn cell_started(&mut self, key: &CellKey, params: &HyperparameterSet, repetitions: usize) {
        self.log.cell_started(key, params, repetitions);
        let _ = self.tx.send(Update::CellStarted {
            key: key.clone(),
            total: repetitions,
        });
    }

    fn repetition_finished(&mut self, key: &CellKey, done: usize, total: usize) {
        self.log.repetition_finished(key, done, total);
        let _ = self.tx.send(Update::Progress { done });
    }

    fn cell_finished(&mut self, key: &CellKey, curve: &AggregatedCurve, elapsed: Duration) {
        self.log.cell_finished(key, curve, elapsed);
        let _ = self.tx.send(Update::CellFinished {
            key: key.clone(),
            rewards: curve.rewards.to_vec(),
            max_q: curve.max_q.to_vec(),
        });
    }

    fn exponent_finished(&mut self, label: &str, elapsed: Duration) {
        self.log.exponent_finished(label, elapsed);
    }
}

/// Install the `tui-logger` logger and start the dashboard thread
///
/// ### Arguments
/// - `total_cells` - number of (exponent, algorithm) cells in the sweep
/// - `level` - lowest level captured and shown in the logs tab
///
/// **Returns** the dashboard thread and an observer to pass to
/// [`Sweep::with_observer`](crate::experiment::sweep::Sweep::with_observer).
/// Dropping the observer tells the dashboard the sweep is done.
pub fn init(
    total_cells: usize,
    level: log::LevelFilter,
) -> Result<(JoinHandle<io::Result<()>>, TuiObserver), log::SetLoggerError> {
    tui_logger::init_logger(level)?;
    tui_logger::set_default_level(level);

    let (tx, rx) = mpsc::channel();
    let handle = thread::spawn(move || App::new(total_cells, level).run(rx));

    Ok((
        handle,
        TuiObserver {
            tx,
            log: LogObserver::default(),
        },
    ))
}
