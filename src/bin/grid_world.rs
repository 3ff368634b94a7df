use std::{error::Error, path::PathBuf, sync::Arc};

use clap::Parser;
use log::LevelFilter;
use rl_sweep::{
    algo::Algorithm,
    config::SweepConfig,
    experiment::{FileSink, Sweep},
};

/// Compare temporal-difference control algorithms on the Van Hasselt grid world
#[derive(Parser)]
#[command(name = "grid_world", version, long_about = None)]
struct Cli {
    /// TOML sweep configuration; built-in defaults if omitted
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Comma separated algorithms, by short or long name
    #[arg(short, long, value_delimiter = ',', value_parser = Algorithm::parse)]
    algorithms: Option<Vec<Algorithm>>,

    /// Comma separated learning-rate exponents
    #[arg(short, long, value_delimiter = ',')]
    exponents: Option<Vec<f32>>,

    /// Repetitions per cell
    #[arg(short = 'n', long)]
    repetitions: Option<usize>,

    /// Steps per tabular repetition
    #[arg(short, long)]
    steps: Option<usize>,

    /// Moving average window
    #[arg(short, long)]
    window: Option<usize>,

    /// Worker threads
    #[arg(long)]
    workers: Option<usize>,

    /// Base seed for reproducible sweeps
    #[arg(long)]
    seed: Option<u64>,

    /// Directory for arrays, figures and the timing log
    #[arg(short, long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// Skip the comparison figures
    #[arg(long)]
    no_figures: bool,

    /// Log every repetition milestone and the reduced curves
    #[arg(short, long)]
    verbose: bool,

    /// Follow the sweep in a terminal dashboard
    #[cfg(feature = "viz")]
    #[arg(long)]
    viz: bool,
}

impl Cli {
    fn sweep_config(&self) -> Result<SweepConfig, Box<dyn Error>> {
        let mut config = match &self.config {
            Some(path) => SweepConfig::load(path)?,
            None => SweepConfig::default(),
        };
        if let Some(algorithms) = &self.algorithms {
            config.algorithms = algorithms.clone();
        }
        if let Some(exponents) = &self.exponents {
            config.exponents = exponents.clone();
        }
        if let Some(repetitions) = self.repetitions {
            config.repetitions = repetitions;
        }
        if let Some(steps) = self.steps {
            config.trial.n_steps = steps;
        }
        if let Some(window) = self.window {
            config.window = window;
        }
        if self.workers.is_some() {
            config.workers = self.workers;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(out) = &self.out {
            config.output.array_dir = out.join("nps");
            config.output.figure_dir = out.clone();
        }
        if self.no_figures {
            config.output.figures = false;
        }
        Ok(config)
    }

    fn level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }
}

/// Run the sweep with the dashboard capturing the log, then wait for it to close
#[cfg(feature = "viz")]
fn run_with_dashboard(level: LevelFilter, config: SweepConfig) -> Result<(), Box<dyn Error>> {
    let total_cells = config.algorithms.len() * config.exponents.len();
    let (handle, observer) = rl_sweep::viz::init(total_cells, level)?;
    let sink = FileSink::new(config.output.clone())?;
    let runner = Arc::new(config.trial.clone());

    let result = Sweep::new(config, runner, Box::new(sink))
        .and_then(|sweep| sweep.with_observer(Box::new(observer)).run());
    if let Err(e) = &result {
        log::error!("{e}");
    }
    handle.join().map_err(|_| "dashboard thread panicked")??;
    result?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = cli.sweep_config()?;

    #[cfg(feature = "viz")]
    {
        if cli.viz {
            return run_with_dashboard(cli.level(), config);
        }
    }

    env_logger::Builder::new()
        .filter_level(cli.level())
        .parse_default_env()
        .init();

    let sink = FileSink::new(config.output.clone())?;
    let runner = Arc::new(config.trial.clone());
    let mut sweep = Sweep::new(config, runner, Box::new(sink))?;
    let outcome = sweep.run()?;

    let dropped: usize = outcome.curves.iter().map(|(_, c)| c.dropped).sum();
    if dropped > 0 {
        log::warn!("{dropped} repetitions failed across the sweep");
    }
    Ok(())
}
