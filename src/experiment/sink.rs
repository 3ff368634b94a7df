use std::{
    error::Error,
    fs::{self, File},
    path::{Path, PathBuf},
};

use ndarray::Array1;
use plotters::{
    backend::SVGBackend,
    chart::ChartBuilder,
    drawing::IntoDrawingArea,
    element::PathElement,
    series::LineSeries,
    style::{Color, IntoFont, Palette, Palette99, BLACK, WHITE},
};
use serde::Serialize;

use crate::{algo::Algorithm, config::OutputConfig, error::PersistenceError};

use super::{
    aggregate::{AggregatedCurve, CellKey},
    sweep::Timing,
};

/// Receives the reduced curves of a sweep, one cell at a time
pub trait ResultsSink {
    fn record_cell(&mut self, key: &CellKey, curve: &AggregatedCurve) -> Result<(), PersistenceError>;

    fn record_timing(&mut self, _timing: &Timing) -> Result<(), PersistenceError> {
        Ok(())
    }

    /// Called after the last algorithm of an exponent
    fn finish_exponent(&mut self, _label: &str) -> Result<(), PersistenceError> {
        Ok(())
    }
}

#[derive(Serialize)]
struct TimingRow<'a> {
    method: &'a str,
    label: &'a str,
    minutes: f64,
}

struct Trace {
    algorithm: Algorithm,
    rewards: Array1<f64>,
    max_q: Array1<f64>,
}

/// Writes `.npy` arrays, one two-panel figure per exponent, and a timing log
pub struct FileSink {
    output: OutputConfig,
    traces: Vec<Trace>,
    times: Option<csv::Writer<File>>,
}

fn create_dir(path: &Path) -> Result<(), PersistenceError> {
    fs::create_dir_all(path).map_err(|source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

impl FileSink {
    /// Create the output directories and truncate the timing log
    pub fn new(output: OutputConfig) -> Result<Self, PersistenceError> {
        create_dir(&output.array_dir)?;
        if output.figures {
            create_dir(&output.figure_dir)?;
        }
        let times = if output.timing_log {
            Some(csv::Writer::from_path(output.array_dir.join("times.csv"))?)
        } else {
            None
        };
        Ok(Self {
            output,
            traces: Vec::new(),
            times,
        })
    }

    /// `{array_dir}/{short name}_{label}_{suffix}.npy`
    pub fn array_path(&self, key: &CellKey, suffix: &str) -> PathBuf {
        self.output
            .array_dir
            .join(format!("{}_{}_{suffix}.npy", key.algorithm, key.label))
    }

    pub fn figure_path(&self, label: &str) -> PathBuf {
        self.output
            .figure_dir
            .join(format!("{}{label}.svg", self.output.figure_prefix))
    }

    fn write_array(&self, path: PathBuf, array: &Array1<f64>) -> Result<(), PersistenceError> {
        ndarray_npy::write_npy(&path, array).map_err(|source| PersistenceError::Npy { path, source })
    }

    fn render(&self, path: &Path, label: &str) -> Result<(), Box<dyn Error>> {
        let root = SVGBackend::new(path, (1024, 1024)).into_drawing_area();
        root.fill(&WHITE)?;
        let root = root.titled(label, ("sans-serif", 30).into_font())?;
        let panels = root.split_evenly((2, 1));

        let curves: [(&str, fn(&Trace) -> &Array1<f64>); 2] =
            [("r", |t| &t.rewards), ("Max Qs", |t| &t.max_q)];

        for (panel, (title, curve)) in panels.iter().zip(curves) {
            let x_max = self.traces.iter().map(|t| curve(t).len()).max().unwrap_or(1);
            let (mut y_min, mut y_max) = self
                .traces
                .iter()
                .flat_map(|t| curve(t).iter().copied())
                .filter(|y| y.is_finite())
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), y| {
                    (lo.min(y), hi.max(y))
                });
            if y_min > y_max {
                (y_min, y_max) = (0.0, 1.0);
            } else if y_min == y_max {
                (y_min, y_max) = (y_min - 0.5, y_max + 0.5);
            }

            let mut chart = ChartBuilder::on(panel)
                .caption(title, ("sans-serif", 20).into_font())
                .margin(10)
                .x_label_area_size(30)
                .y_label_area_size(50)
                .build_cartesian_2d(0..x_max, y_min..y_max)?;
            chart.configure_mesh().draw()?;

            for (i, trace) in self.traces.iter().enumerate() {
                let color = Palette99::pick(i).to_rgba();
                chart
                    .draw_series(LineSeries::new(
                        curve(trace).iter().enumerate().map(|(x, &y)| (x, y)),
                        &color,
                    ))?
                    .label(trace.algorithm.to_string())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
            }

            chart
                .configure_series_labels()
                .background_style(&WHITE.mix(0.8))
                .border_style(&BLACK)
                .draw()?;
        }

        root.present()?;
        Ok(())
    }
}

impl ResultsSink for FileSink {
    fn record_cell(&mut self, key: &CellKey, curve: &AggregatedCurve) -> Result<(), PersistenceError> {
        self.write_array(self.array_path(key, "r"), &curve.rewards)?;
        self.write_array(self.array_path(key, "maxQ"), &curve.max_q)?;
        log::debug!("{key} r: {}", curve.rewards);
        log::debug!("{key} Max Qs: {}", curve.max_q);

        if self.output.figures {
            self.traces.push(Trace {
                algorithm: key.algorithm,
                rewards: curve.rewards.clone(),
                max_q: curve.max_q.clone(),
            });
        }
        Ok(())
    }

    fn record_timing(&mut self, timing: &Timing) -> Result<(), PersistenceError> {
        let Some(times) = self.times.as_mut() else {
            return Ok(());
        };
        let method = timing
            .algorithm
            .map_or_else(|| "overall".to_string(), |a| a.to_string());
        times.serialize(TimingRow {
            method: &method,
            label: &timing.label,
            minutes: timing.minutes(),
        })?;
        times.flush().map_err(|source| PersistenceError::Io {
            path: self.output.array_dir.join("times.csv"),
            source,
        })
    }

    fn finish_exponent(&mut self, label: &str) -> Result<(), PersistenceError> {
        if !self.output.figures || self.traces.is_empty() {
            return Ok(());
        }
        let path = self.figure_path(label);
        self.render(&path, label)
            .map_err(|e| PersistenceError::Plot {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        log::info!("Saved figure {}", path.display());
        self.traces.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ndarray::array;
    use ndarray_npy::read_npy;
    use tempfile::TempDir;

    use super::*;

    fn output(dir: &TempDir, figures: bool) -> OutputConfig {
        OutputConfig {
            array_dir: dir.path().join("nps"),
            figure_dir: dir.path().join("figures"),
            figures,
            ..Default::default()
        }
    }

    fn curve() -> AggregatedCurve {
        AggregatedCurve {
            rewards: array![1.0, 2.0],
            max_q: array![0.5, 0.25, 0.125],
            repetitions: 3,
            dropped: 0,
        }
    }

    #[test]
    fn writes_named_arrays() {
        let dir = TempDir::new().unwrap();
        let mut sink = FileSink::new(output(&dir, false)).unwrap();
        let key = CellKey::new(Algorithm::DoubleQ, 0.8);
        sink.record_cell(&key, &curve()).unwrap();

        let r: Array1<f64> = read_npy(dir.path().join("nps/DQ_08_r.npy")).unwrap();
        let q: Array1<f64> = read_npy(dir.path().join("nps/DQ_08_maxQ.npy")).unwrap();
        assert_eq!(r, curve().rewards);
        assert_eq!(q, curve().max_q);
    }

    #[test]
    fn renders_one_figure_per_exponent() {
        let dir = TempDir::new().unwrap();
        let mut sink = FileSink::new(output(&dir, true)).unwrap();
        sink.record_cell(&CellKey::new(Algorithm::Q, 1.0), &curve()).unwrap();
        sink.record_cell(&CellKey::new(Algorithm::MaxminQ, 1.0), &curve()).unwrap();
        sink.finish_exponent("1").unwrap();

        let svg = fs::read_to_string(dir.path().join("figures/test_1.svg")).unwrap();
        assert!(svg.contains("MMQ"), "Legend names every algorithm");
        assert!(sink.traces.is_empty(), "Traces reset for the next exponent");
    }

    #[test]
    fn timing_log_rows() {
        let dir = TempDir::new().unwrap();
        let mut sink = FileSink::new(output(&dir, false)).unwrap();
        sink.record_timing(&Timing {
            label: "1".into(),
            algorithm: Some(Algorithm::Sarsa),
            elapsed: Duration::from_secs(90),
        })
        .unwrap();
        sink.record_timing(&Timing {
            label: "1".into(),
            algorithm: None,
            elapsed: Duration::from_secs(30),
        })
        .unwrap();

        let log = fs::read_to_string(dir.path().join("nps/times.csv")).unwrap();
        assert_eq!(log, "method,label,minutes\nSARSA,1,1.5\noverall,1,0.5\n");
    }
}
