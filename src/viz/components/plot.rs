use crossterm::event::{Event, KeyCode};
use ratatui::{prelude::*, style::Stylize, widgets::*};

use crate::viz::tui::key_press;

use super::Component;

/// Most points drawn per series
const MAX_POINTS: usize = 400;

/// Key bindings of the plots, as shown in the help popup
pub static KEYS: [(&str, &str); 1] = [("⬅ / ➡", "Switch between the reward and max Q plots")];

const COLORS: [Color; 12] = [
    Color::Cyan,
    Color::Yellow,
    Color::Green,
    Color::Magenta,
    Color::Red,
    Color::Blue,
    Color::LightCyan,
    Color::LightYellow,
    Color::LightGreen,
    Color::LightMagenta,
    Color::LightRed,
    Color::White,
];

/// A line chart with one series per algorithm
pub struct Plot {
    pub x_title: String,
    pub y_title: String,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
    x_labels: Vec<String>,
    y_labels: Vec<String>,
    series: Vec<(String, Vec<(f64, f64)>)>,
}

impl Plot {
    pub fn new(y_label: &str) -> Self {
        Self {
            x_title: String::from("Step"),
            y_title: String::from(y_label),
            x_bounds: [f64::MAX, f64::MIN],
            y_bounds: [f64::MAX, f64::MIN],
            x_labels: Vec::new(),
            y_labels: Vec::new(),
            series: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.x_bounds = [f64::MAX, f64::MIN];
        self.y_bounds = [f64::MAX, f64::MIN];
        self.x_labels.clear();
        self.y_labels.clear();
        self.series.clear();
    }

    /// Add the curve of one algorithm, thinned to at most [`MAX_POINTS`] points
    pub fn add_series(&mut self, name: String, values: &[f64]) {
        let stride = (values.len() / MAX_POINTS).max(1);
        let points: Vec<(f64, f64)> = values
            .iter()
            .enumerate()
            .step_by(stride)
            .filter(|(_, y)| y.is_finite())
            .map(|(x, &y)| (x as f64, y))
            .collect();

        for &(x, y) in &points {
            self.x_bounds = [self.x_bounds[0].min(x), self.x_bounds[1].max(x)];
            self.y_bounds = [self.y_bounds[0].min(y), self.y_bounds[1].max(y)];
        }
        self.x_labels = self.x_bounds.iter().map(|x| format!("{x:.0}")).collect();
        self.y_labels = self.y_bounds.iter().map(|y| format!("{y:.2}")).collect();
        self.series.push((name, points));
    }
}

impl WidgetRef for Plot {
    fn render_ref(&self, area: Rect, buf: &mut Buffer) {
        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .title("Plots")
            .padding(Padding::uniform(4));

        if self.series.is_empty() {
            Paragraph::new("Waiting for the first cell to finish")
                .dark_gray()
                .block(block)
                .render(area, buf);
            return;
        }

        let datasets = self
            .series
            .iter()
            .enumerate()
            .map(|(i, (name, points))| {
                Dataset::default()
                    .name(name.as_str())
                    .marker(Marker::Braille)
                    .graph_type(GraphType::Line)
                    .style(Style::default().fg(COLORS[i % COLORS.len()]))
                    .data(points)
            })
            .collect();

        let x_axis = Axis::default()
            .title(self.x_title.as_str())
            .dark_gray()
            .labels(
                self.x_labels
                    .clone()
                    .into_iter()
                    .map(|l| l.bold())
                    .collect(),
            )
            .bounds(self.x_bounds);

        let y_axis = Axis::default()
            .title(self.y_title.as_str())
            .dark_gray()
            .labels(
                self.y_labels
                    .clone()
                    .into_iter()
                    .map(|l| l.bold())
                    .collect(),
            )
            .bounds(self.y_bounds);

        Chart::new(datasets)
            .block(block)
            .x_axis(x_axis)
            .y_axis(y_axis)
            .legend_position(Some(LegendPosition::BottomRight))
            .render(area, buf);
    }
}

/// The reward and max Q charts of the exponent being swept
pub struct Plots {
    plot_names: [&'static str; 2],
    plots: [Plot; 2],
    label: Option<String>,
    selected: usize,
}

impl Plots {
    pub fn new() -> Self {
        let plot_names = ["r", "Max Qs"];
        Self {
            plot_names,
            plots: plot_names.map(Plot::new),
            label: None,
            selected: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.plot_names.len()
    }

    pub fn next_plot(&mut self) {
        self.selected = (self.selected + 1) % self.len()
    }

    pub fn prev_plot(&mut self) {
        let len = self.len();
        self.selected = (self.selected + len - 1) % len;
    }

    /// Add the curves of a finished cell, starting over when the exponent changes
    pub fn update(&mut self, label: &str, name: String, rewards: &[f64], max_q: &[f64]) {
        if self.label.as_deref() != Some(label) {
            self.plots.iter_mut().for_each(Plot::clear);
            self.label = Some(label.to_string());
        }
        self.plots[0].add_series(name.clone(), rewards);
        self.plots[1].add_series(name, max_q);
    }
}

impl WidgetRef for Plots {
    fn render_ref(&self, area: Rect, buf: &mut Buffer) {
        let titles = self.plot_names.iter().map(|n| match &self.label {
            Some(label) => format!("{n} (exp {label})"),
            None => n.to_string(),
        });
        Tabs::new(titles)
            .block(Block::default().padding(Padding::uniform(2)))
            .white()
            .highlight_style(Style::default().light_green())
            .select(self.selected)
            .render(area, buf);

        self.plots[self.selected].render_ref(area, buf);
    }
}

impl Component for Plots {
    fn handle_ui_event(&mut self, event: &Event) -> bool {
        match key_press(event) {
            Some(KeyCode::Left) => self.prev_plot(),
            Some(KeyCode::Right) => self.next_plot(),
            _ => return false,
        }
        true
    }
}
