use std::{
    io,
    sync::mpsc::{Receiver, TryRecvError},
    time::Duration,
};

use crossterm::event::{self, KeyCode};
use ratatui::{prelude::*, widgets::*};

use crate::experiment::CellKey;

use super::{
    components::{help::render_help, Component, Logs, Plots},
    tui::{key_press, Tui},
};

const TABS: [&str; 2] = ["Plots", "Logs"];

#[derive(Default, PartialEq)]
pub enum State {
    #[default]
    Running,
    Done,
    Quit,
}

/// Messages from a running sweep to the dashboard
#[derive(Debug, Clone)]
pub enum Update {
    CellStarted { key: CellKey, total: usize },
    Progress { done: usize },
    CellFinished {
        key: CellKey,
        rewards: Vec<f64>,
        max_q: Vec<f64>,
    },
}

/// The root TUI component which holds the main app state and runs the render loop
pub struct App {
    state: State,
    cell: Option<CellKey>,
    done: usize,
    total: usize,
    cells_done: usize,
    total_cells: usize,
    selected_tab: usize,
    show_help: bool,
    plots: Plots,
    logs: Logs,
}

impl App {
    pub fn new(total_cells: usize, level: log::LevelFilter) -> Self {
        Self {
            state: Default::default(),
            cell: None,
            done: 0,
            total: 0,
            cells_done: 0,
            total_cells,
            selected_tab: 0,
            show_help: false,
            plots: Plots::new(),
            logs: Logs::new(level),
        }
    }

    fn apply(&mut self, update: Update) {
        match update {
            Update::CellStarted { key, total } => {
                self.cell = Some(key);
                self.done = 0;
                self.total = total;
            }
            Update::Progress { done } => self.done = done,
            Update::CellFinished {
                key,
                rewards,
                max_q,
            } => {
                self.cells_done += 1;
                self.plots
                    .update(&key.label, key.algorithm.to_string(), &rewards, &max_q);
            }
        }
    }

    /// Take over the terminal and run the main loop until the user quits
    pub fn run(&mut self, rx: Receiver<Update>) -> io::Result<()> {
        let mut tui = Tui::enter()?;

        while self.state != State::Quit {
            if self.state == State::Running {
                loop {
                    match rx.try_recv() {
                        Ok(update) => self.apply(update),
                        Err(TryRecvError::Empty) => break,
                        Err(TryRecvError::Disconnected) => {
                            self.state = State::Done;
                            break;
                        }
                    }
                }
            }

            tui.draw(&*self)?;

            if event::poll(Duration::from_millis(16))? {
                let event = event::read()?;
                match key_press(&event) {
                    Some(KeyCode::Char('q')) => self.state = State::Quit,
                    Some(KeyCode::Char('h')) => self.show_help = !self.show_help,
                    Some(KeyCode::Tab) => self.selected_tab = (self.selected_tab + 1) % TABS.len(),
                    _ => {
                        match self.selected_tab {
                            0 => self.plots.handle_ui_event(&event),
                            _ => self.logs.handle_ui_event(&event),
                        };
                    }
                }
            }
        }

        Ok(())
    }

    fn progress_title(&self) -> String {
        let cell = match (&self.cell, &self.state) {
            (_, State::Done) => "finished".to_string(),
            (Some(key), _) => key.to_string(),
            (None, _) => "starting".to_string(),
        };
        format!(
            "Cell {}/{}: {cell}",
            (self.cells_done + 1).min(self.total_cells),
            self.total_cells
        )
    }
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Layout
        let [menu_area, main_area, progress_area] = Layout::vertical([
            Constraint::Length(3),
            Constraint::Fill(1),
            Constraint::Length(3),
        ])
        .areas(area);

        // Menu
        Tabs::new(TABS)
            .block(Block::default().padding(Padding::uniform(1)))
            .white()
            .bold()
            .highlight_style(Style::default().light_green())
            .select(self.selected_tab)
            .render(menu_area, buf);

        // Main
        match self.selected_tab {
            0 => self.plots.render_ref(main_area, buf),
            _ => self.logs.render_ref(main_area, buf),
        }

        // Progress Bar
        let ratio = match self.state {
            State::Done => 1.0,
            _ if self.total == 0 => 0.0,
            _ => self.done as f64 / self.total as f64,
        };
        Gauge::default()
            .block(
                Block::bordered()
                    .border_type(BorderType::Rounded)
                    .title(self.progress_title()),
            )
            .gauge_style(Color::Cyan)
            .ratio(ratio.clamp(0.0, 1.0))
            .label(format!("{}/{}", self.done, self.total))
            .render(progress_area, buf);

        if self.show_help {
            render_help(area, buf, self.selected_tab);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::Algorithm;

    #[test]
    fn updates_track_progress() {
        let mut app = App::new(2, log::LevelFilter::Info);
        app.apply(Update::CellStarted {
            key: CellKey::new(Algorithm::Q, 1.0),
            total: 8,
        });
        app.apply(Update::Progress { done: 3 });
        assert_eq!((app.done, app.total), (3, 8));
        assert_eq!(app.progress_title(), "Cell 1/2: Q (exp 1)");

        app.apply(Update::CellFinished {
            key: CellKey::new(Algorithm::Q, 1.0),
            rewards: vec![0.0, 1.0],
            max_q: vec![0.5, 0.5, 0.5],
        });
        assert_eq!(app.cells_done, 1);
    }

    #[test]
    fn renders_without_terminal() {
        let app = App::new(1, log::LevelFilter::Info);
        let area = Rect::new(0, 0, 80, 24);
        let mut buf = Buffer::empty(area);
        (&app).render(area, &mut buf);
    }
}
