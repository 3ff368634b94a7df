use crossterm::event::{Event, KeyCode};
use ratatui::{prelude::*, widgets::WidgetRef};
use tui_logger::{TuiLoggerSmartWidget, TuiWidgetEvent, TuiWidgetState};

use crate::viz::tui::key_press;

use super::Component;

/// Key bindings of the log pane, as shown in the help popup
pub static KEYS: [(&str, &str); 7] = [
    ("⬆ / ⬇", "Select a log target"),
    ("⬅ / ➡", "Show one level less or more for the target"),
    ("- / +", "Capture one level less or more for the target"),
    ("  s  ", "Show or hide the target list"),
    ("  f  ", "Show only the selected target"),
    ("PgUp ", "Scroll back through the history"),
    (" Esc ", "Follow new messages again"),
];

fn widget_event(key: KeyCode) -> Option<TuiWidgetEvent> {
    Some(match key {
        KeyCode::Up => TuiWidgetEvent::UpKey,
        KeyCode::Down => TuiWidgetEvent::DownKey,
        KeyCode::Left => TuiWidgetEvent::LeftKey,
        KeyCode::Right => TuiWidgetEvent::RightKey,
        KeyCode::Char('-') => TuiWidgetEvent::MinusKey,
        KeyCode::Char('+') | KeyCode::Char('=') => TuiWidgetEvent::PlusKey,
        KeyCode::Char('s') => TuiWidgetEvent::HideKey,
        KeyCode::Char('f') => TuiWidgetEvent::FocusKey,
        KeyCode::PageUp => TuiWidgetEvent::PrevPageKey,
        KeyCode::PageDown => TuiWidgetEvent::NextPageKey,
        KeyCode::Esc => TuiWidgetEvent::EscapeKey,
        _ => return None,
    })
}

/// Sweep messages captured by `tui-logger`, one target per module
pub struct Logs {
    state: TuiWidgetState,
}

impl Logs {
    /// Display messages at `level` and above
    pub fn new(level: log::LevelFilter) -> Self {
        Self {
            state: TuiWidgetState::new().set_default_display_level(level),
        }
    }
}

impl WidgetRef for Logs {
    fn render_ref(&self, area: Rect, buf: &mut Buffer) {
        TuiLoggerSmartWidget::default()
            .title_log("Sweep log")
            .title_target("Targets")
            .style_error(Style::default().light_red())
            .style_warn(Style::default().yellow())
            .style_info(Style::default().white())
            .style_debug(Style::default().dark_gray())
            .output_separator(' ')
            .state(&self.state)
            .render(area, buf);
    }
}

impl Component for Logs {
    fn handle_ui_event(&mut self, event: &Event) -> bool {
        match key_press(event).and_then(widget_event) {
            Some(e) => {
                self.state.transition(e);
                true
            }
            None => false,
        }
    }
}
