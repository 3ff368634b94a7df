use ratatui::{prelude::*, widgets::*};

use super::{log, plot};

static GLOBAL_KEYS: [(&str, &str); 3] = [
    ("  q  ", "Close the dashboard (the sweep keeps running)"),
    ("  h  ", "Show or hide this help"),
    (" Tab ", "Switch between plots and logs"),
];

/// Key bindings shown for `selected_tab`, global ones first
fn bindings(selected_tab: usize) -> impl Iterator<Item = &'static (&'static str, &'static str)> {
    let tab: &'static [(&str, &str)] = match selected_tab {
        0 => &plot::KEYS,
        1 => &log::KEYS,
        _ => &[],
    };
    GLOBAL_KEYS.iter().chain(tab)
}

/// Draw the key bindings of `selected_tab` in a centered popup
pub fn render_help(area: Rect, buf: &mut Buffer, selected_tab: usize) {
    let lines: Vec<Line> = bindings(selected_tab)
        .map(|&(key, action)| {
            Line::from(vec![
                Span::from(key).light_cyan().bold(),
                Span::raw(format!(" : {action}")),
            ])
        })
        .collect();
    let width = lines.iter().map(Line::width).max().unwrap_or(0) + 6;

    let [_, row, _] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(lines.len() as u16 + 4),
        Constraint::Fill(1),
    ])
    .areas(area);
    let [_, popup, _] = Layout::horizontal([
        Constraint::Fill(1),
        Constraint::Length(width as u16),
        Constraint::Fill(1),
    ])
    .areas(row);

    Clear.render(popup, buf);
    Paragraph::new(lines)
        .block(
            Block::bordered()
                .border_type(BorderType::Rounded)
                .padding(Padding::uniform(1))
                .title("Help"),
        )
        .render(popup, buf);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tab_bindings_follow_global_ones() {
        assert_eq!(bindings(0).count(), GLOBAL_KEYS.len() + plot::KEYS.len());
        assert_eq!(bindings(1).count(), GLOBAL_KEYS.len() + log::KEYS.len());
        assert_eq!(bindings(0).next(), Some(&GLOBAL_KEYS[0]));
    }

    #[test]
    fn popup_lists_quit_key() {
        let area = Rect::new(0, 0, 100, 30);
        let mut buf = Buffer::empty(area);
        render_help(area, &mut buf, 0);
        let text: String = buf.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains("Close the dashboard"));
    }
}
