//! Status bar: bottom line with mode, fetch state, and keybindings.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::theme::{C_ERROR, C_INPUT_FG, C_LIVE, C_LOADING, C_MUTED, C_SECONDARY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    StopEntry,
}

/// Fetch health shown left of the key hints.
pub enum FetchHealth<'a> {
    Loading,
    Ok,
    Failed(&'a str),
}

pub fn draw_keys_bar(frame: &mut Frame, area: Rect, mode: InputMode, health: FetchHealth) {
    let (label, label_color) = match mode {
        InputMode::Normal => ("BOARD", C_SECONDARY),
        InputMode::StopEntry => ("STOP", C_INPUT_FG),
    };

    let mut spans = vec![Span::styled(
        format!(" {} ", label),
        Style::default().fg(label_color).add_modifier(Modifier::BOLD),
    )];

    spans.push(match health {
        FetchHealth::Loading => Span::styled("◌ ", Style::default().fg(C_LOADING)),
        FetchHealth::Ok => Span::styled("● ", Style::default().fg(C_LIVE)),
        FetchHealth::Failed(_) => Span::styled("● ", Style::default().fg(C_ERROR)),
    });

    let keys = match mode {
        InputMode::Normal => {
            "jk select  Enter map line  Esc close map  m more  r refresh  / stop  q quit"
        }
        InputMode::StopEntry => "type a stop id  Enter go  Esc cancel",
    };
    spans.push(Span::styled(keys, Style::default().fg(C_MUTED)));

    if let FetchHealth::Failed(message) = health {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(message.to_string(), Style::default().fg(C_ERROR)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
