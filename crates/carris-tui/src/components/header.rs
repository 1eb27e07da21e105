//! Header component: 2-row top bar.
//!
//! Row 1: stop name, stop id, last-updated clock (right).
//! Row 2: locality / municipality subtitle.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app_state::BoardState;
use crate::theme::{style_accent, style_muted, style_secondary, C_LOADING};

pub fn draw(frame: &mut Frame, area: Rect, state: &BoardState) {
    if area.height == 0 {
        return;
    }
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(area);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(10), Constraint::Length(24)])
        .split(rows[0]);

    let title = Line::from(vec![
        Span::raw(" "),
        Span::styled(state.title(), style_accent()),
        Span::styled(format!("  #{}", state.stop_id), style_muted()),
    ]);
    frame.render_widget(Paragraph::new(title), cols[0]);

    let clock = match (&state.last_updated, state.loading) {
        (_, true) => Span::styled("updating… ", Style::default().fg(C_LOADING)),
        (Some(at), false) => Span::styled(
            format!("updated {} ", at.format("%H:%M:%S")),
            style_secondary(),
        ),
        (None, false) => Span::raw(""),
    };
    frame.render_widget(Paragraph::new(Line::from(clock).right_aligned()), cols[1]);

    if rows.len() > 1 && rows[1].height > 0 {
        let subtitle = Line::from(Span::styled(
            format!(" {}", state.subtitle()),
            style_secondary().add_modifier(Modifier::ITALIC),
        ));
        frame.render_widget(Paragraph::new(subtitle), rows[1]);
    }
}
