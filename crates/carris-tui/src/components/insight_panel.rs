//! Insight pane: AI briefing under the board.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

use crate::app_state::BoardState;
use crate::theme::{style_default, style_muted, C_INSIGHT};
use crate::widgets::pane_chrome::pane_chrome;

pub fn draw(frame: &mut Frame, area: Rect, state: &BoardState) {
    let block = pane_chrome("briefing", false, None);
    let lines = match &state.insight {
        Some(insight) => vec![
            Line::from(Span::styled(insight.summary.clone(), style_default())),
            Line::from(Span::styled(
                insight.recommendation.clone(),
                Style::default().fg(C_INSIGHT),
            )),
        ],
        None => vec![Line::from(Span::styled("waiting for arrivals…", style_muted()))],
    };
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
        area,
    );
}
