//! Map pane: the vehicle overlay for the selected line.

use ratatui::{
    layout::{Alignment, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Paragraph},
    Frame,
};

use crate::overlay::{MapOverlayController, OverlayIndicator};
use crate::surface::CanvasSurface;
use crate::theme::{line_color, style_muted, C_ERROR, C_LOADING, C_SECONDARY};
use crate::widgets::pane_chrome::{pane_chrome, Badge};

/// Area the map itself occupies inside a pane of `area`.
pub fn inner_area(area: Rect) -> Rect {
    Block::bordered().inner(area)
}

pub fn draw(frame: &mut Frame, area: Rect, overlay: &MapOverlayController<CanvasSurface>) {
    let selection = overlay.selection();
    let badge_text = selection.map(|s| format!("line {}", s.line_id));
    let badge = match (selection, badge_text.as_deref()) {
        (Some(s), Some(text)) => Some(Badge {
            text,
            color: line_color(s.color),
        }),
        _ => None,
    };
    let block = pane_chrome("map", selection.is_some(), badge);

    match overlay.surface() {
        Some(surface) if selection.is_some() => surface.draw(frame, area, block),
        _ => {
            let hint = if selection.is_some() {
                "preparing map…"
            } else {
                "select a row and press Enter to follow its line"
            };
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(hint, style_muted())))
                    .alignment(Alignment::Center)
                    .block(block),
                area,
            );
        }
    }

    if let Some(label) = overlay.indicator().label() {
        let color = match overlay.indicator() {
            OverlayIndicator::Loading => C_LOADING,
            OverlayIndicator::SurfaceUnavailable => C_ERROR,
            _ => C_SECONDARY,
        };
        let inner = inner_area(area);
        if inner.height > 0 {
            let status = Rect {
                y: inner.y + inner.height - 1,
                height: 1,
                ..inner
            };
            frame.render_widget(
                Paragraph::new(Span::styled(format!(" {} ", label), Style::default().fg(color))),
                status,
            );
        }
    }
}
