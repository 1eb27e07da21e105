//! StopInput: tui-input line for typing a stop id.

use ratatui::crossterm::event::{Event, KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use tui_input::{backend::crossterm::EventHandler, Input};
use unicode_width::UnicodeWidthChar;

use crate::theme::{C_INPUT_BG, C_INPUT_FG, C_MUTED};

#[derive(Debug, PartialEq, Eq)]
pub enum StopInputAction {
    /// Enter with a non-empty value.
    Submitted(String),
    Cancelled,
    None,
}

pub struct StopInput {
    input: Input,
    active: bool,
    placeholder: String,
}

impl StopInput {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            input: Input::default(),
            active: false,
            placeholder: placeholder.into(),
        }
    }

    /// Start editing, prefilled with the current stop id.
    pub fn activate(&mut self, current: &str) {
        self.input = Input::new(current.to_string());
        self.active = true;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn text(&self) -> &str {
        self.input.value()
    }

    /// Esc cancels, Enter submits the trimmed value. Empty submissions are
    /// treated as a cancel.
    pub fn handle_key(&mut self, key: KeyEvent) -> StopInputAction {
        match key.code {
            KeyCode::Esc => {
                self.active = false;
                StopInputAction::Cancelled
            }
            KeyCode::Enter => {
                self.active = false;
                let value = self.input.value().trim().to_string();
                if value.is_empty() {
                    StopInputAction::Cancelled
                } else {
                    StopInputAction::Submitted(value)
                }
            }
            _ => {
                self.input.handle_event(&Event::Key(key));
                StopInputAction::None
            }
        }
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        let scroll = self
            .input
            .visual_scroll(area.width.saturating_sub(8) as usize);
        let value = self.text();
        let display = if value.is_empty() {
            Span::styled(
                format!(" stop: {}", self.placeholder),
                Style::default().fg(C_MUTED),
            )
        } else {
            Span::styled(
                format!(" stop: {}", skip_columns(value, scroll)),
                Style::default().fg(C_INPUT_FG),
            )
        };

        let paragraph =
            Paragraph::new(Line::from(vec![display])).style(Style::default().bg(C_INPUT_BG));
        frame.render_widget(paragraph, area);

        if self.active {
            let cursor_x = area.x + 7 + self.input.visual_cursor().saturating_sub(scroll) as u16;
            frame.set_cursor_position((cursor_x.min(area.x + area.width.saturating_sub(1)), area.y));
        }
    }
}

/// The part of `value` after its first `columns` display columns. A wide char
/// straddling the edge is skipped whole.
fn skip_columns(value: &str, columns: usize) -> &str {
    let mut skipped = 0;
    for (idx, c) in value.char_indices() {
        if skipped >= columns {
            return &value[idx..];
        }
        skipped += c.width().unwrap_or(0);
    }
    ""
}

impl Default for StopInput {
    fn default() -> Self {
        Self::new("e.g. 120385")
    }
}
