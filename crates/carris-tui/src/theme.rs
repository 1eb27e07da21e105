//! Color palette and style constants for the board TUI.

use carris_proto::model::LineColor;
use ratatui::style::{Color, Modifier, Style};

// ── Color palette ─────────────────────────────────────────────────────────────

pub const C_ACCENT: Color = Color::Rgb(255, 210, 50); // network yellow
pub const C_LIVE: Color = Color::Rgb(80, 200, 120);
pub const C_ESTIMATE: Color = Color::Rgb(115, 115, 138);
pub const C_NOW: Color = Color::Rgb(255, 95, 95);
pub const C_LOADING: Color = Color::Rgb(255, 184, 80);
pub const C_ERROR: Color = Color::Rgb(255, 80, 80);
pub const C_MUTED: Color = Color::Rgb(72, 72, 88);
pub const C_SECONDARY: Color = Color::Rgb(115, 115, 138);
pub const C_PRIMARY: Color = Color::Rgb(210, 210, 225);
pub const C_SELECTION_BG: Color = Color::Rgb(28, 28, 40);
pub const C_PANEL_BORDER: Color = Color::Rgb(40, 40, 52);
pub const C_PANEL_BORDER_FOCUSED: Color = Color::Rgb(120, 100, 200);
pub const C_INPUT_BG: Color = Color::Rgb(20, 20, 32);
pub const C_INPUT_FG: Color = Color::Rgb(255, 200, 80);
pub const C_INSIGHT: Color = Color::Rgb(180, 120, 220);
pub const C_MAP_GRID: Color = Color::Rgb(60, 60, 78);

// ── Predefined styles ─────────────────────────────────────────────────────────

pub fn line_color(color: LineColor) -> Color {
    Color::Rgb(color.r, color.g, color.b)
}

/// Line badge: dark text on the line's color.
pub fn style_line_badge(color: LineColor) -> Style {
    Style::default()
        .bg(line_color(color))
        .fg(Color::Rgb(18, 18, 18))
        .add_modifier(Modifier::BOLD)
}

pub fn style_default() -> Style {
    Style::default().fg(C_PRIMARY)
}

pub fn style_secondary() -> Style {
    Style::default().fg(C_SECONDARY)
}

pub fn style_accent() -> Style {
    Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD)
}

pub fn style_selected() -> Style {
    Style::default()
        .bg(C_SELECTION_BG)
        .fg(C_PRIMARY)
        .add_modifier(Modifier::BOLD)
}

pub fn style_border(focused: bool) -> Style {
    if focused {
        Style::default().fg(C_PANEL_BORDER_FOCUSED)
    } else {
        Style::default().fg(C_PANEL_BORDER)
    }
}

pub fn style_muted() -> Style {
    Style::default().fg(C_MUTED)
}
