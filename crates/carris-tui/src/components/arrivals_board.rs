//! ArrivalsBoard component: the countdown list.
//!
//! One row per processed arrival: line badge in the line's color, destination,
//! LIVE/EST badge, countdown. A trailing row offers "show more" while rows are
//! paged out.

use ratatui::crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, ListState, Paragraph},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use carris_proto::model::{Countdown, ProcessedArrival};

use crate::action::Action;
use crate::app_state::BoardState;
use crate::component::Component;
use crate::core::BoardCommand;
use crate::theme::{
    style_default, style_line_badge, style_muted, style_secondary, style_selected, C_ESTIMATE,
    C_LIVE, C_NOW,
};
use crate::widgets::pane_chrome::pane_chrome;

/// Width of the line badge, LIVE/EST badge and countdown columns together.
const FIXED_COLUMNS: usize = 8 + 6 + 8;

#[derive(Default)]
pub struct ArrivalsBoard {
    list_state: ListState,
    /// Line currently shown on the map; its rows get a marker.
    pub mapped_line: Option<String>,
}

impl ArrivalsBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> usize {
        self.list_state.selected().unwrap_or(0)
    }

    /// Row under the cursor, if the board has any.
    pub fn selected_row<'a>(&self, state: &'a BoardState) -> Option<&'a ProcessedArrival> {
        state.displayed().get(self.selected())
    }

    pub fn select_up(&mut self) {
        self.list_state.select(Some(self.selected().saturating_sub(1)));
    }

    pub fn select_down(&mut self, state: &BoardState) {
        let last = state.displayed().len().saturating_sub(1);
        self.list_state.select(Some((self.selected() + 1).min(last)));
    }

    /// Keep the cursor on a real row after the list shrinks.
    pub fn clamp(&mut self, state: &BoardState) {
        let len = state.displayed().len();
        if len == 0 {
            self.list_state.select(None);
        } else if self.selected() >= len {
            self.list_state.select(Some(len - 1));
        } else if self.list_state.selected().is_none() {
            self.list_state.select(Some(0));
        }
    }

    fn row(&self, arrival: &ProcessedArrival, width: usize) -> ListItem<'static> {
        let countdown = arrival.countdown();
        let countdown_style = match countdown {
            Countdown::Now => Style::default().fg(C_NOW).add_modifier(Modifier::BOLD),
            _ => style_default().add_modifier(Modifier::BOLD),
        };
        let badge_style = if arrival.is_live {
            Style::default().fg(C_LIVE)
        } else {
            Style::default().fg(C_ESTIMATE)
        };
        let mapped = self.mapped_line.as_deref() == Some(arrival.line_id.as_str());

        let dest_width = width.saturating_sub(FIXED_COLUMNS).max(4);
        let destination = fit(&arrival.destination, dest_width);

        ListItem::new(Line::from(vec![
            Span::styled(
                format!(" {:<5} ", arrival.line_id),
                style_line_badge(arrival.display_color),
            ),
            Span::styled(if mapped { "◉" } else { " " }, style_secondary()),
            Span::styled(format!("{} ", destination), style_default()),
            Span::styled(format!("{:<5}", arrival.badge()), badge_style),
            Span::styled(format!("{:>7}", countdown.to_string()), countdown_style),
        ]))
    }
}

impl Component for ArrivalsBoard {
    fn handle_key(&mut self, key: KeyEvent, state: &BoardState) -> Vec<Action> {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => vec![Action::SelectDown],
            KeyCode::Char('k') | KeyCode::Up => vec![Action::SelectUp],
            KeyCode::Char('m') => vec![Action::Board(BoardCommand::ShowMore)],
            KeyCode::Enter => match self.selected_row(state) {
                Some(row) => vec![Action::Board(BoardCommand::ToggleLine(row.line_id.clone()))],
                None => vec![],
            },
            _ => vec![],
        }
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &BoardState) {
        self.clamp(state);
        let block = pane_chrome("arrivals", focused, None);
        let inner_width = area.width.saturating_sub(2) as usize;

        if state.displayed().is_empty() {
            let text = if state.loading {
                "loading arrivals…"
            } else {
                "no upcoming arrivals"
            };
            frame.render_widget(
                Paragraph::new(Span::styled(text, style_muted())).block(block),
                area,
            );
            return;
        }

        let mut items: Vec<ListItem> = state
            .displayed()
            .iter()
            .map(|a| self.row(a, inner_width))
            .collect();
        if state.has_more() {
            let remaining = state.arrivals.len() - state.displayed().len();
            items.push(ListItem::new(Span::styled(
                format!("  m  show more ({} more)", remaining),
                style_muted(),
            )));
        }

        let list = List::new(items)
            .block(block)
            .highlight_style(style_selected());
        frame.render_stateful_widget(list, area, &mut self.list_state);
    }
}

/// Truncate or pad `text` to exactly `width` terminal columns.
fn fit(text: &str, width: usize) -> String {
    if text.width() <= width {
        return format!("{}{}", text, " ".repeat(width - text.width()));
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    used += 1;
    out.push_str(&" ".repeat(width.saturating_sub(used)));
    out
}
