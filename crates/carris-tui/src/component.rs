//! Component trait: panels that react to keys and render themselves.
//!
//! Components read `BoardState` but never mutate it; they return `Action`s
//! and the App event loop dispatches those.

use ratatui::crossterm::event::KeyEvent;
use ratatui::{layout::Rect, Frame};

use crate::action::Action;
use crate::app_state::BoardState;

pub trait Component {
    /// Only called while this component has focus.
    fn handle_key(&mut self, key: KeyEvent, state: &BoardState) -> Vec<Action>;

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &BoardState);
}
