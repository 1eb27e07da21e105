//! Action enum: everything a key press can ask for.

use crate::core::BoardCommand;

/// Components produce Actions; the App dispatches them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Forwarded to [`crate::core::BoardCore`].
    Board(BoardCommand),
    SelectUp,
    SelectDown,
    OpenStopInput,
    Quit,
}
