pub mod arrivals_board;
pub mod header;
pub mod insight_panel;
pub mod map_panel;
