//! BoardState: what the board currently shows.
//!
//! Written only by the event loop ([`crate::core::BoardCore`]); the renderer
//! reads it and the HTTP API reads a published [`BoardSnapshot`] copy.

use std::sync::Arc;

use carris_proto::model::{Insight, ProcessedArrival, Stop, Vehicle};
use chrono::{DateTime, Local};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::overlay::{OverlayIndicator, OverlayPhase};

#[derive(Debug, Clone)]
pub struct BoardState {
    pub stop_id: String,
    pub stop: Option<Stop>,
    pub arrivals: Vec<ProcessedArrival>,
    pub last_updated: Option<DateTime<Local>>,
    pub loading: bool,
    /// Message of the last failed fetch; cleared by the next success.
    pub last_error: Option<String>,
    pub insight: Option<Insight>,
    /// Latest vehicle snapshot for the selected line.
    pub vehicles: Vec<Vehicle>,
    page_size: usize,
    visible: usize,
}

impl BoardState {
    pub fn new(stop_id: &str, page_size: usize) -> Self {
        let page_size = page_size.max(1);
        Self {
            stop_id: stop_id.to_string(),
            stop: None,
            arrivals: Vec::new(),
            last_updated: None,
            loading: true,
            last_error: None,
            insight: None,
            vehicles: Vec::new(),
            page_size,
            visible: page_size,
        }
    }

    /// Forget everything about the previous stop.
    pub fn switch_stop(&mut self, stop_id: &str) {
        *self = Self::new(stop_id, self.page_size);
    }

    pub fn title(&self) -> String {
        match &self.stop {
            Some(stop) => stop.name.clone(),
            None if self.loading => "Loading…".to_string(),
            None => format!("Stop {}", self.stop_id),
        }
    }

    pub fn subtitle(&self) -> &str {
        self.stop
            .as_ref()
            .map_or(carris_proto::model::NETWORK_NAME, Stop::subtitle)
    }

    /// Rows currently paged in.
    pub fn displayed(&self) -> &[ProcessedArrival] {
        &self.arrivals[..self.visible.min(self.arrivals.len())]
    }

    pub fn has_more(&self) -> bool {
        self.arrivals.len() > self.visible
    }

    pub fn show_more(&mut self) {
        if self.has_more() {
            self.visible += self.page_size;
        }
    }
}

// ── Published snapshot ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize)]
pub struct BoardSnapshot {
    pub board: BoardView,
    pub overlay: OverlayView,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BoardView {
    pub stop_id: String,
    pub stop: Option<Stop>,
    pub subtitle: String,
    pub arrivals: Vec<ProcessedArrival>,
    pub insight: Option<Insight>,
    pub last_updated: Option<DateTime<Local>>,
    pub loading: bool,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverlayView {
    pub line_id: Option<String>,
    pub phase: OverlayPhase,
    pub indicator: OverlayIndicator,
    pub vehicles_shown: usize,
    pub vehicles: Vec<Vehicle>,
}

impl Default for OverlayView {
    fn default() -> Self {
        Self {
            line_id: None,
            phase: OverlayPhase::Idle,
            indicator: OverlayIndicator::None,
            vehicles_shown: 0,
            vehicles: Vec::new(),
        }
    }
}

/// Latest snapshot, shared with the HTTP API.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    inner: Arc<RwLock<BoardSnapshot>>,
}

impl SnapshotStore {
    pub async fn get(&self) -> BoardSnapshot {
        self.inner.read().await.clone()
    }

    pub async fn publish(&self, snapshot: BoardSnapshot) {
        *self.inner.write().await = snapshot;
    }
}
