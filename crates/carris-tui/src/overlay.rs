//! MapOverlayController: vehicle markers for the selected line.
//!
//! Owns the surface handle, the markers currently on it and the line selection.
//! The surface is created lazily (the first time a line is selected and the map
//! pane has a real size) and is kept for later selections; closing only clears
//! markers.
//!
//! ```text
//! Idle ──toggle_line──▶ Initializing ──surface ready + snapshot──▶ Active
//!   ▲                        │                                      │
//!   └──────── close ─────────┴──────────── close / toggle ──────────┘
//!                            └── surface error ──▶ Failed
//! ```

use carris_proto::arrivals::line_color;
use carris_proto::model::{Bounds, GeoPoint, LineColor, Vehicle};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    #[error("map pane is too small ({width}x{height})")]
    TooSmall { width: u16, height: u16 },
}

pub type MarkerId = u64;

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub position: GeoPoint,
    pub label: String,
    pub color: LineColor,
}

/// Initial view of a freshly (re)used surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewpoint {
    pub center: GeoPoint,
    pub zoom: u8,
}

/// Map rendering primitives the controller drives.
pub trait MapSurface {
    fn set_view(&mut self, view: Viewpoint);
    fn add_marker(&mut self, marker: Marker) -> MarkerId;
    fn remove_marker(&mut self, id: MarkerId);
    /// Show `bounds`, grown by `padding` (fraction of the span per side).
    fn fit_bounds(&mut self, bounds: Bounds, padding: f64);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayPhase {
    Idle,
    Initializing,
    Active,
    Failed,
}

/// Status line shown next to the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayIndicator {
    None,
    Loading,
    NoVehicles,
    SurfaceUnavailable,
}

impl OverlayIndicator {
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Loading => Some("loading vehicles…"),
            Self::NoVehicles => Some("no vehicles in service"),
            Self::SurfaceUnavailable => Some("surface unavailable"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineSelection {
    pub line_id: String,
    pub color: LineColor,
}

/// What the caller must do with the vehicle loop after a toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toggle {
    /// Start (or restart) polling this line.
    Selected(String),
    /// Stop polling; the overlay is back to Idle.
    Closed(String),
}

pub struct MapOverlayController<S: MapSurface> {
    home: Viewpoint,
    fit_padding: f64,
    surface: Option<S>,
    markers: Vec<MarkerId>,
    selection: Option<LineSelection>,
    phase: OverlayPhase,
    indicator: OverlayIndicator,
    /// Snapshot that arrived before the surface existed.
    pending: Option<Vec<Vehicle>>,
}

impl<S: MapSurface> MapOverlayController<S> {
    pub fn new(home: Viewpoint, fit_padding: f64) -> Self {
        Self {
            home,
            fit_padding,
            surface: None,
            markers: Vec::new(),
            selection: None,
            phase: OverlayPhase::Idle,
            indicator: OverlayIndicator::None,
            pending: None,
        }
    }

    pub fn phase(&self) -> OverlayPhase {
        self.phase
    }

    pub fn indicator(&self) -> OverlayIndicator {
        self.indicator
    }

    pub fn selection(&self) -> Option<&LineSelection> {
        self.selection.as_ref()
    }

    pub fn selected_line(&self) -> Option<&str> {
        self.selection.as_ref().map(|s| s.line_id.as_str())
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    /// For pane bookkeeping (resizes); markers stay under the controller.
    pub fn surface_mut(&mut self) -> Option<&mut S> {
        self.surface.as_mut()
    }

    /// True while a line is selected and nothing has mounted a surface yet.
    pub fn wants_surface(&self) -> bool {
        self.phase == OverlayPhase::Initializing && self.surface.is_none()
    }

    // ── Transitions ───────────────────────────────────────────────────────────

    /// Select `line_id`, or close the overlay if it is already selected.
    /// Markers of a previous line are removed before this returns.
    pub fn toggle_line(&mut self, line_id: &str) -> Toggle {
        if self.selected_line() == Some(line_id) {
            self.close();
            return Toggle::Closed(line_id.to_string());
        }

        self.clear_markers();
        self.pending = None;
        self.selection = Some(LineSelection {
            line_id: line_id.to_string(),
            color: line_color(line_id),
        });
        self.phase = OverlayPhase::Initializing;
        self.indicator = OverlayIndicator::Loading;
        if let Some(surface) = self.surface.as_mut() {
            surface.set_view(self.home);
        }
        info!("[overlay] line {} selected", line_id);
        Toggle::Selected(line_id.to_string())
    }

    /// The map pane was mounted (or failed to). Ignored unless a selection is
    /// waiting for a surface.
    pub fn surface_ready(&mut self, result: Result<S, SurfaceError>) {
        if !self.wants_surface() {
            debug!("[overlay] surface event ignored in {:?}", self.phase);
            return;
        }
        match result {
            Ok(mut surface) => {
                surface.set_view(self.home);
                self.surface = Some(surface);
                info!("[overlay] surface ready");
                if let Some(vehicles) = self.pending.take() {
                    self.render(&vehicles);
                }
            }
            Err(e) => {
                error!("[overlay] could not create map surface: {}", e);
                self.phase = OverlayPhase::Failed;
                self.indicator = OverlayIndicator::SurfaceUnavailable;
            }
        }
    }

    /// A completed vehicle fetch for `line_id`.
    pub fn apply_snapshot(&mut self, line_id: &str, vehicles: Vec<Vehicle>) {
        if self.selected_line() != Some(line_id) {
            debug!("[overlay] snapshot for unselected line {} dropped", line_id);
            return;
        }
        match self.phase {
            OverlayPhase::Idle | OverlayPhase::Failed => {}
            OverlayPhase::Initializing if self.surface.is_none() => {
                self.pending = Some(vehicles);
            }
            OverlayPhase::Initializing | OverlayPhase::Active => self.render(&vehicles),
        }
    }

    /// Back to Idle. The surface stays around for the next selection.
    pub fn close(&mut self) -> Option<String> {
        self.clear_markers();
        self.pending = None;
        self.phase = OverlayPhase::Idle;
        self.indicator = OverlayIndicator::None;
        let closed = self.selection.take().map(|s| s.line_id);
        if let Some(line) = &closed {
            info!("[overlay] line {} closed", line);
        }
        closed
    }

    // ── Rendering ─────────────────────────────────────────────────────────────

    fn clear_markers(&mut self) {
        let ids = std::mem::take(&mut self.markers);
        if let Some(surface) = self.surface.as_mut() {
            for id in ids {
                surface.remove_marker(id);
            }
        }
    }

    fn render(&mut self, vehicles: &[Vehicle]) {
        self.clear_markers();
        let (Some(selection), Some(surface)) = (self.selection.as_ref(), self.surface.as_mut())
        else {
            return;
        };

        let mut points = Vec::with_capacity(vehicles.len());
        for vehicle in vehicles {
            let Some(position) = vehicle.position() else {
                continue;
            };
            let id = surface.add_marker(Marker {
                position,
                label: selection.line_id.clone(),
                color: selection.color,
            });
            self.markers.push(id);
            points.push(position);
        }

        match Bounds::covering(points) {
            Some(bounds) => {
                surface.fit_bounds(bounds, self.fit_padding);
                self.indicator = OverlayIndicator::None;
            }
            None => self.indicator = OverlayIndicator::NoVehicles,
        }
        self.phase = OverlayPhase::Active;
        debug!(
            "[overlay] line {}: {} of {} vehicles placed",
            selection.line_id,
            self.markers.len(),
            vehicles.len()
        );
    }
}
