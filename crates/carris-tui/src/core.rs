//! BoardCore: single owner of all mutable board state.
//!
//! Lives inside the TUI event loop. Fetch loops, the insight request and the
//! HTTP API never touch state: they send [`PollEvent`]s or [`BoardCommand`]s
//! and the loop hands them to [`BoardCore::handle_poll`] /
//! [`BoardCore::handle_command`]. Every poll result passes the scheduler's
//! generation check first, so a late answer for a previous stop or line is
//! dropped here and never reaches the screen.

use std::sync::Arc;

use carris_proto::arrivals::summary_rows;
use carris_proto::client::TransitSource;
use carris_proto::config::Config;
use carris_proto::insight::InsightClient;
use carris_proto::model::GeoPoint;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::app_state::{BoardSnapshot, BoardState, BoardView, OverlayView};
use crate::overlay::{MapOverlayController, MapSurface, SurfaceError, Toggle, Viewpoint};
use crate::scheduler::{Cadence, PollEvent, PollingScheduler, Ticket};

// ── BoardCommand ──────────────────────────────────────────────────────────────

/// User intents, from the keyboard or the HTTP API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardCommand {
    SelectStop(String),
    /// Fetch arrivals for the current stop now.
    Refresh,
    /// Open the overlay for a line, or close it if already open.
    ToggleLine(String),
    CloseOverlay,
    ShowMore,
}

// ── BoardCore ─────────────────────────────────────────────────────────────────

pub struct BoardCore<S: TransitSource, M: MapSurface> {
    scheduler: PollingScheduler<S>,
    overlay: MapOverlayController<M>,
    state: BoardState,
    insight: Option<Arc<InsightClient>>,
    /// Number of the last briefing requested.
    insight_requests: u64,
}

impl<S: TransitSource, M: MapSurface> BoardCore<S, M> {
    pub fn new(
        source: Arc<S>,
        config: &Config,
        insight: Option<InsightClient>,
        events: mpsc::Sender<PollEvent>,
    ) -> Self {
        let home = Viewpoint {
            center: GeoPoint::new(config.map.center_lat, config.map.center_lon)
                .unwrap_or(GeoPoint {
                    lat: 38.7223,
                    lon: -9.1393,
                }),
            zoom: config.map.zoom,
        };
        Self {
            scheduler: PollingScheduler::new(source, Cadence::from(&config.polling), events),
            overlay: MapOverlayController::new(home, config.map.fit_padding),
            state: BoardState::new(&config.board.default_stop_id, config.board.page_size),
            insight: insight.map(Arc::new),
            insight_requests: 0,
        }
    }

    /// Start polling `stop_id`.
    pub fn start(&mut self, stop_id: &str) {
        self.state.switch_stop(stop_id);
        self.scheduler.select_stop(stop_id);
    }

    pub fn state(&self) -> &BoardState {
        &self.state
    }

    pub fn overlay(&self) -> &MapOverlayController<M> {
        &self.overlay
    }

    pub fn surface_mut(&mut self) -> Option<&mut M> {
        self.overlay.surface_mut()
    }

    pub fn handle_command(&mut self, cmd: BoardCommand) {
        match cmd {
            BoardCommand::SelectStop(stop_id) => {
                let stop_id = stop_id.trim();
                if stop_id.is_empty() || self.scheduler.current_stop() == Some(stop_id) {
                    return;
                }
                info!("[arrivals] switching to stop {}", stop_id);
                self.start(stop_id);
            }
            BoardCommand::Refresh => {
                let stop_id = self.state.stop_id.clone();
                self.state.loading = true;
                self.scheduler.select_stop(&stop_id);
            }
            BoardCommand::ToggleLine(line_id) => match self.overlay.toggle_line(&line_id) {
                Toggle::Selected(line) => {
                    self.state.vehicles.clear();
                    self.scheduler.select_line(&line);
                }
                Toggle::Closed(_) => self.stop_vehicles(),
            },
            BoardCommand::CloseOverlay => {
                if self.overlay.close().is_some() {
                    self.stop_vehicles();
                }
            }
            BoardCommand::ShowMore => self.state.show_more(),
        }
    }

    fn stop_vehicles(&mut self) {
        self.scheduler.clear_line();
        self.state.vehicles.clear();
    }

    /// Returns `true` when the event changed what is shown.
    pub fn handle_poll(&mut self, event: PollEvent) -> bool {
        let Some(event) = self.scheduler.admit(event) else {
            return false;
        };
        match event {
            PollEvent::Arrivals { ticket, result } => match result {
                Ok(board) => {
                    info!(
                        "[arrivals] stop {}: {} upcoming",
                        ticket.selection,
                        board.arrivals.len()
                    );
                    self.state.stop = Some(board.stop);
                    self.state.arrivals = board.arrivals;
                    self.state.last_updated = Some(board.fetched_at);
                    self.state.loading = false;
                    self.state.last_error = None;
                    self.request_insight(ticket);
                }
                Err(e) => {
                    warn!("[arrivals] stop {} fetch failed: {}", ticket.selection, e);
                    self.state.loading = false;
                    self.state.last_error = Some(e.to_string());
                }
            },
            PollEvent::Vehicles { ticket, result } => match result {
                Ok(vehicles) => {
                    self.state.vehicles = vehicles.clone();
                    self.overlay.apply_snapshot(&ticket.selection, vehicles);
                }
                Err(e) => {
                    warn!("[vehicles] line {} fetch failed: {}", ticket.selection, e);
                }
            },
            PollEvent::Insight {
                request, insight, ..
            } => {
                if request != self.insight_requests {
                    debug!("[insight] briefing {} superseded", request);
                    return false;
                }
                self.state.insight = Some(insight);
            }
        }
        true
    }

    /// Map pane mounted (or could not be).
    pub fn attach_surface(&mut self, result: Result<M, SurfaceError>) {
        self.overlay.surface_ready(result);
    }

    /// Ask for a briefing in the background; the arrivals stay on screen
    /// whatever happens to it.
    fn request_insight(&mut self, ticket: Ticket) {
        let Some(client) = self.insight.clone() else {
            return;
        };
        self.insight_requests += 1;
        let request = self.insight_requests;
        let stop_name = self.state.title();
        let rows = summary_rows(&self.state.arrivals).to_vec();
        let tx = self.scheduler.sender();
        tokio::spawn(async move {
            let insight = client.briefing(&stop_name, &rows).await;
            let _ = tx
                .send(PollEvent::Insight {
                    ticket,
                    request,
                    insight,
                })
                .await;
        });
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        let state = &self.state;
        BoardSnapshot {
            board: BoardView {
                stop_id: state.stop_id.clone(),
                stop: state.stop.clone(),
                subtitle: state.subtitle().to_string(),
                arrivals: state.arrivals.clone(),
                insight: state.insight.clone(),
                last_updated: state.last_updated,
                loading: state.loading,
                last_error: state.last_error.clone(),
            },
            overlay: OverlayView {
                line_id: self.overlay.selected_line().map(str::to_string),
                phase: self.overlay.phase(),
                indicator: self.overlay.indicator(),
                vehicles_shown: self.overlay.marker_count(),
                vehicles: state.vehicles.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::tests::{vehicle, RecordingSurface};
    use crate::overlay::{OverlayIndicator, OverlayPhase};
    use crate::scheduler::tests::FakeSource;
    use carris_proto::model::{Insight, RawArrival};
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    type Core = BoardCore<FakeSource, RecordingSurface>;

    fn core(source: Arc<FakeSource>) -> (Core, mpsc::Receiver<PollEvent>) {
        let (tx, rx) = mpsc::channel(64);
        let core = BoardCore::new(source, &Config::default(), None, tx);
        (core, rx)
    }

    fn raw(line: &str, estimated: &str) -> RawArrival {
        RawArrival {
            line_id: line.to_string(),
            headsign: "Cacém".to_string(),
            scheduled_arrival: None,
            estimated_arrival: Some(estimated.to_string()),
            stop_id: String::new(),
            trip_id: String::new(),
        }
    }

    /// Feed events into the core until `n` have been received.
    async fn pump(core: &mut Core, rx: &mut mpsc::Receiver<PollEvent>, n: usize) {
        for _ in 0..n {
            let event = rx.recv().await.unwrap();
            core.handle_poll(event);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_then_deselect_line_leaves_no_markers_or_fetches() {
        let source = Arc::new(FakeSource::default().with_vehicles(
            "743",
            vec![
                vehicle("a", "743", Some(38.70), Some(-9.30)),
                vehicle("b", "743", Some(38.75), Some(-9.20)),
            ],
        ));
        let (mut core, mut rx) = core(Arc::clone(&source));

        core.handle_command(BoardCommand::ToggleLine("743".to_string()));
        core.attach_surface(Ok(RecordingSurface::default()));
        pump(&mut core, &mut rx, 1).await;
        assert_eq!(core.overlay().marker_count(), 2);
        assert_eq!(core.overlay().phase(), OverlayPhase::Active);

        core.handle_command(BoardCommand::ToggleLine("743".to_string()));
        assert_eq!(core.overlay().marker_count(), 0);
        assert_eq!(core.overlay().surface().unwrap().markers.len(), 0);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(source.vehicle_calls.load(Ordering::SeqCst), 1);
        assert!(rx.try_recv().is_err());
        assert_eq!(core.snapshot().overlay.line_id, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_stop_never_overwrites_new_stop() {
        let source = Arc::new(
            FakeSource::default()
                .with_delay("A", Duration::from_secs(5))
                .with_arrivals("A", vec![raw("1523", "23:59:00")])
                .with_arrivals("B", vec![raw("2720", "23:59:00"), raw("3701", "23:59:00")]),
        );
        let (mut core, mut rx) = core(source);

        core.start("A");
        tokio::time::sleep(Duration::from_secs(1)).await;
        core.handle_command(BoardCommand::SelectStop("B".to_string()));
        pump(&mut core, &mut rx, 2).await;

        let state = core.state();
        assert_eq!(state.stop_id, "B");
        assert_eq!(state.stop.as_ref().map(|s| s.id.as_str()), Some("B"));
        assert!(state.arrivals.iter().all(|a| a.line_id != "1523"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_tick_keeps_previous_arrivals() {
        let source = Arc::new(
            FakeSource::default().with_arrivals("A", vec![raw("1523", "23:59:00")]),
        );
        let (mut core, mut rx) = core(Arc::clone(&source));

        core.start("A");
        pump(&mut core, &mut rx, 1).await;
        let before = core.state().arrivals.clone();
        let stop_before = core.state().stop.clone();

        source.fail_arrivals.store(1, Ordering::SeqCst);
        pump(&mut core, &mut rx, 1).await;
        let state = core.state();
        assert_eq!(state.arrivals, before);
        assert_eq!(state.stop, stop_before);
        assert!(state.last_error.is_some());
        assert!(!state.loading);

        pump(&mut core, &mut rx, 1).await;
        assert!(core.state().last_error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_vehicle_tick_keeps_markers() {
        let source = Arc::new(FakeSource::default().with_vehicles(
            "1523",
            vec![
                vehicle("a", "1523", Some(38.70), Some(-9.30)),
                vehicle("b", "1523", Some(38.75), Some(-9.20)),
            ],
        ));
        let (mut core, mut rx) = core(Arc::clone(&source));

        core.handle_command(BoardCommand::ToggleLine("1523".to_string()));
        core.attach_surface(Ok(RecordingSurface::default()));
        pump(&mut core, &mut rx, 1).await;
        assert_eq!(core.overlay().surface().unwrap().fits.len(), 1);

        source.fail_vehicles.store(1, Ordering::SeqCst);
        pump(&mut core, &mut rx, 1).await;
        assert_eq!(source.vehicle_calls.load(Ordering::SeqCst), 2);
        assert_eq!(core.overlay().marker_count(), 2);
        assert_eq!(core.overlay().surface().unwrap().markers.len(), 2);
        assert_eq!(core.overlay().surface().unwrap().fits.len(), 1);
        assert_eq!(core.overlay().phase(), OverlayPhase::Active);
        assert_eq!(core.overlay().indicator(), OverlayIndicator::None);
        assert_eq!(core.state().vehicles.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_older_briefing_never_replaces_newer() {
        let source = Arc::new(FakeSource::default());
        let (mut core, mut rx) = core(source);
        core.start("A");
        pump(&mut core, &mut rx, 1).await;

        let ticket = core.scheduler.arrivals_ticket().unwrap();
        let briefing = |request: u64, summary: &str| PollEvent::Insight {
            ticket: ticket.clone(),
            request,
            insight: Insight {
                summary: summary.to_string(),
                recommendation: String::new(),
            },
        };
        core.insight_requests = 2;

        assert!(core.handle_poll(briefing(2, "second")));
        assert!(!core.handle_poll(briefing(1, "first")));
        assert_eq!(
            core.state().insight.as_ref().map(|i| i.summary.as_str()),
            Some("second")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_before_map_mount_is_rendered_on_mount() {
        let source = Arc::new(FakeSource::default().with_vehicles(
            "1523",
            vec![vehicle("a", "1523", Some(38.7), Some(-9.1))],
        ));
        let (mut core, mut rx) = core(source);

        core.handle_command(BoardCommand::ToggleLine("1523".to_string()));
        pump(&mut core, &mut rx, 1).await;
        assert_eq!(core.overlay().phase(), OverlayPhase::Initializing);
        assert_eq!(core.state().vehicles.len(), 1);

        core.attach_surface(Ok(RecordingSurface::default()));
        assert_eq!(core.overlay().phase(), OverlayPhase::Active);
        assert_eq!(core.snapshot().overlay.vehicles_shown, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_stop_selection_is_a_no_op() {
        let source = Arc::new(FakeSource::default());
        let (mut core, mut rx) = core(Arc::clone(&source));

        core.start("A");
        pump(&mut core, &mut rx, 1).await;
        core.handle_command(BoardCommand::SelectStop(" A ".to_string()));
        assert!(!core.state().loading);
        assert_eq!(source.stop_calls.load(Ordering::SeqCst), 1);

        core.handle_command(BoardCommand::Refresh);
        pump(&mut core, &mut rx, 1).await;
        assert_eq!(source.stop_calls.load(Ordering::SeqCst), 2);
    }
}
