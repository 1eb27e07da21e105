//! App: terminal event loop around [`BoardCore`].
//!
//! Architecture:
//! - `App` owns the core (board state, scheduler, map overlay) and the UI
//!   components.
//! - A blocking task forwards terminal events into an mpsc channel; fetch
//!   results and HTTP commands arrive on their own channels.
//! - The loop draws a frame, mounts the map surface if the overlay asks for
//!   one, publishes a snapshot for the HTTP API, then awaits the next message.

use std::io;
use std::time::Duration;

use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, info};

use carris_proto::client::CarrisClient;

use crate::{
    action::Action,
    app_state::SnapshotStore,
    component::Component,
    components::{arrivals_board::ArrivalsBoard, header, insight_panel, map_panel},
    core::{BoardCommand, BoardCore},
    scheduler::PollEvent,
    surface::CanvasSurface,
    widgets::{
        status_bar::{self, FetchHealth, InputMode},
        stop_input::{StopInput, StopInputAction},
    },
};

pub type Core = BoardCore<CarrisClient, CanvasSurface>;

/// Redraw cadence while nothing else happens (keeps the clock honest).
const IDLE_REDRAW: Duration = Duration::from_secs(1);
const INSIGHT_HEIGHT: u16 = 5;

pub struct App {
    core: Core,
    board: ArrivalsBoard,
    stop_input: StopInput,
    snapshots: SnapshotStore,
    show_insight: bool,
    /// Where the map pane was last drawn.
    map_area: Rect,
    should_quit: bool,
}

impl App {
    pub fn new(core: Core, snapshots: SnapshotStore, show_insight: bool) -> Self {
        Self {
            core,
            board: ArrivalsBoard::new(),
            stop_input: StopInput::default(),
            snapshots,
            show_insight,
            map_area: Rect::default(),
            should_quit: false,
        }
    }

    // ── Main run loop ─────────────────────────────────────────────────────────

    pub async fn run(
        mut self,
        poll_rx: mpsc::Receiver<PollEvent>,
        remote_rx: mpsc::Receiver<BoardCommand>,
    ) -> anyhow::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        debug!("run(): terminal created, size={:?}", terminal.size());

        let result = self.event_loop(&mut terminal, poll_rx, remote_rx).await;

        // ── Teardown ──────────────────────────────────────────────────────────
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;
        result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        mut poll_rx: mpsc::Receiver<PollEvent>,
        mut remote_rx: mpsc::Receiver<BoardCommand>,
    ) -> anyhow::Result<()> {
        // ── Background task: keyboard events ──────────────────────────────────
        let (key_tx, mut key_rx) = mpsc::channel::<Event>(256);
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if key_tx.blocking_send(ev).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        let mut idle = tokio::time::interval(IDLE_REDRAW);
        idle.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| self.draw(f))?;
                if self.mount_surface() {
                    terminal.draw(|f| self.draw(f))?;
                }
                self.snapshots.publish(self.core.snapshot()).await;
            }

            if self.should_quit {
                info!("quit requested");
                break;
            }

            needs_redraw = tokio::select! {
                Some(ev) = key_rx.recv() => self.handle_event(ev),
                Some(evt) = poll_rx.recv() => self.core.handle_poll(evt),
                Some(cmd) = remote_rx.recv() => {
                    debug!("remote command {:?}", cmd);
                    self.dispatch(Action::Board(cmd));
                    true
                }
                _ = idle.tick() => true,
            };
        }
        Ok(())
    }

    /// Create the map surface once its pane has been laid out, or keep an
    /// existing one in step with the pane size. Returns `true` when a redraw
    /// is needed.
    fn mount_surface(&mut self) -> bool {
        let inner = map_panel::inner_area(self.map_area);
        if let Some(surface) = self.core.surface_mut() {
            return surface.resize(inner);
        }
        if !self.core.overlay().wants_surface() {
            return false;
        }
        if inner.width == 0 || inner.height == 0 {
            return false;
        }
        self.core.attach_surface(CanvasSurface::mount(inner));
        true
    }

    // ── Input ─────────────────────────────────────────────────────────────────

    fn handle_event(&mut self, ev: Event) -> bool {
        match ev {
            Event::Key(key) if key.kind != KeyEventKind::Release => {
                self.handle_key(key);
                true
            }
            Event::Resize(_, _) => true,
            _ => false,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if self.stop_input.is_active() {
            if let StopInputAction::Submitted(stop_id) = self.stop_input.handle_key(key) {
                self.dispatch(Action::Board(BoardCommand::SelectStop(stop_id)));
            }
            return;
        }

        let ctrl_c = key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c');
        let actions = match key.code {
            _ if ctrl_c => vec![Action::Quit],
            KeyCode::Char('q') => vec![Action::Quit],
            KeyCode::Char('/') => vec![Action::OpenStopInput],
            KeyCode::Char('r') => vec![Action::Board(BoardCommand::Refresh)],
            KeyCode::Esc => vec![Action::Board(BoardCommand::CloseOverlay)],
            _ => self.board.handle_key(key, self.core.state()),
        };
        for action in actions {
            self.dispatch(action);
        }
    }

    fn dispatch(&mut self, action: Action) {
        match action {
            Action::Board(cmd) => self.core.handle_command(cmd),
            Action::SelectUp => self.board.select_up(),
            Action::SelectDown => self.board.select_down(self.core.state()),
            Action::OpenStopInput => self.stop_input.activate(&self.core.state().stop_id),
            Action::Quit => self.should_quit = true,
        }
    }

    // ── Rendering ─────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut Frame) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Min(6),
                Constraint::Length(if self.stop_input.is_active() { 1 } else { 0 }),
                Constraint::Length(1),
            ])
            .split(frame.area());

        let state = self.core.state();
        header::draw(frame, rows[0], state);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(rows[1]);

        let left = if self.show_insight {
            Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(4), Constraint::Length(INSIGHT_HEIGHT)])
                .split(body[0])
        } else {
            Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(4)])
                .split(body[0])
        };

        self.board.mapped_line = self.core.overlay().selected_line().map(str::to_string);
        let board_focused = !self.stop_input.is_active();
        self.board.draw(frame, left[0], board_focused, state);
        if self.show_insight && left.len() > 1 {
            insight_panel::draw(frame, left[1], state);
        }

        self.map_area = body[1];
        map_panel::draw(frame, body[1], self.core.overlay());

        let mode = if self.stop_input.is_active() {
            self.stop_input.draw(frame, rows[2]);
            InputMode::StopEntry
        } else {
            InputMode::Normal
        };
        let health = match (&state.last_error, state.loading) {
            (_, true) => FetchHealth::Loading,
            (Some(message), false) => FetchHealth::Failed(message.as_str()),
            (None, false) => FetchHealth::Ok,
        };
        status_bar::draw_keys_bar(frame, rows[3], mode, health);
    }
}
