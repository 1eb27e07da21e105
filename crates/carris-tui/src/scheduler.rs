//! PollingScheduler: the two repeating fetch loops.
//!
//! * arrivals loop: stop metadata + realtime arrivals, immediately on stop
//!   change and then every `arrivals_every`.
//! * vehicle loop: only while a line is selected; first fetch after
//!   `vehicles_delay`, then every `vehicles_every`.
//!
//! Each loop runs as its own tokio task and only *sends* results; it never
//! touches board state. Every result carries a [`Ticket`] (selection +
//! generation) stamped at dispatch time. Restarting a loop bumps its
//! generation and cancels the old task's timer, but a fetch already in flight
//! is allowed to finish: its result arrives with an old ticket and
//! [`PollingScheduler::admit`] drops it.

use std::sync::Arc;
use std::time::Duration;

use carris_proto::arrivals::process;
use carris_proto::client::TransitSource;
use carris_proto::config::PollingConfig;
use carris_proto::error::FetchError;
use carris_proto::model::{Insight, ProcessedArrival, Stop, Vehicle};
use chrono::{DateTime, Local};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    pub arrivals_every: Duration,
    pub vehicles_every: Duration,
    pub vehicles_delay: Duration,
}

impl From<&PollingConfig> for Cadence {
    fn from(cfg: &PollingConfig) -> Self {
        Self {
            arrivals_every: Duration::from_secs(cfg.arrivals_interval_secs.max(1)),
            vehicles_every: Duration::from_secs(cfg.vehicles_interval_secs.max(1)),
            vehicles_delay: Duration::from_millis(cfg.vehicles_start_delay_ms),
        }
    }
}

impl Default for Cadence {
    fn default() -> Self {
        Self::from(&PollingConfig::default())
    }
}

/// Selection a fetch was dispatched for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub generation: u64,
    pub selection: String,
}

/// One completed arrivals tick.
#[derive(Debug, Clone)]
pub struct StopBoard {
    pub stop: Stop,
    pub arrivals: Vec<ProcessedArrival>,
    pub fetched_at: DateTime<Local>,
}

#[derive(Debug)]
pub enum PollEvent {
    Arrivals {
        ticket: Ticket,
        result: Result<StopBoard, FetchError>,
    },
    Vehicles {
        ticket: Ticket,
        result: Result<Vec<Vehicle>, FetchError>,
    },
    /// AI briefing requested after an arrivals batch; tagged like that batch.
    /// `request` numbers briefings so only the newest one is applied.
    Insight {
        ticket: Ticket,
        request: u64,
        insight: Insight,
    },
}

impl PollEvent {
    pub fn ticket(&self) -> &Ticket {
        match self {
            Self::Arrivals { ticket, .. }
            | Self::Vehicles { ticket, .. }
            | Self::Insight { ticket, .. } => ticket,
        }
    }
}

#[derive(Debug, Default)]
struct LoopSlot {
    generation: u64,
    selection: Option<String>,
    cancel: Option<CancellationToken>,
}

impl LoopSlot {
    /// Stop whatever runs now and move to `selection` under a fresh generation.
    fn restart(&mut self, selection: Option<String>) -> Option<(Ticket, CancellationToken)> {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
        self.generation += 1;
        self.selection = selection;

        let selection = self.selection.clone()?;
        let token = CancellationToken::new();
        self.cancel = Some(token.clone());
        Some((
            Ticket {
                generation: self.generation,
                selection,
            },
            token,
        ))
    }

    fn is_current(&self, ticket: &Ticket) -> bool {
        self.generation == ticket.generation
            && self.selection.as_deref() == Some(ticket.selection.as_str())
    }

    #[cfg(test)]
    fn current_ticket(&self) -> Option<Ticket> {
        self.selection.clone().map(|selection| Ticket {
            generation: self.generation,
            selection,
        })
    }
}

pub struct PollingScheduler<S: TransitSource> {
    source: Arc<S>,
    events: mpsc::Sender<PollEvent>,
    cadence: Cadence,
    arrivals: LoopSlot,
    vehicles: LoopSlot,
}

impl<S: TransitSource> PollingScheduler<S> {
    pub fn new(source: Arc<S>, cadence: Cadence, events: mpsc::Sender<PollEvent>) -> Self {
        Self {
            source,
            events,
            cadence,
            arrivals: LoopSlot::default(),
            vehicles: LoopSlot::default(),
        }
    }

    /// Sender for results produced outside the loops (the AI briefing).
    pub fn sender(&self) -> mpsc::Sender<PollEvent> {
        self.events.clone()
    }

    pub fn current_stop(&self) -> Option<&str> {
        self.arrivals.selection.as_deref()
    }

    #[cfg(test)]
    pub fn current_line(&self) -> Option<&str> {
        self.vehicles.selection.as_deref()
    }

    #[cfg(test)]
    pub fn arrivals_ticket(&self) -> Option<Ticket> {
        self.arrivals.current_ticket()
    }

    /// Replace the arrivals loop with one for `stop_id`. Calling it again with
    /// the same id restarts the loop, which doubles as "refresh now".
    pub fn select_stop(&mut self, stop_id: &str) {
        let Some((ticket, cancel)) = self.arrivals.restart(Some(stop_id.to_string())) else {
            return;
        };
        info!(
            "[arrivals] polling stop {} every {:?} (gen {})",
            ticket.selection, self.cadence.arrivals_every, ticket.generation
        );
        tokio::spawn(arrivals_loop(
            Arc::clone(&self.source),
            ticket,
            self.cadence.arrivals_every,
            cancel,
            self.events.clone(),
        ));
    }

    /// Replace the vehicle loop with one for `line_id`.
    pub fn select_line(&mut self, line_id: &str) {
        let Some((ticket, cancel)) = self.vehicles.restart(Some(line_id.to_string())) else {
            return;
        };
        info!(
            "[vehicles] polling line {} every {:?} after {:?} (gen {})",
            ticket.selection,
            self.cadence.vehicles_every,
            self.cadence.vehicles_delay,
            ticket.generation
        );
        tokio::spawn(vehicles_loop(
            Arc::clone(&self.source),
            ticket,
            self.cadence,
            cancel,
            self.events.clone(),
        ));
    }

    /// Stop the vehicle loop. Results still in flight become stale.
    pub fn clear_line(&mut self) {
        if let Some(line) = self.vehicles.selection.as_deref() {
            info!("[vehicles] stopped polling line {}", line);
        }
        self.vehicles.restart(None);
    }

    /// `Some(event)` when it belongs to the current selection of its loop.
    pub fn admit(&self, event: PollEvent) -> Option<PollEvent> {
        let current = match &event {
            PollEvent::Arrivals { ticket, .. } | PollEvent::Insight { ticket, .. } => {
                self.arrivals.is_current(ticket)
            }
            PollEvent::Vehicles { ticket, .. } => self.vehicles.is_current(ticket),
        };
        if current {
            Some(event)
        } else {
            let ticket = event.ticket();
            debug!(
                "discarding stale result for {} (gen {})",
                ticket.selection, ticket.generation
            );
            None
        }
    }
}

impl<S: TransitSource> Drop for PollingScheduler<S> {
    fn drop(&mut self) {
        self.arrivals.restart(None);
        self.vehicles.restart(None);
    }
}

async fn arrivals_loop<S: TransitSource>(
    source: Arc<S>,
    ticket: Ticket,
    every: Duration,
    cancel: CancellationToken,
    events: mpsc::Sender<PollEvent>,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let result = fetch_board(source.as_ref(), &ticket.selection).await;
        let event = PollEvent::Arrivals {
            ticket: ticket.clone(),
            result,
        };
        if events.send(event).await.is_err() {
            break;
        }
    }
    debug!("[arrivals] loop for {} (gen {}) ended", ticket.selection, ticket.generation);
}

async fn vehicles_loop<S: TransitSource>(
    source: Arc<S>,
    ticket: Ticket,
    cadence: Cadence,
    cancel: CancellationToken,
    events: mpsc::Sender<PollEvent>,
) {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => return,
        _ = tokio::time::sleep(cadence.vehicles_delay) => {}
    }

    let mut ticker = tokio::time::interval(cadence.vehicles_every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let result = source.fetch_vehicles(&ticket.selection).await;
        let event = PollEvent::Vehicles {
            ticket: ticket.clone(),
            result,
        };
        if events.send(event).await.is_err() {
            break;
        }
    }
    debug!("[vehicles] loop for {} (gen {}) ended", ticket.selection, ticket.generation);
}

/// Stop metadata, then arrivals, processed against the time they arrived.
async fn fetch_board<S: TransitSource>(source: &S, stop_id: &str) -> Result<StopBoard, FetchError> {
    let stop = source.fetch_stop(stop_id).await?;
    let raw = source.fetch_arrivals(stop_id).await?;
    let now = Local::now();
    Ok(StopBoard {
        stop,
        arrivals: process(&raw, &now),
        fetched_at: now,
    })
}
