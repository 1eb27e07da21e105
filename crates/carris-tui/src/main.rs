mod action;
mod app;
mod app_state;
mod component;
mod components;
mod core;
mod http;
mod overlay;
mod scheduler;
mod surface;
mod theme;
mod widgets;

use std::sync::Arc;

use carris_proto::client::CarrisClient;
use carris_proto::config::Config;
use carris_proto::insight::InsightClient;
use carris_proto::platform;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::app_state::SnapshotStore;
use crate::core::{BoardCommand, BoardCore};
use crate::scheduler::PollEvent;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let log_path = platform::log_path();
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override; default to debug for app code but suppress noisy
    // connection-level DEBUG from HTTP client internals (hyper_util, reqwest).
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    // Print log path to stderr so the operator can tail it immediately.
    eprintln!("carris-board log: {}", log_path.display());

    info!("carris-board starting…");

    // ── Load config ──────────────────────────────────────────────────────────
    let config = Config::load().unwrap_or_default();
    let stop_id = std::env::args()
        .nth(1)
        .map(|arg| arg.trim().to_string())
        .filter(|arg| !arg.is_empty())
        .unwrap_or_else(|| config.board.default_stop_id.clone());

    // ── Collaborators ────────────────────────────────────────────────────────
    let source = Arc::new(CarrisClient::new(&config.api)?);
    let insight = if config.insight.enabled {
        match InsightClient::new(&config.insight) {
            Ok(client) => Some(client),
            Err(e) => {
                warn!("[insight] disabled: {}", e);
                None
            }
        }
    } else {
        None
    };
    let show_insight = insight.is_some();

    // ── Channels (fetch loops / HTTP → event loop) ───────────────────────────
    let (poll_tx, poll_rx) = mpsc::channel::<PollEvent>(256);
    let (command_tx, command_rx) = mpsc::channel::<BoardCommand>(64);
    let snapshots = SnapshotStore::default();

    // ── HTTP server ──────────────────────────────────────────────────────────
    if config.http.enabled {
        http::start_server(
            config.http.bind_address.clone(),
            config.http.port,
            snapshots.clone(),
            command_tx,
        );
    }

    // ── Run TUI ──────────────────────────────────────────────────────────────
    let mut core = BoardCore::new(source, &config, insight, poll_tx);
    info!("[arrivals] initial stop {}", stop_id);
    core.start(&stop_id);

    let app = app::App::new(core, snapshots, show_insight);
    app.run(poll_rx, command_rx).await?;

    Ok(())
}
