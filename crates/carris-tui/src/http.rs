use crate::app_state::{BoardView, OverlayView, SnapshotStore};
use crate::core::BoardCommand;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info};

#[derive(Clone)]
struct HttpState {
    snapshots: SnapshotStore,
    command_tx: mpsc::Sender<BoardCommand>,
}

pub fn start_server(
    bind_address: String,
    port: u16,
    snapshots: SnapshotStore,
    command_tx: mpsc::Sender<BoardCommand>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let app = router(HttpState {
            snapshots,
            command_tx,
        });

        let addr = format!("{}:{}", bind_address, port);
        let listener = match TcpListener::bind(&addr).await {
            Ok(l) => l,
            Err(e) => {
                error!("Failed to bind HTTP server to {}: {}", addr, e);
                return;
            }
        };

        info!("HTTP API server listening on http://{}", addr);

        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP server error: {}", e);
        }
    })
}

fn router(state: HttpState) -> Router {
    Router::new()
        .route("/api/board", get(get_board))
        .route("/api/overlay", get(get_overlay))
        .route("/api/stop/:id", get(select_stop).post(select_stop))
        .route("/api/line/:id", get(toggle_line).post(toggle_line))
        .with_state(state)
}

async fn get_board(State(state): State<HttpState>) -> Json<BoardView> {
    Json(state.snapshots.get().await.board)
}

async fn get_overlay(State(state): State<HttpState>) -> Json<OverlayView> {
    Json(state.snapshots.get().await.overlay)
}

async fn select_stop(State(state): State<HttpState>, Path(id): Path<String>) -> StatusCode {
    info!("HTTP API: select stop {}", id);
    forward(&state, BoardCommand::SelectStop(id)).await
}

async fn toggle_line(State(state): State<HttpState>, Path(id): Path<String>) -> StatusCode {
    info!("HTTP API: toggle line {}", id);
    forward(&state, BoardCommand::ToggleLine(id)).await
}

async fn forward(state: &HttpState, cmd: BoardCommand) -> StatusCode {
    if state.command_tx.send(cmd).await.is_err() {
        error!("Failed to forward command to the board loop");
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    StatusCode::ACCEPTED
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn serve(state: HttpState) -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        addr
    }

    async fn raw_request(addr: std::net::SocketAddr, request: &str) -> String {
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn test_line_toggle_is_forwarded_not_applied() {
        let (tx, mut rx) = mpsc::channel(4);
        let addr = serve(HttpState {
            snapshots: SnapshotStore::default(),
            command_tx: tx,
        })
        .await;

        let response = raw_request(
            addr,
            "POST /api/line/1523 HTTP/1.1\r\nHost: x\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 202"));
        assert_eq!(
            rx.recv().await,
            Some(BoardCommand::ToggleLine("1523".to_string()))
        );
    }

    #[tokio::test]
    async fn test_board_returns_published_snapshot() {
        let (tx, _rx) = mpsc::channel(4);
        let snapshots = SnapshotStore::default();
        let mut snapshot = snapshots.get().await;
        snapshot.board.stop_id = "120385".to_string();
        snapshots.publish(snapshot).await;

        let addr = serve(HttpState {
            snapshots,
            command_tx: tx,
        })
        .await;
        let response = raw_request(
            addr,
            "GET /api/board HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("\"stop_id\":\"120385\""));
    }
}
