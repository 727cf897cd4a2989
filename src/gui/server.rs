//! Web server for serving the board viewer and API endpoints

use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{
        Html, IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tokio::sync::Mutex;

use super::events::{ChangeEvent, Notifier};
use crate::Error;
use crate::storage::Board;

/// Default port for `td serve`
pub const DEFAULT_PORT: u16 = 3141;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Board handle; the lock serializes mutations within this process
    pub board: Arc<Mutex<Board>>,
    /// Listeners on `/api/events`
    pub notifier: Arc<Notifier>,
}

impl AppState {
    pub fn new(board: Board) -> Self {
        Self {
            board: Arc::new(Mutex::new(board)),
            notifier: Arc::new(Notifier::new()),
        }
    }
}

/// Start the web viewer for the board at `root`.
pub async fn start_server(
    root: &Path,
    port: u16,
    host: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let board = Board::open(root)?;
    let state = AppState::new(board);

    // Keep the watcher alive for the lifetime of the server.
    let (_watcher, changes) = super::watcher::watch_board(root)?;
    let notifier = Arc::clone(&state.notifier);
    tokio::spawn(async move {
        let mut changes = std::pin::pin!(changes);
        while let Some(event) = changes.next().await {
            notifier.broadcast(&event);
        }
    });

    let host_addr: std::net::IpAddr = host
        .parse()
        .map_err(|e| format!("Invalid host address '{}': {}", host, e))?;
    let addr = SocketAddr::from((host_addr, port));
    println!("Serving board at http://{}", addr);
    println!("Press Ctrl+C to stop");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}

/// First port at or above `start` that can be bound on `host`.
pub fn find_available_port(host: &str, start: u16) -> Option<u16> {
    (start..start.saturating_add(100))
        .find(|port| std::net::TcpListener::bind((host, *port)).is_ok())
}

/// All routes of the viewer.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(serve_index))
        .route("/api/board", get(get_board))
        .route("/api/status", get(get_status))
        .route("/api/events", get(events))
        .route("/api/move", post(move_task))
        .route("/api/delete", post(delete_task))
        .with_state(state)
}

/// An error rendered as `{"error": message}` with a matching status code.
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::InvalidChoice { .. } | Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Ambiguous { .. } => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("request failed: {}", self.0);
        }
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult = Result<Json<serde_json::Value>, ApiError>;

/// Serve the main HTML page
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("index.html"))
}

/// Board view, reconciled first when the index is stale
async fn get_board(State(state): State<AppState>) -> ApiResult {
    let board = state.board.lock().await;
    let view = board.board_view()?;
    Ok(Json(serde_json::to_value(view).map_err(Error::from)?))
}

/// Last sync time
async fn get_status(State(state): State<AppState>) -> ApiResult {
    let board = state.board.lock().await;
    let last_sync = board.last_sync()?;
    Ok(Json(serde_json::json!({
        "last_sync": last_sync,
        "listeners": state.notifier.listener_count(),
    })))
}

/// Server-sent change events
async fn events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = state.notifier.subscribe().map(|event| {
        let payload = serde_json::to_string(&event).unwrap_or_default();
        Ok::<_, Infallible>(Event::default().event(event.kind()).data(payload))
    });
    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MoveRequest {
    task_id: Option<String>,
    target_column: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteRequest {
    task_id: Option<String>,
}

fn required(value: Option<String>, name: &str) -> Result<String, ApiError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::InvalidInput(format!("Missing required field '{}'", name)).into()),
    }
}

/// Move a task and tell listeners
async fn move_task(State(state): State<AppState>, Json(request): Json<MoveRequest>) -> ApiResult {
    let task_id = required(request.task_id, "taskId")?;
    let target = required(request.target_column, "targetColumn")?;

    let board = state.board.lock().await;
    let outcome = board.move_task(&task_id, &target)?;
    drop(board);

    if outcome.moved {
        state.notifier.broadcast(&ChangeEvent::moved(&outcome));
    }
    Ok(Json(serde_json::json!({ "success": true, "task": outcome })))
}

/// Delete a task and tell listeners
async fn delete_task(
    State(state): State<AppState>,
    Json(request): Json<DeleteRequest>,
) -> ApiResult {
    let task_id = required(request.task_id, "taskId")?;

    let board = state.board.lock().await;
    let deleted = board.delete_task(&task_id)?;
    drop(board);

    state.notifier.broadcast(&ChangeEvent::deleted(&deleted));
    Ok(Json(serde_json::json!({ "success": true, "task": deleted })))
}
