//! HTTP control surface over the engine handle

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use streamsim_engine::{EngineError, EngineHandle, EngineStatus};
use thiserror::Error;
use tracing::info;

/// Control errors with their HTTP status
#[derive(Error, Debug)]
pub enum ControlError {
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

pub type ControlResult<T> = Result<T, ControlError>;

impl From<EngineError> for ControlError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::AlreadyRunning | EngineError::NotRunning => ControlError::Conflict(e.to_string()),
            EngineError::InvalidMultiplier(_) => ControlError::BadRequest(e.to_string()),
            other => ControlError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ControlError {
    fn into_response(self) -> Response {
        let status = match self {
            ControlError::Conflict(_) => StatusCode::CONFLICT,
            ControlError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ControlError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = json!({
            "error": {
                "message": self.to_string(),
                "status": status.as_u16()
            }
        });
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct ClockRequest {
    pub multiplier: f64,
}

/// Routes under `/sim`
pub fn router(handle: EngineHandle) -> Router {
    Router::new()
        .route("/sim/start", post(start))
        .route("/sim/stop", post(stop))
        .route("/sim/clock", put(set_clock))
        .route("/sim/status", get(status))
        .with_state(handle)
}

async fn start(State(handle): State<EngineHandle>) -> ControlResult<Json<EngineStatus>> {
    info!("Start requested");
    handle.start()?;
    Ok(Json(handle.status()))
}

async fn stop(State(handle): State<EngineHandle>) -> ControlResult<Json<EngineStatus>> {
    info!("Stop requested");
    handle.stop()?;
    Ok(Json(handle.status()))
}

async fn set_clock(
    State(handle): State<EngineHandle>,
    Json(request): Json<ClockRequest>,
) -> ControlResult<Json<EngineStatus>> {
    info!(multiplier = request.multiplier, "Clock change requested");
    handle.set_speed(request.multiplier)?;
    Ok(Json(handle.status()))
}

async fn status(State(handle): State<EngineHandle>) -> Json<EngineStatus> {
    Json(handle.status())
}
