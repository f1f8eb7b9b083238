//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use tracing::{debug, info};

use crate::pipeline::QueryOptions;

use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sensors", get(list_sensors))
        .route("/sensors/:id", get(get_sensor))
        .route("/sensors/:id/options", get(get_options).put(put_options))
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Latest output of every sensor.
async fn list_sensors(State(state): State<AppState>) -> Json<SensorListResponse> {
    let sensors = state
        .monitors
        .iter()
        .map(SensorResponse::from_handle)
        .collect();

    Json(SensorListResponse { sensors })
}

/// Latest output of one sensor, by unique id.
async fn get_sensor(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SensorResponse>, AppError> {
    let handle = state.find(&id).ok_or_else(|| not_found(&id))?;
    Ok(Json(SensorResponse::from_handle(handle)))
}

/// Current query options of one sensor.
async fn get_options(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<QueryOptions>, AppError> {
    let handle = state.find(&id).ok_or_else(|| not_found(&id))?;
    Ok(Json(handle.config().options()))
}

/// Replace one sensor's query options. Takes effect on its next poll.
async fn put_options(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(options): Json<QueryOptions>,
) -> Result<Json<QueryOptions>, AppError> {
    let handle = state.find(&id).ok_or_else(|| not_found(&id))?;
    info!(sensor = %id, "replacing options");
    handle.update_options(options);
    Ok(Json(handle.config().options()))
}

fn not_found(id: &str) -> AppError {
    AppError::NotFound {
        message: format!("No sensor {id}"),
    }
}

// Error handling

#[derive(Debug)]
pub enum AppError {
    NotFound { message: String },
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
        };

        debug!(%status, %message, "request failed");

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
