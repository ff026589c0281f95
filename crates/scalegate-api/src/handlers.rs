//! System route handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;

use crate::GateState;

/// Response wrapper for consistent API format.
#[derive(Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

#[derive(Debug, Serialize)]
struct ObservationView {
    function: String,
    available_replicas: u64,
    min_replicas: u64,
    age_ms: u64,
    ttl_ms: u64,
}

/// GET /system/scaling/:name
pub async fn get_observation(
    State(state): State<GateState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    let cache = state.scaler.cache();
    match cache.snapshot(&name) {
        Some(cached) => ApiResponse::ok(ObservationView {
            function: name,
            available_replicas: cached.observation.available_replicas,
            min_replicas: cached.observation.min_replicas,
            age_ms: cached.age.as_millis() as u64,
            ttl_ms: cache.ttl().as_millis() as u64,
        })
        .into_response(),
        None => error_response("no recent observation", StatusCode::NOT_FOUND).into_response(),
    }
}

/// GET /healthz
pub async fn healthz() -> &'static str {
    "OK"
}
