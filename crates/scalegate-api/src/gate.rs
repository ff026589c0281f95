//! Scale gate middleware.

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use scalegate_scaling::ScaleOutcome;
use tracing::{info, warn};

use crate::GateState;

const FUNCTION_PREFIX: &str = "/function/";

/// Function name addressed by a request target such as
/// `/function/echo/rest/of/path?q=1`. Empty when the target does not name one.
pub fn function_name(target: &str) -> &str {
    target
        .strip_prefix(FUNCTION_PREFIX)
        .and_then(|rest| rest.split(['/', '?']).next())
        .unwrap_or_default()
}

/// Hold the request until its function has a ready replica.
pub async fn scale_gate(State(state): State<GateState>, req: Request, next: Next) -> Response {
    let function = function_name(req.uri().path()).to_string();
    let result = state
        .scaler
        .scale_with_shutdown(&function, state.shutdown.clone())
        .await;

    let status = match result.outcome() {
        ScaleOutcome::Ready => return next.run(req).await,
        ScaleOutcome::NotFound => StatusCode::NOT_FOUND,
        ScaleOutcome::Failed => StatusCode::INTERNAL_SERVER_ERROR,
        ScaleOutcome::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        ScaleOutcome::TimedOut => {
            let secs = result.duration.as_secs_f64();
            info!(function = %function, elapsed_secs = secs, "scale from zero timed out");
            return (
                StatusCode::GATEWAY_TIMEOUT,
                format!("function {function} not ready after {secs:.2}s"),
            )
                .into_response();
        }
    };

    let error = result.error.map(|e| e.to_string()).unwrap_or_default();
    let body = format!("error finding function {function}: {error}");
    warn!(function = %function, %status, "{body}");
    (status, body).into_response()
}
