//! scalegate-api — HTTP surface for scale-from-zero.
//!
//! The gate is an axum middleware placed in front of the function
//! invocation routes. Each request is held until the target function has
//! capacity, then forwarded unchanged.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | ANY | `/function/{name}/...` | downstream invocation, behind the gate |
//! | GET | `/system/scaling/{name}` | latest cached replica observation |
//! | GET | `/healthz` | liveness |
//!
//! # Status mapping
//!
//! | Scale outcome | Response |
//! |---|---|
//! | Ready | downstream response |
//! | NotFound | 404, plaintext error |
//! | Failed | 500, plaintext error |
//! | Cancelled | 503, plaintext error |
//! | TimedOut | 504, plaintext message |

pub mod gate;
pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::get;
use scalegate_scaling::Scaler;
use tokio::sync::watch;

pub use gate::{function_name, scale_gate};

/// Shared state for the gate and the system routes.
#[derive(Clone)]
pub struct GateState {
    pub scaler: Arc<Scaler>,
    /// When set, shutdown aborts requests still waiting for capacity.
    pub shutdown: Option<watch::Receiver<bool>>,
}

impl GateState {
    pub fn new(scaler: Arc<Scaler>) -> Self {
        Self {
            scaler,
            shutdown: None,
        }
    }

    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }
}

/// Put `downstream` behind the scale gate and add the system routes.
pub fn build_router(state: GateState, downstream: Router) -> Router {
    let gated = downstream.layer(middleware::from_fn_with_state(state.clone(), scale_gate));

    Router::new()
        .route("/system/scaling/{name}", get(handlers::get_observation))
        .route("/healthz", get(handlers::healthz))
        .with_state(state)
        .merge(gated)
}
