//! Scale gate tests.
//!
//! Drives the full router with `oneshot` against an in-memory control
//! plane whose functions come up after a configurable number of polls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::any;
use scalegate_api::{GateState, build_router};
use scalegate_scaling::{QueryError, ReplicaObservation, ReplicaQuery, Scaler, ScalingConfig};
use tower::ServiceExt;

#[derive(Debug, Clone, Copy)]
struct FakeFunction {
    available: u64,
    min: u64,
    /// Polls after a scale-up before replicas appear; `None` never comes up.
    ready_after: Option<u32>,
}

#[derive(Default)]
struct FakeControlPlane {
    functions: Mutex<HashMap<String, FakeFunction>>,
    pending: Mutex<HashMap<String, u32>>,
    fail_scale: bool,
    fail_polls: bool,
}

impl FakeControlPlane {
    fn with(self, name: &str, function: FakeFunction) -> Self {
        self.functions.lock().unwrap().insert(name.to_string(), function);
        self
    }
}

#[async_trait]
impl ReplicaQuery for FakeControlPlane {
    async fn get_replicas(&self, function: &str) -> Result<ReplicaObservation, QueryError> {
        let mut functions = self.functions.lock().unwrap();
        let Some(entry) = functions.get_mut(function) else {
            return Err(QueryError::NotFound(function.to_string()));
        };

        let mut pending = self.pending.lock().unwrap();
        if let Some(polls) = pending.get_mut(function) {
            if self.fail_polls {
                return Err(QueryError::Transport("connection refused".to_string()));
            }
            *polls += 1;
            if entry.ready_after.is_some_and(|n| *polls >= n) {
                entry.available = entry.min.max(1);
                pending.remove(function);
            }
        }

        Ok(ReplicaObservation::new(entry.available, entry.min))
    }

    async fn set_replicas(&self, function: &str, _replicas: u64) -> Result<(), QueryError> {
        if self.fail_scale {
            return Err(QueryError::Status {
                status: 500,
                body: "scale rejected".to_string(),
            });
        }
        self.pending.lock().unwrap().insert(function.to_string(), 0);
        Ok(())
    }
}

fn cold(ready_after: Option<u32>) -> FakeFunction {
    FakeFunction {
        available: 0,
        min: 0,
        ready_after,
    }
}

fn warm() -> FakeFunction {
    FakeFunction {
        available: 1,
        min: 1,
        ready_after: None,
    }
}

fn downstream() -> Router {
    Router::new().route(
        "/function/{*rest}",
        any(|req: Request<Body>| async move { format!("invoked {}", req.uri().path()) }),
    )
}

fn router(control_plane: FakeControlPlane, max_poll_count: u32) -> Router {
    let config = ScalingConfig::new(
        max_poll_count,
        Duration::from_millis(10),
        Duration::from_secs(5),
    );
    let scaler = Arc::new(Scaler::from_config(config, Arc::new(control_plane)));
    build_router(GateState::new(scaler), downstream())
}

async fn call(router: Router, uri: &str) -> (StatusCode, String) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let resp = router.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test(start_paused = true)]
async fn warm_function_is_forwarded() {
    let router = router(FakeControlPlane::default().with("echo", warm()), 3);

    let (status, body) = call(router, "/function/echo/path").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "invoked /function/echo/path");
}

#[tokio::test(start_paused = true)]
async fn cold_function_is_scaled_then_forwarded() {
    let router = router(FakeControlPlane::default().with("echo", cold(Some(2))), 5);

    let (status, body) = call(router, "/function/echo").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "invoked /function/echo");
}

#[tokio::test(start_paused = true)]
async fn unknown_function_is_404() {
    let router = router(FakeControlPlane::default(), 3);

    let (status, body) = call(router, "/function/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.starts_with("error finding function missing:"));
    assert!(body.contains("function not found: missing"));
}

#[tokio::test(start_paused = true)]
async fn scale_command_failure_is_500() {
    let control_plane = FakeControlPlane {
        fail_scale: true,
        ..FakeControlPlane::default()
    }
    .with("echo", cold(Some(1)));
    let router = router(control_plane, 3);

    let (status, body) = call(router, "/function/echo").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("scale rejected"));
}

#[tokio::test(start_paused = true)]
async fn poll_failure_is_500() {
    let control_plane = FakeControlPlane {
        fail_polls: true,
        ..FakeControlPlane::default()
    }
    .with("echo", cold(Some(1)));
    let router = router(control_plane, 3);

    let (status, body) = call(router, "/function/echo").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("connection refused"));
}

#[tokio::test(start_paused = true)]
async fn timed_out_scale_is_504() {
    let router = router(FakeControlPlane::default().with("echo", cold(None)), 2);

    let (status, body) = call(router, "/function/echo").await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body, "function echo not ready after 0.02s");
}

#[tokio::test(start_paused = true)]
async fn shutdown_while_waiting_is_503() {
    let control_plane = FakeControlPlane::default().with("echo", cold(None));
    let config = ScalingConfig::new(1_000, Duration::from_millis(10), Duration::from_secs(5));
    let scaler = Arc::new(Scaler::from_config(config, Arc::new(control_plane)));
    let (tx, rx) = tokio::sync::watch::channel(false);
    let router = build_router(GateState::new(scaler).with_shutdown(rx), downstream());

    let pending = tokio::spawn(call(router, "/function/echo"));
    tokio::time::sleep(Duration::from_millis(55)).await;
    tx.send(true).unwrap();

    let (status, body) = pending.await.unwrap();
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.contains("cancelled by shutdown"));
}

#[tokio::test(start_paused = true)]
async fn observation_is_inspectable_after_scale() {
    let router = router(FakeControlPlane::default().with("echo", cold(Some(1))), 3);

    let (status, _) = call(router.clone(), "/function/echo").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(router, "/system/scaling/echo").await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["function"], "echo");
    assert_eq!(json["data"]["available_replicas"], 1);
}

#[tokio::test(start_paused = true)]
async fn missing_observation_is_404() {
    let router = router(FakeControlPlane::default(), 3);

    let (status, body) = call(router, "/system/scaling/echo").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["success"], false);
}

#[tokio::test(start_paused = true)]
async fn system_routes_bypass_the_gate() {
    let router = router(FakeControlPlane::default(), 3);

    let (status, body) = call(router, "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
}
