//! Scaler — scale a function from zero and wait for capacity.
//!
//! One [`Scaler`] is shared by every in-flight request. Each call to
//! [`Scaler::scale`] runs the query/scale/poll state machine to a terminal
//! state and returns a [`ScaleResult`]. Concurrent calls for the same
//! function may each issue a scale-up command; the control plane is
//! expected to treat repeated targets as idempotent.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::ObservationCache;
use crate::config::ScalingConfig;
use crate::error::ScaleError;
use crate::query::{ReplicaObservation, ReplicaQuery};

/// Terminal state of a scale call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleOutcome {
    /// At least one replica is available.
    Ready,
    /// The poll budget ran out without observing a replica.
    TimedOut,
    /// The function is known but the scale command or a poll failed.
    Failed,
    /// The initial query failed.
    NotFound,
    /// Shutdown interrupted the poll loop.
    Cancelled,
}

/// Result of a single scale call.
#[derive(Debug, Clone)]
pub struct ScaleResult {
    pub available: bool,
    pub found: bool,
    pub error: Option<ScaleError>,
    /// Wall time from entry to the terminal state.
    pub duration: Duration,
}

impl ScaleResult {
    fn ready(start: Instant) -> Self {
        Self {
            available: true,
            found: true,
            error: None,
            duration: start.elapsed(),
        }
    }

    fn not_found(error: ScaleError, start: Instant) -> Self {
        Self {
            available: false,
            found: false,
            error: Some(error),
            duration: start.elapsed(),
        }
    }

    fn failed(error: ScaleError, start: Instant) -> Self {
        Self {
            available: false,
            found: true,
            error: Some(error),
            duration: start.elapsed(),
        }
    }

    fn timed_out(start: Instant) -> Self {
        Self {
            available: false,
            found: true,
            error: None,
            duration: start.elapsed(),
        }
    }

    pub fn outcome(&self) -> ScaleOutcome {
        match (&self.error, self.found, self.available) {
            (_, false, _) => ScaleOutcome::NotFound,
            (Some(ScaleError::Cancelled { .. }), _, _) => ScaleOutcome::Cancelled,
            (Some(_), _, _) => ScaleOutcome::Failed,
            (None, _, true) => ScaleOutcome::Ready,
            (None, _, false) => ScaleOutcome::TimedOut,
        }
    }
}

/// Scales functions from zero replicas on demand.
pub struct Scaler {
    config: ScalingConfig,
    query: Arc<dyn ReplicaQuery>,
    cache: ObservationCache,
}

impl Scaler {
    /// Create a scaler around an existing cache handle.
    pub fn new(config: ScalingConfig, query: Arc<dyn ReplicaQuery>, cache: ObservationCache) -> Self {
        Self {
            config,
            query,
            cache,
        }
    }

    /// Create a scaler with a fresh cache using `config.cache_expiry`.
    pub fn from_config(config: ScalingConfig, query: Arc<dyn ReplicaQuery>) -> Self {
        let cache = ObservationCache::new(config.cache_expiry);
        Self::new(config, query, cache)
    }

    pub fn config(&self) -> &ScalingConfig {
        &self.config
    }

    /// Handle to the observation cache this scaler writes to.
    pub fn cache(&self) -> &ObservationCache {
        &self.cache
    }

    /// Ensure `function` has at least one available replica.
    ///
    /// Runs until the function is ready, a control plane call fails, or
    /// `max_poll_count` polls have seen zero replicas.
    pub async fn scale(&self, function: &str) -> ScaleResult {
        self.scale_with_shutdown(function, None).await
    }

    /// Like [`scale`](Self::scale), but a `true` on `shutdown` aborts the wait
    /// between polls with [`ScaleError::Cancelled`].
    pub async fn scale_with_shutdown(
        &self,
        function: &str,
        mut shutdown: Option<watch::Receiver<bool>>,
    ) -> ScaleResult {
        let start = Instant::now();

        if self.config.cache_fast_path
            && let Some(cached) = self.cache.get(function)
            && cached.is_ready()
        {
            debug!(function, replicas = cached.available_replicas, "ready from cache");
            return ScaleResult::ready(start);
        }

        let observation = match self.query.get_replicas(function).await {
            Ok(observation) => observation,
            Err(source) => {
                return ScaleResult::not_found(
                    ScaleError::Query {
                        function: function.to_string(),
                        source,
                    },
                    start,
                );
            }
        };
        self.cache.set(function, observation);

        if observation.is_ready() {
            return ScaleResult::ready(start);
        }

        let target = observation.scale_target();
        info!(function, target, "scale from zero requested");

        if let Err(source) = self.query.set_replicas(function, target).await {
            warn!(function, target, error = %source, "scale command failed");
            return ScaleResult::failed(
                ScaleError::ScaleCommand {
                    function: function.to_string(),
                    target,
                    source,
                },
                start,
            );
        }

        for attempt in 1..=self.config.max_poll_count {
            match self.query.get_replicas(function).await {
                Ok(observation) => {
                    self.cache.set(function, observation);
                    if observation.is_ready() {
                        let elapsed = start.elapsed();
                        info!(
                            function,
                            replicas = observation.available_replicas,
                            attempt,
                            elapsed_ms = elapsed.as_millis() as u64,
                            "scale from zero succeeded"
                        );
                        return ScaleResult::ready(start);
                    }
                    debug!(function, attempt, "no replicas available yet");
                }
                Err(source) => {
                    // A failed poll leaves a zero reading behind, not the pre-scale one.
                    self.cache.set(function, ReplicaObservation::default());
                    warn!(function, attempt, error = %source, "replica poll failed");
                    return ScaleResult::failed(
                        ScaleError::Poll {
                            function: function.to_string(),
                            attempt,
                            source,
                        },
                        start,
                    );
                }
            }

            if !self.wait_poll_interval(&mut shutdown).await {
                info!(function, attempt, "scale from zero cancelled");
                return ScaleResult::failed(
                    ScaleError::Cancelled {
                        function: function.to_string(),
                    },
                    start,
                );
            }
        }

        let result = ScaleResult::timed_out(start);
        warn!(
            function,
            polls = self.config.max_poll_count,
            elapsed_ms = result.duration.as_millis() as u64,
            "scale from zero timed out"
        );
        result
    }

    /// Sleep for one poll interval. Returns `false` if shutdown fired first.
    ///
    /// A closed shutdown channel degrades to a plain sleep.
    async fn wait_poll_interval(&self, shutdown: &mut Option<watch::Receiver<bool>>) -> bool {
        let sleep = tokio::time::sleep(self.config.function_poll_interval);
        tokio::pin!(sleep);

        loop {
            let Some(rx) = shutdown.as_mut() else {
                (&mut sleep).await;
                return true;
            };
            if *rx.borrow_and_update() {
                return false;
            }

            let closed = tokio::select! {
                _ = &mut sleep => return true,
                changed = rx.changed() => changed.is_err(),
            };
            if closed {
                *shutdown = None;
            }
        }
    }
}
