//! scalegate-scaling — scale-from-zero for function invocations.
//!
//! When a function has been scaled down to zero replicas, an inbound
//! invocation asks the control plane for capacity and holds the request
//! until at least one replica is ready, or until the poll budget runs out.
//!
//! # State machine
//!
//! ```text
//! Querying ──(replicas > 0)──────────────────────────────► Ready
//!    │  └──(query error)─────────────────────────────────► NotFound
//!    ▼ (replicas == 0)
//! Scaling  ──(set error)─────────────────────────────────► Failed
//!    ▼
//! Polling ×max_poll_count ──(replicas > 0)───────────────► Ready
//!    │                    ──(query error)────────────────► Failed
//!    │                    ──(shutdown during wait)───────► Cancelled
//!    └──(budget exhausted)───────────────────────────────► TimedOut
//! ```
//!
//! Every successful read from the control plane is recorded in the
//! [`ObservationCache`], which the scaler owns and other consumers may
//! inspect through a cloned handle.

pub mod cache;
pub mod config;
pub mod error;
pub mod query;
pub mod scaler;

pub use cache::{CachedObservation, ObservationCache};
pub use config::{ScalingConfig, parse_duration};
pub use error::{ConfigError, QueryError, ScaleError};
pub use query::{ReplicaObservation, ReplicaQuery};
pub use scaler::{ScaleOutcome, ScaleResult, Scaler};
