//! scalegate-provider — talks to a faas-provider style control plane.
//!
//! [`HttpReplicaQuery`] implements [`scalegate_scaling::ReplicaQuery`] over
//! the provider's HTTP API:
//!
//! | Method | Path | Use |
//! |---|---|---|
//! | GET | `/system/function/{name}` | read replica counts and labels |
//! | POST | `/system/scale-function/{name}` | request a replica count |
//!
//! The minimum replica count is read from the `com.openfaas.scale.min`
//! label on the function.

pub mod client;
pub mod types;

pub use client::HttpReplicaQuery;
pub use types::{FunctionStatus, MIN_REPLICAS_LABEL, ScaleServiceRequest};
