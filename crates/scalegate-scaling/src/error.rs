//! Error types for the scaler and its control plane capability.

use thiserror::Error;

/// Errors returned by a [`ReplicaQuery`](crate::ReplicaQuery) implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("function not found: {0}")]
    NotFound(String),

    #[error("control plane request failed: {0}")]
    Transport(String),

    #[error("control plane returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid control plane response: {0}")]
    Decode(String),
}

/// Why a scale-from-zero attempt did not end with a ready function.
///
/// A poll budget running out is not an error; see
/// [`ScaleOutcome::TimedOut`](crate::ScaleOutcome::TimedOut).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScaleError {
    /// The initial replica query failed. The function is treated as unknown.
    #[error("unable to query function {function}: {source}")]
    Query {
        function: String,
        #[source]
        source: QueryError,
    },

    /// The function exists but the zero-to-N command was rejected.
    #[error("unable to scale function {function} to {target} replica(s): {source}")]
    ScaleCommand {
        function: String,
        target: u64,
        #[source]
        source: QueryError,
    },

    /// A replica query failed while waiting for capacity.
    #[error("polling function {function} failed on attempt {attempt}: {source}")]
    Poll {
        function: String,
        attempt: u32,
        #[source]
        source: QueryError,
    },

    #[error("scale-up of function {function} cancelled by shutdown")]
    Cancelled { function: String },
}

/// Errors from loading or validating a [`ScalingConfig`](crate::ScalingConfig).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid duration: {0:?}")]
    InvalidDuration(String),

    #[error("cache_expiry must be greater than zero")]
    ZeroCacheExpiry,
}
