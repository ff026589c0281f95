//! The control plane capability consumed by the scaler.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::QueryError;

/// A point-in-time replica count reading for one function.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplicaObservation {
    /// Replicas that are ready to serve traffic.
    pub available_replicas: u64,
    /// Configured floor, or 0 when the function does not declare one.
    pub min_replicas: u64,
}

impl ReplicaObservation {
    pub fn new(available_replicas: u64, min_replicas: u64) -> Self {
        Self {
            available_replicas,
            min_replicas,
        }
    }

    /// Replica count to request on a zero-to-N transition.
    pub fn scale_target(&self) -> u64 {
        if self.min_replicas > 0 {
            self.min_replicas
        } else {
            1
        }
    }

    pub fn is_ready(&self) -> bool {
        self.available_replicas > 0
    }
}

/// Reads and writes replica counts on the orchestration control plane.
#[async_trait]
pub trait ReplicaQuery: Send + Sync {
    /// Current available and minimum replicas for `function`.
    async fn get_replicas(&self, function: &str) -> Result<ReplicaObservation, QueryError>;

    /// Ask the control plane to run `replicas` instances of `function`.
    async fn set_replicas(&self, function: &str, replicas: u64) -> Result<(), QueryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_target_uses_min_replicas() {
        assert_eq!(ReplicaObservation::new(0, 3).scale_target(), 3);
    }

    #[test]
    fn scale_target_falls_back_to_one() {
        assert_eq!(ReplicaObservation::new(0, 0).scale_target(), 1);
    }

    #[test]
    fn ready_requires_available_replicas() {
        assert!(!ReplicaObservation::new(0, 2).is_ready());
        assert!(ReplicaObservation::new(1, 0).is_ready());
    }
}
