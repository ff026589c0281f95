//! Time-bounded memo of the latest replica observation per function.
//!
//! The cache is a cloneable handle over a single `RwLock`ed map. Reads take
//! the read lock and never evict; an entry older than the TTL is reported
//! as absent. Expired entries are dropped by [`ObservationCache::purge_expired`],
//! typically driven by [`ObservationCache::run_sweeper`].

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::query::ReplicaObservation;

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    observation: ReplicaObservation,
    stored_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() >= ttl
    }
}

/// A live cache entry together with how long ago it was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedObservation {
    pub observation: ReplicaObservation,
    pub age: Duration,
}

/// Replica observations keyed by function name, each valid for `ttl`.
#[derive(Debug, Clone)]
pub struct ObservationCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    ttl: Duration,
}

impl ObservationCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Record `observation` for `function`, replacing any previous entry and
    /// restarting its TTL.
    pub fn set(&self, function: &str, observation: ReplicaObservation) {
        let mut entries = self.entries.write().expect("observation cache lock");
        entries.insert(
            function.to_string(),
            CacheEntry {
                observation,
                stored_at: Instant::now(),
            },
        );
    }

    /// The latest observation for `function`, or `None` if absent or expired.
    pub fn get(&self, function: &str) -> Option<ReplicaObservation> {
        self.snapshot(function).map(|cached| cached.observation)
    }

    /// Like [`get`](Self::get) but also reports the entry's age.
    pub fn snapshot(&self, function: &str) -> Option<CachedObservation> {
        let entries = self.entries.read().expect("observation cache lock");
        let entry = entries.get(function)?;
        if entry.is_expired(self.ttl) {
            return None;
        }
        Some(CachedObservation {
            observation: entry.observation,
            age: entry.stored_at.elapsed(),
        })
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().expect("observation cache lock");
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(self.ttl));
        before - entries.len()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.read().expect("observation cache lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Purge expired entries every `interval` until shutdown.
    pub async fn run_sweeper(
        &self,
        interval: Duration,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) {
        info!(
            interval_ms = interval.as_millis() as u64,
            ttl_ms = self.ttl.as_millis() as u64,
            "observation cache sweeper started"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    let removed = self.purge_expired();
                    if removed > 0 {
                        debug!(removed, remaining = self.len(), "purged expired observations");
                    }
                }
                _ = shutdown.changed() => {
                    info!("observation cache sweeper shutting down");
                    break;
                }
            }
        }
    }
}
