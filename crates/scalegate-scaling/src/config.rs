//! Scaler configuration.
//!
//! Durations are written as short strings (`"50ms"`, `"5s"`, `"1m"`) so the
//! same struct can be embedded in a TOML file.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tunables for the scale-from-zero loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalingConfig {
    /// Poll attempts after a scale-up request before giving up.
    pub max_poll_count: u32,

    /// Wait between poll attempts.
    #[serde(with = "duration_str")]
    pub function_poll_interval: Duration,

    /// Lifetime of a cached replica observation.
    #[serde(with = "duration_str")]
    pub cache_expiry: Duration,

    /// Serve ready functions from a fresh cache entry without querying.
    #[serde(default)]
    pub cache_fast_path: bool,
}

impl ScalingConfig {
    pub fn new(max_poll_count: u32, function_poll_interval: Duration, cache_expiry: Duration) -> Self {
        Self {
            max_poll_count,
            function_poll_interval,
            cache_expiry,
            cache_fast_path: false,
        }
    }

    pub fn with_cache_fast_path(mut self, enabled: bool) -> Self {
        self.cache_fast_path = enabled;
        self
    }

    /// Upper bound on how long a single scale call waits between polls.
    /// `None` if the product does not fit in a `Duration`.
    pub fn poll_budget(&self) -> Option<Duration> {
        self.function_poll_interval.checked_mul(self.max_poll_count)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_expiry.is_zero() {
            return Err(ConfigError::ZeroCacheExpiry);
        }
        Ok(())
    }
}

/// Parse a duration string like `"500ms"`, `"5s"`, `"2m"` or a bare number
/// of seconds.
pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    let s = s.trim();
    let invalid = || ConfigError::InvalidDuration(s.to_string());

    if let Some(ms) = s.strip_suffix("ms") {
        ms.parse::<u64>().map(Duration::from_millis).map_err(|_| invalid())
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.parse::<u64>().map(Duration::from_secs).map_err(|_| invalid())
    } else if let Some(mins) = s.strip_suffix('m') {
        let mins = mins.parse::<u64>().map_err(|_| invalid())?;
        mins.checked_mul(60).map(Duration::from_secs).ok_or_else(invalid)
    } else {
        s.parse::<u64>().map(Duration::from_secs).map_err(|_| invalid())
    }
}

/// Render a duration in the shortest unit `parse_duration` reads back.
fn format_duration(d: Duration) -> String {
    if d.subsec_nanos() != 0 || d.is_zero() {
        format!("{}ms", d.as_millis())
    } else if d.as_secs() % 60 == 0 {
        format!("{}m", d.as_secs() / 60)
    } else {
        format!("{}s", d.as_secs())
    }
}

mod duration_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_duration(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}
