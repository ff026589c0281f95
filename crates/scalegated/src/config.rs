//! scalegate.toml configuration.
//!
//! ```toml
//! [server]
//! port = 8080
//! provider_url = "http://127.0.0.1:8081"
//! upstream_url = "http://127.0.0.1:8081"
//! provider_timeout = "5s"
//! sweep_interval = "30s"
//!
//! [scaling]
//! max_poll_count = 1000
//! function_poll_interval = "50ms"
//! cache_expiry = "5s"
//! ```
//!
//! Every section is optional; command line flags override file values.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use scalegate_scaling::{ScalingConfig, parse_duration};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub scaling: ScalingConfig,
}

/// On-disk shape of scalegate.toml; missing values fall back to
/// [`GatewayConfig::default`].
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GatewayFile {
    server: ServerConfig,
    scaling: ScalingSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ScalingSection {
    max_poll_count: Option<u32>,
    function_poll_interval: Option<String>,
    cache_expiry: Option<String>,
    cache_fast_path: Option<bool>,
}

impl ScalingSection {
    fn merge_into(self, scaling: &mut ScalingConfig) -> anyhow::Result<()> {
        if let Some(count) = self.max_poll_count {
            scaling.max_poll_count = count;
        }
        if let Some(interval) = &self.function_poll_interval {
            scaling.function_poll_interval =
                parse_duration(interval).context("scaling.function_poll_interval")?;
        }
        if let Some(expiry) = &self.cache_expiry {
            scaling.cache_expiry = parse_duration(expiry).context("scaling.cache_expiry")?;
        }
        if let Some(enabled) = self.cache_fast_path {
            scaling.cache_fast_path = enabled;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// Control plane API used for replica queries.
    pub provider_url: String,
    /// Where ready invocations are forwarded.
    pub upstream_url: String,
    /// Value for the `Authorization` header sent to the provider.
    pub provider_authorization: Option<String>,
    pub provider_timeout: String,
    /// How often expired cache entries are purged.
    pub sweep_interval: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            provider_url: "http://127.0.0.1:8081".to_string(),
            upstream_url: "http://127.0.0.1:8081".to_string(),
            provider_authorization: None,
            provider_timeout: "5s".to_string(),
            sweep_interval: "30s".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn provider_timeout(&self) -> anyhow::Result<Duration> {
        parse_duration(&self.provider_timeout).context("server.provider_timeout")
    }

    pub fn sweep_interval(&self) -> anyhow::Result<Duration> {
        parse_duration(&self.sweep_interval).context("server.sweep_interval")
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            scaling: ScalingConfig::new(1000, Duration::from_millis(50), Duration::from_secs(5)),
        }
    }
}

impl GatewayConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let file: GatewayFile = toml::from_str(content)?;
        let mut config = GatewayConfig {
            server: file.server,
            ..GatewayConfig::default()
        };
        file.scaling.merge_into(&mut config.scaling)?;
        Ok(config)
    }

    /// Check every value the daemon will need before anything is started.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.scaling.validate()?;
        self.server.provider_timeout()?;
        let sweep = self.server.sweep_interval()?;
        anyhow::ensure!(!sweep.is_zero(), "server.sweep_interval must be greater than zero");
        Ok(())
    }
}
