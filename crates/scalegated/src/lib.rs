//! scalegated — config loading and the upstream proxy used by the daemon.

pub mod config;
pub mod proxy;

pub use config::GatewayConfig;
pub use proxy::UpstreamProxy;
