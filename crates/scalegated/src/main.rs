//! scalegated — the scalegate daemon.
//!
//! Puts the scale-from-zero gate in front of a function upstream:
//! - Replica queries against the provider API
//! - Observation cache + periodic sweeper
//! - Gate middleware and reverse proxy
//! - Scaling inspection routes
//!
//! # Usage
//!
//! ```text
//! scalegated serve --config /etc/scalegate/scalegate.toml --port 8080
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use http::HeaderValue;
use tokio::sync::watch;
use tracing::{error, info, warn};

use scalegate_api::{GateState, build_router};
use scalegate_provider::HttpReplicaQuery;
use scalegate_scaling::{ObservationCache, Scaler, parse_duration};
use scalegated::{GatewayConfig, UpstreamProxy, proxy};

const DEFAULT_LOG_FILTER: &str = "info,scalegated=debug,scalegate=debug";

#[derive(Parser)]
#[command(name = "scalegated", about = "scalegate scale-from-zero gateway")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the gateway.
    Serve(ServeArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// TOML config file; flags below override its values.
    #[arg(long, env = "SCALEGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on.
    #[arg(long, env = "SCALEGATE_PORT")]
    port: Option<u16>,

    /// Provider API base URL for replica queries.
    #[arg(long, env = "SCALEGATE_PROVIDER_URL")]
    provider_url: Option<String>,

    /// Authorization header value sent to the provider.
    #[arg(long, env = "SCALEGATE_PROVIDER_AUTHORIZATION", hide_env_values = true)]
    provider_authorization: Option<String>,

    /// Base URL invocations are forwarded to.
    #[arg(long, env = "SCALEGATE_UPSTREAM_URL")]
    upstream_url: Option<String>,

    /// Poll attempts after a scale-up before giving up.
    #[arg(long)]
    max_poll_count: Option<u32>,

    /// Wait between polls, e.g. "50ms".
    #[arg(long, value_parser = parse_duration)]
    poll_interval: Option<Duration>,

    /// Lifetime of cached replica observations, e.g. "5s".
    #[arg(long, value_parser = parse_duration)]
    cache_expiry: Option<Duration>,

    /// Answer ready functions from the cache without querying the provider.
    #[arg(long)]
    cache_fast_path: bool,

    /// Emit logs as JSON.
    #[arg(long, env = "SCALEGATE_JSON_LOGS")]
    json_logs: bool,
}

impl ServeArgs {
    fn resolve_config(&self) -> anyhow::Result<GatewayConfig> {
        let mut config = match &self.config {
            Some(path) => GatewayConfig::from_file(path)?,
            None => GatewayConfig::default(),
        };

        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(url) = &self.provider_url {
            config.server.provider_url = url.clone();
        }
        if let Some(auth) = &self.provider_authorization {
            config.server.provider_authorization = Some(auth.clone());
        }
        if let Some(url) = &self.upstream_url {
            config.server.upstream_url = url.clone();
        }
        if let Some(count) = self.max_poll_count {
            config.scaling.max_poll_count = count;
        }
        if let Some(interval) = self.poll_interval {
            config.scaling.function_poll_interval = interval;
        }
        if let Some(expiry) = self.cache_expiry {
            config.scaling.cache_expiry = expiry;
        }
        if self.cache_fast_path {
            config.scaling.cache_fast_path = true;
        }

        config.validate()?;
        Ok(config)
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => {
            init_tracing(args.json_logs);
            let config = args.resolve_config()?;
            run_serve(config).await
        }
    }
}

async fn run_serve(config: GatewayConfig) -> anyhow::Result<()> {
    info!("scalegate starting");

    // ── Provider client ────────────────────────────────────────

    let mut query = HttpReplicaQuery::new(config.server.provider_url.clone())
        .with_timeout(config.server.provider_timeout()?);
    if let Some(auth) = &config.server.provider_authorization {
        let value = HeaderValue::from_str(auth).context("invalid provider authorization value")?;
        query = query.with_authorization(value);
    }
    info!(url = %config.server.provider_url, "provider client initialized");

    // ── Scaler ─────────────────────────────────────────────────

    let cache = ObservationCache::new(config.scaling.cache_expiry);
    let scaler = Arc::new(Scaler::new(config.scaling.clone(), Arc::new(query), cache.clone()));
    info!(
        max_poll_count = config.scaling.max_poll_count,
        poll_interval_ms = config.scaling.function_poll_interval.as_millis() as u64,
        cache_expiry_ms = config.scaling.cache_expiry.as_millis() as u64,
        cache_fast_path = config.scaling.cache_fast_path,
        "scaler initialized"
    );
    match config.scaling.poll_budget() {
        Some(budget) => info!(
            poll_budget_ms = budget.as_millis() as u64,
            "cold start wait bounded"
        ),
        None => warn!("poll budget does not fit in a duration"),
    }

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let sweep_interval = config.server.sweep_interval()?;
    let sweeper_shutdown = shutdown_rx.clone();
    let sweeper_handle = tokio::spawn(async move {
        cache.run_sweeper(sweep_interval, sweeper_shutdown).await;
    });

    // ── Start gateway ──────────────────────────────────────────

    let upstream = UpstreamProxy::new(config.server.upstream_url.clone());
    let state = GateState::new(scaler).with_shutdown(shutdown_rx);
    let router = build_router(state, proxy::router(upstream));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));

    info!(%addr, upstream = %config.server.upstream_url, "gateway listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    let _ = sweeper_handle.await;

    info!("scalegate stopped");
    Ok(())
}
