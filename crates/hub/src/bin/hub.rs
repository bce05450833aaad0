// Path: crates/hub/src/bin/hub.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo
    )
)]

use anyhow::Result;
use clap::Parser;
use provenet_hub::{jobs, router, AppState};
use provenet_scheduler::Scheduler;
use provenet_types::config::HubConfig;
use std::path::Path;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[clap(name = "provenet-hub", about = "The provenet dispatch hub")]
struct HubOpts {
    /// Directory holding the `$MODE.toml` configuration profiles.
    #[clap(long, env = "CONFIG_DIR", default_value = ".")]
    config_dir: String,
    /// Overrides the bind address from the profile.
    #[clap(long, env = "HUB_LISTEN_ADDR")]
    listen_addr: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    provenet_telemetry::init::init_tracing("provenet-hub")?;

    let opts = HubOpts::parse();
    let config = HubConfig::load(Path::new(&opts.config_dir))?;
    let listen_addr = opts
        .listen_addr
        .unwrap_or_else(|| format!("{}:{}", config.server.host, config.server.port));
    tracing::info!(target: "hub", app = %config.app, %listen_addr, "starting");

    let state = AppState::from_config(config)?;

    let scheduler = Scheduler::new();
    jobs::register_jobs(&scheduler, Arc::clone(&state.registry))?;

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, router(Arc::clone(&state)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown().await;
    tracing::info!(target: "hub", "stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(target: "hub", error = %e, "failed to install ctrl-c handler");
    }
    tracing::info!(target: "hub", "shutdown signal received");
}
