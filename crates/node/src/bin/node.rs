// Path: crates/node/src/bin/node.rs
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
use clap::{Parser, Subcommand};
use provenet_crypto::keygen::CryptoKeyWriter;
use provenet_ipc::prove::prove_service_server::ProveServiceServer;
use provenet_node::grpc::ProveServiceGrpc;
use provenet_node::validator::ValidatorRegistry;
use provenet_node::{router, NodeState};
use provenet_types::config::NodeConfig;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Channels pre-opened to each proving backend at startup.
const WARMUP_CHANNELS: usize = 2;

#[derive(Parser, Debug)]
#[clap(name = "provenet-node", about = "A provenet prover node")]
struct NodeOpts {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP and binary-RPC servers.
    Server {
        /// Directory holding the `$MODE.toml` configuration profiles.
        #[clap(long, env = "CONFIG_DIR", default_value = ".")]
        config_dir: String,
        /// Overrides the hub API URL from the profile.
        #[clap(long, env = "HUB_API")]
        hub_api: Option<String>,
    },
    /// Generate a crypto key pair.
    CryptoKeys {
        /// Directory to write `private_key` / `public_key` into.
        #[clap(short, long)]
        path: Option<String>,
        /// Key size in bits.
        #[clap(short, long)]
        size: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    provenet_telemetry::init::init_tracing("provenet-node")?;
    let opts = NodeOpts::parse();
    match opts.command {
        Command::Server {
            config_dir,
            hub_api,
        } => server(&config_dir, hub_api).await,
        Command::CryptoKeys { path, size } => crypto_keys(path, size),
    }
}

async fn server(config_dir: &str, hub_api: Option<String>) -> Result<()> {
    let mut config = NodeConfig::load(Path::new(config_dir))?;
    if let Some(hub_api) = hub_api {
        config.hub.api_url = hub_api;
    }
    let http_addr = format!("{}:{}", config.http.host, config.http.port);
    let grpc_addr = format!("{}:{}", config.grpc.host, config.grpc.port);
    tracing::info!(target: "node", app = %config.app, %http_addr, %grpc_addr, "starting");

    // Deployments plug their payload validators in here; an empty registry
    // rejects every ZKLOGIN request as UNSUPPORTED_OAUTH_PROVIDER.
    let validators = Arc::new(ValidatorRegistry::new());
    let state = NodeState::from_config(config, validators)?;

    // Channels are lazy past this point; a misconfigured backend address
    // surfaces here instead of on the first prove request.
    if let Err(e) = state.prove.warmup(WARMUP_CHANNELS) {
        tracing::warn!(target: "node", error = %e, "backend warmup failed");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let flusher = state.task_cache.spawn_flusher(shutdown_rx.clone());
    let heartbeat = tokio::spawn(Arc::clone(&state.hub).run_heartbeat(
        state.config.hub.grpc_info.clone(),
        state.config.hub.http_info.clone(),
        Duration::from_secs(state.config.hub.heartbeat_interval_secs),
        shutdown_rx.clone(),
    ));

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(target: "node", error = %e, "failed to install ctrl-c handler");
        }
        tracing::info!(target: "node", "shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    let http_listener = tokio::net::TcpListener::bind(&http_addr).await?;
    let mut http_shutdown = shutdown_rx.clone();
    let http_server = axum::serve(http_listener, router(Arc::clone(&state)))
        .with_graceful_shutdown(async move {
            let _ = http_shutdown.changed().await;
        });

    let grpc_service = ProveServiceServer::new(ProveServiceGrpc::new(Arc::clone(&state)));
    let mut grpc_shutdown = shutdown_rx.clone();
    let grpc_server = tonic::transport::Server::builder()
        .add_service(grpc_service)
        .serve_with_shutdown(grpc_addr.parse()?, async move {
            let _ = grpc_shutdown.changed().await;
        });

    let (http_result, grpc_result) = tokio::join!(http_server, grpc_server);
    http_result?;
    grpc_result?;

    // Servers are down; stop the background loops and close the pools.
    if let Err(e) = heartbeat.await {
        tracing::warn!(target: "node", error = %e, "heartbeat did not exit cleanly");
    }
    if let Err(e) = flusher.await {
        tracing::warn!(target: "node", error = %e, "flusher did not exit cleanly");
    }
    state.prove.close();
    tracing::info!(target: "node", "stopped");
    Ok(())
}

fn crypto_keys(path: Option<String>, size: usize) -> Result<()> {
    let dir = path.unwrap_or_else(|| NodeConfig::default().crypto_keys_path);
    let (private_path, public_path) = CryptoKeyWriter::new(&dir).generate(size)?;
    tracing::info!(
        target: "node",
        private = %private_path.display(),
        public = %public_path.display(),
        bits = size,
        "crypto keys generated"
    );
    Ok(())
}
