// Path: crates/hub/src/probe.rs
//! Concurrent health check of a candidate node's two endpoints.

use provenet_ipc::prove::prove_service_client::ProveServiceClient;
use provenet_ipc::prove::Empty;
use std::time::Duration;
use tonic::transport::Endpoint;

/// Outcome of probing both endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOutcome {
    /// The RPC `Ping` round-trip succeeded.
    pub ok_rpc: bool,
    /// `GET /ping` answered with status 200.
    pub ok_http: bool,
}

impl ProbeOutcome {
    /// Both endpoints answered.
    pub fn is_ok(&self) -> bool {
        self.ok_rpc && self.ok_http
    }

    /// Human-readable rejection reason naming the failed endpoint(s).
    pub fn rejection_message(&self) -> String {
        let mut parts = Vec::new();
        if !self.ok_rpc {
            parts.push("gRPC server is unreachable.");
        }
        if !self.ok_http {
            parts.push("HTTP server is unreachable.");
        }
        parts.join(" ")
    }
}

/// Probes a node's RPC and HTTP endpoints concurrently under one deadline.
#[derive(Clone)]
pub struct LivenessProbe {
    http: reqwest::Client,
    deadline: Duration,
}

/// Total time budget shared by both probes.
pub const DEFAULT_PROBE_DEADLINE: Duration = Duration::from_secs(6);

impl LivenessProbe {
    /// A probe reusing the hub's shared HTTP client.
    pub fn new(http: reqwest::Client, deadline: Duration) -> Self {
        Self { http, deadline }
    }

    /// Probe both endpoints. Each leg that misses the deadline counts as
    /// unreachable; the call itself never exceeds the deadline by more
    /// than scheduling noise.
    pub async fn check(&self, grpc_addr: &str, http_addr: &str) -> ProbeOutcome {
        let (ok_rpc, ok_http) = tokio::join!(
            tokio::time::timeout(self.deadline, ping_rpc(grpc_addr)),
            tokio::time::timeout(self.deadline, self.ping_http(http_addr)),
        );
        ProbeOutcome {
            ok_rpc: ok_rpc.unwrap_or(false),
            ok_http: ok_http.unwrap_or(false),
        }
    }

    async fn ping_http(&self, http_addr: &str) -> bool {
        let url = format!("{http_addr}/ping");
        match self.http.get(&url).send().await {
            Ok(response) => {
                let ok = response.status() == reqwest::StatusCode::OK;
                tracing::debug!(target: "probe", %url, status = %response.status(), "http ping");
                ok
            }
            Err(e) => {
                tracing::debug!(target: "probe", %url, error = %e, "http ping failed");
                false
            }
        }
    }
}

async fn ping_rpc(grpc_addr: &str) -> bool {
    let uri = if grpc_addr.contains("://") {
        grpc_addr.to_string()
    } else {
        format!("http://{grpc_addr}")
    };
    let endpoint = match Endpoint::from_shared(uri.clone()) {
        Ok(endpoint) => endpoint.connect_timeout(Duration::from_secs(3)),
        Err(e) => {
            tracing::debug!(target: "probe", addr = %uri, error = %e, "bad rpc address");
            return false;
        }
    };
    match endpoint.connect().await {
        Ok(channel) => ProveServiceClient::new(channel)
            .ping(Empty {})
            .await
            .is_ok(),
        Err(e) => {
            tracing::debug!(target: "probe", addr = %uri, error = %e, "rpc connect failed");
            false
        }
    }
}
