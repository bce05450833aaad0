// Path: crates/node/src/hub_client.rs
//! The node's view of the hub: heartbeat registration and result
//! write-back, every field encrypted under the hub's session public key.

use provenet_crypto::KeyCache;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Client for the hub API.
pub struct HubClient {
    api_url: String,
    session_key: Arc<KeyCache>,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct HeartbeatBody {
    grpc_info: String,
    http_info: String,
}

#[derive(Serialize)]
struct ResultBody {
    project_name: String,
    proof_hash: String,
    duration: String,
    verifiers: String,
}

#[derive(Serialize)]
struct VerifierBody {
    proof_hash: String,
    verifiers: String,
}

impl HubClient {
    /// A client for the hub at `api_url`, optionally routed through an
    /// outbound proxy.
    pub fn new(
        api_url: String,
        session_key: Arc<KeyCache>,
        proxy: Option<&str>,
    ) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder().timeout(Duration::from_secs(6));
        if let Some(proxy) = proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }
        Ok(Self {
            api_url,
            session_key,
            http: builder.build()?,
        })
    }

    /// POST a completed proof to the hub's `/result`. Failures are logged
    /// and dropped: the proof is still returned to the caller.
    pub async fn send_result(
        &self,
        project_name: &str,
        proof_hash: &str,
        duration_ms: u64,
        verifiers: &[String],
    ) {
        let envelope = match self.session_key.envelope().await {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::error!(target: "hub_client", error = %e, "session key unavailable");
                return;
            }
        };
        let verifiers_json = serde_json::to_string(verifiers).unwrap_or_else(|_| "[]".to_string());
        let body = match (
            envelope.encrypt(project_name),
            envelope.encrypt(proof_hash),
            envelope.encrypt(&duration_ms.to_string()),
            envelope.encrypt(&verifiers_json),
        ) {
            (Ok(project_name), Ok(proof_hash), Ok(duration), Ok(verifiers)) => ResultBody {
                project_name,
                proof_hash,
                duration,
                verifiers,
            },
            _ => {
                tracing::error!(target: "hub_client", "failed to encrypt result fields");
                return;
            }
        };
        let url = format!("{}/api/v1/hub/result", self.api_url);
        match self.http.post(&url).json(&body).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::info!(target: "hub_client", proof_hash, "result sent to hub");
            }
            Ok(response) => {
                tracing::error!(target: "hub_client", status = %response.status(), "hub rejected result");
            }
            Err(e) => {
                tracing::error!(target: "hub_client", error = %e, "result send failed");
            }
        }
    }

    /// PUT a verifier update to the hub's `/verifier`. Returns whether the
    /// hub accepted it.
    pub async fn update_verifier(&self, proof_hash: &str, verifiers: &[String]) -> bool {
        let envelope = match self.session_key.envelope().await {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::error!(target: "hub_client", error = %e, "session key unavailable");
                return false;
            }
        };
        let verifiers_json = serde_json::to_string(verifiers).unwrap_or_else(|_| "[]".to_string());
        let body = match (envelope.encrypt(proof_hash), envelope.encrypt(&verifiers_json)) {
            (Ok(proof_hash), Ok(verifiers)) => VerifierBody {
                proof_hash,
                verifiers,
            },
            _ => {
                tracing::error!(target: "hub_client", "failed to encrypt verifier fields");
                return false;
            }
        };
        let url = format!("{}/api/v1/hub/verifier", self.api_url);
        match self.http.put(&url).json(&body).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::info!(target: "hub_client", proof_hash, "verifier updated at hub");
                true
            }
            Ok(response) => {
                tracing::error!(target: "hub_client", status = %response.status(), "hub rejected verifier update");
                false
            }
            Err(e) => {
                tracing::error!(target: "hub_client", error = %e, "verifier update failed");
                false
            }
        }
    }

    /// Re-register this node's endpoints with the hub every `interval`
    /// until shutdown. Transport errors are logged and retried at the next
    /// beat; the loop never terminates on its own.
    pub async fn run_heartbeat(
        self: Arc<Self>,
        grpc_info: String,
        http_info: String,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let url = format!("{}/api/v1/hub/node", self.api_url);
        tracing::info!(
            target: "heartbeat",
            %url,
            interval_secs = interval.as_secs(),
            "heartbeat started"
        );
        loop {
            match self.session_key.envelope().await {
                Ok(envelope) => {
                    match (envelope.encrypt(&grpc_info), envelope.encrypt(&http_info)) {
                        (Ok(grpc_info), Ok(http_info)) => {
                            let body = HeartbeatBody {
                                grpc_info,
                                http_info,
                            };
                            match self.http.post(&url).json(&body).send().await {
                                Ok(response) if response.status().is_success() => {
                                    tracing::debug!(target: "heartbeat", "heartbeat sent");
                                }
                                Ok(response) => {
                                    tracing::error!(
                                        target: "heartbeat",
                                        status = %response.status(),
                                        "hub rejected heartbeat"
                                    );
                                }
                                Err(e) => {
                                    tracing::error!(target: "heartbeat", error = %e, "heartbeat failed");
                                }
                            }
                        }
                        _ => {
                            tracing::error!(target: "heartbeat", "failed to encrypt endpoints");
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(target: "heartbeat", error = %e, "session key unavailable");
                }
            }
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }
        tracing::info!(target: "heartbeat", "heartbeat stopped");
    }
}
