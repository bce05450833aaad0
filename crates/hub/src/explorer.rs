// Path: crates/hub/src/explorer.rs
//! Forwarding of signed results to the external explorer service.
//!
//! Every field crossing to the explorer is re-encrypted under the
//! explorer's public key, obtained through the key cache like every other
//! envelope in the process. Forwarding failures are logged and dropped:
//! the hub has already accepted the result.

use provenet_crypto::KeyCache;
use serde::Serialize;
use std::sync::Arc;

/// Client for the explorer's data-ingestion endpoints.
pub struct Explorer {
    api: String,
    key: Arc<KeyCache>,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct ProofBody {
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

impl Explorer {
    /// A client for `api`, encrypting under the public key cached in `key`.
    /// An empty `api` disables forwarding.
    pub fn new(api: String, key: Arc<KeyCache>, http: reqwest::Client) -> Self {
        Self { api, key, http }
    }

    /// POST a completed proof to `/api/v1/data/proof`.
    pub async fn send_proof(
        &self,
        project_name: &str,
        proof_hash: &str,
        duration: &str,
        verifiers: &str,
    ) {
        if self.api.is_empty() {
            tracing::warn!(target: "explorer", "no explorer configured, dropping proof result");
            return;
        }
        let envelope = match self.key.envelope().await {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::error!(target: "explorer", error = %e, "explorer key unavailable");
                return;
            }
        };
        let body = match (
            envelope.encrypt(project_name),
            envelope.encrypt(proof_hash),
            envelope.encrypt(duration),
            envelope.encrypt(verifiers),
        ) {
            (Ok(project_name), Ok(proof_hash), Ok(duration), Ok(verifiers)) => ProofBody {
                project_name,
                proof_hash,
                duration,
                verifiers,
            },
            _ => {
                tracing::error!(target: "explorer", "failed to encrypt proof fields");
                return;
            }
        };
        let url = format!("{}/api/v1/data/proof", self.api);
        match self.http.post(&url).json(&body).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::info!(target: "explorer", "proof forwarded");
            }
            Ok(response) => {
                tracing::error!(target: "explorer", status = %response.status(), "explorer rejected proof");
            }
            Err(e) => {
                tracing::error!(target: "explorer", error = %e, "proof forward failed");
            }
        }
    }

    /// PUT a verifier update to `/api/v1/data/verifier`.
    pub async fn update_verifier(&self, proof_hash: &str, verifiers: &[String]) {
        if self.api.is_empty() {
            tracing::warn!(target: "explorer", "no explorer configured, dropping verifier update");
            return;
        }
        let envelope = match self.key.envelope().await {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::error!(target: "explorer", error = %e, "explorer key unavailable");
                return;
            }
        };
        let verifiers_json = serde_json::to_string(verifiers).unwrap_or_else(|_| "[]".to_string());
        let body = match (envelope.encrypt(proof_hash), envelope.encrypt(&verifiers_json)) {
            (Ok(proof_hash), Ok(verifiers)) => VerifierBody {
                proof_hash,
                verifiers,
            },
            _ => {
                tracing::error!(target: "explorer", "failed to encrypt verifier fields");
                return;
            }
        };
        let url = format!("{}/api/v1/data/verifier", self.api);
        match self.http.put(&url).json(&body).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::info!(target: "explorer", "verifier update forwarded");
            }
            Ok(response) => {
                tracing::error!(target: "explorer", status = %response.status(), "explorer rejected verifier update");
            }
            Err(e) => {
                tracing::error!(target: "explorer", error = %e, "verifier update failed");
            }
        }
    }
}
