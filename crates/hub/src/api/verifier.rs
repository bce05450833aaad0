// Path: crates/hub/src/api/verifier.rs
//! `PUT /verifier`: accept an encrypted verifier update and relay it.

use crate::api::reply;
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use provenet_types::response::WireCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Body of `PUT /verifier`: both fields ciphertext under the hub session
/// public key; `verifiers` decrypts to a JSON string array.
#[derive(Debug, Serialize, Deserialize)]
pub struct PutVerifierRequest {
    /// Encrypted proof hash.
    pub proof_hash: String,
    /// Encrypted verifier list (JSON array text).
    pub verifiers: String,
}

/// Decrypt both fields, parse the verifier array, forward to the explorer.
pub async fn put_verifier(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PutVerifierRequest>,
) -> Response {
    let envelope = match state.session_keys.envelope().await {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::error!(target: "hub", endpoint = "PUT /verifier", error = %e, "session key unavailable");
            return reply(StatusCode::INTERNAL_SERVER_ERROR, WireCode::PrivateKeyNotExist);
        }
    };

    // A verifier list that decrypts but does not parse as a JSON array is
    // the same failure as one that does not decrypt.
    let parsed = envelope.decrypt(&body.proof_hash).ok().zip(
        envelope
            .decrypt(&body.verifiers)
            .ok()
            .and_then(|raw| serde_json::from_str::<Vec<String>>(&raw).ok()),
    );
    let Some((proof_hash, verifiers)) = parsed else {
        tracing::error!(target: "hub", endpoint = "PUT /verifier", "decryption failed");
        return reply(StatusCode::BAD_REQUEST, WireCode::DecryptionFailed);
    };
    if verifiers.is_empty() {
        tracing::error!(target: "hub", endpoint = "PUT /verifier", "decryption returned empty data");
        return reply(StatusCode::BAD_REQUEST, WireCode::DecryptionFailed);
    }

    tracing::info!(
        target: "hub",
        endpoint = "PUT /verifier",
        proof_hash = %proof_hash,
        verifiers = verifiers.len(),
        "verifier update accepted"
    );
    state.explorer.update_verifier(&proof_hash, &verifiers).await;

    reply(StatusCode::OK, WireCode::Successfully)
}
