// Path: crates/hub/src/api/result.rs
//! `POST /result`: accept an encrypted proof result and relay it.

use crate::api::reply;
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use provenet_types::response::WireCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Body of `POST /result`: every field ciphertext under the hub session
/// public key.
#[derive(Debug, Serialize, Deserialize)]
pub struct PostResultRequest {
    /// Encrypted project name.
    pub project_name: String,
    /// Encrypted proof hash.
    pub proof_hash: String,
    /// Encrypted wall-clock duration (milliseconds, decimal text).
    pub duration: String,
    /// Encrypted verifier list (JSON array text).
    pub verifiers: String,
}

/// Decrypt the four result fields and forward them to the explorer.
/// Forwarding failures are logged, never surfaced: the node already did
/// the work and retrying is the explorer's problem.
pub async fn post_result(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PostResultRequest>,
) -> Response {
    let envelope = match state.session_keys.envelope().await {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::error!(target: "hub", endpoint = "POST /result", error = %e, "session key unavailable");
            return reply(StatusCode::INTERNAL_SERVER_ERROR, WireCode::PrivateKeyNotExist);
        }
    };

    let decrypted = (
        envelope.decrypt(&body.project_name),
        envelope.decrypt(&body.proof_hash),
        envelope.decrypt(&body.duration),
        envelope.decrypt(&body.verifiers),
    );
    let (project_name, proof_hash, duration, verifiers) = match decrypted {
        (Ok(project_name), Ok(proof_hash), Ok(duration), Ok(verifiers)) => {
            (project_name, proof_hash, duration, verifiers)
        }
        _ => {
            tracing::error!(target: "hub", endpoint = "POST /result", "decryption failed");
            return reply(StatusCode::BAD_REQUEST, WireCode::DecryptionFailed);
        }
    };

    tracing::info!(
        target: "hub",
        endpoint = "POST /result",
        project = %project_name,
        proof_hash = %proof_hash,
        "result accepted"
    );
    state
        .explorer
        .send_proof(&project_name, &proof_hash, &duration, &verifiers)
        .await;

    reply(StatusCode::OK, WireCode::Successfully)
}
