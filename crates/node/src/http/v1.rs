// Path: crates/node/src/http/v1.rs
//! v1 HTTP handlers: ping, task admission, the prove variants, public key
//! export and verifier updates.

use crate::http::{reply, reply_with_msg};
use crate::prove::{ProofResult, ProveParams};
use crate::prover::circom::CircomOp;
use crate::NodeState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use provenet_types::response::WireCode;
use provenet_types::TaskState;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// `GET /ping`.
pub async fn ping() -> Response {
    reply_with_msg(StatusCode::OK, WireCode::Successfully, "Pong")
}

/// Body of `POST /push_task`.
#[derive(Debug, Serialize, Deserialize)]
pub struct PushTaskRequest {
    /// The proof hash the hub dispatched.
    pub proof_hash: String,
    /// Hub signature over the proof hash.
    pub signature: String,
}

/// `POST /push_task`: verify the hub's signature and admit the hash as
/// `PENDING` with the default TTL. A hash that is already present — any
/// state, any remaining TTL — is a replay.
pub async fn push_task(
    State(state): State<Arc<NodeState>>,
    Json(body): Json<PushTaskRequest>,
) -> Response {
    let envelope = match state.session_key.envelope().await {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::error!(target: "node", endpoint = "POST /push_task", error = %e, "session key unavailable");
            return reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                WireCode::NodePublicKeyNotFound,
            );
        }
    };

    if !envelope.verify(&body.proof_hash, &body.signature) {
        tracing::warn!(target: "node", endpoint = "POST /push_task", "invalid signature");
        return reply_with_msg(
            StatusCode::BAD_REQUEST,
            WireCode::RequestError,
            "invalid signature",
        );
    }

    if state.task_cache.get(&body.proof_hash).is_some() {
        tracing::warn!(
            target: "node",
            endpoint = "POST /push_task",
            proof_hash = %body.proof_hash,
            "replayed proof hash"
        );
        return reply_with_msg(
            StatusCode::BAD_REQUEST,
            WireCode::RequestError,
            "Proof hash is exist",
        );
    }

    state.task_cache.set(
        &body.proof_hash,
        TaskState::Pending,
        Some(crate::task_cache::DEFAULT_TTL),
    );
    tracing::info!(
        target: "node",
        endpoint = "POST /push_task",
        proof_hash = %body.proof_hash,
        "task admitted"
    );
    reply(StatusCode::OK, WireCode::Successfully)
}

/// Body shared by the v1 prove endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProveRequestV1 {
    /// Backend selector.
    pub prover_id: String,
    /// Circuit template id.
    pub circuit_template_id: String,
    /// Payload, possibly encrypted.
    pub input_data: String,
    /// Whether `input_data` is encrypted.
    pub is_encrypted: bool,
    /// Opaque auth token.
    #[serde(default)]
    pub auth_token: String,
    /// The admitted proof hash being claimed.
    pub proof_hash: String,
    /// Validation family; absent defaults to ZKLOGIN.
    #[serde(default)]
    pub method: Option<i32>,
    /// Requested payload validator.
    #[serde(default)]
    pub oauth_provider: Option<String>,
    /// Input length hint for the nosha256 variants.
    #[serde(default)]
    pub length: Option<u32>,
}

impl ProveRequestV1 {
    fn params(&self) -> ProveParams {
        ProveParams {
            prover_id: self.prover_id.clone(),
            circuit_template_id: self.circuit_template_id.clone(),
            payload: self.input_data.clone(),
            is_encrypted: self.is_encrypted,
            auth_token: self.auth_token.clone(),
            task_type: self.method.unwrap_or(0),
            length: self.length.unwrap_or(0),
            oauth_provider: self.oauth_provider.clone().unwrap_or_default(),
        }
    }
}

/// Success body of the v1 prove endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProveResponseV1 {
    /// Numeric wire code.
    pub code: i32,
    /// Outcome message.
    pub msg: String,
    /// Proof as JSON text, or base64 bytes for the offchain variant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof_data: Option<String>,
    /// Witness as JSON text (witness variants only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub witness_data: Option<String>,
}

/// Claim the hash, run one prove variant, report the result to the hub.
async fn run_prove(state: Arc<NodeState>, op: CircomOp, request: ProveRequestV1) -> Response {
    if let Err(e) = state.task_cache.claim(&request.proof_hash) {
        return reply_with_msg(StatusCode::BAD_REQUEST, WireCode::from(e), &e.to_string());
    }

    let result = state.prove.prove_v1(op, &request.params()).await;
    report_to_hub(&state, &request.proof_hash, &result).await;

    let proof_data = match op {
        CircomOp::Nosha256Offchain => result
            .proof_bytes
            .as_deref()
            .map(|bytes| BASE64.encode(bytes))
            .or(result.proof),
        _ => result.proof,
    };
    let witness_data = match op {
        CircomOp::Nosha256WithWitness | CircomOp::Nosha256Offchain => result.witness,
        _ => None,
    };
    (
        StatusCode::OK,
        Json(ProveResponseV1 {
            code: result.code,
            msg: result.msg,
            proof_data,
            witness_data,
        }),
    )
        .into_response()
}

pub(crate) async fn report_to_hub(state: &NodeState, proof_hash: &str, result: &ProofResult) {
    if let (Some(project_name), Some(duration_ms)) = (&result.project_name, result.duration_ms) {
        state
            .hub
            .send_result(project_name, proof_hash, duration_ms, &result.verifiers)
            .await;
    }
}

/// `POST /prove`.
pub async fn prove(
    State(state): State<Arc<NodeState>>,
    Json(body): Json<ProveRequestV1>,
) -> Response {
    run_prove(state, CircomOp::Prove, body).await
}

/// `POST /prove_nosha256`.
pub async fn prove_nosha256(
    State(state): State<Arc<NodeState>>,
    Json(body): Json<ProveRequestV1>,
) -> Response {
    run_prove(state, CircomOp::Nosha256, body).await
}

/// `POST /prove_nosha256_with_witness`.
pub async fn prove_nosha256_with_witness(
    State(state): State<Arc<NodeState>>,
    Json(body): Json<ProveRequestV1>,
) -> Response {
    run_prove(state, CircomOp::Nosha256WithWitness, body).await
}

/// `POST /prove_nosha256_offchain`.
pub async fn prove_nosha256_offchain(
    State(state): State<Arc<NodeState>>,
    Json(body): Json<ProveRequestV1>,
) -> Response {
    run_prove(state, CircomOp::Nosha256Offchain, body).await
}

/// Success body of `GET /get_public_key`.
#[derive(Debug, Serialize, Deserialize)]
pub struct GetPublicKeyResponse {
    /// Numeric wire code.
    pub code: i32,
    /// Outcome message.
    pub msg: String,
    /// The node's crypto public key PEM.
    pub public_key: String,
}

/// `GET /get_public_key`.
pub async fn get_public_key(State(state): State<Arc<NodeState>>) -> Response {
    match state.prove.get_public_key().await {
        Ok(public_key) => (
            StatusCode::OK,
            Json(GetPublicKeyResponse {
                code: WireCode::Successfully.code(),
                msg: WireCode::Successfully.msg().to_string(),
                public_key,
            }),
        )
            .into_response(),
        Err(e) => reply_with_msg(
            StatusCode::OK,
            WireCode::NodePublicKeyNotFound,
            &e.to_string(),
        ),
    }
}

/// Body of `PUT /verifier`: both fields ciphertext under the node's crypto
/// public key; `verifier` decrypts to a JSON string array.
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateVerifierRequest {
    /// Encrypted proof hash.
    pub proof_hash: String,
    /// Encrypted verifier list (JSON array text).
    pub verifier: String,
}

/// `PUT /verifier`: decrypt the update and relay it to the hub.
pub async fn put_verifier(
    State(state): State<Arc<NodeState>>,
    Json(body): Json<UpdateVerifierRequest>,
) -> Response {
    let envelope = match state.crypto_keys.envelope().await {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::error!(target: "node", endpoint = "PUT /verifier", error = %e, "crypto key unavailable");
            return reply(StatusCode::OK, WireCode::NodePrivateKeyNotFound);
        }
    };

    let parsed = envelope.decrypt(&body.proof_hash).ok().zip(
        envelope
            .decrypt(&body.verifier)
            .ok()
            .and_then(|raw| serde_json::from_str::<Vec<String>>(&raw).ok()),
    );
    let Some((proof_hash, verifiers)) = parsed else {
        tracing::error!(target: "node", endpoint = "PUT /verifier", "decryption failed");
        return reply(StatusCode::OK, WireCode::NodePrivateKeyInvalid);
    };
    if verifiers.is_empty() {
        return reply(StatusCode::OK, WireCode::NodePrivateKeyInvalid);
    }

    if state.hub.update_verifier(&proof_hash, &verifiers).await {
        reply(StatusCode::OK, WireCode::Successfully)
    } else {
        reply_with_msg(StatusCode::OK, WireCode::NodeError, "Update failed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::test_node_state;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use provenet_crypto::RsaEnvelope;
    use tower::ServiceExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn push_request(proof_hash: &str, signature: &str) -> Request<Body> {
        let body = serde_json::json!({
            "proof_hash": proof_hash,
            "signature": signature,
        });
        Request::builder()
            .method("POST")
            .uri("/push_task")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn ping_pongs() {
        let (state, _guard) = test_node_state().await;
        let response = crate::router(state)
            .oneshot(
                Request::builder()
                    .uri("/ping")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["msg"], "Pong");
    }

    #[tokio::test]
    async fn push_task_admits_a_hub_signed_hash() {
        let (state, guard) = test_node_state().await;
        let proof_hash = "0xabc123";
        let signature = guard.hub_envelope.sign(proof_hash).unwrap();

        let response = crate::router(Arc::clone(&state))
            .oneshot(push_request(proof_hash, &signature))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.task_cache.get(proof_hash), Some(TaskState::Pending));
    }

    #[tokio::test]
    async fn push_task_rejects_a_replayed_hash() {
        let (state, guard) = test_node_state().await;
        let proof_hash = "0xreplayed";
        let signature = guard.hub_envelope.sign(proof_hash).unwrap();

        let app = crate::router(Arc::clone(&state));
        let first = app
            .clone()
            .oneshot(push_request(proof_hash, &signature))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app
            .oneshot(push_request(proof_hash, &signature))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::BAD_REQUEST);
        let body = body_json(second).await;
        assert_eq!(body["msg"], "Proof hash is exist");
    }

    #[tokio::test]
    async fn push_task_rejects_a_foreign_signature() {
        let (state, _guard) = test_node_state().await;
        let proof_hash = "0xforged";
        let forged = RsaEnvelope::generate(1024)
            .unwrap()
            .sign(proof_hash)
            .unwrap();

        let response = crate::router(Arc::clone(&state))
            .oneshot(push_request(proof_hash, &forged))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["msg"], "invalid signature");
        // No entry may be created for a forged push.
        assert_eq!(state.task_cache.get(proof_hash), None);
    }

    #[tokio::test]
    async fn prove_without_an_admitted_hash_is_task_not_found() {
        let (state, _guard) = test_node_state().await;
        let body = serde_json::json!({
            "prover_id": "circom",
            "circuit_template_id": "20001",
            "input_data": "{}",
            "is_encrypted": false,
            "proof_hash": "0xnever-admitted",
        });
        let response = crate::router(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/prove")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["code"], -2009);
        assert_eq!(body["msg"], "Proof hash does not exist");
    }

    #[tokio::test]
    async fn get_public_key_returns_the_pem() {
        let (state, _guard) = test_node_state().await;
        let response = crate::router(state)
            .oneshot(
                Request::builder()
                    .uri("/get_public_key")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["code"], 0);
        assert!(body["public_key"]
            .as_str()
            .unwrap()
            .contains("BEGIN PUBLIC KEY"));
    }
}
