// Path: crates/hub/src/api/node.rs
//! `GET /node` (dispatch) and `POST /node` (registration).

use crate::api::{ok_json, reply, reply_with_msg, reply_with_results};
use crate::dispatch;
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use provenet_types::error::CryptoError;
use provenet_types::node::NodeInfo;
use provenet_types::response::WireCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Success body of `GET /node`.
#[derive(Debug, Serialize, Deserialize)]
pub struct GetNodeResponse {
    /// Numeric wire code.
    pub code: i32,
    /// Outcome message.
    pub msg: String,
    /// The nodes the task was dispatched to.
    pub results: Vec<NodeInfo>,
    /// The proof hash every selected node received.
    pub proof_hash: String,
}

/// `GET /node`: sign a fresh proof hash, fan it out, return the attempted
/// nodes. The pushes are fire-and-forget — a `results` entry is no proof
/// the node acknowledged the task.
pub async fn get_node(State(state): State<Arc<AppState>>) -> Response {
    let started = Instant::now();

    let envelope = match state.session_keys.envelope().await {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::error!(target: "hub", endpoint = "GET /node", error = %e, "signing key unavailable");
            return reply(StatusCode::INTERNAL_SERVER_ERROR, WireCode::PrivateKeyNotExist);
        }
    };

    let request_id = uuid::Uuid::new_v4().to_string();
    let proof_hash = dispatch::generate_proof_hash(&request_id);
    let signature = match envelope.sign(&proof_hash) {
        Ok(signature) => signature,
        Err(e) => {
            tracing::error!(target: "hub", endpoint = "GET /node", error = %e, "signing failed");
            return reply(StatusCode::INTERNAL_SERVER_ERROR, WireCode::RequestError);
        }
    };

    let results = dispatch::fan_out(
        &state.registry,
        &state.http,
        state.config.registry.sample_size,
        &proof_hash,
        &signature,
    )
    .await;

    if results.is_empty() {
        tracing::error!(target: "hub", endpoint = "GET /node", "failed to process any nodes");
        return reply_with_msg(
            StatusCode::BAD_REQUEST,
            WireCode::RequestError,
            "Failed to process any nodes.",
        );
    }

    tracing::info!(
        target: "hub",
        endpoint = "GET /node",
        nodes = results.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "dispatch completed"
    );
    ok_json(GetNodeResponse {
        code: WireCode::Successfully.code(),
        msg: WireCode::Successfully.msg().to_string(),
        results,
        proof_hash,
    })
}

/// Body of `POST /node`: both endpoints ciphertext under the hub's session
/// public key.
#[derive(Debug, Serialize, Deserialize)]
pub struct PostNodeRequest {
    /// Encrypted RPC endpoint address.
    pub grpc_info: String,
    /// Encrypted HTTP endpoint address.
    pub http_info: String,
}

/// `POST /node`: decrypt the candidate's endpoints, probe both, register.
pub async fn post_node(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PostNodeRequest>,
) -> Response {
    let started = Instant::now();

    let envelope = match state.session_keys.envelope().await {
        Ok(envelope) => envelope,
        Err(e @ CryptoError::KeyNotFound(_)) => {
            tracing::error!(target: "hub", endpoint = "POST /node", error = %e, "session key missing");
            return reply(StatusCode::INTERNAL_SERVER_ERROR, WireCode::PrivateKeyNotExist);
        }
        Err(e) => {
            tracing::error!(target: "hub", endpoint = "POST /node", error = %e, "session key unusable");
            return reply(StatusCode::INTERNAL_SERVER_ERROR, WireCode::PrivateKeyNotExist);
        }
    };

    // Empty plaintext and padding failures collapse into one error kind, so
    // a single match covers every rejection path.
    let (grpc_info, http_info) = match (
        envelope.decrypt(&body.grpc_info),
        envelope.decrypt(&body.http_info),
    ) {
        (Ok(grpc_info), Ok(http_info)) => (grpc_info, http_info),
        _ => {
            tracing::error!(target: "hub", endpoint = "POST /node", "payload decryption failed");
            return reply(StatusCode::BAD_REQUEST, WireCode::DecryptionFailed);
        }
    };

    let outcome = state.probe.check(&grpc_info, &http_info).await;
    if !outcome.is_ok() {
        tracing::error!(
            target: "hub",
            endpoint = "POST /node",
            grpc = %grpc_info,
            http = %http_info,
            reason = %outcome.rejection_message(),
            "registration rejected"
        );
        return reply_with_results(
            StatusCode::BAD_REQUEST,
            WireCode::RegisterFailed,
            outcome.rejection_message(),
        );
    }

    let id = state.registry.add(&grpc_info, &http_info);
    tracing::info!(
        target: "hub",
        endpoint = "POST /node",
        node_id = %id,
        grpc = %grpc_info,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "node registered"
    );
    reply(StatusCode::OK, WireCode::Successfully)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::test_state;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn get_node_with_empty_registry_is_400() {
        let (state, _guard) = test_state().await;
        let app = crate::router(state);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/hub/node")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["msg"], "Failed to process any nodes.");
    }

    #[tokio::test]
    async fn get_node_signs_a_fresh_proof_hash() {
        let (state, _guard) = test_state().await;
        state.registry.add("127.0.0.1:1", "http://127.0.0.1:9");
        let app = crate::router(Arc::clone(&state));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/hub/node")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["code"], 0);
        let proof_hash = body["proof_hash"].as_str().unwrap();
        assert!(proof_hash.starts_with("0x"));
        assert_eq!(proof_hash.len(), 66);
        assert_eq!(body["results"].as_array().unwrap().len(), 1);
        assert!(body["results"][0]["poh"].as_str().is_some());
    }

    #[tokio::test]
    async fn post_node_with_undecryptable_payload_is_400() {
        let (state, _guard) = test_state().await;
        let app = crate::router(Arc::clone(&state));
        let request_body = serde_json::json!({
            "grpc_info": "!!garbage!!",
            "http_info": "!!garbage!!",
        });
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/hub/node")
                    .header("content-type", "application/json")
                    .body(Body::from(request_body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["code"], -1008);
        assert_eq!(state.registry.len(), 0);
    }

    #[tokio::test]
    async fn post_node_rejects_unreachable_endpoints() {
        let (state, _guard) = test_state().await;
        let envelope = state.session_keys.envelope().await.unwrap();
        let request_body = serde_json::json!({
            "grpc_info": envelope.encrypt("192.0.2.1:50050").unwrap(),
            "http_info": envelope.encrypt("http://192.0.2.1:50051").unwrap(),
        });
        let app = crate::router(Arc::clone(&state));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/hub/node")
                    .header("content-type", "application/json")
                    .body(Body::from(request_body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["code"], -1009);
        // Invariant: a rejected registration leaves the registry unchanged.
        assert_eq!(state.registry.len(), 0);
    }
}
