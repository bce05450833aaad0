// Path: crates/node/src/http/v2.rs
//! v2 HTTP surface: one prove endpoint with the richer result shape.

use crate::http::v1::report_to_hub;
use crate::http::reply_with_msg;
use crate::prove::ProveParams;
use crate::NodeState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use provenet_types::response::WireCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Body of `POST /api/v2/prove`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProveV2Request {
    /// Backend selector.
    pub prover: String,
    /// Circuit template id.
    pub circuit_template_id: String,
    /// Payload, possibly encrypted.
    pub payload: String,
    /// Whether `payload` is encrypted.
    pub is_encrypted: bool,
    /// Opaque auth token.
    #[serde(default)]
    pub auth_token: String,
    /// Validation family; absent defaults to ZKLOGIN.
    #[serde(default)]
    pub task_type: Option<i32>,
    /// Input length hint.
    #[serde(default)]
    pub length: Option<u32>,
    /// Requested payload validator.
    #[serde(default)]
    pub oauth_provider: Option<String>,
    /// The admitted proof hash being claimed.
    pub proof_hash: String,
}

/// Success body of `POST /api/v2/prove`. Byte fields are base64 text.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProveV2Response {
    /// Numeric wire code.
    pub code: i32,
    /// Outcome message.
    pub msg: String,
    /// Proof as JSON text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof: Option<String>,
    /// Solidity-calldata rendering of the proof.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof_solidity: Option<String>,
    /// Raw proof bytes, base64-encoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof_bytes: Option<String>,
    /// Public witness as JSON text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_witness: Option<String>,
    /// Raw public witness bytes, base64-encoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_witness_bytes: Option<String>,
}

/// `POST /api/v2/prove`: claim, prove, report, respond.
pub async fn prove(
    State(state): State<Arc<NodeState>>,
    Json(body): Json<ProveV2Request>,
) -> Response {
    if let Err(e) = state.task_cache.claim(&body.proof_hash) {
        return reply_with_msg(StatusCode::BAD_REQUEST, WireCode::from(e), &e.to_string());
    }

    let params = ProveParams {
        prover_id: body.prover.clone(),
        circuit_template_id: body.circuit_template_id.clone(),
        payload: body.payload.clone(),
        is_encrypted: body.is_encrypted,
        auth_token: body.auth_token.clone(),
        task_type: body.task_type.unwrap_or(0),
        length: body.length.unwrap_or(0),
        oauth_provider: body.oauth_provider.clone().unwrap_or_default(),
    };
    let result = state.prove.prove_v2(&params).await;
    report_to_hub(&state, &body.proof_hash, &result).await;

    (
        StatusCode::OK,
        Json(ProveV2Response {
            code: result.code,
            msg: result.msg,
            proof: result.proof,
            proof_solidity: result.proof_solidity,
            proof_bytes: result.proof_bytes.as_deref().map(|b| BASE64.encode(b)),
            public_witness: result.public_witness,
            public_witness_bytes: result
                .public_witness_bytes
                .as_deref()
                .map(|b| BASE64.encode(b)),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::test_node_state;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use provenet_types::TaskState;
    use tower::ServiceExt;

    #[tokio::test]
    async fn v2_claim_failures_use_the_same_codes_as_v1() {
        let (state, _guard) = test_node_state().await;
        state.task_cache.set(
            "0xclaimed",
            TaskState::Running,
            Some(std::time::Duration::from_secs(60)),
        );
        let body = serde_json::json!({
            "prover": "circom",
            "circuit_template_id": "20001",
            "payload": "{}",
            "is_encrypted": false,
            "proof_hash": "0xclaimed",
        });
        let response = crate::router(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v2/prove")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], -2010);
        assert_eq!(body["msg"], "Proof hash is invalid");
    }
}
