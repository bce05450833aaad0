// Path: crates/node/src/grpc.rs
//! The node's binary-RPC surface. Semantics match the HTTP handlers:
//! claim-first, same wire codes, same result shapes.

use crate::http::v1::report_to_hub;
use crate::prove::ProveParams;
use crate::prover::circom::CircomOp;
use crate::NodeState;
use provenet_ipc::prove::prove_service_server::ProveService as ProveServiceRpc;
use provenet_ipc::prove::{
    Empty, GetPublicKeyResponse, ProveBaseRequest, ProveNosha256OffchainRequest,
    ProveNosha256OffchainResponse, ProveNosha256Request, ProveNosha256Response,
    ProveNosha256WithWitnessRequest, ProveNosha256WithWitnessResponse, ProveRequest,
    ProveResponse, StatusResponse, UpdateVerifierRequest,
};
use provenet_types::error::TaskError;
use provenet_types::response::WireCode;
use std::sync::Arc;
use tonic::{Request, Response, Status};

/// Tonic service wrapping the shared node state.
pub struct ProveServiceGrpc {
    state: Arc<NodeState>,
}

impl ProveServiceGrpc {
    /// A service over the shared state.
    pub fn new(state: Arc<NodeState>) -> Self {
        Self { state }
    }

    fn claim(&self, proof_hash: &str) -> Result<(), StatusResponse> {
        self.state.task_cache.claim(proof_hash).map_err(|e: TaskError| {
            StatusResponse {
                code: WireCode::from(e).code(),
                msg: e.to_string(),
            }
        })
    }
}

fn params_from_base(
    base: Option<ProveBaseRequest>,
    length: u32,
    task_type: i32,
    oauth_provider: String,
) -> ProveParams {
    let base = base.unwrap_or_default();
    ProveParams {
        prover_id: base.prover_id,
        circuit_template_id: base.circuit_template_id,
        payload: base.input_data,
        is_encrypted: base.is_encrypted,
        auth_token: base.auth_token,
        task_type,
        length,
        oauth_provider,
    }
}

fn status_ok() -> StatusResponse {
    StatusResponse {
        code: WireCode::Successfully.code(),
        msg: WireCode::Successfully.msg().to_string(),
    }
}

#[tonic::async_trait]
impl ProveServiceRpc for ProveServiceGrpc {
    async fn ping(&self, _request: Request<Empty>) -> Result<Response<StatusResponse>, Status> {
        Ok(Response::new(StatusResponse {
            code: WireCode::Successfully.code(),
            msg: "Pong".to_string(),
        }))
    }

    async fn get_public_key(
        &self,
        _request: Request<Empty>,
    ) -> Result<Response<GetPublicKeyResponse>, Status> {
        let response = match self.state.prove.get_public_key().await {
            Ok(public_key) => GetPublicKeyResponse {
                base_response: Some(status_ok()),
                public_key,
            },
            Err(e) => GetPublicKeyResponse {
                base_response: Some(StatusResponse {
                    code: WireCode::NodePublicKeyNotFound.code(),
                    msg: e.to_string(),
                }),
                public_key: String::new(),
            },
        };
        Ok(Response::new(response))
    }

    async fn update_verifier(
        &self,
        request: Request<UpdateVerifierRequest>,
    ) -> Result<Response<StatusResponse>, Status> {
        let request = request.into_inner();
        let envelope = match self.state.crypto_keys.envelope().await {
            Ok(envelope) => envelope,
            Err(_) => {
                return Ok(Response::new(StatusResponse {
                    code: WireCode::NodePrivateKeyNotFound.code(),
                    msg: WireCode::NodePrivateKeyNotFound.msg().to_string(),
                }))
            }
        };
        let parsed = envelope.decrypt(&request.proof_hash).ok().zip(
            envelope
                .decrypt(&request.verifier)
                .ok()
                .and_then(|raw| serde_json::from_str::<Vec<String>>(&raw).ok()),
        );
        let Some((proof_hash, verifiers)) = parsed.filter(|(_, v)| !v.is_empty()) else {
            return Ok(Response::new(StatusResponse {
                code: WireCode::NodePrivateKeyInvalid.code(),
                msg: WireCode::NodePrivateKeyInvalid.msg().to_string(),
            }));
        };
        let response = if self.state.hub.update_verifier(&proof_hash, &verifiers).await {
            status_ok()
        } else {
            StatusResponse {
                code: WireCode::NodeError.code(),
                msg: "Update failed".to_string(),
            }
        };
        Ok(Response::new(response))
    }

    async fn prove_nosha256(
        &self,
        request: Request<ProveNosha256Request>,
    ) -> Result<Response<ProveNosha256Response>, Status> {
        let request = request.into_inner();
        if let Err(status) = self.claim(&request.proof_hash) {
            return Ok(Response::new(ProveNosha256Response {
                base_response: Some(status),
                proof_data: String::new(),
            }));
        }
        let params = params_from_base(
            request.base_request,
            request.length,
            request.task_type,
            request.oauth_provider,
        );
        let result = self.state.prove.prove_v1(CircomOp::Nosha256, &params).await;
        report_to_hub(&self.state, &request.proof_hash, &result).await;
        Ok(Response::new(ProveNosha256Response {
            base_response: Some(StatusResponse {
                code: result.code,
                msg: result.msg,
            }),
            proof_data: result.proof.unwrap_or_default(),
        }))
    }

    async fn prove_nosha256_with_witness(
        &self,
        request: Request<ProveNosha256WithWitnessRequest>,
    ) -> Result<Response<ProveNosha256WithWitnessResponse>, Status> {
        let request = request.into_inner();
        if let Err(status) = self.claim(&request.proof_hash) {
            return Ok(Response::new(ProveNosha256WithWitnessResponse {
                base_response: Some(status),
                proof_data: String::new(),
                witness_data: String::new(),
            }));
        }
        let params = params_from_base(
            request.base_request,
            request.length,
            request.task_type,
            request.oauth_provider,
        );
        let result = self
            .state
            .prove
            .prove_v1(CircomOp::Nosha256WithWitness, &params)
            .await;
        report_to_hub(&self.state, &request.proof_hash, &result).await;
        Ok(Response::new(ProveNosha256WithWitnessResponse {
            base_response: Some(StatusResponse {
                code: result.code,
                msg: result.msg,
            }),
            proof_data: result.proof.unwrap_or_default(),
            witness_data: result.witness.unwrap_or_default(),
        }))
    }

    async fn prove_nosha256_offchain(
        &self,
        request: Request<ProveNosha256OffchainRequest>,
    ) -> Result<Response<ProveNosha256OffchainResponse>, Status> {
        let request = request.into_inner();
        if let Err(status) = self.claim(&request.proof_hash) {
            return Ok(Response::new(ProveNosha256OffchainResponse {
                base_response: Some(status),
                proof_data: Vec::new(),
                witness_data: String::new(),
            }));
        }
        let params = params_from_base(
            request.base_request,
            request.length,
            request.task_type,
            request.oauth_provider,
        );
        let result = self
            .state
            .prove
            .prove_v1(CircomOp::Nosha256Offchain, &params)
            .await;
        report_to_hub(&self.state, &request.proof_hash, &result).await;
        Ok(Response::new(ProveNosha256OffchainResponse {
            base_response: Some(StatusResponse {
                code: result.code,
                msg: result.msg,
            }),
            proof_data: result.proof_bytes.unwrap_or_default(),
            witness_data: result.witness.unwrap_or_default(),
        }))
    }

    async fn prove(
        &self,
        request: Request<ProveRequest>,
    ) -> Result<Response<ProveResponse>, Status> {
        let request = request.into_inner();
        if let Err(status) = self.claim(&request.proof_hash) {
            return Ok(Response::new(ProveResponse {
                base_response: Some(status),
                ..ProveResponse::default()
            }));
        }
        let params = ProveParams {
            prover_id: request.prover,
            circuit_template_id: request.circuit_template_id,
            payload: request.payload,
            is_encrypted: request.is_encrypted,
            auth_token: request.auth_token,
            task_type: request.task_type,
            length: request.length,
            oauth_provider: request.oauth_provider,
        };
        let result = self.state.prove.prove_v2(&params).await;
        report_to_hub(&self.state, &request.proof_hash, &result).await;
        Ok(Response::new(ProveResponse {
            base_response: Some(StatusResponse {
                code: result.code,
                msg: result.msg,
            }),
            proof: result.proof.unwrap_or_default(),
            proof_solidity: result.proof_solidity.unwrap_or_default(),
            proof_bytes: result.proof_bytes.unwrap_or_default(),
            public_witness: result.public_witness.unwrap_or_default(),
            public_witness_bytes: result.public_witness_bytes.unwrap_or_default(),
        }))
    }
}
