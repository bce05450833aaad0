// Path: crates/node/src/prover/circom.rs
//! Client for the circom proving engine.

use super::pool::{ChannelPool, PooledChannel};
use super::{call_with_retry, MAX_MESSAGE_BYTES};
use provenet_ipc::backend::proving_backend_client::ProvingBackendClient;
use provenet_ipc::backend::{BackendProveRequest, BackendProveResponse};
use provenet_types::error::ProveError;
use std::sync::Arc;
use tonic::transport::Channel;

/// The v1/v2 prove variants the circom engine serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircomOp {
    /// Full prove with SHA256 preprocessing (v1 `/prove`, v2 `Prove`).
    Prove,
    /// Prove without SHA256 preprocessing.
    Nosha256,
    /// Like `Nosha256`, also returning the witness.
    Nosha256WithWitness,
    /// Off-chain proof bytes plus witness.
    Nosha256Offchain,
}

impl CircomOp {
    fn name(self) -> &'static str {
        match self {
            Self::Prove => "prove",
            Self::Nosha256 => "prove_nosha256",
            Self::Nosha256WithWitness => "prove_nosha256_with_witness",
            Self::Nosha256Offchain => "prove_nosha256_offchain",
        }
    }
}

/// Pooled client for the circom backend.
#[derive(Clone)]
pub struct CircomBackend {
    pool: Arc<ChannelPool>,
}

fn client(channel: Channel) -> ProvingBackendClient<Channel> {
    ProvingBackendClient::new(channel)
        .max_decoding_message_size(MAX_MESSAGE_BYTES)
        .max_encoding_message_size(MAX_MESSAGE_BYTES)
}

impl CircomBackend {
    /// A backend over the shared pool for `address`.
    pub fn new(address: &str, max_connections: usize) -> Self {
        Self {
            pool: ChannelPool::for_address(address, max_connections),
        }
    }

    /// Run one prove variant against the backend with retry, returning the
    /// raw backend response.
    pub async fn prove(
        &self,
        op: CircomOp,
        input_data: &str,
        circuit_template_id: &str,
        length: u32,
    ) -> Result<BackendProveResponse, ProveError> {
        let pooled: PooledChannel = self.pool.acquire().await?;
        let request = BackendProveRequest {
            input_data: input_data.to_string(),
            circuit_template_id: circuit_template_id.to_string(),
            length,
        };
        let channel = pooled.channel();
        let result = call_with_retry(op.name(), move || {
            let mut client = client(channel.clone());
            let request = request.clone();
            async move {
                let response = match op {
                    CircomOp::Prove => client.prove(request).await?,
                    CircomOp::Nosha256 => client.prove_nosha256(request).await?,
                    CircomOp::Nosha256WithWitness => {
                        client.prove_nosha256_with_witness(request).await?
                    }
                    CircomOp::Nosha256Offchain => client.prove_nosha256_offchain(request).await?,
                };
                Ok(response.into_inner())
            }
        })
        .await;
        self.pool.release(pooled);
        result
    }

    /// Pre-open channels before serving.
    pub fn warmup(&self, n: usize) -> Result<usize, ProveError> {
        self.pool.warmup(n)
    }

    /// Close the shared pool.
    pub fn close(&self) {
        self.pool.close();
    }
}
