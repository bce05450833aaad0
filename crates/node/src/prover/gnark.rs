// Path: crates/node/src/prover/gnark.rs
//! Client for the private (gnark) proving engine.
//!
//! The private engine serves a fixed set of privileged circuits, each with
//! its own RPC; anything else is not routable.

use super::pool::{ChannelPool, PooledChannel};
use super::{call_with_retry, MAX_MESSAGE_BYTES};
use provenet_ipc::backend::proving_backend_client::ProvingBackendClient;
use provenet_ipc::backend::{BackendProveRequest, BackendProveResponse};
use provenet_types::error::ProveError;
use std::sync::Arc;
use tonic::transport::Channel;

/// Pooled client for the private backend.
#[derive(Clone)]
pub struct PrivateBackend {
    pool: Arc<ChannelPool>,
}

fn client(channel: Channel) -> ProvingBackendClient<Channel> {
    ProvingBackendClient::new(channel)
        .max_decoding_message_size(MAX_MESSAGE_BYTES)
        .max_encoding_message_size(MAX_MESSAGE_BYTES)
}

impl PrivateBackend {
    /// A backend over the shared pool for `address`.
    pub fn new(address: &str, max_connections: usize) -> Self {
        Self {
            pool: ChannelPool::for_address(address, max_connections),
        }
    }

    /// Whether this backend can route `circuit_template_id` at all.
    pub fn routes(circuit_template_id: &str) -> bool {
        matches!(circuit_template_id, "10005" | "10006" | "10010")
    }

    /// Run the circuit-specific offchain RPC for a privileged circuit.
    pub async fn prove(
        &self,
        input_data: &str,
        circuit_template_id: &str,
    ) -> Result<BackendProveResponse, ProveError> {
        if !Self::routes(circuit_template_id) {
            return Err(ProveError::UnsupportedCircuit(
                circuit_template_id.to_string(),
            ));
        }
        let pooled: PooledChannel = self.pool.acquire().await?;
        let request = BackendProveRequest {
            input_data: input_data.to_string(),
            circuit_template_id: circuit_template_id.to_string(),
            length: 0,
        };
        let channel = pooled.channel();
        let circuit = circuit_template_id.to_string();
        let result = call_with_retry("prove_private", move || {
            let mut client = client(channel.clone());
            let request = request.clone();
            let circuit = circuit.clone();
            async move {
                let response = match circuit.as_str() {
                    "10005" => client.prove_tiga_offchain(request).await?,
                    "10006" => client.prove_binance_offchain(request).await?,
                    "10010" => client.prove_merkle_offchain(request).await?,
                    // Guarded above; unreachable circuits fail like an
                    // unimplemented backend method.
                    _ => return Err(tonic::Status::unimplemented("circuit not routable")),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_privileged_circuits_route() {
        assert!(PrivateBackend::routes("10005"));
        assert!(PrivateBackend::routes("10006"));
        assert!(PrivateBackend::routes("10010"));
        assert!(!PrivateBackend::routes("10007"));
        assert!(!PrivateBackend::routes(""));
    }
}
