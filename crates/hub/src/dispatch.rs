// Path: crates/hub/src/dispatch.rs
//! Signed task fan-out.
//!
//! One `GET /node` produces one `(proof_hash, signature)` pair; every
//! selected node receives the same pair, and a node that accepts it is the
//! sole legitimate executor for that hash. Pushes are fire-and-forget: the
//! client response is shaped before any node acknowledges, and a failing
//! node never fails its siblings.

use crate::registry::{NodeRecord, NodeRegistry};
use provenet_types::node::{EndpointInfo, NodeInfo};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Sampling attempts before giving up on an empty registry.
const SAMPLE_ATTEMPTS: usize = 3;
/// Pause between sampling attempts.
const SAMPLE_RETRY_DELAY: Duration = Duration::from_millis(100);

/// `"0x" + sha256(request_id + "-" + unix_millis)`.
pub fn generate_proof_hash(request_id: &str) -> String {
    let unix_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let preimage = format!("{request_id}-{unix_ms}");
    format!("0x{}", hex::encode(Sha256::digest(preimage.as_bytes())))
}

#[derive(Serialize)]
struct PushTaskBody<'a> {
    proof_hash: &'a str,
    signature: &'a str,
}

/// POST the signed task to one node. Outcome is logged, never propagated.
async fn push_task(http: reqwest::Client, http_addr: String, proof_hash: String, signature: String) {
    let url = format!("{http_addr}/push_task");
    let body = PushTaskBody {
        proof_hash: &proof_hash,
        signature: &signature,
    };
    match http.post(&url).json(&body).send().await {
        Ok(response) if response.status().is_success() => {
            tracing::debug!(target: "dispatch", %url, "task pushed");
        }
        Ok(response) => {
            tracing::warn!(target: "dispatch", %url, status = %response.status(), "push rejected");
        }
        Err(e) => {
            tracing::warn!(target: "dispatch", %url, error = %e, "push failed");
        }
    }
}

fn shape(record: &NodeRecord) -> NodeInfo {
    NodeInfo {
        grpc_info: EndpointInfo {
            address: record.grpc_info.clone(),
            timestamp: record.timestamp,
        },
        http_info: EndpointInfo {
            address: record.http_info.clone(),
            timestamp: record.timestamp,
        },
        poh: record.poh.clone(),
    }
}

/// Sample the registry (retrying on empty), fan the signed task out to each
/// selected node fire-and-forget, and return the attempted nodes.
///
/// An empty return means no node could be selected after all attempts; the
/// caller maps that to a 400.
pub async fn fan_out(
    registry: &NodeRegistry,
    http: &reqwest::Client,
    sample_size: usize,
    proof_hash: &str,
    signature: &str,
) -> Vec<NodeInfo> {
    for attempt in 1..=SAMPLE_ATTEMPTS {
        let nodes = registry.sample(sample_size);
        if nodes.is_empty() {
            tracing::warn!(
                target: "dispatch",
                attempt,
                attempts = SAMPLE_ATTEMPTS,
                "no nodes available"
            );
            tokio::time::sleep(SAMPLE_RETRY_DELAY).await;
            continue;
        }

        let mut shaped = Vec::with_capacity(nodes.len());
        for record in &nodes {
            tokio::spawn(push_task(
                http.clone(),
                record.http_info.clone(),
                proof_hash.to_string(),
                signature.to_string(),
            ));
            shaped.push(shape(record));
        }
        tracing::debug!(
            target: "dispatch",
            attempt,
            nodes = shaped.len(),
            proof_hash,
            "task dispatched"
        );
        return shaped;
    }
    Vec::new()
}

/// Sum of the sampling retry delays — how long `fan_out` can take against
/// an empty registry.
pub fn empty_registry_budget() -> Duration {
    SAMPLE_RETRY_DELAY * SAMPLE_ATTEMPTS as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use provenet_crypto::RsaEnvelope;

    #[test]
    fn proof_hash_is_prefixed_sha256_hex() {
        let hash = generate_proof_hash("req-1");
        assert!(hash.starts_with("0x"));
        assert_eq!(hash.len(), 2 + 64);
        assert!(hex::decode(&hash[2..]).is_ok());
    }

    #[test]
    fn proof_hashes_differ_per_request() {
        assert_ne!(generate_proof_hash("req-1"), generate_proof_hash("req-2"));
    }

    #[test]
    fn signature_binds_proof_hash() {
        let envelope = RsaEnvelope::generate(1024).unwrap();
        let hash = generate_proof_hash("req-1");
        let signature = envelope.sign(&hash).unwrap();
        assert!(envelope.verify(&hash, &signature));
        assert!(!envelope.verify(&generate_proof_hash("req-2"), &signature));
    }

    #[tokio::test]
    async fn empty_registry_exhausts_attempts() {
        let registry = NodeRegistry::default();
        let http = reqwest::Client::new();
        let started = std::time::Instant::now();
        let shaped = fan_out(&registry, &http, 4, "0xabc", "sig").await;
        assert!(shaped.is_empty());
        assert!(started.elapsed() >= empty_registry_budget());
    }

    #[tokio::test]
    async fn unreachable_nodes_still_shape_into_the_response() {
        let registry = NodeRegistry::default();
        registry.add("127.0.0.1:1", "http://127.0.0.1:9");
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(200))
            .build()
            .unwrap();
        let shaped = fan_out(&registry, &http, 4, "0xabc", "sig").await;
        assert_eq!(shaped.len(), 1);
        assert_eq!(shaped[0].grpc_info.address, "127.0.0.1:1");
        assert!(!shaped[0].poh.is_empty());
    }
}
