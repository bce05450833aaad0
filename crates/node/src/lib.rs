// Path: crates/node/src/lib.rs
//! The provenet prover node: signature-verified task admission, a
//! TTL-indexed task cache, the prove pipeline over pooled backend
//! channels, and result write-back to the hub.

pub mod grpc;
pub mod http;
pub mod hub_client;
pub mod project;
pub mod prove;
pub mod prover;
pub mod task_cache;
pub mod validator;

use axum::routing::{get, post, put};
use axum::Router;
use hub_client::HubClient;
use prove::ProveService;
use provenet_crypto::KeyCache;
use provenet_types::config::{NodeConfig, PRIVATE_KEY_FILE, PUBLIC_KEY_FILE};
use std::path::Path;
use std::sync::Arc;
use task_cache::TaskCache;
use tower_http::trace::TraceLayer;
use validator::ValidatorRegistry;

/// Process-wide node state, shared by the HTTP and RPC surfaces.
pub struct NodeState {
    /// The loaded configuration profile.
    pub config: NodeConfig,
    /// Hub session public key (verifies `/push_task` signatures).
    pub session_key: Arc<KeyCache>,
    /// The node's crypto key pair (payload and verifier decryption).
    pub crypto_keys: Arc<KeyCache>,
    /// Admitted proof hashes.
    pub task_cache: Arc<TaskCache>,
    /// The prove pipeline.
    pub prove: Arc<ProveService>,
    /// Hub write-back client.
    pub hub: Arc<HubClient>,
}

impl NodeState {
    /// Build the process state from a loaded profile. `validators` carries
    /// whatever payload validators the deployment registers.
    pub fn from_config(
        config: NodeConfig,
        validators: Arc<ValidatorRegistry>,
    ) -> anyhow::Result<Arc<Self>> {
        let session_key = Arc::new(KeyCache::new_public(&config.session_key_path));
        let crypto_dir = Path::new(&config.crypto_keys_path);
        let crypto_keys = Arc::new(KeyCache::new_pair(
            crypto_dir.join(PRIVATE_KEY_FILE),
            crypto_dir.join(PUBLIC_KEY_FILE),
        ));
        let task_cache = Arc::new(TaskCache::load(&config.cache_path));
        let prove = Arc::new(ProveService::new(&config, validators));
        let hub = Arc::new(HubClient::new(
            config.hub.api_url.clone(),
            Arc::clone(&session_key),
            config.proxy.as_deref(),
        )?);
        Ok(Arc::new(Self {
            config,
            session_key,
            crypto_keys,
            task_cache,
            prove,
            hub,
        }))
    }
}

/// The node's HTTP surface: v1 at the root, v2 under `/api/v2`.
pub fn router(state: Arc<NodeState>) -> Router {
    Router::new()
        .route("/ping", get(http::v1::ping))
        .route("/push_task", post(http::v1::push_task))
        .route("/prove", post(http::v1::prove))
        .route("/prove_nosha256", post(http::v1::prove_nosha256))
        .route(
            "/prove_nosha256_with_witness",
            post(http::v1::prove_nosha256_with_witness),
        )
        .route(
            "/prove_nosha256_offchain",
            post(http::v1::prove_nosha256_offchain),
        )
        .route("/get_public_key", get(http::v1::get_public_key))
        .route("/verifier", put(http::v1::put_verifier))
        .route("/api/v2/prove", post(http::v2::prove))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
