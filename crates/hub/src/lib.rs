// Path: crates/hub/src/lib.rs
//! The provenet hub: node registry, signed task dispatch and result relay.

pub mod api;
pub mod dispatch;
pub mod explorer;
pub mod jobs;
pub mod probe;
pub mod registry;

use axum::routing::{get, post, put};
use axum::Router;
use explorer::Explorer;
use probe::LivenessProbe;
use provenet_crypto::KeyCache;
use provenet_types::config::{HubConfig, PRIVATE_KEY_FILE, PUBLIC_KEY_FILE};
use registry::NodeRegistry;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

/// Total timeout of the shared outbound HTTP session.
pub const HTTP_SESSION_TIMEOUT: Duration = Duration::from_secs(6);

/// Process-wide hub state, shared by the handlers and the sweeper.
pub struct AppState {
    /// The loaded configuration profile.
    pub config: HubConfig,
    /// Live node set.
    pub registry: Arc<NodeRegistry>,
    /// Hub session key pair (signs dispatches, decrypts registrations).
    pub session_keys: Arc<KeyCache>,
    /// Shared outbound HTTP session (probing, fan-out).
    pub http: reqwest::Client,
    /// Endpoint health checker.
    pub probe: LivenessProbe,
    /// Explorer relay.
    pub explorer: Explorer,
}

impl AppState {
    /// Build the process state from a loaded profile.
    pub fn from_config(config: HubConfig) -> anyhow::Result<Arc<Self>> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_SESSION_TIMEOUT)
            .build()?;
        let session_dir = Path::new(&config.session_keys_path);
        let session_keys = Arc::new(KeyCache::new_pair(
            session_dir.join(PRIVATE_KEY_FILE),
            session_dir.join(PUBLIC_KEY_FILE),
        ));
        let explorer_key = Arc::new(KeyCache::new_public(&config.explorer.key_path));
        let registry = Arc::new(NodeRegistry::new(Duration::from_secs(
            config.registry.inactivity_timeout_secs,
        )));
        let probe = LivenessProbe::new(http.clone(), probe::DEFAULT_PROBE_DEADLINE);
        let explorer = Explorer::new(config.explorer.api.clone(), explorer_key, http.clone());
        Ok(Arc::new(Self {
            config,
            registry,
            session_keys,
            http,
            probe,
            explorer,
        }))
    }
}

/// The hub's HTTP surface under `/api/v1/hub`.
pub fn router(state: Arc<AppState>) -> Router {
    let hub = Router::new()
        .route("/node", get(api::node::get_node).post(api::node::post_node))
        .route("/result", post(api::result::post_result))
        .route("/verifier", put(api::verifier::put_verifier));
    Router::new()
        .nest("/api/v1/hub", hub)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use provenet_crypto::RsaEnvelope;
    use provenet_types::config::ExplorerConfig;

    /// A ready hub state over a fresh session key pair in a tempdir.
    /// The probe deadline is shortened so rejection tests stay fast.
    pub(crate) async fn test_state() -> (Arc<AppState>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let envelope = RsaEnvelope::generate(1024).unwrap();
        std::fs::write(
            dir.path().join(PRIVATE_KEY_FILE),
            envelope.private_key_pem().unwrap(),
        )
        .unwrap();
        std::fs::write(
            dir.path().join(PUBLIC_KEY_FILE),
            envelope.public_key_pem().unwrap(),
        )
        .unwrap();

        let config = HubConfig {
            session_keys_path: dir.path().display().to_string(),
            explorer: ExplorerConfig::default(),
            ..HubConfig::default()
        };
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(500))
            .build()
            .unwrap();
        let session_keys = Arc::new(KeyCache::new_pair(
            dir.path().join(PRIVATE_KEY_FILE),
            dir.path().join(PUBLIC_KEY_FILE),
        ));
        let explorer_key = Arc::new(KeyCache::new_public(dir.path().join(PUBLIC_KEY_FILE)));
        let state = Arc::new(AppState {
            registry: Arc::new(NodeRegistry::default()),
            session_keys,
            probe: LivenessProbe::new(http.clone(), Duration::from_millis(500)),
            explorer: Explorer::new(String::new(), explorer_key, http.clone()),
            http,
            config,
        });
        (state, dir)
    }
}
