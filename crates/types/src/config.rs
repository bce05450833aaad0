// Path: crates/types/src/config.rs
//! Configuration profiles for the hub and node binaries.
//!
//! A profile is a TOML file named after the `MODE` environment variable
//! (`$config_dir/$MODE.toml`). Every field carries a default so a missing
//! file yields the built-in profile; a present-but-broken file is an error,
//! never a silent fallback.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File name of a private key inside a key directory.
pub const PRIVATE_KEY_FILE: &str = "private_key";
/// File name of a public key inside a key directory.
pub const PUBLIC_KEY_FILE: &str = "public_key";

/// Resolve the active profile name from `MODE`, lowercased.
pub fn mode(default: &str) -> String {
    std::env::var("MODE")
        .unwrap_or_else(|_| default.to_string())
        .to_lowercase()
}

fn load_profile<T>(config_dir: &Path, profile: &str) -> Result<T, ConfigError>
where
    T: Default + serde::de::DeserializeOwned,
{
    let path = config_dir.join(format!("{profile}.toml"));
    if !path.exists() {
        return Ok(T::default());
    }
    let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// A `host:port` bind address for one of the two server endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindConfig {
    /// Host or interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
}

/// Hub service configuration (`hub.toml`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Application name used in logs.
    pub app: String,
    /// Directory holding the session key pair (`private_key`, `public_key`).
    pub session_keys_path: String,
    /// HTTP bind address.
    pub server: BindConfig,
    /// Explorer forwarding target.
    pub explorer: ExplorerConfig,
    /// Node registry tuning.
    pub registry: RegistryConfig,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            app: "provenet-hub".to_string(),
            session_keys_path: "session_keys".to_string(),
            server: BindConfig {
                host: "0.0.0.0".to_string(),
                port: 9000,
            },
            explorer: ExplorerConfig::default(),
            registry: RegistryConfig::default(),
        }
    }
}

impl HubConfig {
    /// Load `$config_dir/$MODE.toml` (default profile `hub`).
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        load_profile(config_dir, &mode("hub"))
    }
}

/// Where the hub forwards decrypted results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Base URL of the explorer API. Empty disables forwarding.
    pub api: String,
    /// Path to the explorer's PEM public key.
    pub key_path: String,
}

/// Node registry tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Seconds after which an unrefreshed registration is considered dead.
    pub inactivity_timeout_secs: u64,
    /// Nodes returned by one dispatch sample.
    pub sample_size: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout_secs: 30,
            sample_size: 4,
        }
    }
}

/// Prover node configuration (`node.toml`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Application name used in logs.
    pub app: String,
    /// Directory holding the node's crypto key pair.
    pub crypto_keys_path: String,
    /// Path to the hub session *public* key distributed to this node.
    pub session_key_path: String,
    /// Path of the on-disk task cache.
    pub cache_path: String,
    /// Path of the project map (`project_id → {project_name, verifiers}`).
    pub project_path: String,
    /// Path of the circuit → payload-validator binding map.
    pub provider_resolver_path: String,
    /// Outbound proxy URL for hub traffic, if any.
    pub proxy: Option<String>,
    /// Binary-RPC bind address.
    pub grpc: BindConfig,
    /// HTTP bind address.
    pub http: BindConfig,
    /// How this node reaches, and announces itself to, the hub.
    pub hub: HubEndpointConfig,
    /// Proving backend addresses and pool tuning.
    pub prover: ProverConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            app: "provenet-node".to_string(),
            crypto_keys_path: "crypto_keys".to_string(),
            session_key_path: "session_keys/public_key".to_string(),
            cache_path: "task_cache.bin".to_string(),
            project_path: "project.json".to_string(),
            provider_resolver_path: "provider_resolver.json".to_string(),
            proxy: None,
            grpc: BindConfig {
                host: "[::]".to_string(),
                port: 50050,
            },
            http: BindConfig {
                host: "127.0.0.1".to_string(),
                port: 50051,
            },
            hub: HubEndpointConfig::default(),
            prover: ProverConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Load `$config_dir/$MODE.toml` (default profile `node`).
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        load_profile(config_dir, &mode("node"))
    }
}

/// The node's view of the hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HubEndpointConfig {
    /// Base URL of the hub API.
    pub api_url: String,
    /// The RPC address this node announces in its heartbeat.
    pub grpc_info: String,
    /// The HTTP address this node announces in its heartbeat.
    pub http_info: String,
    /// Seconds between heartbeats.
    pub heartbeat_interval_secs: u64,
}

impl Default for HubEndpointConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:9000".to_string(),
            grpc_info: "127.0.0.1:50050".to_string(),
            http_info: "http://127.0.0.1:50051".to_string(),
            heartbeat_interval_secs: 10,
        }
    }
}

/// Proving backend addresses and channel pool tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProverConfig {
    /// Address of the circom proving backend.
    pub circom_address: String,
    /// Address of the private (gnark) proving backend.
    pub private_address: String,
    /// Channel pool cap per backend address.
    pub max_connections: usize,
    /// TIGA circuit ids admitted without payload inspection.
    pub privileged_circuits: Vec<String>,
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self {
            circom_address: "http://circom-prover:60051".to_string(),
            private_address: "http://gnark-prover:60050".to_string(),
            max_connections: 100,
            privileged_circuits: vec![
                "10005".to_string(),
                "10006".to_string(),
                "10010".to_string(),
            ],
        }
    }
}
