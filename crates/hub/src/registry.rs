// Path: crates/hub/src/registry.rs
//! The live set of prover nodes, keyed by a stable id and chained by PoH.
//!
//! The PoH chain is not a consensus mechanism. It is a tamper-evident
//! insertion order carried forward so that each dispatched task response
//! includes a chain tip visible to the client.

use parking_lot::Mutex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// One registered node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    /// Binary-RPC endpoint address.
    pub grpc_info: String,
    /// HTTP endpoint URL prefix.
    pub http_info: String,
    /// Epoch seconds of the most recent registration.
    pub timestamp: u64,
    /// PoH digest chaining this record to the previous insertion.
    pub poh: String,
}

// Canonical hash preimages. Field order is fixed by declaration and the
// encoding is compact serde_json, so ids and poh values are deterministic
// for a given input.
#[derive(Serialize)]
struct IdPreimage<'a> {
    grpc_info: &'a str,
    http_info: &'a str,
}

#[derive(Serialize)]
struct PohPreimage<'a> {
    grpc_info: &'a str,
    http_info: &'a str,
    timestamp: u64,
    last_poh: Option<&'a str>,
}

fn sha256_hex<T: Serialize>(value: &T) -> String {
    // Serializing these preimages cannot fail: they are plain strings and ints.
    let raw = serde_json::to_vec(value).unwrap_or_default();
    hex::encode(Sha256::digest(raw))
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

struct RegistryInner {
    nodes: HashMap<String, NodeRecord>,
    last_poh: Option<String>,
    timeout: Duration,
}

/// Process-wide registry of live prover nodes.
///
/// All mutation happens under one short, non-suspending critical section so
/// the registry can be shared between the request handlers and the sweeper
/// on a parallel runtime.
pub struct NodeRegistry {
    inner: Mutex<RegistryInner>,
}

/// Default seconds after which an unrefreshed registration is dead.
pub const DEFAULT_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(30);
/// Default number of nodes handed to one dispatch.
pub const DEFAULT_SAMPLE_SIZE: usize = 4;

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_INACTIVITY_TIMEOUT)
    }
}

impl NodeRegistry {
    /// An empty registry with the given inactivity timeout.
    pub fn new(timeout: Duration) -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                nodes: HashMap::new(),
                last_poh: None,
                timeout,
            }),
        }
    }

    /// Stable id of a node: `sha256({grpc_info, http_info})`.
    pub fn node_id(grpc_info: &str, http_info: &str) -> String {
        sha256_hex(&IdPreimage {
            grpc_info,
            http_info,
        })
    }

    /// Insert or refresh a node, advancing the PoH chain. Returns the id.
    ///
    /// The first insertion bootstraps the chain from its own poh, so
    /// `poh_1` hashes over `last_poh = poh_1` of itself — intentional
    /// self-loop, see the module docs.
    pub fn add(&self, grpc_info: &str, http_info: &str) -> String {
        let timestamp = now_secs();
        let id = Self::node_id(grpc_info, http_info);
        let mut inner = self.inner.lock();

        let poh = sha256_hex(&PohPreimage {
            grpc_info,
            http_info,
            timestamp,
            last_poh: inner.last_poh.as_deref(),
        });
        if inner.last_poh.is_none() {
            inner.last_poh = Some(poh.clone());
        }
        inner.nodes.insert(
            id.clone(),
            NodeRecord {
                grpc_info: grpc_info.to_string(),
                http_info: http_info.to_string(),
                timestamp,
                poh: poh.clone(),
            },
        );
        inner.last_poh = Some(poh);
        id
    }

    /// Remove a node by id.
    pub fn remove(&self, id: &str) {
        self.inner.lock().nodes.remove(id);
    }

    /// Up to `k` nodes chosen uniformly at random without replacement.
    /// Returns every node when `k >= len`.
    pub fn sample(&self, k: usize) -> Vec<NodeRecord> {
        use rand::seq::SliceRandom;
        let inner = self.inner.lock();
        if k >= inner.nodes.len() {
            return inner.nodes.values().cloned().collect();
        }
        let mut rng = rand::thread_rng();
        inner
            .nodes
            .values()
            .collect::<Vec<_>>()
            .choose_multiple(&mut rng, k)
            .map(|r| (*r).clone())
            .collect()
    }

    /// Override the inactivity timeout.
    pub fn set_timeout(&self, timeout: Duration) {
        self.inner.lock().timeout = timeout;
    }

    /// Drop every record whose registration is older than the timeout.
    /// Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = now_secs();
        let mut inner = self.inner.lock();
        let timeout = inner.timeout.as_secs();
        let before = inner.nodes.len();
        inner
            .nodes
            .retain(|_, record| now.saturating_sub(record.timestamp) <= timeout);
        before - inner.nodes.len()
    }

    /// Number of registered nodes.
    pub fn len(&self) -> usize {
        self.inner.lock().nodes.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The current PoH chain tip, if any node was ever inserted.
    pub fn last_poh(&self) -> Option<String> {
        self.inner.lock().last_poh.clone()
    }

    #[cfg(test)]
    fn get(&self, id: &str) -> Option<NodeRecord> {
        self.inner.lock().nodes.get(id).cloned()
    }
}
