// Path: crates/types/src/node.rs
//! Node endpoint models shared by the hub API and its clients.

use serde::{Deserialize, Serialize};

/// One of a node's two endpoints, as returned by `GET /node`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointInfo {
    /// Transport address (`host:port` for RPC, URL prefix for HTTP).
    pub address: String,
    /// Epoch seconds of the node's most recent registration.
    pub timestamp: u64,
}

/// A node as shaped into a `GET /node` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    /// The node's binary-RPC endpoint.
    pub grpc_info: EndpointInfo,
    /// The node's HTTP endpoint.
    pub http_info: EndpointInfo,
    /// The PoH chain tip recorded at this node's insertion.
    pub poh: String,
}
