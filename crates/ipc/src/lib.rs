// Path: crates/ipc/src/lib.rs
//! # provenet IPC
//!
//! Generated Protobuf/Tonic code for the two RPC surfaces:
//! 1. **`prove`** — the prover node's public control surface.
//! 2. **`backend`** — the external proving engines the node fans work to.

/// The prover node's public binary-RPC surface.
pub mod prove {
    /// Version 1 of the surface, matching the proto package hierarchy.
    pub mod v1 {
        tonic::include_proto!("provenet.prove.v1");
    }
    // Flatten the API for users.
    pub use v1::*;
}

/// The external proving-backend surface.
pub mod backend {
    /// Version 1 of the surface, matching the proto package hierarchy.
    pub mod v1 {
        tonic::include_proto!("provenet.backend.v1");
    }
    pub use v1::*;
}
