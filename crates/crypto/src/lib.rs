// Path: crates/crypto/src/lib.rs
//! RSA envelope operations and key caching.
//!
//! The envelope bundles the four operations the control plane needs —
//! OAEP-SHA256 encrypt/decrypt and PSS-SHA256 sign/verify — over a
//! PEM-loaded key pair, with ciphertext and signatures framed as base85
//! text. The key cache layers mtime-indexed hot reload on top so handlers
//! always see the keys currently on disk without re-parsing PEM per request.

pub mod envelope;
pub mod key_cache;
pub mod keygen;

pub use envelope::RsaEnvelope;
pub use key_cache::KeyCache;
pub use provenet_types::error::CryptoError;
