// Path: crates/types/src/error.rs
//! Error types for the provenet control plane.

use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
pub trait ErrorCode {
    /// Returns the unique, stable string identifier for this error variant.
    fn code(&self) -> &'static str;
}

/// Errors raised by the RSA envelope and the key cache.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// A key file was missing at the configured path.
    #[error("Key file not found: {0}")]
    KeyNotFound(String),
    /// The key material could not be parsed.
    #[error("Invalid key material: {0}")]
    InvalidKey(String),
    /// The loaded envelope has no public half, but an operation required one.
    #[error("Public key is not loaded")]
    PublicKeyUnavailable,
    /// The loaded envelope has no private half, but an operation required one.
    #[error("Private key is not loaded")]
    PrivateKeyUnavailable,
    /// Encryption failed (plaintext too large for the modulus, or RNG failure).
    #[error("Encryption failed")]
    EncryptionFailed,
    /// Decryption failed. Deliberately a single kind: malformed framing,
    /// padding failure and empty plaintext are indistinguishable to callers.
    #[error("Decryption failed")]
    DecryptionFailed,
    /// Producing a signature failed.
    #[error("Signing failed: {0}")]
    SigningFailed(String),
    /// An I/O error while reading key files.
    #[error("Key I/O error: {0}")]
    Io(String),
}

impl ErrorCode for CryptoError {
    fn code(&self) -> &'static str {
        match self {
            Self::KeyNotFound(_) => "CRYPTO_KEY_NOT_FOUND",
            Self::InvalidKey(_) => "CRYPTO_INVALID_KEY",
            Self::PublicKeyUnavailable => "CRYPTO_PUBLIC_KEY_UNAVAILABLE",
            Self::PrivateKeyUnavailable => "CRYPTO_PRIVATE_KEY_UNAVAILABLE",
            Self::EncryptionFailed => "CRYPTO_ENCRYPT_FAILED",
            Self::DecryptionFailed => "CRYPTO_DECRYPT_FAILED",
            Self::SigningFailed(_) => "CRYPTO_SIGN_FAILED",
            Self::Io(_) => "CRYPTO_IO_ERROR",
        }
    }
}

/// Errors raised when claiming a task against the node-side task cache.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TaskError {
    /// The proof hash has never been admitted, or its TTL has passed.
    #[error("Proof hash does not exist")]
    NotFound,
    /// The proof hash exists but is not in the `PENDING` state.
    #[error("Proof hash is invalid")]
    Invalid,
}

impl ErrorCode for TaskError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "TASK_NOT_FOUND",
            Self::Invalid => "TASK_INVALID",
        }
    }
}

/// Errors raised by the hub-side dispatch engine.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The registry produced no usable nodes after all sampling attempts.
    #[error("Failed to process any nodes")]
    NoNodes,
    /// The signing key could not be loaded.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl ErrorCode for DispatchError {
    fn code(&self) -> &'static str {
        match self {
            Self::NoNodes => "DISPATCH_NO_NODES",
            Self::Crypto(e) => e.code(),
        }
    }
}

/// Errors raised by the node-side prove pipeline.
///
/// Each variant maps to one of the node's operational wire codes; the
/// mapping lives next to the envelope in [`crate::response`].
#[derive(Debug, Error)]
pub enum ProveError {
    /// The node's crypto private key file is missing.
    #[error("Private key file not found")]
    PrivateKeyNotFound,
    /// Payload decryption with the crypto private key failed.
    #[error("Decryption failed with provided private key")]
    PrivateKeyInvalid,
    /// The node's crypto public key file is missing.
    #[error("Public key file not found")]
    PublicKeyNotFound,
    /// The payload failed validator or TIGA admission checks.
    #[error("Verification failed due to invalid input data")]
    UnauthorizedPayload,
    /// The requested task type has no handler.
    #[error("Task '{0}' is not supported. Please choose a supported method")]
    UnsupportedTaskType(i32),
    /// The selected backend has no RPC for this circuit.
    #[error("Unsupported circuit_template_id: {0}")]
    UnsupportedCircuit(String),
    /// The requested prover id has no backend.
    #[error("Prover not match")]
    UnsupportedProver(String),
    /// The requested payload validator is not registered.
    #[error("OAuth provider '{0}' not found")]
    UnsupportedOauthProvider(String),
    /// The proving backend did not answer within the retry budget.
    #[error("Prover backend is not responding: {0}")]
    BackendUnavailable(String),
    /// The backend answered with a non-transient failure.
    #[error("Prover backend error: {0}")]
    Backend(String),
}

impl ErrorCode for ProveError {
    fn code(&self) -> &'static str {
        match self {
            Self::PrivateKeyNotFound => "PROVE_PRIVATE_KEY_NOT_FOUND",
            Self::PrivateKeyInvalid => "PROVE_PRIVATE_KEY_INVALID",
            Self::PublicKeyNotFound => "PROVE_PUBLIC_KEY_NOT_FOUND",
            Self::UnauthorizedPayload => "PROVE_UNAUTHORIZED_PAYLOAD",
            Self::UnsupportedTaskType(_) => "PROVE_UNSUPPORTED_TASK_TYPE",
            Self::UnsupportedCircuit(_) => "PROVE_UNSUPPORTED_CIRCUIT",
            Self::UnsupportedProver(_) => "PROVE_UNSUPPORTED_PROVER",
            Self::UnsupportedOauthProvider(_) => "PROVE_UNSUPPORTED_OAUTH_PROVIDER",
            Self::BackendUnavailable(_) => "PROVE_BACKEND_UNAVAILABLE",
            Self::Backend(_) => "PROVE_BACKEND_ERROR",
        }
    }
}

/// Errors raised by the periodic job scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A job name was registered twice. This is a fatal configuration error.
    #[error("Job [{0}] already exists")]
    DuplicateJob(String),
}

impl ErrorCode for SchedulerError {
    fn code(&self) -> &'static str {
        match self {
            Self::DuplicateJob(_) => "SCHEDULER_DUPLICATE_JOB",
        }
    }
}

/// Errors raised while loading a configuration profile.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The profile file exists but could not be read.
    #[error("Failed to read config profile {path}: {source}")]
    Io {
        /// Path of the profile that failed to load.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The profile file could not be parsed as TOML.
    #[error("Failed to parse config profile {path}: {source}")]
    Parse {
        /// Path of the profile that failed to parse.
        path: String,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
}

impl ErrorCode for ConfigError {
    fn code(&self) -> &'static str {
        match self {
            Self::Io { .. } => "CONFIG_IO_ERROR",
            Self::Parse { .. } => "CONFIG_PARSE_ERROR",
        }
    }
}
