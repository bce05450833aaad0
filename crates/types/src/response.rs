// Path: crates/types/src/response.rs
//! The `{code, msg, results}` response envelope and its numeric wire codes.
//!
//! Only `code` and `msg` ever cross the wire; internal error detail stays in
//! the logs. The hub block (`0`, `-1000..=-1009`) is the table the original
//! deployment shipped with and must not be renumbered; the node block
//! (`-2000..=-2010`) is disjoint so a code identifies the failing side.

use crate::error::{ProveError, TaskError};
use serde::{Deserialize, Serialize};

/// Stable numeric wire codes for every response envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireCode {
    /// The operation completed.
    Successfully,
    /// Generic request failure.
    RequestError,
    /// The request timed out.
    Timeout,
    /// An argument was invalid or missing.
    ArgsInvalid,
    /// An authentication token expired.
    TokenExpired,
    /// The caller exceeded its rate budget.
    RateLimit,
    /// The caller lacks permission.
    PermissionInvalid,
    /// The hub's session private key file is missing.
    PrivateKeyNotExist,
    /// The hub's session public key file is missing.
    PublicKeyNotExist,
    /// A ciphertext field failed to decrypt.
    DecryptionFailed,
    /// Node registration was rejected.
    RegisterFailed,

    /// Generic node-side failure.
    NodeError,
    /// The node's crypto private key file is missing.
    NodePrivateKeyNotFound,
    /// Payload decryption with the node's private key failed.
    NodePrivateKeyInvalid,
    /// The node's crypto public key file is missing.
    NodePublicKeyNotFound,
    /// The payload failed admission checks.
    NodeUnauthorizedPayload,
    /// The task type has no handler.
    NodeUnsupportedTaskType,
    /// The prover id has no backend.
    NodeUnsupportedProver,
    /// The payload validator is not registered.
    NodeUnsupportedOauthProvider,
    /// The proving backend did not respond within the retry budget.
    NodeProverNotResponse,
    /// A claim was made against an unknown proof hash.
    NodeTaskNotFound,
    /// A claim was made against a non-pending proof hash.
    NodeTaskInvalid,
}

impl WireCode {
    /// The numeric code serialized into the envelope.
    pub const fn code(self) -> i32 {
        match self {
            Self::Successfully => 0,
            Self::RequestError => -1000,
            Self::Timeout => -1001,
            Self::ArgsInvalid => -1002,
            Self::TokenExpired => -1003,
            Self::RateLimit => -1004,
            Self::PermissionInvalid => -1005,
            Self::PrivateKeyNotExist => -1006,
            Self::PublicKeyNotExist => -1007,
            Self::DecryptionFailed => -1008,
            Self::RegisterFailed => -1009,

            Self::NodeError => -2000,
            Self::NodePrivateKeyNotFound => -2001,
            Self::NodePrivateKeyInvalid => -2002,
            Self::NodePublicKeyNotFound => -2003,
            Self::NodeUnauthorizedPayload => -2004,
            Self::NodeUnsupportedTaskType => -2005,
            Self::NodeUnsupportedProver => -2006,
            Self::NodeUnsupportedOauthProvider => -2007,
            Self::NodeProverNotResponse => -2008,
            Self::NodeTaskNotFound => -2009,
            Self::NodeTaskInvalid => -2010,
        }
    }

    /// The default human-readable message for this code.
    pub const fn msg(self) -> &'static str {
        match self {
            Self::Successfully => "Successfully",
            Self::RequestError => "request error",
            Self::Timeout => "Time out",
            Self::ArgsInvalid => "Arg invalid or isn't specified",
            Self::TokenExpired => "Token expired",
            Self::RateLimit => "Too many requests",
            Self::PermissionInvalid => "Permission invalid",
            Self::PrivateKeyNotExist => "Private key is not exist",
            Self::PublicKeyNotExist => "Public key is not exist",
            Self::DecryptionFailed => "Decryption failed",
            Self::RegisterFailed => "Register failed",

            Self::NodeError => "System busy",
            Self::NodePrivateKeyNotFound => "Private key file not found",
            Self::NodePrivateKeyInvalid => "Decryption failed with provided private key",
            Self::NodePublicKeyNotFound => "Public key file not found",
            Self::NodeUnauthorizedPayload => "Verification failed due to invalid input data",
            Self::NodeUnsupportedTaskType => "Task type is not supported",
            Self::NodeUnsupportedProver => "Prover not match",
            Self::NodeUnsupportedOauthProvider => "OAuth provider not found",
            Self::NodeProverNotResponse => "Prover backend is not responding",
            Self::NodeTaskNotFound => "Proof hash does not exist",
            Self::NodeTaskInvalid => "Proof hash is invalid",
        }
    }
}

impl From<TaskError> for WireCode {
    fn from(e: TaskError) -> Self {
        match e {
            TaskError::NotFound => Self::NodeTaskNotFound,
            TaskError::Invalid => Self::NodeTaskInvalid,
        }
    }
}

impl From<&ProveError> for WireCode {
    fn from(e: &ProveError) -> Self {
        match e {
            ProveError::PrivateKeyNotFound => Self::NodePrivateKeyNotFound,
            ProveError::PrivateKeyInvalid => Self::NodePrivateKeyInvalid,
            ProveError::PublicKeyNotFound => Self::NodePublicKeyNotFound,
            ProveError::UnauthorizedPayload => Self::NodeUnauthorizedPayload,
            ProveError::UnsupportedTaskType(_) => Self::NodeUnsupportedTaskType,
            ProveError::UnsupportedCircuit(_) => Self::NodeUnsupportedTaskType,
            ProveError::UnsupportedProver(_) => Self::NodeUnsupportedProver,
            ProveError::UnsupportedOauthProvider(_) => Self::NodeUnsupportedOauthProvider,
            ProveError::BackendUnavailable(_) => Self::NodeProverNotResponse,
            ProveError::Backend(_) => Self::NodeError,
        }
    }
}

/// The JSON response envelope shared by every HTTP handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T = serde_json::Value> {
    /// Numeric wire code; `0` means success.
    pub code: i32,
    /// Human-readable outcome.
    pub msg: String,
    /// Optional payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<T>,
}

impl<T> Envelope<T> {
    /// An envelope carrying a wire code and its default message.
    pub fn from_code(code: WireCode) -> Self {
        Self {
            code: code.code(),
            msg: code.msg().to_string(),
            results: None,
        }
    }

    /// An envelope carrying a wire code and a caller-supplied message.
    pub fn with_msg(code: WireCode, msg: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            msg: msg.into(),
            results: None,
        }
    }

    /// A success envelope with a payload.
    pub fn ok(results: T) -> Self {
        Self {
            code: WireCode::Successfully.code(),
            msg: WireCode::Successfully.msg().to_string(),
            results: Some(results),
        }
    }
}

impl Envelope<serde_json::Value> {
    /// A bare success envelope.
    pub fn success() -> Self {
        Self::from_code(WireCode::Successfully)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hub_block_matches_deployed_table() {
        assert_eq!(WireCode::Successfully.code(), 0);
        assert_eq!(WireCode::RequestError.code(), -1000);
        assert_eq!(WireCode::ArgsInvalid.code(), -1002);
        assert_eq!(WireCode::PrivateKeyNotExist.code(), -1006);
        assert_eq!(WireCode::PublicKeyNotExist.code(), -1007);
        assert_eq!(WireCode::DecryptionFailed.code(), -1008);
        assert_eq!(WireCode::RegisterFailed.code(), -1009);
    }

    #[test]
    fn node_block_is_disjoint_from_hub_block() {
        let node_codes = [
            WireCode::NodeError,
            WireCode::NodeTaskNotFound,
            WireCode::NodeTaskInvalid,
            WireCode::NodeUnsupportedProver,
            WireCode::NodeProverNotResponse,
        ];
        for c in node_codes {
            assert!(c.code() <= -2000, "{:?} leaked into the hub block", c);
        }
    }

    #[test]
    fn envelope_omits_empty_results() {
        let body = serde_json::to_string(&Envelope::<serde_json::Value>::success()).unwrap();
        assert_eq!(body, r#"{"code":0,"msg":"Successfully"}"#);
    }
}
