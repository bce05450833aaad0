// Path: crates/node/src/prover/mod.rs
//! Clients for the external proving backends.

pub mod circom;
pub mod gnark;
pub mod pool;

use provenet_types::error::ProveError;
use std::future::Future;
use std::time::Duration;

/// Maximum message size on backend channels (proofs and witnesses can be
/// large).
pub const MAX_MESSAGE_BYTES: usize = 64 * 1024 * 1024;

/// Retries after the first attempt.
const MAX_RETRIES: u32 = 2;
/// First backoff step; doubles per attempt.
const BACKOFF_BASE: Duration = Duration::from_millis(150);
/// Backoff ceiling.
const BACKOFF_CAP: Duration = Duration::from_secs(2);

/// The backend a request routes to, selected by `prover_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProverId {
    /// The circom proving engine.
    Circom,
    /// The private (gnark) proving engine, reachable from v2 only.
    Private,
}

impl ProverId {
    /// Parse a wire prover id. Unknown ids surface `UNSUPPORTED_PROVER`.
    pub fn parse(raw: &str) -> Result<Self, ProveError> {
        match raw.to_ascii_lowercase().as_str() {
            "circom" => Ok(Self::Circom),
            "private" | "gnark" => Ok(Self::Private),
            _ => Err(ProveError::UnsupportedProver(raw.to_string())),
        }
    }
}

fn is_transient(code: tonic::Code) -> bool {
    matches!(
        code,
        tonic::Code::Unavailable | tonic::Code::DeadlineExceeded | tonic::Code::Internal
    )
}

/// Run one backend RPC with bounded retry on transient codes.
///
/// Backoff is `150 ms × 2^attempt`, capped at 2 s. Non-transient failures
/// and exhausted retries surface as `ProveError`.
pub(crate) async fn call_with_retry<T, F, Fut>(op: &str, mut call: F) -> Result<T, ProveError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, tonic::Status>>,
{
    let mut attempt: u32 = 0;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(status) if is_transient(status.code()) && attempt < MAX_RETRIES => {
                let backoff = (BACKOFF_BASE * 2u32.pow(attempt)).min(BACKOFF_CAP);
                tracing::warn!(
                    target: "prover",
                    op,
                    attempt,
                    code = %status.code(),
                    backoff_ms = backoff.as_millis() as u64,
                    "transient backend failure, retrying"
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(status) if is_transient(status.code()) => {
                tracing::error!(target: "prover", op, code = %status.code(), "backend retries exhausted");
                return Err(ProveError::BackendUnavailable(status.message().to_string()));
            }
            Err(status) => {
                tracing::error!(target: "prover", op, code = %status.code(), "backend call failed");
                return Err(ProveError::Backend(status.message().to_string()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn prover_ids_parse_case_insensitively() {
        assert_eq!(ProverId::parse("CIRCOM").unwrap(), ProverId::Circom);
        assert_eq!(ProverId::parse("private").unwrap(), ProverId::Private);
        assert!(matches!(
            ProverId::parse("halo2").unwrap_err(),
            ProveError::UnsupportedProver(_)
        ));
    }

    #[tokio::test]
    async fn transient_failures_retry_then_succeed() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = call_with_retry("test", move || {
            let c = Arc::clone(&c);
            async move {
                if c.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(tonic::Status::unavailable("backend busy"))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_surface_backend_unavailable() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result: Result<u32, _> = call_with_retry("test", move || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(tonic::Status::deadline_exceeded("too slow"))
            }
        })
        .await;
        assert!(matches!(
            result.unwrap_err(),
            ProveError::BackendUnavailable(_)
        ));
        // Initial attempt plus two retries.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_transient_failures_do_not_retry() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result: Result<u32, _> = call_with_retry("test", move || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(tonic::Status::invalid_argument("bad circuit"))
            }
        })
        .await;
        assert!(matches!(result.unwrap_err(), ProveError::Backend(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
