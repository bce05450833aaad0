// Path: crates/crypto/src/key_cache.rs
//! Mtime-indexed hot reload of key files.
//!
//! Every handler that needs an envelope goes through a cache instead of
//! re-reading PEM per request. The cache keys on file mtimes, so replacing a
//! key file on disk takes effect on the next `envelope()` call without a
//! restart. Concurrent callers serialize on one async mutex, which also
//! guarantees at most one reload is in flight.

use crate::envelope::RsaEnvelope;
use provenet_types::error::CryptoError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::Mutex;

enum KeySource {
    /// A private/public pair at two paths.
    Pair {
        private_path: PathBuf,
        public_path: PathBuf,
    },
    /// A single public key file (session or explorer key).
    PublicOnly { path: PathBuf },
}

struct CacheState {
    private_mtime: Option<SystemTime>,
    public_mtime: SystemTime,
    envelope: Arc<RsaEnvelope>,
}

/// An mtime-indexed cache over one envelope's key files.
pub struct KeyCache {
    source: KeySource,
    state: Mutex<Option<CacheState>>,
}

impl KeyCache {
    /// Cache a full key pair.
    pub fn new_pair(private_path: impl Into<PathBuf>, public_path: impl Into<PathBuf>) -> Self {
        Self {
            source: KeySource::Pair {
                private_path: private_path.into(),
                public_path: public_path.into(),
            },
            state: Mutex::new(None),
        }
    }

    /// Cache a public-only key file.
    pub fn new_public(path: impl Into<PathBuf>) -> Self {
        Self {
            source: KeySource::PublicOnly { path: path.into() },
            state: Mutex::new(None),
        }
    }

    /// Return the cached envelope, reloading if any key file changed on disk.
    pub async fn envelope(&self) -> Result<Arc<RsaEnvelope>, CryptoError> {
        let mut state = self.state.lock().await;
        match &self.source {
            KeySource::Pair {
                private_path,
                public_path,
            } => {
                let private_mtime = mtime(private_path).await?;
                let public_mtime = mtime(public_path).await?;
                if let Some(cached) = state.as_ref() {
                    if cached.private_mtime == Some(private_mtime)
                        && cached.public_mtime == public_mtime
                    {
                        return Ok(Arc::clone(&cached.envelope));
                    }
                }
                let private_pem = read_key(private_path).await?;
                let public_pem = read_key(public_path).await?;
                let envelope = Arc::new(RsaEnvelope::from_key_pair_pem(&private_pem, &public_pem)?);
                tracing::debug!(target: "key_cache", path = %public_path.display(), "reloaded key pair");
                *state = Some(CacheState {
                    private_mtime: Some(private_mtime),
                    public_mtime,
                    envelope: Arc::clone(&envelope),
                });
                Ok(envelope)
            }
            KeySource::PublicOnly { path } => {
                let public_mtime = mtime(path).await?;
                if let Some(cached) = state.as_ref() {
                    if cached.public_mtime == public_mtime {
                        return Ok(Arc::clone(&cached.envelope));
                    }
                }
                let public_pem = read_key(path).await?;
                let envelope = Arc::new(RsaEnvelope::from_public_pem(&public_pem)?);
                tracing::debug!(target: "key_cache", path = %path.display(), "reloaded public key");
                *state = Some(CacheState {
                    private_mtime: None,
                    public_mtime,
                    envelope: Arc::clone(&envelope),
                });
                Ok(envelope)
            }
        }
    }
}

async fn mtime(path: &Path) -> Result<SystemTime, CryptoError> {
    let meta = tokio::fs::metadata(path).await.map_err(|e| io_to_crypto(path, e))?;
    meta.modified().map_err(|e| io_to_crypto(path, e))
}

async fn read_key(path: &Path) -> Result<String, CryptoError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| io_to_crypto(path, e))
}

fn io_to_crypto(path: &Path, e: std::io::Error) -> CryptoError {
    if e.kind() == std::io::ErrorKind::NotFound {
        CryptoError::KeyNotFound(path.display().to_string())
    } else {
        CryptoError::Io(format!("{}: {e}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn write_pair(dir: &Path) -> RsaEnvelope {
        let env = RsaEnvelope::generate(1024).unwrap();
        std::fs::write(dir.join("private_key"), env.private_key_pem().unwrap()).unwrap();
        std::fs::write(dir.join("public_key"), env.public_key_pem().unwrap()).unwrap();
        env
    }

    #[tokio::test]
    async fn missing_file_is_key_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let cache = KeyCache::new_pair(dir.path().join("private_key"), dir.path().join("public_key"));
        assert!(matches!(
            cache.envelope().await.unwrap_err(),
            CryptoError::KeyNotFound(_)
        ));
    }

    #[tokio::test]
    async fn unchanged_mtimes_return_same_envelope() {
        let dir = tempfile::tempdir().unwrap();
        write_pair(dir.path());
        let cache = KeyCache::new_pair(dir.path().join("private_key"), dir.path().join("public_key"));
        let first = cache.envelope().await.unwrap();
        let second = cache.envelope().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn touched_file_triggers_reload() {
        let dir = tempfile::tempdir().unwrap();
        write_pair(dir.path());
        let cache = KeyCache::new_pair(dir.path().join("private_key"), dir.path().join("public_key"));
        let first = cache.envelope().await.unwrap();

        // Filesystem mtime granularity can be a full second.
        tokio::time::sleep(Duration::from_millis(1100)).await;
        let replacement = write_pair(dir.path());

        let second = cache.envelope().await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        let cipher = second.encrypt("after-rotation").unwrap();
        assert_eq!(replacement.decrypt(&cipher).unwrap(), "after-rotation");
    }

    #[tokio::test]
    async fn public_only_mode_verifies() {
        let dir = tempfile::tempdir().unwrap();
        let pair = write_pair(dir.path());
        let cache = KeyCache::new_public(dir.path().join("public_key"));
        let env = cache.envelope().await.unwrap();
        let sig = pair.sign("claim").unwrap();
        assert!(env.verify("claim", &sig));
        assert!(matches!(
            env.decrypt("anything").unwrap_err(),
            CryptoError::PrivateKeyUnavailable
        ));
    }
}
