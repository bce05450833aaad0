// Path: crates/crypto/src/keygen.rs
//! Key-file generation for the `crypto-keys` CLI subcommand.

use crate::envelope::RsaEnvelope;
use provenet_types::config::{PRIVATE_KEY_FILE, PUBLIC_KEY_FILE};
use provenet_types::error::CryptoError;
use std::path::{Path, PathBuf};

/// Smallest modulus the CLI will generate.
pub const MIN_KEY_BITS: usize = 2048;
/// Largest modulus the CLI will generate.
pub const MAX_KEY_BITS: usize = 8192;

/// Writes a freshly generated key pair into a directory as
/// `private_key` / `public_key` PEM files.
pub struct CryptoKeyWriter {
    dir: PathBuf,
}

impl CryptoKeyWriter {
    /// A writer targeting `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Generate a pair of `bits` modulus size and write both PEM files.
    /// Returns the paths written.
    pub fn generate(&self, bits: usize) -> Result<(PathBuf, PathBuf), CryptoError> {
        if !(MIN_KEY_BITS..=MAX_KEY_BITS).contains(&bits) {
            return Err(CryptoError::InvalidKey(format!(
                "key size {bits} outside [{MIN_KEY_BITS}, {MAX_KEY_BITS}]"
            )));
        }
        let envelope = RsaEnvelope::generate(bits)?;
        let private_path = self.dir.join(PRIVATE_KEY_FILE);
        let public_path = self.dir.join(PUBLIC_KEY_FILE);
        write_file(&private_path, &envelope.private_key_pem()?)?;
        write_file(&public_path, &envelope.public_key_pem()?)?;
        tracing::info!(
            target: "keygen",
            dir = %self.dir.display(),
            bits,
            "crypto keys generated"
        );
        Ok((private_path, public_path))
    }
}

fn write_file(path: &Path, pem: &str) -> Result<(), CryptoError> {
    std::fs::write(path, pem).map_err(|e| CryptoError::Io(format!("{}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_sizes() {
        let dir = tempfile::tempdir().unwrap();
        let writer = CryptoKeyWriter::new(dir.path());
        assert!(writer.generate(1024).is_err());
        assert!(writer.generate(16384).is_err());
    }

    #[test]
    fn writes_loadable_pair() {
        let dir = tempfile::tempdir().unwrap();
        let (private_path, public_path) = CryptoKeyWriter::new(dir.path()).generate(2048).unwrap();
        let envelope = RsaEnvelope::from_key_pair_pem(
            &std::fs::read_to_string(private_path).unwrap(),
            &std::fs::read_to_string(public_path).unwrap(),
        )
        .unwrap();
        let cipher = envelope.encrypt("probe").unwrap();
        assert_eq!(envelope.decrypt(&cipher).unwrap(), "probe");
    }
}
