// Path: crates/crypto/src/envelope.rs
//! The RSA operations bundle bound to a loaded key pair.

use provenet_types::error::CryptoError;
use rand::rngs::OsRng;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::pss::{Signature, SigningKey, VerifyingKey};
use rsa::signature::{RandomizedSigner, SignatureEncoding, Verifier};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

/// RSA envelope: encrypt/decrypt with OAEP-SHA256, sign/verify with
/// PSS-SHA256, ciphertext and signatures framed as base85 text.
///
/// Either half of the pair may be absent; operations that need the missing
/// half fail with `PublicKeyUnavailable` / `PrivateKeyUnavailable`.
#[derive(Clone, Debug)]
pub struct RsaEnvelope {
    public: Option<RsaPublicKey>,
    private: Option<RsaPrivateKey>,
}

impl RsaEnvelope {
    /// Load an envelope from PEM text. Accepts PKCS#8/SPKI ("PRIVATE KEY",
    /// "PUBLIC KEY") and falls back to PKCS#1 ("RSA PRIVATE KEY", "RSA
    /// PUBLIC KEY") framing.
    pub fn from_pem(public_pem: Option<&str>, private_pem: Option<&str>) -> Result<Self, CryptoError> {
        let public = public_pem.map(parse_public_pem).transpose()?;
        let private = private_pem.map(parse_private_pem).transpose()?;
        Ok(Self { public, private })
    }

    /// Load a full key pair.
    pub fn from_key_pair_pem(private_pem: &str, public_pem: &str) -> Result<Self, CryptoError> {
        Self::from_pem(Some(public_pem), Some(private_pem))
    }

    /// Load a verification/encryption-only envelope.
    pub fn from_public_pem(public_pem: &str) -> Result<Self, CryptoError> {
        Self::from_pem(Some(public_pem), None)
    }

    /// Load a decryption/signing-only envelope.
    pub fn from_private_pem(private_pem: &str) -> Result<Self, CryptoError> {
        Self::from_pem(None, Some(private_pem))
    }

    /// Generate a fresh key pair of `bits` modulus size.
    pub fn generate(bits: usize) -> Result<Self, CryptoError> {
        let private = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| CryptoError::InvalidKey(format!("key generation failed: {e}")))?;
        let public = private.to_public_key();
        Ok(Self {
            public: Some(public),
            private: Some(private),
        })
    }

    fn public(&self) -> Result<&RsaPublicKey, CryptoError> {
        self.public.as_ref().ok_or(CryptoError::PublicKeyUnavailable)
    }

    fn private(&self) -> Result<&RsaPrivateKey, CryptoError> {
        self.private.as_ref().ok_or(CryptoError::PrivateKeyUnavailable)
    }

    /// OAEP(MGF1-SHA256, SHA256, no label) encrypt, base85-encoded.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let ciphertext = self
            .public()?
            .encrypt(&mut OsRng, Oaep::new::<Sha256>(), plaintext.as_bytes())
            .map_err(|_| CryptoError::EncryptionFailed)?;
        Ok(base85::encode(&ciphertext))
    }

    /// Inverse of [`encrypt`](Self::encrypt).
    ///
    /// Malformed base85, padding failure and empty plaintext all collapse
    /// into the single `DecryptionFailed` kind; callers must not be able to
    /// distinguish a wrong key from malformed input.
    pub fn decrypt(&self, ciphertext: &str) -> Result<String, CryptoError> {
        let private = self.private()?;
        let raw = base85::decode(ciphertext).map_err(|_| CryptoError::DecryptionFailed)?;
        let plaintext = private
            .decrypt(Oaep::new::<Sha256>(), &raw)
            .map_err(|_| CryptoError::DecryptionFailed)?;
        if plaintext.is_empty() {
            return Err(CryptoError::DecryptionFailed);
        }
        String::from_utf8(plaintext).map_err(|_| CryptoError::DecryptionFailed)
    }

    /// PSS(MGF1-SHA256, SHA256) signature over `message`, base85-encoded.
    pub fn sign(&self, message: &str) -> Result<String, CryptoError> {
        let signing_key = SigningKey::<Sha256>::new(self.private()?.clone());
        let signature = signing_key
            .try_sign_with_rng(&mut OsRng, message.as_bytes())
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;
        Ok(base85::encode(&signature.to_bytes()))
    }

    /// Verify a base85-framed PSS signature. Never errors: any failure —
    /// bad framing, wrong key, tampered message — is `false`.
    pub fn verify(&self, message: &str, signature: &str) -> bool {
        let Ok(public) = self.public() else {
            return false;
        };
        let Ok(raw) = base85::decode(signature) else {
            return false;
        };
        let Ok(sig) = Signature::try_from(raw.as_slice()) else {
            return false;
        };
        VerifyingKey::<Sha256>::new(public.clone())
            .verify(message.as_bytes(), &sig)
            .is_ok()
    }

    /// PEM-serialize the public half (SPKI framing).
    pub fn public_key_pem(&self) -> Result<String, CryptoError> {
        self.public()?
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| CryptoError::InvalidKey(format!("public key serialization failed: {e}")))
    }

    /// PEM-serialize the private half (PKCS#8 framing).
    pub fn private_key_pem(&self) -> Result<String, CryptoError> {
        self.private()?
            .to_pkcs8_pem(LineEnding::LF)
            .map(|pem| pem.to_string())
            .map_err(|e| CryptoError::InvalidKey(format!("private key serialization failed: {e}")))
    }
}

fn parse_public_pem(pem: &str) -> Result<RsaPublicKey, CryptoError> {
    RsaPublicKey::from_public_key_pem(pem)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
        .map_err(|e| CryptoError::InvalidKey(format!("public key parse failed: {e}")))
}

fn parse_private_pem(pem: &str) -> Result<RsaPrivateKey, CryptoError> {
    RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .map_err(|e| CryptoError::InvalidKey(format!("private key parse failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1024-bit keys keep the tests fast; the OAEP bound still leaves room
    // for the short plaintexts exercised here.
    fn test_envelope() -> RsaEnvelope {
        RsaEnvelope::generate(1024).unwrap()
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let env = test_envelope();
        let plain = "127.0.0.1:50050";
        let cipher = env.encrypt(plain).unwrap();
        assert_ne!(cipher, plain);
        assert_eq!(env.decrypt(&cipher).unwrap(), plain);
    }

    #[test]
    fn sign_verify_roundtrip() {
        let env = test_envelope();
        let msg = "0xdeadbeef";
        let sig = env.sign(msg).unwrap();
        assert!(env.verify(msg, &sig));
        assert!(!env.verify("0xdeadbeee", &sig));
    }

    #[test]
    fn verify_rejects_foreign_key() {
        let signer = test_envelope();
        let other = test_envelope();
        let sig = signer.sign("payload").unwrap();
        assert!(!other.verify("payload", &sig));
    }

    #[test]
    fn verify_never_panics_on_garbage() {
        let env = test_envelope();
        assert!(!env.verify("msg", "not base85 \u{7f}"));
        assert!(!env.verify("msg", ""));
        assert!(!env.verify("msg", &base85::encode(b"short")));
    }

    #[test]
    fn decrypt_failures_are_one_kind() {
        let env = test_envelope();
        let garbage = env.decrypt("!!not-a-ciphertext!!").unwrap_err();
        assert!(matches!(garbage, CryptoError::DecryptionFailed));

        let foreign = test_envelope().encrypt("secret").unwrap();
        let wrong_key = env.decrypt(&foreign).unwrap_err();
        assert!(matches!(wrong_key, CryptoError::DecryptionFailed));
    }

    #[test]
    fn pem_roundtrip_preserves_operations() {
        let env = test_envelope();
        let reloaded = RsaEnvelope::from_key_pair_pem(
            &env.private_key_pem().unwrap(),
            &env.public_key_pem().unwrap(),
        )
        .unwrap();
        let cipher = reloaded.encrypt("hello").unwrap();
        assert_eq!(env.decrypt(&cipher).unwrap(), "hello");
        let sig = env.sign("hello").unwrap();
        assert!(reloaded.verify("hello", &sig));
    }

    #[test]
    fn half_envelopes_reject_missing_operations() {
        let pair = test_envelope();
        let public_only = RsaEnvelope::from_public_pem(&pair.public_key_pem().unwrap()).unwrap();
        assert!(matches!(
            public_only.decrypt("anything").unwrap_err(),
            CryptoError::PrivateKeyUnavailable
        ));
        let private_only = RsaEnvelope::from_private_pem(&pair.private_key_pem().unwrap()).unwrap();
        assert!(matches!(
            private_only.encrypt("anything").unwrap_err(),
            CryptoError::PublicKeyUnavailable
        ));
    }
}
