//! Request signing
//!
//! The firmware rejects state-changing requests unless they carry a `Check`
//! header: the hex SHA-256 of the body, RSA-encrypted (PKCS#1 v1.5) with a
//! public key baked into the web UI, then base64-encoded.

use base64::{Engine as _, engine::general_purpose};
use f680_core::{Error, Result};
use rand::rngs::OsRng;
use rsa::pkcs8::DecodePublicKey;
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Encrypt, RsaPublicKey};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Header carrying the signature
pub const CHECK_HEADER: &str = "Check";

/// Stand-in key used when no key file is configured
///
/// This is not the firmware's key: routers reject requests signed with it.
const PLACEHOLDER_ENCRYPTION_KEY: &str = include_str!("../keys/placeholder_public.pem");

/// Signs request bodies with the router's public key
#[derive(Debug, Clone)]
pub struct RequestSigner {
    key: RsaPublicKey,
}

impl RequestSigner {
    /// Signer using the bundled placeholder key
    pub fn placeholder() -> Result<Self> {
        Self::from_pem(PLACEHOLDER_ENCRYPTION_KEY)
    }

    /// Parse a PEM `PUBLIC KEY` block holding an RSA key
    pub fn from_pem(pem: &str) -> Result<Self> {
        let key = RsaPublicKey::from_public_key_pem(pem)
            .map_err(|e| Error::parse(format!("unable to parse pub key: {}", e)))?;
        Ok(Self { key })
    }

    /// Read the key from a PEM file
    pub fn from_file(path: &Path) -> Result<Self> {
        let pem = std::fs::read_to_string(path).map_err(|e| {
            Error::parse(format!("unable to read key {}: {}", path.display(), e))
        })?;
        Self::from_pem(&pem)
    }

    /// Key modulus size in bytes, which is also the ciphertext length
    pub fn key_size(&self) -> usize {
        self.key.size()
    }

    /// Lowercase hex SHA-256 of `payload`
    pub fn digest(payload: &[u8]) -> String {
        hex::encode(Sha256::digest(payload))
    }

    /// Produce the `Check` header value for `payload`
    ///
    /// PKCS#1 v1.5 padding is randomized, so two signatures of the same
    /// payload differ while both decrypt to the same digest.
    pub fn sign(&self, payload: &[u8]) -> Result<String> {
        let digest = Self::digest(payload);
        let encrypted = self
            .key
            .encrypt(&mut OsRng, Pkcs1v15Encrypt, digest.as_bytes())
            .map_err(|e| Error::signing(format!("encryption failed: {}", e)))?;

        Ok(general_purpose::STANDARD.encode(encrypted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::RsaPrivateKey;
    use rsa::pkcs8::DecodePrivateKey;

    const TEST_PUBLIC: &str = include_str!("../tests/fixtures/test_public.pem");
    const TEST_PRIVATE: &str = include_str!("../tests/fixtures/test_private.pem");

    #[test]
    fn test_digest_is_hex_sha256() {
        assert_eq!(
            RequestSigner::digest(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(RequestSigner::digest(b"IF_ACTION=Apply").len(), 64);
    }

    #[test]
    fn test_signature_decrypts_to_digest() {
        let signer = RequestSigner::from_pem(TEST_PUBLIC).unwrap();
        let private = RsaPrivateKey::from_pkcs8_pem(TEST_PRIVATE).unwrap();
        let payload = b"IF_ACTION=Apply&ProcFlag_0=2&_InstID_0=DEV.DHCPSOURCE1&_InstNum=1";

        let signature = signer.sign(payload).unwrap();
        let ciphertext = general_purpose::STANDARD.decode(&signature).unwrap();
        assert_eq!(ciphertext.len(), signer.key_size());
        assert_eq!(ciphertext.len(), 256);

        let plain = private.decrypt(Pkcs1v15Encrypt, &ciphertext).unwrap();
        assert_eq!(plain, RequestSigner::digest(payload).into_bytes());
    }

    #[test]
    fn test_padding_is_randomized() {
        let signer = RequestSigner::from_pem(TEST_PUBLIC).unwrap();
        let a = signer.sign(b"payload").unwrap();
        let b = signer.sign(b"payload").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_placeholder_key_parses() {
        let signer = RequestSigner::placeholder().unwrap();
        let ciphertext = general_purpose::STANDARD
            .decode(signer.sign(b"payload").unwrap())
            .unwrap();
        assert_eq!(ciphertext.len(), signer.key_size());
    }

    #[test]
    fn test_rejects_non_public_key_pem() {
        assert!(RequestSigner::from_pem(TEST_PRIVATE).is_err());
        assert!(RequestSigner::from_pem("not a key").is_err());
    }
}
