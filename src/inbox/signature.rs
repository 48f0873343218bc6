use base64::Engine;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::pkcs8::DecodePublicKey;
use rsa::signature::Verifier;
use rsa::RsaPublicKey;
use sha2::Sha256;
use std::sync::RwLock;

/// Verifies RSA-SHA256 webhook signatures against the gateway's public key.
///
/// The key starts empty and is installed wholesale after the boot fetch.
/// With no key present every check fails closed: webhooks are rejected until
/// the key becomes available, never accepted blindly.
#[derive(Default)]
pub struct SignatureVerifier {
    public_key_pem: RwLock<String>,
}

impl SignatureVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install_key(&self, pem: String) {
        let mut key = self
            .public_key_pem
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *key = pem;
    }

    pub fn has_key(&self) -> bool {
        !self
            .public_key_pem
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_empty()
    }

    /// Checks `signature_b64` over the exact raw body bytes. Every failure
    /// mode (no key, bad base64, unparsable PEM, mismatch) is `false`.
    pub fn verify(&self, raw_body: &[u8], signature_b64: &str) -> bool {
        let pem = self
            .public_key_pem
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        if pem.is_empty() {
            return false;
        }

        let Ok(signature_bytes) = base64::engine::general_purpose::STANDARD.decode(signature_b64)
        else {
            return false;
        };
        let Ok(signature) = Signature::try_from(signature_bytes.as_slice()) else {
            return false;
        };

        let Ok(public_key) = RsaPublicKey::from_public_key_pem(&pem)
            .or_else(|_| RsaPublicKey::from_pkcs1_pem(&pem))
        else {
            return false;
        };

        VerifyingKey::<Sha256>::new(public_key)
            .verify(raw_body, &signature)
            .is_ok()
    }
}
