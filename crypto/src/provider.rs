// Copyright (c) 2024 The Weft Authors

//! The crypto provider facade: one object carrying every primitive the
//! SDK needs, so callers hold a single seam instead of a bag of free
//! functions.

use crate::{csr, Certificate, HashAlgorithm, KeyAlgorithm, KeyPair, Result};
use std::time::Duration;

/// Software crypto provider over the RustCrypto ECDSA stack.
///
/// Stateless; cheap to clone and share.
#[derive(Clone, Copy, Debug, Default)]
pub struct CryptoProvider;

impl CryptoProvider {
    pub fn new() -> Self {
        Self
    }

    /// Generate a key pair for `algo`.
    pub fn generate_key(&self, algo: KeyAlgorithm) -> KeyPair {
        KeyPair::generate(algo)
    }

    /// Sign `msg`, returning a canonical low-s DER ECDSA signature.
    pub fn sign(&self, key: &KeyPair, msg: &[u8]) -> Result<Vec<u8>> {
        key.sign(msg)
    }

    /// Verify `sig` over `msg` against the public key certified by
    /// `cert`. High-s signatures do not verify.
    pub fn verify(&self, cert: &Certificate, msg: &[u8], sig: &[u8]) -> Result<bool> {
        cert.public_key().verify(msg, sig)
    }

    /// Hash `msg` under `algo`.
    pub fn hash(&self, msg: &[u8], algo: HashAlgorithm) -> Vec<u8> {
        algo.digest(msg)
    }

    /// Parse a PEM or DER certificate.
    pub fn import_cert(&self, bytes: &[u8]) -> Result<Certificate> {
        Certificate::import(bytes)
    }

    /// Build a PEM certification request for `key`.
    pub fn create_csr(&self, key: &KeyPair, subject: &str) -> Result<String> {
        csr::create_csr(key, subject)
    }

    /// Mint a self-signed certificate, for local and test identities.
    pub fn self_signed(
        &self,
        key: &KeyPair,
        subject: &str,
        lifetime: Duration,
    ) -> Result<Certificate> {
        csr::self_signed(key, subject, lifetime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_sign_verify_against_cert() {
        let provider = CryptoProvider::new();
        let key = provider.generate_key(KeyAlgorithm::EcdsaP256);
        let cert = provider
            .self_signed(&key, "CN=app1,O=org1", Duration::from_secs(600))
            .unwrap();

        let sig = provider.sign(&key, b"proposal bytes").unwrap();
        assert!(provider.verify(&cert, b"proposal bytes", &sig).unwrap());
        assert!(!provider.verify(&cert, b"tampered", &sig).unwrap());
    }
}
