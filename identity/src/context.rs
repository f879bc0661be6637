// Copyright (c) 2024 The Weft Authors

//! Per-transaction identity context.

use crate::{Identity, Result};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Nonce length in bytes.
pub const NONCE_LEN: usize = 24;

/// State derived per ledger interaction: a fresh random nonce and the
/// transaction id `hex(sha256(nonce ‖ serialized-identity))`.
///
/// Single-use by convention: reusing a context reuses its transaction
/// id, and the ledger rejects duplicate ids at validation time. Create
/// a new context per submission instead.
#[derive(Clone, Debug)]
pub struct IdentityContext {
    identity: Arc<Identity>,
    nonce: [u8; NONCE_LEN],
    tx_id: String,
}

impl IdentityContext {
    /// Derive a context with a fresh nonce from the OS entropy source.
    pub fn new(identity: Arc<Identity>) -> Self {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        Self::with_nonce(identity, nonce)
    }

    /// Derive a context from a caller-supplied nonce. Exposed so tests
    /// and deterministic replays can pin the transaction id.
    pub fn with_nonce(identity: Arc<Identity>, nonce: [u8; NONCE_LEN]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(nonce);
        hasher.update(identity.to_bytes());
        let tx_id = hex::encode(hasher.finalize());
        Self { identity, nonce, tx_id }
    }

    pub fn identity(&self) -> &Arc<Identity> {
        &self.identity
    }

    pub fn nonce(&self) -> &[u8; NONCE_LEN] {
        &self.nonce
    }

    /// The derived transaction id, lowercase hex.
    pub fn tx_id(&self) -> &str {
        &self.tx_id
    }

    /// The creator field for signature headers: the identity's MSP wire
    /// envelope.
    pub fn creator(&self) -> Vec<u8> {
        self.identity.to_bytes()
    }

    /// Sign `msg` with the context's identity.
    pub fn sign(&self, msg: &[u8]) -> Result<Vec<u8>> {
        self.identity.sign(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use weft_crypto::{self_signed, KeyAlgorithm, KeyPair};

    fn identity() -> Arc<Identity> {
        let key = Arc::new(KeyPair::generate(KeyAlgorithm::EcdsaP256));
        let cert = self_signed(&key, "CN=user1,O=org1", Duration::from_secs(3600)).unwrap();
        Arc::new(Identity::new("Org1MSP", cert.to_pem(), key).unwrap())
    }

    #[test]
    fn tx_id_is_hash_of_nonce_and_identity() {
        let identity = identity();
        let ctx = IdentityContext::new(identity.clone());

        let mut hasher = Sha256::new();
        hasher.update(ctx.nonce());
        hasher.update(identity.to_bytes());
        assert_eq!(ctx.tx_id(), hex::encode(hasher.finalize()));
    }

    #[test]
    fn fresh_contexts_get_fresh_ids() {
        let identity = identity();
        let a = IdentityContext::new(identity.clone());
        let b = IdentityContext::new(identity);
        assert_ne!(a.tx_id(), b.tx_id());
        assert_ne!(a.nonce(), b.nonce());
    }

    #[test]
    fn pinned_nonce_pins_the_id() {
        let identity = identity();
        let a = IdentityContext::with_nonce(identity.clone(), [7u8; NONCE_LEN]);
        let b = IdentityContext::with_nonce(identity, [7u8; NONCE_LEN]);
        assert_eq!(a.tx_id(), b.tx_id());
    }

    #[test]
    fn context_signatures_verify_against_the_identity_cert() {
        let identity = identity();
        let ctx = IdentityContext::new(identity.clone());
        let sig = ctx.sign(b"payload").unwrap();
        assert!(identity.public_key().verify(b"payload", &sig).unwrap());
    }
}
