// Copyright (c) 2024 The Weft Authors

//! The identity value object.

use crate::{Error, Result};
use prost::Message;
use std::{fmt, sync::Arc};
use weft_crypto::{Certificate, KeyPair, PublicKey};
use weft_protocol::msp::SerializedIdentity;

/// A channel member identity: MSP id, certificate, and (for signing
/// identities) the private-key handle. Immutable after construction.
///
/// The wire form is the MSP envelope `(mspId, cert-bytes)`; the private
/// key never leaves the process. Equality is over the wire form, so an
/// identity round-trips `parse(serialize(id)) == id` whether or not a
/// key is attached.
#[derive(Clone)]
pub struct Identity {
    msp_id: String,
    cert_bytes: Vec<u8>,
    cert: Certificate,
    key: Option<Arc<KeyPair>>,
}

impl Identity {
    /// Construct a signing identity.
    ///
    /// `cert_bytes` is the PEM (or DER) certificate exactly as it will
    /// be serialized on the wire. The key must match the certificate.
    pub fn new(
        msp_id: impl Into<String>,
        cert_bytes: impl Into<Vec<u8>>,
        key: Arc<KeyPair>,
    ) -> Result<Self> {
        let mut identity = Self::verifier(msp_id, cert_bytes)?;
        if key.ski() != identity.cert.ski() {
            return Err(Error::KeyMismatch {
                key: key.ski().to_string(),
                cert: identity.cert.ski().to_string(),
            });
        }
        identity.key = Some(key);
        Ok(identity)
    }

    /// Construct a verify-only identity (no private key), e.g. a peer
    /// identity parsed off the wire.
    pub fn verifier(msp_id: impl Into<String>, cert_bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let msp_id = msp_id.into();
        if msp_id.is_empty() {
            return Err(Error::EmptyMspId);
        }
        let cert_bytes = cert_bytes.into();
        let cert = Certificate::import(&cert_bytes)?;
        Ok(Self { msp_id, cert_bytes, cert, key: None })
    }

    /// Parse the MSP wire envelope.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let serialized = SerializedIdentity::decode(bytes)?;
        Self::verifier(serialized.mspid, serialized.id_bytes)
    }

    /// The MSP wire envelope: `(mspId, cert-bytes)`.
    pub fn to_bytes(&self) -> Vec<u8> {
        SerializedIdentity {
            mspid: self.msp_id.clone(),
            id_bytes: self.cert_bytes.clone(),
        }
        .encode_to_vec()
    }

    pub fn msp_id(&self) -> &str {
        &self.msp_id
    }

    /// The certificate bytes exactly as serialized on the wire.
    pub fn cert_bytes(&self) -> &[u8] {
        &self.cert_bytes
    }

    pub fn certificate(&self) -> &Certificate {
        &self.cert
    }

    /// The verifier for this identity's signatures.
    pub fn public_key(&self) -> &PublicKey {
        self.cert.public_key()
    }

    /// Whether a private key is attached.
    pub fn can_sign(&self) -> bool {
        self.key.is_some()
    }

    /// Sign `msg` with the attached key.
    pub fn sign(&self, msg: &[u8]) -> Result<Vec<u8>> {
        let key = self.key.as_ref().ok_or(Error::MissingKey)?;
        Ok(key.sign(msg)?)
    }
}

impl PartialEq for Identity {
    fn eq(&self, other: &Self) -> bool {
        self.msp_id == other.msp_id && self.cert_bytes == other.cert_bytes
    }
}

impl Eq for Identity {}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("msp_id", &self.msp_id)
            .field("subject", &self.cert.subject())
            .field("can_sign", &self.can_sign())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use weft_crypto::{self_signed, KeyAlgorithm};

    fn signing_identity() -> Identity {
        let key = Arc::new(KeyPair::generate(KeyAlgorithm::EcdsaP256));
        let cert = self_signed(&key, "CN=user1,O=org1", Duration::from_secs(3600)).unwrap();
        Identity::new("Org1MSP", cert.to_pem(), key).unwrap()
    }

    #[test]
    fn serialize_parse_roundtrip() {
        let identity = signing_identity();
        let parsed = Identity::from_bytes(&identity.to_bytes()).unwrap();
        assert_eq!(parsed, identity);
        assert_eq!(parsed.msp_id(), "Org1MSP");
        assert!(!parsed.can_sign());
    }

    #[test]
    fn mismatched_key_is_rejected() {
        let key = Arc::new(KeyPair::generate(KeyAlgorithm::EcdsaP256));
        let other = Arc::new(KeyPair::generate(KeyAlgorithm::EcdsaP256));
        let cert = self_signed(&key, "CN=user1", Duration::from_secs(3600)).unwrap();
        assert_matches::assert_matches!(
            Identity::new("Org1MSP", cert.to_pem(), other),
            Err(Error::KeyMismatch { .. })
        );
    }

    #[test]
    fn empty_msp_id_is_rejected() {
        let key = Arc::new(KeyPair::generate(KeyAlgorithm::EcdsaP256));
        let cert = self_signed(&key, "CN=user1", Duration::from_secs(3600)).unwrap();
        assert_matches::assert_matches!(
            Identity::new("", cert.to_pem(), key),
            Err(Error::EmptyMspId)
        );
    }

    #[test]
    fn verify_only_identity_cannot_sign() {
        let identity = signing_identity();
        let parsed = Identity::from_bytes(&identity.to_bytes()).unwrap();
        assert_matches::assert_matches!(parsed.sign(b"msg"), Err(Error::MissingKey));
    }
}
