// Copyright (c) 2024 The Weft Authors

//! Typed ECDSA key pairs over the curves the ledger accepts.

use crate::{Error, Result};
use p256::pkcs8::{DecodePrivateKey, EncodePrivateKey};
use rand_core::OsRng;
use spki::{DecodePublicKey, EncodePublicKey};
use sha2::{Digest, Sha256};
use signature::{Signer, Verifier};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Supported key algorithms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
    EcdsaP256,
    EcdsaP384,
}

impl KeyAlgorithm {
    /// Private scalar length in bytes.
    pub fn key_size(&self) -> usize {
        match self {
            Self::EcdsaP256 => 32,
            Self::EcdsaP384 => 48,
        }
    }
}

/// Subject key identifier: SHA-256 over the DER encoding of the public
/// key. The primary key for credential storage.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubjectKeyId([u8; 32]);

impl SubjectKeyId {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    fn of_spki_der(der: &[u8]) -> Self {
        Self(Sha256::digest(der).into())
    }
}

impl Display for SubjectKeyId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl std::fmt::Debug for SubjectKeyId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "SubjectKeyId({self})")
    }
}

/// An ECDSA signing key pair.
///
/// Signatures are DER-encoded and canonicalized so the `s` component is
/// in the lower half of the curve order; the ledger rejects the high-s
/// form.
#[derive(Clone)]
pub enum KeyPair {
    P256(p256::ecdsa::SigningKey),
    P384(p384::ecdsa::SigningKey),
}

impl KeyPair {
    /// Generate a fresh key pair from the OS entropy source.
    pub fn generate(algo: KeyAlgorithm) -> Self {
        match algo {
            KeyAlgorithm::EcdsaP256 => Self::P256(p256::ecdsa::SigningKey::random(&mut OsRng)),
            KeyAlgorithm::EcdsaP384 => Self::P384(p384::ecdsa::SigningKey::random(&mut OsRng)),
        }
    }

    /// Import a raw private scalar.
    pub fn from_bytes(algo: KeyAlgorithm, bytes: &[u8]) -> Result<Self> {
        if bytes.len() != algo.key_size() {
            return Err(Error::BadKeySize { expected: algo.key_size(), actual: bytes.len() });
        }
        match algo {
            KeyAlgorithm::EcdsaP256 => p256::ecdsa::SigningKey::from_slice(bytes)
                .map(Self::P256)
                .map_err(|e| Error::BadKeyEncoding(e.to_string())),
            KeyAlgorithm::EcdsaP384 => p384::ecdsa::SigningKey::from_slice(bytes)
                .map(Self::P384)
                .map_err(|e| Error::BadKeyEncoding(e.to_string())),
        }
    }

    /// Import a PKCS#8 DER private key, inferring the curve.
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self> {
        if let Ok(key) = p256::ecdsa::SigningKey::from_pkcs8_der(der) {
            return Ok(Self::P256(key));
        }
        p384::ecdsa::SigningKey::from_pkcs8_der(der)
            .map(Self::P384)
            .map_err(|e| Error::BadKeyEncoding(e.to_string()))
    }

    /// Export as PKCS#8 DER. The returned buffer holds secret material;
    /// callers should zeroize it when done.
    pub fn to_pkcs8_der(&self) -> Result<Vec<u8>> {
        let doc = match self {
            Self::P256(key) => key.to_pkcs8_der(),
            Self::P384(key) => key.to_pkcs8_der(),
        }
        .map_err(|e| Error::BadKeyEncoding(e.to_string()))?;
        Ok(doc.as_bytes().to_vec())
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        match self {
            Self::P256(_) => KeyAlgorithm::EcdsaP256,
            Self::P384(_) => KeyAlgorithm::EcdsaP384,
        }
    }

    /// The verifying half.
    pub fn public_key(&self) -> PublicKey {
        match self {
            Self::P256(key) => PublicKey::P256(*key.verifying_key()),
            Self::P384(key) => PublicKey::P384(*key.verifying_key()),
        }
    }

    /// SKI of the public half.
    pub fn ski(&self) -> SubjectKeyId {
        self.public_key().ski()
    }

    /// Sign `msg` with the curve's matched hash (SHA-256 for P-256,
    /// SHA-384 for P-384) and return a canonical low-s DER signature.
    pub fn sign(&self, msg: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::P256(key) => {
                let sig: p256::ecdsa::Signature =
                    key.try_sign(msg).map_err(|e| Error::SigningFailed(e.to_string()))?;
                let sig = sig.normalize_s().unwrap_or(sig);
                Ok(sig.to_der().as_bytes().to_vec())
            }
            Self::P384(key) => {
                let sig: p384::ecdsa::Signature =
                    key.try_sign(msg).map_err(|e| Error::SigningFailed(e.to_string()))?;
                let sig = sig.normalize_s().unwrap_or(sig);
                Ok(sig.to_der().as_bytes().to_vec())
            }
        }
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        // Never print private material.
        write!(f, "KeyPair({:?}, ski={})", self.algorithm(), self.ski())
    }
}

/// An ECDSA verifying key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PublicKey {
    P256(p256::ecdsa::VerifyingKey),
    P384(p384::ecdsa::VerifyingKey),
}

impl PublicKey {
    /// Import a DER `SubjectPublicKeyInfo`, inferring the curve.
    pub fn from_spki_der(der: &[u8]) -> Result<Self> {
        if let Ok(key) = p256::ecdsa::VerifyingKey::from_public_key_der(der) {
            return Ok(Self::P256(key));
        }
        if let Ok(key) = p384::ecdsa::VerifyingKey::from_public_key_der(der) {
            return Ok(Self::P384(key));
        }
        Err(Error::BadAlgo("public key is not ECDSA over P-256 or P-384".into()))
    }

    /// Export as DER `SubjectPublicKeyInfo`.
    pub fn to_spki_der(&self) -> Result<Vec<u8>> {
        let doc = match self {
            Self::P256(key) => key.to_public_key_der(),
            Self::P384(key) => key.to_public_key_der(),
        }
        .map_err(|e| Error::BadKeyEncoding(e.to_string()))?;
        Ok(doc.as_bytes().to_vec())
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        match self {
            Self::P256(_) => KeyAlgorithm::EcdsaP256,
            Self::P384(_) => KeyAlgorithm::EcdsaP384,
        }
    }

    /// SKI of this key.
    pub fn ski(&self) -> SubjectKeyId {
        // SPKI encoding of a valid key cannot fail.
        let der = self.to_spki_der().expect("SPKI encoding of a valid key");
        SubjectKeyId::of_spki_der(&der)
    }

    /// Verify a DER ECDSA signature over `msg`.
    ///
    /// The high-s form is rejected (returns false), matching what the
    /// ledger itself does.
    pub fn verify(&self, msg: &[u8], sig_der: &[u8]) -> Result<bool> {
        match self {
            Self::P256(key) => {
                let sig = p256::ecdsa::Signature::from_der(sig_der)
                    .map_err(|e| Error::BadSignatureEncoding(e.to_string()))?;
                if sig.normalize_s().is_some() {
                    return Ok(false);
                }
                Ok(key.verify(msg, &sig).is_ok())
            }
            Self::P384(key) => {
                let sig = p384::ecdsa::Signature::from_der(sig_der)
                    .map_err(|e| Error::BadSignatureEncoding(e.to_string()))?;
                if sig.normalize_s().is_some() {
                    return Ok(false);
                }
                Ok(key.verify(msg, &sig).is_ok())
            }
        }
    }
}
