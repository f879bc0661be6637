// Copyright (c) 2024 The Weft Authors

//! X.509 certificate import.

use crate::{Error, PublicKey, Result, SubjectKeyId};
use der::{Decode, Encode};
use sha2::{Digest, Sha256};

/// A parsed X.509 certificate with its verifier extracted.
#[derive(Clone, Debug)]
pub struct Certificate {
    der: Vec<u8>,
    parsed: x509_cert::Certificate,
    public_key: PublicKey,
}

impl Certificate {
    /// Import a certificate from PEM or DER bytes.
    pub fn import(bytes: &[u8]) -> Result<Self> {
        let der = if looks_like_pem(bytes) {
            let block = pem::parse(bytes)
                .map_err(|e| Error::BadCertEncoding(e.to_string()))?;
            if block.tag() != "CERTIFICATE" {
                return Err(Error::BadCertEncoding(format!(
                    "expected a CERTIFICATE block, got {}",
                    block.tag()
                )));
            }
            block.into_contents()
        } else {
            bytes.to_vec()
        };

        let parsed = x509_cert::Certificate::from_der(&der)
            .map_err(|e| Error::BadCertEncoding(e.to_string()))?;

        let spki_der = parsed
            .tbs_certificate
            .subject_public_key_info
            .to_der()
            .map_err(|e| Error::BadCertEncoding(e.to_string()))?;
        let public_key = PublicKey::from_spki_der(&spki_der)?;

        Ok(Self { der, parsed, public_key })
    }

    /// The DER bytes this certificate was parsed from.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// PEM rendering of the certificate.
    pub fn to_pem(&self) -> String {
        pem::encode(&pem::Pem::new("CERTIFICATE", self.der.clone()))
    }

    /// The subject distinguished name, RFC 4514 style.
    pub fn subject(&self) -> String {
        self.parsed.tbs_certificate.subject.to_string()
    }

    /// The verifier bound to this certificate.
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// SKI of the certified public key.
    pub fn ski(&self) -> SubjectKeyId {
        self.public_key.ski()
    }

    /// SHA-256 digest of the DER certificate, e.g. for TLS cert-hash
    /// binding.
    pub fn digest(&self) -> [u8; 32] {
        Sha256::digest(&self.der).into()
    }
}

fn looks_like_pem(bytes: &[u8]) -> bool {
    // Tolerate leading whitespace before the armor.
    let trimmed = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .map(|i| &bytes[i..])
        .unwrap_or_default();
    trimmed.starts_with(b"-----BEGIN")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_is_a_bad_cert() {
        assert_matches::assert_matches!(
            Certificate::import(b"not a certificate"),
            Err(Error::BadCertEncoding(_))
        );
        assert_matches::assert_matches!(
            Certificate::import(b"-----BEGIN CERTIFICATE-----\nZ%@\n-----END CERTIFICATE-----\n"),
            Err(Error::BadCertEncoding(_))
        );
    }

    #[test]
    fn wrong_pem_tag_is_rejected() {
        let block = pem::encode(&pem::Pem::new("PRIVATE KEY", vec![1, 2, 3]));
        assert_matches::assert_matches!(
            Certificate::import(block.as_bytes()),
            Err(Error::BadCertEncoding(_))
        );
    }
}
