// Copyright (c) 2024 The Weft Authors

//! Certificate-request assembly, plus a self-signed variant for local
//! and test credentials.
//!
//! Both paths assemble the to-be-signed structure explicitly, sign its
//! exact DER bytes with the canonical ECDSA path from [`crate::KeyPair`],
//! and wrap the result, so the signature algorithm identifiers stay
//! visible instead of being buried in a builder.

use crate::{Certificate, Error, KeyAlgorithm, KeyPair, Result};
use der::{
    asn1::{BitString, ObjectIdentifier},
    Decode, Encode, EncodePem,
};
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use std::{str::FromStr, time::Duration};
use x509_cert::{
    certificate::{TbsCertificate, Version as CertVersion},
    name::Name,
    request::{CertReq, CertReqInfo, Version as ReqVersion},
    serial_number::SerialNumber,
    time::Validity,
};

const ECDSA_WITH_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2");
const ECDSA_WITH_SHA384: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.3");

fn signature_algorithm(algo: KeyAlgorithm) -> AlgorithmIdentifierOwned {
    let oid = match algo {
        KeyAlgorithm::EcdsaP256 => ECDSA_WITH_SHA256,
        KeyAlgorithm::EcdsaP384 => ECDSA_WITH_SHA384,
    };
    AlgorithmIdentifierOwned { oid, parameters: None }
}

fn parse_subject(subject: &str) -> Result<Name> {
    Name::from_str(subject).map_err(|e| Error::BadSubject(format!("{subject:?}: {e}")))
}

fn subject_public_key_info(key: &KeyPair) -> Result<SubjectPublicKeyInfoOwned> {
    let spki_der = key.public_key().to_spki_der()?;
    Ok(SubjectPublicKeyInfoOwned::from_der(&spki_der)?)
}

/// Build a PEM certification request for `key` with the given subject
/// distinguished name (e.g. `"CN=user1,O=org1"`).
pub fn create_csr(key: &KeyPair, subject: &str) -> Result<String> {
    let info = CertReqInfo {
        version: ReqVersion::V1,
        subject: parse_subject(subject)?,
        public_key: subject_public_key_info(key)?,
        attributes: Default::default(),
    };

    let info_der = info.to_der()?;
    let signature = key.sign(&info_der)?;

    let csr = CertReq {
        info,
        algorithm: signature_algorithm(key.algorithm()),
        signature: BitString::from_bytes(&signature)?,
    };

    csr.to_pem(der::pem::LineEnding::LF)
        .map_err(|e| Error::BadKeyEncoding(e.to_string()))
}

/// Mint a self-signed certificate for `key`, valid for `lifetime`.
///
/// Meant for local development and tests; production identities come
/// from the certificate authority collaborator.
pub fn self_signed(key: &KeyPair, subject: &str, lifetime: Duration) -> Result<Certificate> {
    let name = parse_subject(subject)?;
    let algorithm = signature_algorithm(key.algorithm());

    let tbs = TbsCertificate {
        version: CertVersion::V3,
        serial_number: SerialNumber::new(&[1]).map_err(Error::from)?,
        signature: algorithm.clone(),
        issuer: name.clone(),
        validity: Validity::from_now(lifetime).map_err(Error::from)?,
        subject: name,
        subject_public_key_info: subject_public_key_info(key)?,
        issuer_unique_id: None,
        subject_unique_id: None,
        extensions: None,
    };

    let tbs_der = tbs.to_der()?;
    let signature = key.sign(&tbs_der)?;

    let cert = x509_cert::Certificate {
        tbs_certificate: tbs,
        signature_algorithm: algorithm,
        signature: BitString::from_bytes(&signature)?,
    };

    Certificate::import(&cert.to_der()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csr_is_pem_armored() {
        let key = KeyPair::generate(KeyAlgorithm::EcdsaP256);
        let csr = create_csr(&key, "CN=user1,O=org1").unwrap();
        assert!(csr.starts_with("-----BEGIN CERTIFICATE REQUEST-----"));
    }

    #[test]
    fn bad_subject_is_reported() {
        let key = KeyPair::generate(KeyAlgorithm::EcdsaP256);
        assert_matches::assert_matches!(
            create_csr(&key, "not a dn"),
            Err(Error::BadSubject(_))
        );
    }

    #[test]
    fn self_signed_cert_verifies_with_the_key() {
        for algo in [KeyAlgorithm::EcdsaP256, KeyAlgorithm::EcdsaP384] {
            let key = KeyPair::generate(algo);
            let cert =
                self_signed(&key, "CN=peer0,O=org1", Duration::from_secs(3600)).unwrap();

            // The cert binds exactly this key.
            assert_eq!(cert.ski(), key.ski());
            let sig = key.sign(b"msg").unwrap();
            assert!(cert.public_key().verify(b"msg", &sig).unwrap());
        }
    }

    #[test]
    fn self_signed_cert_survives_pem_roundtrip() {
        let key = KeyPair::generate(KeyAlgorithm::EcdsaP256);
        let cert = self_signed(&key, "CN=admin,O=org1", Duration::from_secs(3600)).unwrap();
        let back = Certificate::import(cert.to_pem().as_bytes()).unwrap();
        assert_eq!(back.der(), cert.der());
        assert!(back.subject().contains("admin"));
    }
}
