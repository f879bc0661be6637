// Copyright (c) 2024 The Weft Authors

//! Authentication token for the credential-issuance collaborator's
//! HTTP API.

use crate::{Identity, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

/// Build the enrollment authentication token for an HTTP request body:
///
/// `base64(cert) + "." + base64(sign(base64(body) + "." + base64(cert)))`
///
/// The certificate bytes are the identity's wire certificate; the
/// signature is the identity's canonical ECDSA signature over the
/// dotted base64 string.
pub fn enrollment_token(identity: &Identity, body: &[u8]) -> Result<String> {
    let cert_b64 = BASE64.encode(identity.cert_bytes());
    let body_b64 = BASE64.encode(body);
    let signed = format!("{body_b64}.{cert_b64}");
    let signature = identity.sign(signed.as_bytes())?;
    Ok(format!("{cert_b64}.{}", BASE64.encode(signature)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, time::Duration};
    use weft_crypto::{self_signed, KeyAlgorithm, KeyPair};

    #[test]
    fn token_has_two_parts_and_a_verifiable_signature() {
        let key = Arc::new(KeyPair::generate(KeyAlgorithm::EcdsaP256));
        let cert = self_signed(&key, "CN=admin,O=org1", Duration::from_secs(3600)).unwrap();
        let identity = Identity::new("Org1MSP", cert.to_pem(), key).unwrap();

        let body = br#"{"certificate_request":"..."}"#;
        let token = enrollment_token(&identity, body).unwrap();

        let (cert_part, sig_part) = token.split_once('.').unwrap();
        assert_eq!(cert_part, BASE64.encode(identity.cert_bytes()));

        let signed = format!("{}.{}", BASE64.encode(body), cert_part);
        let sig = BASE64.decode(sig_part).unwrap();
        assert!(identity.public_key().verify(signed.as_bytes(), &sig).unwrap());
    }

    #[test]
    fn verify_only_identity_cannot_build_a_token() {
        let key = Arc::new(KeyPair::generate(KeyAlgorithm::EcdsaP256));
        let cert = self_signed(&key, "CN=admin", Duration::from_secs(3600)).unwrap();
        let identity = Identity::verifier("Org1MSP", cert.to_pem()).unwrap();
        assert!(enrollment_token(&identity, b"body").is_err());
    }
}
