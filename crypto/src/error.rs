// Copyright (c) 2024 The Weft Authors

//! Crypto error types.

use displaydoc::Display;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum Error {
    /// Unsupported algorithm: {0}
    BadAlgo(String),

    /// Bad key size: expected {expected} bytes, got {actual}
    BadKeySize { expected: usize, actual: usize },

    /// Could not parse certificate: {0}
    BadCertEncoding(String),

    /// Could not parse key material: {0}
    BadKeyEncoding(String),

    /// Signing failed: {0}
    SigningFailed(String),

    /// Signature is not in canonical low-s form
    NonCanonicalSignature,

    /// Malformed signature: {0}
    BadSignatureEncoding(String),

    /// Bad subject name: {0}
    BadSubject(String),

    /// Key store entry not found: {0}
    NotFound(String),

    /// Key store failure: {0}
    Store(String),
}

impl From<der::Error> for Error {
    fn from(src: der::Error) -> Self {
        Error::BadKeyEncoding(src.to_string())
    }
}
