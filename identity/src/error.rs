// Copyright (c) 2024 The Weft Authors

//! Identity error types.

use displaydoc::Display;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum Error {
    /// Crypto failure: {0}
    Crypto(#[from] weft_crypto::Error),

    /// Identity has no private key attached
    MissingKey,

    /// Private key does not match the certificate (key ski {key}, cert ski {cert})
    KeyMismatch { key: String, cert: String },

    /// Malformed serialized identity: {0}
    Decode(#[from] prost::DecodeError),

    /// MSP id must not be empty
    EmptyMspId,
}
