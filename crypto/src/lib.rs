// Copyright (c) 2024 The Weft Authors

//! Key management, signing and certificate handling for the weft SDK.
//!
//! The ledger accepts ECDSA over the NIST P-256 and P-384 curves, and
//! rejects signatures whose `s` component is in the upper half of the
//! curve order. Everything produced here is canonicalized accordingly,
//! and verification rejects the high-s form rather than normalizing it.
//!
//! Keys are addressed by their SKI, the SHA-256 digest of the DER
//! encoding of the public key. The [`KeyStore`] contract plus the
//! `<ski>-priv` / `<ski>-pub` naming helpers cover everything the
//! credential-store collaborator needs.

mod certificate;
mod csr;
mod error;
mod hash;
mod keys;
mod keystore;
mod provider;

pub use certificate::Certificate;
pub use csr::{create_csr, self_signed};
pub use error::{Error, Result};
pub use hash::HashAlgorithm;
pub use keys::{KeyAlgorithm, KeyPair, PublicKey, SubjectKeyId};
pub use keystore::{
    private_key_name, public_key_name, store_key_pair, load_key_pair, KeyStore, MemoryKeyStore,
};
pub use provider::CryptoProvider;
