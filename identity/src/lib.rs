// Copyright (c) 2024 The Weft Authors

//! Signing identities and per-transaction contexts.
//!
//! An [`Identity`] is the immutable triple of MSP id, X.509 certificate
//! and private-key handle. Each ledger interaction derives a fresh
//! [`IdentityContext`] from it, carrying the nonce and transaction id
//! that make the interaction unique. The [`enrollment_token`] builder
//! covers the credential-issuance collaborator's HTTP authentication
//! format.

mod context;
mod error;
mod identity;
mod token;

pub use context::{IdentityContext, NONCE_LEN};
pub use error::{Error, Result};
pub use identity::Identity;
pub use token::enrollment_token;
