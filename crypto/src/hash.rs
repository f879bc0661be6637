// Copyright (c) 2024 The Weft Authors

//! Digest algorithms the ledger understands.

use sha2::{Digest, Sha256, Sha384};
use sha3::{Sha3_256, Sha3_384};

/// Hash family and width.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Sha256,
    Sha384,
    Sha3_256,
    Sha3_384,
}

impl HashAlgorithm {
    /// Digest length in bytes.
    pub fn digest_len(&self) -> usize {
        match self {
            Self::Sha256 | Self::Sha3_256 => 32,
            Self::Sha384 | Self::Sha3_384 => 48,
        }
    }

    /// Hash `msg` with this algorithm.
    pub fn digest(&self, msg: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha256 => Sha256::digest(msg).to_vec(),
            Self::Sha384 => Sha384::digest(msg).to_vec(),
            Self::Sha3_256 => Sha3_256::digest(msg).to_vec(),
            Self::Sha3_384 => Sha3_384::digest(msg).to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_lengths() {
        for algo in [
            HashAlgorithm::Sha256,
            HashAlgorithm::Sha384,
            HashAlgorithm::Sha3_256,
            HashAlgorithm::Sha3_384,
        ] {
            assert_eq!(algo.digest(b"abc").len(), algo.digest_len());
        }
    }

    #[test]
    fn sha256_matches_known_vector() {
        // SHA-256("abc")
        let digest = HashAlgorithm::Sha256.digest(b"abc");
        assert_eq!(
            hex::encode(digest),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
