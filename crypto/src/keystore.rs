// Copyright (c) 2024 The Weft Authors

//! The flat name-to-bytes contract the credential-store collaborator
//! implements, plus the SKI naming convention layered on top.

use crate::{Error, KeyPair, Result, SubjectKeyId};
use std::{collections::HashMap, sync::Mutex};
use zeroize::Zeroize;

/// A flat `name → bytes` store. Implementations may be files, a
/// database, or an HSM-backed vault; the SDK only needs these two
/// operations.
pub trait KeyStore: Send + Sync {
    fn store(&self, name: &str, value: &[u8]) -> Result<()>;

    /// Load a previously stored value. `Error::NotFound` when the name
    /// has never been stored.
    fn load(&self, name: &str) -> Result<Vec<u8>>;
}

/// Storage name for the private half of a key pair.
pub fn private_key_name(ski: &SubjectKeyId) -> String {
    format!("{ski}-priv")
}

/// Storage name for the public half of a key pair.
pub fn public_key_name(ski: &SubjectKeyId) -> String {
    format!("{ski}-pub")
}

/// Persist both halves of `key` under its SKI. The private half is
/// stored as PKCS#8 DER, the public half as SPKI DER.
pub fn store_key_pair(store: &dyn KeyStore, key: &KeyPair) -> Result<SubjectKeyId> {
    let ski = key.ski();
    let mut priv_der = key.to_pkcs8_der()?;
    let stored = store.store(&private_key_name(&ski), &priv_der);
    priv_der.zeroize();
    stored?;
    store.store(&public_key_name(&ski), &key.public_key().to_spki_der()?)?;
    Ok(ski)
}

/// Load the key pair stored under `ski`.
pub fn load_key_pair(store: &dyn KeyStore, ski: &SubjectKeyId) -> Result<KeyPair> {
    let mut der = store.load(&private_key_name(ski))?;
    let parsed = KeyPair::from_pkcs8_der(&der);
    der.zeroize();
    let key = parsed?;
    if key.ski() != *ski {
        return Err(Error::Store(format!(
            "key stored under {ski} has ski {}",
            key.ski()
        )));
    }
    Ok(key)
}

/// In-process store, mainly for tests and ephemeral identities.
#[derive(Default)]
pub struct MemoryKeyStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyStore for MemoryKeyStore {
    fn store(&self, name: &str, value: &[u8]) -> Result<()> {
        self.entries
            .lock()
            .map_err(|_| Error::Store("poisoned".into()))?
            .insert(name.to_owned(), value.to_vec());
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Vec<u8>> {
        self.entries
            .lock()
            .map_err(|_| Error::Store("poisoned".into()))?
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotFound(name.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KeyAlgorithm;

    #[test]
    fn key_pair_roundtrips_through_the_store() {
        let store = MemoryKeyStore::new();
        let key = KeyPair::generate(KeyAlgorithm::EcdsaP256);
        let ski = store_key_pair(&store, &key).unwrap();
        assert_eq!(ski, key.ski());

        let back = load_key_pair(&store, &ski).unwrap();
        assert_eq!(back.ski(), key.ski());

        // Both conventional names exist.
        store.load(&private_key_name(&ski)).unwrap();
        store.load(&public_key_name(&ski)).unwrap();
    }

    #[test]
    fn missing_entry_is_not_found() {
        let store = MemoryKeyStore::new();
        assert_matches::assert_matches!(
            store.load("deadbeef-priv"),
            Err(Error::NotFound(_))
        );
    }
}
