//! Shared fixtures. RSA generation is slow, so tests share one pair.

use std::sync::OnceLock;

use crate::credentials::{CredentialField, Credentials};
use crate::keys::{KeyPair, MIN_KEY_BITS};
use crate::store::MemoryStore;

pub(crate) fn test_key_pair() -> &'static KeyPair {
    static PAIR: OnceLock<KeyPair> = OnceLock::new();
    PAIR.get_or_init(|| KeyPair::generate(MIN_KEY_BITS).expect("key generation"))
}

/// Store holding a secret and the shared key pair.
pub(crate) fn seeded_store(secret: &str) -> MemoryStore {
    let pair = test_key_pair();
    let mut creds = Credentials::default();
    creds.set(CredentialField::Secret, Some(secret.to_string()));
    creds.set(CredentialField::PrivateKey, Some(pair.private_key.clone()));
    creds.set(CredentialField::PublicKey, Some(pair.public_key.clone()));
    MemoryStore::from_credentials(&creds)
}
