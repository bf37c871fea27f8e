//! Client key pair management.
//!
//! The API identifies an installation by an RSA public key. The pair is
//! generated once and reused until the secret is rotated or the store is
//! cleared.

use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::RsaPrivateKey;
use tracing::info;

use crate::credentials::{CredentialField, Credentials};
use crate::error::{BunqError, BunqResult};
use crate::store::CredentialStore;

/// Smallest modulus the API accepts.
pub const MIN_KEY_BITS: usize = 2048;

/// PEM-encoded RSA key pair (PKCS#8 private, SPKI public).
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPair {
    pub private_key: String,
    pub public_key: String,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("private_key", &"<redacted>")
            .field("public_key", &self.public_key)
            .finish()
    }
}

impl KeyPair {
    /// Generate a fresh pair.
    pub fn generate(bits: usize) -> BunqResult<Self> {
        if bits < MIN_KEY_BITS {
            return Err(BunqError::config(format!(
                "key size {bits} is below the {MIN_KEY_BITS}-bit minimum"
            )));
        }

        let private = RsaPrivateKey::new(&mut rand::thread_rng(), bits).map_err(|e| {
            BunqError::KeyGeneration {
                message: e.to_string(),
            }
        })?;

        let private_pem =
            private
                .to_pkcs8_pem(LineEnding::LF)
                .map_err(|e| BunqError::KeyGeneration {
                    message: format!("failed to encode private key as PKCS#8 PEM: {}", e),
                })?;

        let public_pem = private
            .to_public_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| BunqError::KeyGeneration {
                message: format!("failed to encode public key as SPKI PEM: {}", e),
            })?;

        Ok(Self {
            private_key: private_pem.as_str().to_owned(),
            public_key: public_pem,
        })
    }
}

/// Return the stored key pair, generating and persisting one if either half
/// is missing. `creds` is updated to match the store.
pub async fn ensure_key_pair<S>(
    store: &S,
    creds: &mut Credentials,
    bits: usize,
) -> BunqResult<KeyPair>
where
    S: CredentialStore + ?Sized,
{
    let stored_private = store.read_field(CredentialField::PrivateKey).await?;
    let stored_public = store.read_field(CredentialField::PublicKey).await?;

    if let (Some(private_key), Some(public_key)) = (stored_private, stored_public) {
        creds.private_key = Some(private_key.clone());
        creds.public_key = Some(public_key.clone());
        return Ok(KeyPair {
            private_key,
            public_key,
        });
    }

    info!(bits, "generating client key pair");
    let pair = KeyPair::generate(bits)?;

    store
        .write_field(CredentialField::PrivateKey, &pair.private_key)
        .await?;
    store
        .write_field(CredentialField::PublicKey, &pair.public_key)
        .await?;

    creds.private_key = Some(pair.private_key.clone());
    creds.public_key = Some(pair.public_key.clone());

    Ok(pair)
}
