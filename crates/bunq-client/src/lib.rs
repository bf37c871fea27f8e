//! Credential lifecycle and signed-request dispatch for the bunq API.
//!
//! The API needs three things before it answers a domain call:
//!
//! - a one-time installation that registers an RSA public key
//! - a device registration and a session bound to the caller's API key
//! - an RSA signature on every request after installation
//!
//! This crate implements that handshake and the dispatcher that signs and
//! sends requests. Listing accounts, making payments and rendering output are
//! left to callers, which receive the raw [`ResponseEnvelope`].
//!
//! # Quick Start
//!
//! ```no_run
//! use bunq_client::{BunqClient, ClientConfig, MemoryStore, Method};
//!
//! # async fn example() -> bunq_client::BunqResult<()> {
//! let client = BunqClient::new(ClientConfig::from_env(), MemoryStore::with_secret("api-key"))?;
//! client.setup().await?;
//!
//! let user_id = client.credentials().await?.user_id.unwrap_or_default();
//! let accounts = client
//!     .request(Method::GET, &format!("/user/{user_id}/monetary-account"), None)
//!     .await?;
//! println!("{} entries", accounts.response.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Session expiry
//!
//! Tokens never expire locally. When the API rejects one, the call fails with
//! [`BunqError::HttpStatus`] and [`BunqError::is_auth_failure`] is true; call
//! [`BunqClient::refresh_session`] and retry. Nothing is retried automatically.
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `BUNQ_SANDBOX_URL` | Sandbox base URL (default: `https://public-api.sandbox.bunq.com`) |
//! | `BUNQ_PRODUCTION_URL` | Production base URL (default: `https://api.bunq.com`) |
//! | `BUNQ_TIMEOUT` | Request timeout in seconds (default: 30) |
//! | `BUNQ_DEVICE_DESCRIPTION` | Device description (default: `bunq-cli`) |
//! | `BUNQ_KEY_BITS` | RSA key size for new key pairs (default: 2048) |

pub mod client;
pub mod config;
pub mod credentials;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod handshake;
pub mod keys;
pub mod signing;
pub mod store;

#[cfg(test)]
mod test_support;

// Re-export main types
pub use client::BunqClient;
pub use config::ClientConfig;
pub use credentials::{CredentialField, Credentials, Environment, HandshakeState};
pub use dispatch::Dispatcher;
pub use envelope::{
    ApiErrorBody, EnvelopeEntry, IdRecord, Principal, PrincipalKind, ResponseEnvelope,
    ServerPublicKeyRecord, TokenRecord,
};
pub use error::{BunqError, BunqResult};
pub use handshake::Handshake;
pub use keys::{ensure_key_pair, KeyPair};
pub use signing::{sign, signing_string, verify_signature, API_VERSION};
pub use store::{CredentialStore, FileStore, MemoryStore};

pub use reqwest::Method;
