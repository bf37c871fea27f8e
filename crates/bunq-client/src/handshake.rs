//! Trust establishment: installation, device registration, session creation.
//!
//! ```text
//! Unconfigured --install--> Installed --register_device--> DeviceRegistered
//!                                                              |
//!                    SessionActive <--create_session-----------+
//! ```
//!
//! Each step requires the credential produced by the one before it and
//! writes what it learns straight through to the store. Nothing here catches
//! errors: a failed step aborts and the caller starts over from `install`.
//! Rotating the secret drops the record back to `Unconfigured`.

use reqwest::Method;
use serde_json::json;
use tracing::{info, warn};

use crate::credentials::{CredentialField, Credentials, Environment};
use crate::dispatch::Dispatcher;
use crate::error::{BunqError, BunqResult};
use crate::keys::ensure_key_pair;
use crate::store::CredentialStore;

pub const INSTALLATION_PATH: &str = "/installation";
pub const DEVICE_SERVER_PATH: &str = "/device-server";
pub const SESSION_SERVER_PATH: &str = "/session-server";

/// Drives the handshake against one dispatcher and one store.
pub struct Handshake<'a, S: CredentialStore + ?Sized> {
    dispatcher: &'a Dispatcher,
    store: &'a S,
}

impl<'a, S: CredentialStore + ?Sized> Handshake<'a, S> {
    pub fn new(dispatcher: &'a Dispatcher, store: &'a S) -> Self {
        Self { dispatcher, store }
    }

    /// Register the client public key and obtain an installation token.
    pub async fn install(&self, creds: &mut Credentials) -> BunqResult<()> {
        require_secret(creds)?;

        let key_bits = self.dispatcher.config().key_bits;
        let pair = ensure_key_pair(self.store, creds, key_bits).await?;

        let body = json!({ "client_public_key": pair.public_key });
        let envelope = self
            .dispatcher
            .dispatch_unauthenticated(Method::POST, INSTALLATION_PATH, Some(&body), creds)
            .await?;

        let token = envelope
            .token()
            .ok_or_else(|| BunqError::protocol("installation response has no Token entry"))?;
        self.persist(creds, CredentialField::InstallationToken, &token.token)
            .await?;

        match envelope.server_public_key() {
            Some(key) => {
                self.persist(creds, CredentialField::ServerPublicKey, &key.server_public_key)
                    .await?
            }
            None => warn!("installation response has no ServerPublicKey entry"),
        }

        // Device and session belonged to the previous installation.
        for field in [
            CredentialField::DeviceServerId,
            CredentialField::SessionToken,
            CredentialField::UserId,
        ] {
            self.forget(creds, field).await?;
        }

        info!(environment = %creds.environment, "installation complete");
        Ok(())
    }

    /// Declare this installation as a device allowed from any IP.
    pub async fn register_device(&self, creds: &mut Credentials) -> BunqResult<()> {
        let installation_token = require_installation_token(creds, "device registration")?;
        let secret = require_secret(creds)?;

        if creds.private_key.is_none() {
            // Accepted or not depending on the API environment.
            warn!("no private key held, device registration goes out unsigned");
        }

        let body = json!({
            "description": self.dispatcher.config().device_description,
            "secret": secret,
            "permitted_ips": ["*"],
        });
        let envelope = self
            .dispatcher
            .dispatch(
                Method::POST,
                DEVICE_SERVER_PATH,
                Some(&body),
                Some(&installation_token),
                creds,
            )
            .await?;

        if let Some(id) = envelope.id() {
            self.persist(creds, CredentialField::DeviceServerId, &id.id)
                .await?;
        }

        info!(device_server_id = ?creds.device_server_id, "device registered");
        Ok(())
    }

    /// Exchange the secret for a session token, authenticated by the
    /// installation token.
    pub async fn create_session(&self, creds: &mut Credentials) -> BunqResult<()> {
        let installation_token = require_installation_token(creds, "session creation")?;
        let secret = require_secret(creds)?;

        if creds.private_key.is_none() {
            warn!("no private key held, session creation goes out unsigned");
        }

        let body = json!({ "secret": secret });
        let envelope = self
            .dispatcher
            .dispatch(
                Method::POST,
                SESSION_SERVER_PATH,
                Some(&body),
                Some(&installation_token),
                creds,
            )
            .await?;

        let token = envelope
            .token()
            .ok_or_else(|| BunqError::protocol("session response has no Token entry"))?;
        self.persist(creds, CredentialField::SessionToken, &token.token)
            .await?;

        match envelope.principal() {
            Some((kind, principal)) => {
                self.persist(creds, CredentialField::UserId, &principal.id)
                    .await?;
                info!(user_id = %principal.id, kind = kind.as_str(), "session created");
            }
            None => {
                // A user id from an older session would describe someone else.
                self.forget(creds, CredentialField::UserId).await?;
                warn!("session response has no user entry");
            }
        }

        Ok(())
    }

    /// Run the whole handshake. Any failure aborts the remaining steps.
    pub async fn full_setup(&self, creds: &mut Credentials) -> BunqResult<()> {
        self.install(creds).await?;
        self.register_device(creds).await?;
        self.create_session(creds).await
    }

    /// Obtain a fresh session token, installing first if never installed.
    pub async fn refresh_session(&self, creds: &mut Credentials) -> BunqResult<()> {
        if creds.installation_token.is_none() {
            info!("no installation token, running full setup");
            return self.full_setup(creds).await;
        }
        self.create_session(creds).await
    }

    /// Store a new API secret. A different secret invalidates the key pair
    /// and every token; returns whether that happened.
    pub async fn rotate_secret(&self, creds: &mut Credentials, secret: &str) -> BunqResult<bool> {
        let secret = secret.trim();
        if secret.is_empty() {
            return Err(BunqError::config("API key must not be empty"));
        }
        if creds.secret.as_deref() == Some(secret) {
            return Ok(false);
        }

        // Secret last, so a partial failure still reads as a change on retry.
        for field in CredentialField::HANDSHAKE {
            self.forget(creds, field).await?;
        }
        self.persist(creds, CredentialField::Secret, secret).await?;

        info!("API key changed, handshake credentials cleared");
        Ok(true)
    }

    /// Switch environments. Existing tokens are kept but belong to the old
    /// environment, so a new setup is needed; returns whether it changed.
    pub async fn set_environment(
        &self,
        creds: &mut Credentials,
        environment: Environment,
    ) -> BunqResult<bool> {
        let changed = creds.environment != environment;
        self.persist(creds, CredentialField::Environment, environment.as_str())
            .await?;

        if changed {
            info!(%environment, "environment changed, run setup again before making calls");
        }
        Ok(changed)
    }

    async fn persist(
        &self,
        creds: &mut Credentials,
        field: CredentialField,
        value: &str,
    ) -> BunqResult<()> {
        self.store.write_field(field, value).await?;
        creds.set(field, Some(value.to_string()));
        Ok(())
    }

    async fn forget(&self, creds: &mut Credentials, field: CredentialField) -> BunqResult<()> {
        self.store.delete_field(field).await?;
        creds.set(field, None);
        Ok(())
    }
}

fn require_secret(creds: &Credentials) -> BunqResult<String> {
    creds
        .secret
        .clone()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| BunqError::config("no API key configured"))
}

fn require_installation_token(creds: &Credentials, step: &str) -> BunqResult<String> {
    creds.installation_token.clone().ok_or_else(|| {
        BunqError::config(format!(
            "{step} requires an installation token; run install first"
        ))
    })
}
