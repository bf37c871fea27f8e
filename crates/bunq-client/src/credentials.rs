//! The credential record and its field vocabulary.
//!
//! `Credentials` is a caller-owned snapshot of what the [`CredentialStore`]
//! holds. The handshake mutates it and writes every change through to the
//! store, so the two never drift within one call.
//!
//! [`CredentialStore`]: crate::store::CredentialStore

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BunqError;

/// API environment, selecting the base endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Sandbox,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sandbox => "sandbox",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = BunqError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" => Ok(Self::Sandbox),
            "production" | "prod" => Ok(Self::Production),
            other => Err(BunqError::config(format!(
                "unknown environment '{other}' (expected sandbox or production)"
            ))),
        }
    }
}

/// Names of the persisted credential fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CredentialField {
    Secret,
    Environment,
    PrivateKey,
    PublicKey,
    ServerPublicKey,
    InstallationToken,
    DeviceServerId,
    SessionToken,
    UserId,
}

impl CredentialField {
    pub const ALL: [CredentialField; 9] = [
        Self::Secret,
        Self::Environment,
        Self::PrivateKey,
        Self::PublicKey,
        Self::ServerPublicKey,
        Self::InstallationToken,
        Self::DeviceServerId,
        Self::SessionToken,
        Self::UserId,
    ];

    /// Fields that belong to one secret and die with it on rotation.
    pub const HANDSHAKE: [CredentialField; 7] = [
        Self::PrivateKey,
        Self::PublicKey,
        Self::ServerPublicKey,
        Self::InstallationToken,
        Self::DeviceServerId,
        Self::SessionToken,
        Self::UserId,
    ];

    /// Storage key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Secret => "secret",
            Self::Environment => "environment",
            Self::PrivateKey => "private_key",
            Self::PublicKey => "public_key",
            Self::ServerPublicKey => "server_public_key",
            Self::InstallationToken => "installation_token",
            Self::DeviceServerId => "device_server_id",
            Self::SessionToken => "session_token",
            Self::UserId => "user_id",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == key)
    }

    fn is_sensitive(&self) -> bool {
        matches!(
            self,
            Self::Secret | Self::PrivateKey | Self::InstallationToken | Self::SessionToken
        )
    }
}

impl fmt::Display for CredentialField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the handshake stands, derived from which credentials are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Unconfigured,
    Installed,
    DeviceRegistered,
    SessionActive,
}

impl fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unconfigured => "unconfigured",
            Self::Installed => "installed",
            Self::DeviceRegistered => "device registered",
            Self::SessionActive => "session active",
        })
    }
}

/// The credential record.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub secret: Option<String>,
    pub environment: Environment,
    pub private_key: Option<String>,
    pub public_key: Option<String>,
    pub server_public_key: Option<String>,
    pub installation_token: Option<String>,
    pub device_server_id: Option<String>,
    pub session_token: Option<String>,
    pub user_id: Option<String>,
}

impl Credentials {
    /// Build a record from raw store fields. An unparseable environment falls
    /// back to sandbox.
    pub fn from_fields(fields: &BTreeMap<CredentialField, String>) -> Self {
        let mut creds = Self::default();
        for (field, value) in fields {
            creds.set(*field, Some(value.clone()));
        }
        creds
    }

    pub fn get(&self, field: CredentialField) -> Option<&str> {
        match field {
            CredentialField::Secret => self.secret.as_deref(),
            CredentialField::Environment => Some(self.environment.as_str()),
            CredentialField::PrivateKey => self.private_key.as_deref(),
            CredentialField::PublicKey => self.public_key.as_deref(),
            CredentialField::ServerPublicKey => self.server_public_key.as_deref(),
            CredentialField::InstallationToken => self.installation_token.as_deref(),
            CredentialField::DeviceServerId => self.device_server_id.as_deref(),
            CredentialField::SessionToken => self.session_token.as_deref(),
            CredentialField::UserId => self.user_id.as_deref(),
        }
    }

    pub fn set(&mut self, field: CredentialField, value: Option<String>) {
        match field {
            CredentialField::Secret => self.secret = value,
            CredentialField::Environment => {
                self.environment = value
                    .and_then(|v| v.parse().ok())
                    .unwrap_or_default();
            }
            CredentialField::PrivateKey => self.private_key = value,
            CredentialField::PublicKey => self.public_key = value,
            CredentialField::ServerPublicKey => self.server_public_key = value,
            CredentialField::InstallationToken => self.installation_token = value,
            CredentialField::DeviceServerId => self.device_server_id = value,
            CredentialField::SessionToken => self.session_token = value,
            CredentialField::UserId => self.user_id = value,
        }
    }

    pub fn has_key_pair(&self) -> bool {
        self.private_key.is_some() && self.public_key.is_some()
    }

    /// Token the dispatcher uses when the caller names none: session first,
    /// then installation.
    pub fn auth_token(&self) -> Option<&str> {
        self.session_token
            .as_deref()
            .or(self.installation_token.as_deref())
    }

    pub fn handshake_state(&self) -> HandshakeState {
        if self.installation_token.is_none() {
            HandshakeState::Unconfigured
        } else if self.session_token.is_some() {
            HandshakeState::SessionActive
        } else if self.device_server_id.is_some() {
            HandshakeState::DeviceRegistered
        } else {
            HandshakeState::Installed
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Credentials");
        for field in CredentialField::ALL {
            let value = self.get(field);
            match value {
                Some(_) if field.is_sensitive() => s.field(field.as_str(), &"<redacted>"),
                Some(v) => s.field(field.as_str(), &v),
                None => s.field(field.as_str(), &None::<()>),
            };
        }
        s.finish()
    }
}
