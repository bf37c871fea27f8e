//! Client configuration.

use serde::{Deserialize, Serialize};

use crate::credentials::Environment;
use crate::error::{BunqError, BunqResult};
use crate::keys::MIN_KEY_BITS;

/// Client configuration.
///
/// The environment is not part of it: that is a credential field, because
/// switching it invalidates the handshake operationally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Sandbox base URL.
    #[serde(default = "default_sandbox_url")]
    pub sandbox_url: String,

    /// Production base URL.
    #[serde(default = "default_production_url")]
    pub production_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Description sent when registering this device.
    #[serde(default = "default_device_description")]
    pub device_description: String,

    /// RSA modulus size for newly generated key pairs.
    #[serde(default = "default_key_bits")]
    pub key_bits: usize,

    /// `X-Bunq-Language` value.
    #[serde(default = "default_language")]
    pub language: String,

    /// `X-Bunq-Region` value.
    #[serde(default = "default_region")]
    pub region: String,

    /// `X-Bunq-Geolocation` value.
    #[serde(default = "default_geolocation")]
    pub geolocation: String,
}

fn default_sandbox_url() -> String {
    "https://public-api.sandbox.bunq.com".to_string()
}

fn default_production_url() -> String {
    "https://api.bunq.com".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_device_description() -> String {
    "bunq-cli".to_string()
}

fn default_key_bits() -> usize {
    MIN_KEY_BITS
}

fn default_language() -> String {
    "en_US".to_string()
}

fn default_region() -> String {
    "nl_NL".to_string()
}

fn default_geolocation() -> String {
    "0 0 0 0 000".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            sandbox_url: default_sandbox_url(),
            production_url: default_production_url(),
            timeout_secs: default_timeout(),
            device_description: default_device_description(),
            key_bits: default_key_bits(),
            language: default_language(),
            region: default_region(),
            geolocation: default_geolocation(),
        }
    }
}

impl ClientConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `BUNQ_SANDBOX_URL` | Sandbox base URL |
    /// | `BUNQ_PRODUCTION_URL` | Production base URL |
    /// | `BUNQ_TIMEOUT` | Request timeout in seconds |
    /// | `BUNQ_DEVICE_DESCRIPTION` | Device description for registration |
    /// | `BUNQ_KEY_BITS` | RSA key size for new key pairs |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            sandbox_url: std::env::var("BUNQ_SANDBOX_URL").unwrap_or(defaults.sandbox_url),
            production_url: std::env::var("BUNQ_PRODUCTION_URL")
                .unwrap_or(defaults.production_url),
            timeout_secs: std::env::var("BUNQ_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.timeout_secs),
            device_description: std::env::var("BUNQ_DEVICE_DESCRIPTION")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.device_description),
            key_bits: std::env::var("BUNQ_KEY_BITS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.key_bits),
            ..defaults
        }
    }

    /// Point both environments at one URL (tests, proxies).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.sandbox_url = url.clone();
        self.production_url = url;
        self
    }

    pub fn with_sandbox_url(mut self, url: impl Into<String>) -> Self {
        self.sandbox_url = url.into();
        self
    }

    pub fn with_production_url(mut self, url: impl Into<String>) -> Self {
        self.production_url = url.into();
        self
    }

    pub fn with_device_description(mut self, description: impl Into<String>) -> Self {
        self.device_description = description.into();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Base URL for an environment, without trailing slash.
    pub fn base_url(&self, environment: Environment) -> &str {
        let url = match environment {
            Environment::Sandbox => &self.sandbox_url,
            Environment::Production => &self.production_url,
        };
        url.trim_end_matches('/')
    }

    pub fn validate(&self) -> BunqResult<()> {
        for (name, value) in [
            ("sandbox_url", &self.sandbox_url),
            ("production_url", &self.production_url),
        ] {
            let parsed = url::Url::parse(value)
                .map_err(|e| BunqError::config(format!("invalid {name} '{value}': {e}")))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(BunqError::config(format!(
                    "{name} must be an http(s) URL, got '{value}'"
                )));
            }
        }

        if self.key_bits < MIN_KEY_BITS {
            return Err(BunqError::config(format!(
                "key_bits must be at least {MIN_KEY_BITS}, got {}",
                self.key_bits
            )));
        }

        if self.timeout_secs == 0 {
            return Err(BunqError::config("timeout_secs must be positive"));
        }

        Ok(())
    }
}
