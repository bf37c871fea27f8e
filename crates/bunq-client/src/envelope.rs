//! Response envelope wire types.
//!
//! Every successful response is
//!
//! ```json
//! { "Response": [ { "Token": { "token": "..." } }, { "UserPerson": { "id": 42 } } ] }
//! ```
//!
//! Each element is an object with exactly one key naming the payload kind.
//! [`EnvelopeEntry`] decodes that shape into a sum type; unknown kinds are
//! kept as [`EnvelopeEntry::Other`] so domain responses pass through intact.

use std::fmt;

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parsed `{"Response": [...]}` body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(rename = "Response")]
    pub response: Vec<EnvelopeEntry>,
}

impl ResponseEnvelope {
    /// First token entry.
    pub fn token(&self) -> Option<&TokenRecord> {
        self.response.iter().find_map(|entry| match entry {
            EnvelopeEntry::Token(token) => Some(token),
            _ => None,
        })
    }

    pub fn server_public_key(&self) -> Option<&ServerPublicKeyRecord> {
        self.response.iter().find_map(|entry| match entry {
            EnvelopeEntry::ServerPublicKey(key) => Some(key),
            _ => None,
        })
    }

    pub fn id(&self) -> Option<&IdRecord> {
        self.response.iter().find_map(|entry| match entry {
            EnvelopeEntry::Id(id) => Some(id),
            _ => None,
        })
    }

    /// The authenticated principal, whichever shape the API returned.
    pub fn principal(&self) -> Option<(PrincipalKind, &Principal)> {
        self.response.iter().find_map(EnvelopeEntry::as_principal)
    }
}

/// One element of the `Response` array.
#[derive(Debug, Clone, PartialEq)]
pub enum EnvelopeEntry {
    Token(TokenRecord),
    ServerPublicKey(ServerPublicKeyRecord),
    Id(IdRecord),
    UserPerson(Principal),
    UserCompany(Principal),
    UserApiKey(Principal),
    UserPaymentServiceProvider(Principal),
    Other { kind: String, payload: Value },
}

impl EnvelopeEntry {
    /// Wire key for this entry.
    pub fn kind(&self) -> &str {
        match self {
            Self::Token(_) => "Token",
            Self::ServerPublicKey(_) => "ServerPublicKey",
            Self::Id(_) => "Id",
            Self::UserPerson(_) => PrincipalKind::UserPerson.as_str(),
            Self::UserCompany(_) => PrincipalKind::UserCompany.as_str(),
            Self::UserApiKey(_) => PrincipalKind::UserApiKey.as_str(),
            Self::UserPaymentServiceProvider(_) => {
                PrincipalKind::UserPaymentServiceProvider.as_str()
            }
            Self::Other { kind, .. } => kind.as_str(),
        }
    }

    pub fn as_principal(&self) -> Option<(PrincipalKind, &Principal)> {
        match self {
            Self::UserPerson(p) => Some((PrincipalKind::UserPerson, p)),
            Self::UserCompany(p) => Some((PrincipalKind::UserCompany, p)),
            Self::UserApiKey(p) => Some((PrincipalKind::UserApiKey, p)),
            Self::UserPaymentServiceProvider(p) => {
                Some((PrincipalKind::UserPaymentServiceProvider, p))
            }
            _ => None,
        }
    }

    fn decode(kind: String, payload: Value) -> Result<Self, serde_json::Error> {
        Ok(match kind.as_str() {
            "Token" => Self::Token(serde_json::from_value(payload)?),
            "ServerPublicKey" => Self::ServerPublicKey(serde_json::from_value(payload)?),
            "Id" => Self::Id(serde_json::from_value(payload)?),
            "UserPerson" => Self::UserPerson(serde_json::from_value(payload)?),
            "UserCompany" => Self::UserCompany(serde_json::from_value(payload)?),
            "UserApiKey" => Self::UserApiKey(serde_json::from_value(payload)?),
            "UserPaymentServiceProvider" => {
                Self::UserPaymentServiceProvider(serde_json::from_value(payload)?)
            }
            _ => Self::Other { kind, payload },
        })
    }
}

impl<'de> Deserialize<'de> for EnvelopeEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let object = Map::<String, Value>::deserialize(deserializer)?;
        let count = object.len();
        let mut entries = object.into_iter();

        match (entries.next(), entries.next()) {
            (Some((kind, payload)), None) => {
                Self::decode(kind.clone(), payload).map_err(|e| {
                    de::Error::custom(format!("invalid {kind} entry: {e}"))
                })
            }
            _ => Err(de::Error::custom(format!(
                "envelope entry must have exactly one key, found {count}"
            ))),
        }
    }
}

impl Serialize for EnvelopeEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Self::Token(token) => map.serialize_entry(self.kind(), token)?,
            Self::ServerPublicKey(key) => map.serialize_entry(self.kind(), key)?,
            Self::Id(id) => map.serialize_entry(self.kind(), id)?,
            Self::UserPerson(p)
            | Self::UserCompany(p)
            | Self::UserApiKey(p)
            | Self::UserPaymentServiceProvider(p) => map.serialize_entry(self.kind(), p)?,
            Self::Other { kind, payload } => map.serialize_entry(kind, payload)?,
        }
        map.end()
    }
}

/// Token issued by installation or session creation.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,

    pub token: String,
}

impl fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRecord")
            .field("id", &self.id)
            .field("created", &self.created)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// The API's own public key, returned by installation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerPublicKeyRecord {
    pub server_public_key: String,
}

/// Bare object id, e.g. the device server created by registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdRecord {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
}

/// Which principal shape a session belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrincipalKind {
    UserPerson,
    UserCompany,
    UserApiKey,
    UserPaymentServiceProvider,
}

impl PrincipalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserPerson => "UserPerson",
            Self::UserCompany => "UserCompany",
            Self::UserApiKey => "UserApiKey",
            Self::UserPaymentServiceProvider => "UserPaymentServiceProvider",
        }
    }
}

/// Authenticated user. Only `id` is interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Ids arrive as JSON numbers; accept strings too.
fn id_as_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(s),
        other => Err(de::Error::custom(format!(
            "expected id as number or string, got {other}"
        ))),
    }
}

/// Error body of a non-2xx response.
///
/// The API answers `{"Error": [{"error_description": "..."}]}`; anything else
/// is kept only as raw text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiErrorBody {
    pub descriptions: Vec<String>,
    pub raw: String,
}

#[derive(Deserialize)]
struct ErrorWire {
    #[serde(rename = "Error")]
    error: Vec<ErrorItemWire>,
}

#[derive(Deserialize)]
struct ErrorItemWire {
    #[serde(default)]
    error_description: Option<String>,
}

impl ApiErrorBody {
    pub fn parse(raw: &str) -> Self {
        let descriptions = serde_json::from_str::<ErrorWire>(raw)
            .map(|wire| {
                wire.error
                    .into_iter()
                    .filter_map(|item| item.error_description)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            descriptions,
            raw: raw.to_string(),
        }
    }
}

impl fmt::Display for ApiErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.descriptions.is_empty() {
            f.write_str(&self.descriptions.join("; "))
        } else if self.raw.is_empty() {
            f.write_str("(empty body)")
        } else {
            let snippet: String = self.raw.chars().take(200).collect();
            f.write_str(&snippet)
        }
    }
}
