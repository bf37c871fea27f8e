//! Credential persistence.
//!
//! The client never owns storage: callers inject a [`CredentialStore`]. Two
//! implementations ship with the crate:
//!
//! - [`MemoryStore`]: process-local, for tests and short-lived tools
//! - [`FileStore`]: one JSON object on disk
//!
//! ```text
//! ~/.config/bunq/credentials.json
//! {
//!   "environment": "sandbox",
//!   "secret": "...",
//!   "installation_token": "...",
//!   ...
//! }
//! ```

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::credentials::{CredentialField, Credentials, Environment};
use crate::error::{BunqError, BunqResult};

type FieldMap = BTreeMap<CredentialField, String>;

/// Durable key-value persistence for credential fields.
///
/// `snapshot` must return a consistent view: all fields as of one instant.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn read_field(&self, field: CredentialField) -> BunqResult<Option<String>>;

    async fn write_field(&self, field: CredentialField, value: &str) -> BunqResult<()>;

    async fn delete_field(&self, field: CredentialField) -> BunqResult<()>;

    async fn clear_all(&self) -> BunqResult<()>;

    /// Read every field at once.
    async fn snapshot(&self) -> BunqResult<Credentials>;

    async fn get_secret(&self) -> BunqResult<Option<String>> {
        self.read_field(CredentialField::Secret).await
    }

    async fn get_environment(&self) -> BunqResult<Environment> {
        match self.read_field(CredentialField::Environment).await? {
            Some(value) => value.parse(),
            None => Ok(Environment::default()),
        }
    }
}

#[async_trait]
impl<T: CredentialStore + ?Sized> CredentialStore for Arc<T> {
    async fn read_field(&self, field: CredentialField) -> BunqResult<Option<String>> {
        (**self).read_field(field).await
    }

    async fn write_field(&self, field: CredentialField, value: &str) -> BunqResult<()> {
        (**self).write_field(field, value).await
    }

    async fn delete_field(&self, field: CredentialField) -> BunqResult<()> {
        (**self).delete_field(field).await
    }

    async fn clear_all(&self) -> BunqResult<()> {
        (**self).clear_all().await
    }

    async fn snapshot(&self) -> BunqResult<Credentials> {
        (**self).snapshot().await
    }
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    fields: RwLock<FieldMap>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with an API secret.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        let mut fields = FieldMap::new();
        fields.insert(CredentialField::Secret, secret.into());
        Self {
            fields: RwLock::new(fields),
        }
    }

    /// Store pre-populated from an existing record.
    pub fn from_credentials(creds: &Credentials) -> Self {
        let fields = CredentialField::ALL
            .into_iter()
            .filter_map(|f| creds.get(f).map(|v| (f, v.to_string())))
            .collect();
        Self {
            fields: RwLock::new(fields),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn read_field(&self, field: CredentialField) -> BunqResult<Option<String>> {
        Ok(self.fields.read().await.get(&field).cloned())
    }

    async fn write_field(&self, field: CredentialField, value: &str) -> BunqResult<()> {
        self.fields.write().await.insert(field, value.to_string());
        Ok(())
    }

    async fn delete_field(&self, field: CredentialField) -> BunqResult<()> {
        self.fields.write().await.remove(&field);
        Ok(())
    }

    async fn clear_all(&self) -> BunqResult<()> {
        self.fields.write().await.clear();
        Ok(())
    }

    async fn snapshot(&self) -> BunqResult<Credentials> {
        let fields = self.fields.read().await;
        Ok(Credentials::from_fields(&fields))
    }
}

/// JSON-file store.
///
/// Writes go to a temp file that is renamed over the target, so a reader
/// sees either the old or the new object, never a torn one.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Store at the default location.
    ///
    /// Default: `<config dir>/bunq/credentials.json`
    pub fn open_default() -> BunqResult<Self> {
        Ok(Self::new(default_credentials_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> BunqResult<FieldMap> {
        let text = match fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(FieldMap::new()),
            Err(e) => {
                return Err(BunqError::store(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };
        if text.trim().is_empty() {
            return Ok(FieldMap::new());
        }

        let raw: BTreeMap<String, String> = serde_json::from_str(&text).map_err(|e| {
            BunqError::store(format!("failed to parse {}: {}", self.path.display(), e))
        })?;

        let mut fields = FieldMap::new();
        for (key, value) in raw {
            match CredentialField::from_key(&key) {
                Some(field) => {
                    fields.insert(field, value);
                }
                None => debug!(key = %key, "ignoring unknown credential field"),
            }
        }
        Ok(fields)
    }

    async fn save(&self, fields: &FieldMap) -> BunqResult<()> {
        let raw: BTreeMap<&str, &str> = fields
            .iter()
            .map(|(f, v)| (f.as_str(), v.as_str()))
            .collect();
        let json = serde_json::to_string_pretty(&raw)
            .map_err(|e| BunqError::store(format!("failed to serialize credentials: {}", e)))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    BunqError::store(format!("failed to create {}: {}", parent.display(), e))
                })?;
            }
        }

        write_atomic(&self.path, json).await
    }

    async fn update<F>(&self, mutate: F) -> BunqResult<()>
    where
        F: FnOnce(&mut FieldMap) + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut fields = self.load().await?;
        mutate(&mut fields);
        self.save(&fields).await
    }
}

#[async_trait]
impl CredentialStore for FileStore {
    async fn read_field(&self, field: CredentialField) -> BunqResult<Option<String>> {
        Ok(self.load().await?.remove(&field))
    }

    async fn write_field(&self, field: CredentialField, value: &str) -> BunqResult<()> {
        let value = value.to_string();
        self.update(move |fields| {
            fields.insert(field, value);
        })
        .await
    }

    async fn delete_field(&self, field: CredentialField) -> BunqResult<()> {
        self.update(move |fields| {
            fields.remove(&field);
        })
        .await
    }

    async fn clear_all(&self) -> BunqResult<()> {
        self.update(|fields| fields.clear()).await
    }

    async fn snapshot(&self) -> BunqResult<Credentials> {
        Ok(Credentials::from_fields(&self.load().await?))
    }
}

/// Default credentials file location.
pub fn default_credentials_path() -> BunqResult<PathBuf> {
    let base = dirs::config_dir()
        .or_else(dirs::home_dir)
        .ok_or_else(|| BunqError::store("could not determine config directory"))?;

    Ok(base.join("bunq").join("credentials.json"))
}

async fn write_atomic(path: &Path, content: String) -> BunqResult<()> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || write_atomic_blocking(&path, content.as_bytes()))
        .await
        .map_err(|e| BunqError::store(format!("credential write task failed: {}", e)))?
}

/// Unique temp file in the target directory, renamed over the target.
fn write_atomic_blocking(path: &Path, content: &[u8]) -> BunqResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir)
        .map_err(|e| BunqError::store(format!("failed to create temp file: {}", e)))?;
    temp.write_all(content)
        .and_then(|()| temp.as_file().sync_all())
        .map_err(|e| BunqError::store(format!("failed to write temp file: {}", e)))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o600))
            .map_err(|e| BunqError::store(format!("failed to set permissions: {}", e)))?;
    }

    temp.persist(path).map_err(|e| {
        BunqError::store(format!("failed to replace {}: {}", path.display(), e.error))
    })?;

    Ok(())
}
