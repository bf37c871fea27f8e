pub mod dispatch;
mod manage;
mod request;
mod setup;
mod status;

pub use dispatch::dispatch;

use std::path::PathBuf;

use anyhow::Result;
use bunq_client::{BunqClient, FileStore};

pub(crate) type Client = BunqClient<FileStore>;

/// Client over the credential file, configured from the environment.
pub(crate) fn open_client(credentials: Option<PathBuf>) -> Result<Client> {
    let store = match credentials {
        Some(path) => FileStore::new(path),
        None => FileStore::open_default()?,
    };
    tracing::debug!(path = %store.path().display(), "using credential file");
    Ok(BunqClient::from_env(store)?)
}
