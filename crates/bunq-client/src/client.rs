//! Client facade: one dispatcher plus an injected credential store.
//!
//! Every call takes a fresh snapshot of the store, so several clients (or
//! tasks) may share one store. A call racing a session refresh can still
//! go out with the old token and fail with an auth error; retrying after the
//! refresh is the caller's job.

use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use crate::config::ClientConfig;
use crate::credentials::{Credentials, Environment, HandshakeState};
use crate::dispatch::Dispatcher;
use crate::envelope::ResponseEnvelope;
use crate::error::BunqResult;
use crate::handshake::Handshake;
use crate::store::CredentialStore;

#[derive(Debug)]
pub struct BunqClient<S> {
    dispatcher: Dispatcher,
    store: S,
}

impl<S: CredentialStore> BunqClient<S> {
    pub fn new(config: ClientConfig, store: S) -> BunqResult<Self> {
        Ok(Self {
            dispatcher: Dispatcher::new(config)?,
            store,
        })
    }

    pub fn from_env(store: S) -> BunqResult<Self> {
        Self::new(ClientConfig::from_env(), store)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Step-by-step access to the handshake.
    pub fn handshake(&self) -> Handshake<'_, S> {
        Handshake::new(&self.dispatcher, &self.store)
    }

    pub async fn credentials(&self) -> BunqResult<Credentials> {
        self.store.snapshot().await
    }

    pub async fn state(&self) -> BunqResult<HandshakeState> {
        Ok(self.credentials().await?.handshake_state())
    }

    /// Install, register the device and open a session.
    pub async fn setup(&self) -> BunqResult<Credentials> {
        let mut creds = self.credentials().await?;
        self.handshake().full_setup(&mut creds).await?;
        Ok(creds)
    }

    /// Replace an expired session token.
    pub async fn refresh_session(&self) -> BunqResult<Credentials> {
        let mut creds = self.credentials().await?;
        self.handshake().refresh_session(&mut creds).await?;
        Ok(creds)
    }

    pub async fn rotate_secret(&self, secret: &str) -> BunqResult<bool> {
        let mut creds = self.credentials().await?;
        self.handshake().rotate_secret(&mut creds, secret).await
    }

    pub async fn set_environment(&self, environment: Environment) -> BunqResult<bool> {
        let mut creds = self.credentials().await?;
        self.handshake()
            .set_environment(&mut creds, environment)
            .await
    }

    /// Forget everything, secret included.
    pub async fn clear(&self) -> BunqResult<()> {
        debug!("clearing all credentials");
        self.store.clear_all().await
    }

    /// Signed domain call with the current session.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> BunqResult<ResponseEnvelope> {
        let creds = self.credentials().await?;
        self.dispatcher
            .dispatch(method, path, body, None, &creds)
            .await
    }
}
