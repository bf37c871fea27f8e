//! HTTP layer: header assembly, signing, status mapping.
//!
//! This is the only place that talks to the network. No retries: a failed
//! call is reported once and the caller decides what to do next.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL, CONTENT_TYPE, USER_AGENT};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::credentials::Credentials;
use crate::envelope::{ApiErrorBody, ResponseEnvelope};
use crate::error::{BunqError, BunqResult};
use crate::signing::{self, API_VERSION};

const USER_AGENT_VALUE: &str = concat!("bunq-client/", env!("CARGO_PKG_VERSION"));

pub const HEADER_LANGUAGE: &str = "X-Bunq-Language";
pub const HEADER_REGION: &str = "X-Bunq-Region";
pub const HEADER_REQUEST_ID: &str = "X-Bunq-Client-Request-Id";
pub const HEADER_GEOLOCATION: &str = "X-Bunq-Geolocation";
pub const HEADER_AUTHENTICATION: &str = "X-Bunq-Client-Authentication";
pub const HEADER_SIGNATURE: &str = "X-Bunq-Client-Signature";
const HEADER_RESPONSE_ID: &str = "X-Bunq-Client-Response-Id";

/// Which token, if any, goes into the authentication header.
#[derive(Debug, Clone, Copy)]
enum Auth<'a> {
    /// Explicit token, else session token, else installation token.
    Select(Option<&'a str>),
    /// No token and no signature (installation only).
    Anonymous,
}

/// Signed-request dispatcher (holds reqwest client and config).
#[derive(Debug, Clone)]
pub struct Dispatcher {
    client: reqwest::Client,
    config: ClientConfig,
}

impl Dispatcher {
    pub fn new(config: ClientConfig) -> BunqResult<Self> {
        config.validate()?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        default_headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(default_headers)
            .build()
            .map_err(|e| BunqError::config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send a signed, authenticated request and return the raw envelope.
    ///
    /// The token is `explicit_token` if given, else the session token, else
    /// the installation token, else none. The request is signed whenever
    /// `creds` holds a private key; a missing or unusable key never blocks
    /// the call.
    pub async fn dispatch(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        explicit_token: Option<&str>,
        creds: &Credentials,
    ) -> BunqResult<ResponseEnvelope> {
        self.send(method, path, body, Auth::Select(explicit_token), creds)
            .await
    }

    /// Send without token or signature. Only the installation call is
    /// accepted this way.
    pub async fn dispatch_unauthenticated(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        creds: &Credentials,
    ) -> BunqResult<ResponseEnvelope> {
        self.send(method, path, body, Auth::Anonymous, creds).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        auth: Auth<'_>,
        creds: &Credentials,
    ) -> BunqResult<ResponseEnvelope> {
        let path = signing::normalize_path(path);
        let url = format!(
            "{}/{}{}",
            self.config.base_url(creds.environment),
            API_VERSION,
            path
        );

        // Serialized once: the signature covers these exact bytes.
        let body_text = match body {
            Some(value) => serde_json::to_string(value)
                .map_err(|e| BunqError::protocol(format!("failed to serialize body: {}", e)))?,
            None => String::new(),
        };

        let request_id = Uuid::new_v4().to_string();
        let mut request = self
            .client
            .request(method.clone(), &url)
            .header(HEADER_LANGUAGE, &self.config.language)
            .header(HEADER_REGION, &self.config.region)
            .header(HEADER_REQUEST_ID, &request_id)
            .header(HEADER_GEOLOCATION, &self.config.geolocation);

        let (token, signature) = match auth {
            Auth::Anonymous => (None, None),
            Auth::Select(explicit) => (
                explicit.or_else(|| creds.auth_token()),
                signing::sign(
                    method.as_str(),
                    &path,
                    &body_text,
                    creds.private_key.as_deref(),
                ),
            ),
        };

        if let Some(token) = token {
            request = request.header(HEADER_AUTHENTICATION, token);
        }
        let signed = signature.is_some();
        if let Some(signature) = signature {
            request = request.header(HEADER_SIGNATURE, signature);
        }

        debug!(
            method = %method,
            path = %path,
            request_id = %request_id,
            authenticated = token.is_some(),
            signed,
            "dispatching request"
        );

        let response = request.body(body_text).send().await?;
        let status = response.status();
        let response_id = response
            .headers()
            .get(HEADER_RESPONSE_ID)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let text = response.text().await.map_err(|e| BunqError::Transport {
            message: format!("failed to read response body: {}", e),
        })?;

        debug!(
            status = status.as_u16(),
            request_id = %request_id,
            response_id = ?response_id,
            "response received"
        );

        if !status.is_success() {
            return Err(BunqError::HttpStatus {
                status: status.as_u16(),
                body: ApiErrorBody::parse(&text),
            });
        }

        parse_envelope(&text)
    }
}

/// Parse a 2xx body. An empty body is an empty envelope.
pub(crate) fn parse_envelope(text: &str) -> BunqResult<ResponseEnvelope> {
    if text.trim().is_empty() {
        return Ok(ResponseEnvelope::default());
    }
    serde_json::from_str(text)
        .map_err(|e| BunqError::protocol(format!("failed to parse response envelope: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::Environment;
    use wiremock::matchers::{body_string, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn dispatcher_for(server: &MockServer) -> Dispatcher {
        Dispatcher::new(ClientConfig::default().with_base_url(server.uri()))
            .expect("failed to create dispatcher")
    }

    fn envelope_json() -> Value {
        serde_json::json!({ "Response": [ { "Id": { "id": 3 } } ] })
    }

    #[test]
    fn test_parse_envelope_empty_body() {
        assert_eq!(parse_envelope("").unwrap(), ResponseEnvelope::default());
        assert_eq!(parse_envelope("  \n").unwrap(), ResponseEnvelope::default());
    }

    #[test]
    fn test_parse_envelope_malformed() {
        assert!(matches!(
            parse_envelope("{\"Response\": 5}"),
            Err(BunqError::Protocol { .. })
        ));
        assert!(matches!(
            parse_envelope("<html>"),
            Err(BunqError::Protocol { .. })
        ));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = Dispatcher::new(ClientConfig::default().with_base_url("nope"));
        assert!(matches!(result, Err(BunqError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_unencodable_token_is_configuration_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let creds = Credentials {
            session_token: Some("edited\ntoken".into()),
            ..Credentials::default()
        };
        let result = dispatcher_for(&server)
            .dispatch(Method::GET, "/user", None, None, &creds)
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, BunqError::Configuration { .. }));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_fixed_headers_are_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/user"))
            .and(header("Content-Type", "application/json"))
            .and(header("Cache-Control", "no-cache"))
            .and(header(HEADER_LANGUAGE, "en_US"))
            .and(header(HEADER_REGION, "nl_NL"))
            .and(header(HEADER_GEOLOCATION, "0 0 0 0 000"))
            .and(header_exists(HEADER_REQUEST_ID))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope_json()))
            .expect(1)
            .mount(&server)
            .await;

        let envelope = dispatcher_for(&server)
            .dispatch(Method::GET, "/user", None, None, &Credentials::default())
            .await
            .unwrap();
        assert_eq!(envelope.id().unwrap().id, "3");
    }

    #[tokio::test]
    async fn test_token_selection_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/explicit"))
            .and(header(HEADER_AUTHENTICATION, "explicit"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope_json()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/session"))
            .and(header(HEADER_AUTHENTICATION, "sess"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope_json()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/installation-only"))
            .and(header(HEADER_AUTHENTICATION, "inst"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope_json()))
            .expect(1)
            .mount(&server)
            .await;

        let dispatcher = dispatcher_for(&server);
        let full = Credentials {
            installation_token: Some("inst".into()),
            session_token: Some("sess".into()),
            ..Default::default()
        };
        let installed = Credentials {
            installation_token: Some("inst".into()),
            ..Default::default()
        };

        dispatcher
            .dispatch(Method::GET, "/explicit", None, Some("explicit"), &full)
            .await
            .unwrap();
        dispatcher
            .dispatch(Method::GET, "/session", None, None, &full)
            .await
            .unwrap();
        dispatcher
            .dispatch(Method::GET, "/installation-only", None, None, &installed)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_no_token_means_no_auth_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope_json()))
            .mount(&server)
            .await;

        dispatcher_for(&server)
            .dispatch(Method::GET, "/user", None, None, &Credentials::default())
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].headers.get(HEADER_AUTHENTICATION).is_none());
        assert!(requests[0].headers.get(HEADER_SIGNATURE).is_none());
    }

    #[tokio::test]
    async fn test_unusable_key_sends_unsigned() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope_json()))
            .expect(1)
            .mount(&server)
            .await;

        let creds = Credentials {
            private_key: Some("corrupted".into()),
            session_token: Some("sess".into()),
            ..Default::default()
        };
        dispatcher_for(&server)
            .dispatch(Method::POST, "/user", Some(&serde_json::json!({})), None, &creds)
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        assert!(requests[0].headers.get(HEADER_SIGNATURE).is_none());
    }

    #[tokio::test]
    async fn test_body_is_sent_as_serialized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/session-server"))
            .and(body_string("{\"secret\":\"s\"}"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope_json()))
            .expect(1)
            .mount(&server)
            .await;

        dispatcher_for(&server)
            .dispatch(
                Method::POST,
                "session-server",
                Some(&serde_json::json!({ "secret": "s" })),
                None,
                &Credentials::default(),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_environment_selects_base_url() {
        let sandbox = MockServer::start().await;
        let production = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope_json()))
            .expect(0)
            .mount(&sandbox)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope_json()))
            .expect(1)
            .mount(&production)
            .await;

        let dispatcher = Dispatcher::new(
            ClientConfig::default()
                .with_sandbox_url(sandbox.uri())
                .with_production_url(production.uri()),
        )
        .unwrap();
        let creds = Credentials {
            environment: Environment::Production,
            ..Default::default()
        };
        dispatcher
            .dispatch(Method::GET, "/user", None, None, &creds)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_request_ids_are_unique() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope_json()))
            .mount(&server)
            .await;

        let dispatcher = dispatcher_for(&server);
        for _ in 0..3 {
            dispatcher
                .dispatch(Method::GET, "/user", None, None, &Credentials::default())
                .await
                .unwrap();
        }

        let requests = server.received_requests().await.unwrap();
        let mut ids: Vec<String> = requests
            .iter()
            .map(|r| {
                r.headers
                    .get(HEADER_REQUEST_ID)
                    .unwrap()
                    .to_str()
                    .unwrap()
                    .to_string()
            })
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }

    #[tokio::test]
    async fn test_http_error_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/user"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "Error": [ { "error_description": "Insufficient authorisation." } ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = dispatcher_for(&server)
            .dispatch(Method::GET, "/user", None, Some("stale"), &Credentials::default())
            .await;

        match result {
            Err(BunqError::HttpStatus { status, body }) => {
                assert_eq!(status, 401);
                assert_eq!(body.descriptions, vec!["Insufficient authorisation."]);
            }
            other => panic!("expected HttpStatus, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"Response\": {}}"))
            .mount(&server)
            .await;

        let result = dispatcher_for(&server)
            .dispatch(Method::GET, "/user", None, None, &Credentials::default())
            .await;
        assert!(matches!(result, Err(BunqError::Protocol { .. })));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        // Bind then release a port so nothing is listening on it.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let uri = format!("http://127.0.0.1:{port}");

        let dispatcher = Dispatcher::new(ClientConfig::default().with_base_url(uri)).unwrap();
        let result = dispatcher
            .dispatch(Method::GET, "/user", None, None, &Credentials::default())
            .await;
        assert!(matches!(result, Err(BunqError::Transport { .. })));
    }
}
