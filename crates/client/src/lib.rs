//! Async client for the discue REST API.
//!
//! Entity responses wrap the entity in a single named field
//! (`{"queue": {...}}`); [`Client::send_and_receive`] unwraps it.

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::Value as Json;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

mod model;
mod ops;

pub use model::*;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("invalid api endpoint '{endpoint}': {source}")]
    InvalidEndpoint { endpoint: String, #[source] source: url::ParseError },
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("status: {status}, body: {body}")]
    UnexpectedStatus { status: u16, body: String },
    #[error("response does not contain a '{key}' entity")]
    MissingEntity { key: String },
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::UnexpectedStatus { status: 404, .. })
    }
}

#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub path: String,
    pub expect_status: StatusCode,
    pub body: Option<Json>,
}

impl RequestOptions {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), expect_status: StatusCode::OK, body: None }
    }

    pub fn with_body(mut self, body: Json) -> Self { self.body = Some(body); self }
}

pub struct Client {
    endpoint: String,
    api_key: SecretString,
    http: reqwest::Client,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").field("endpoint", &self.endpoint).finish_non_exhaustive()
    }
}

impl Client {
    pub fn new(endpoint: &str, api_key: SecretString, timeout: Duration) -> Result<Self, ClientError> {
        url::Url::parse(endpoint)
            .map_err(|source| ClientError::InvalidEndpoint { endpoint: endpoint.to_string(), source })?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { endpoint: endpoint.trim_end_matches('/').to_string(), api_key, http })
    }

    pub fn endpoint(&self) -> &str { &self.endpoint }

    /// Sends the request and returns the raw body once the status matches.
    pub async fn execute(&self, opts: RequestOptions) -> Result<String, ClientError> {
        let url = format!("{}{}", self.endpoint, opts.path);
        debug!(method = %opts.method, %url, "sending request");
        let mut req = self.http
            .request(opts.method.clone(), &url)
            .header("x-api-key", self.api_key.expose_secret().as_str())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json");
        if let Some(body) = &opts.body {
            req = req.body(serde_json::to_vec(body)?);
        }
        let res = req.send().await?;
        let status = res.status();
        let body = res.text().await?;
        if status != opts.expect_status {
            debug!(method = %opts.method, %url, status = status.as_u16(), "unexpected status");
            return Err(ClientError::UnexpectedStatus { status: status.as_u16(), body });
        }
        Ok(body)
    }

    /// Sends the request and decodes the entity stored under `key`.
    pub async fn send_and_receive<T: DeserializeOwned>(&self, opts: RequestOptions, key: &str) -> Result<T, ClientError> {
        let body = self.execute(opts).await?;
        let mut envelope: Json = serde_json::from_str(&body)?;
        let entity = envelope
            .get_mut(key)
            .map(Json::take)
            .filter(|v| !v.is_null())
            .ok_or_else(|| ClientError::MissingEntity { key: key.to_string() })?;
        Ok(serde_json::from_value(entity)?)
    }

    /// For requests whose response carries no entity (deletes).
    pub async fn send(&self, opts: RequestOptions) -> Result<(), ClientError> {
        self.execute(opts).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use reqwest::Method;
    use serde_json::json;

    pub(crate) fn test_client(server: &MockServer) -> Client {
        Client::new(&server.base_url(), SecretString::new("secret-key".into()), DEFAULT_TIMEOUT).unwrap()
    }

    #[test]
    fn rejects_unparseable_endpoint() {
        let err = Client::new("not a url", SecretString::new("k".into()), DEFAULT_TIMEOUT).unwrap_err();
        assert!(matches!(err, ClientError::InvalidEndpoint { .. }));
    }

    #[test]
    fn debug_output_hides_the_key() {
        let client = Client::new("http://localhost:3000/", SecretString::new("super-secret".into()), DEFAULT_TIMEOUT).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:3000");
        assert!(!format!("{client:?}").contains("super-secret"));
    }

    #[tokio::test]
    async fn sends_auth_and_content_headers() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/queues/abc")
                .header("x-api-key", "secret-key")
                .header("accept", "application/json")
                .header("content-type", "application/json");
            then.status(200).json_body(json!({ "queue": { "id": "abc", "alias": "orders" } }));
        });

        let client = test_client(&server);
        let q: Json = client.send_and_receive(RequestOptions::new(Method::GET, "/queues/abc"), "queue").await.unwrap();
        mock.assert();
        assert_eq!(q["alias"], "orders");
    }

    #[tokio::test]
    async fn unexpected_status_keeps_the_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/queues/missing");
            then.status(404).body("{\"title\":\"Not Found\"}");
        });

        let err = test_client(&server).execute(RequestOptions::new(Method::GET, "/queues/missing")).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "status: 404, body: {\"title\":\"Not Found\"}");
    }

    #[tokio::test]
    async fn missing_envelope_key_is_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/queues/abc");
            then.status(200).json_body(json!({ "_links": { "self": { "href": "/queues/abc" } } }));
        });

        let err = test_client(&server)
            .send_and_receive::<Json>(RequestOptions::new(Method::GET, "/queues/abc"), "queue")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::MissingEntity { ref key } if key == "queue"));
    }
}
