//! HTTP transport for provider endpoints
//!
//! The transport only moves bytes. It never interprets error bodies; those are
//! handed back untouched so the classifier can inspect them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How the access token is presented to the user-info endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenPlacement {
    /// `Authorization: Bearer <token>` header.
    #[default]
    Header,
    /// `access_token=<token>` query parameter.
    Query,
}

/// A failed request: network error or non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    /// Description of the failure.
    pub message: String,
    /// HTTP status, if a response was received.
    pub status: Option<u16>,
    /// Raw response body, if any.
    pub body: Option<String>,
}

impl TransportError {
    /// Creates an error for a request that never produced a response.
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            body: None,
        }
    }

    /// Creates an error for a response with a non-success status.
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        Self {
            message: format!("HTTP status {}", status),
            status: Some(status),
            body: (!body.is_empty()).then_some(body),
        }
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for TransportError {}

/// Transport used by strategies to reach provider endpoints.
#[async_trait]
pub trait UserInfoTransport: Send + Sync {
    /// GET the user-info endpoint with the given access token.
    ///
    /// Returns the response body on 2xx.
    async fn fetch_user_info(
        &self,
        endpoint: &str,
        access_token: &str,
        placement: TokenPlacement,
    ) -> Result<String, TransportError>;

    /// POST a url-encoded form (token exchange).
    ///
    /// Returns the response body on 2xx.
    async fn post_form(
        &self,
        endpoint: &str,
        form: &[(String, String)],
    ) -> Result<String, TransportError>;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport with a default client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport around a preconfigured client (timeouts, proxies).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn read(response: reqwest::Response) -> Result<String, TransportError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::network(e.to_string()))?;

        if status.is_success() {
            Ok(body)
        } else {
            Err(TransportError::status(status.as_u16(), body))
        }
    }
}

#[async_trait]
impl UserInfoTransport for HttpTransport {
    async fn fetch_user_info(
        &self,
        endpoint: &str,
        access_token: &str,
        placement: TokenPlacement,
    ) -> Result<String, TransportError> {
        debug!(endpoint, ?placement, "Fetching user profile");

        let request = self.client.get(endpoint);
        let request = match placement {
            TokenPlacement::Header => request.bearer_auth(access_token),
            TokenPlacement::Query => request.query(&[("access_token", access_token)]),
        };

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::network(e.to_string()))?;

        Self::read(response).await
    }

    async fn post_form(
        &self,
        endpoint: &str,
        form: &[(String, String)],
    ) -> Result<String, TransportError> {
        debug!(endpoint, "Posting token request");

        let response = self
            .client
            .post(endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(form)
            .send()
            .await
            .map_err(|e| TransportError::network(e.to_string()))?;

        Self::read(response).await
    }
}
