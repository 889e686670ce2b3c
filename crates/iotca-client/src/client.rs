//! Main PKI engine client implementation.

use crate::api::*;
use iotca_core::{EngineErrors, EngineResponse, PkiError, Result};
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for a PKI secrets engine
#[derive(Clone)]
pub struct PkiClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: HttpClient,
    token: String,
    address: String,
}

impl std::fmt::Debug for PkiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkiClient")
            .field("address", &self.inner.address)
            .finish_non_exhaustive()
    }
}

impl PkiClient {
    /// Create a client for the engine at `address` using default settings
    pub fn new(address: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        PkiClientBuilder::new(address, token).build()
    }

    /// Create a builder for custom configuration
    #[must_use]
    pub fn builder(address: impl Into<String>, token: impl Into<String>) -> PkiClientBuilder {
        PkiClientBuilder::new(address, token)
    }

    /// Engine address this client talks to
    #[must_use]
    pub fn address(&self) -> &str {
        &self.inner.address
    }

    /// Root authority endpoints of a mount
    #[must_use]
    pub fn root<'a>(&'a self, mount: &'a str) -> RootApi<'a> {
        RootApi::new(self, mount)
    }

    /// Intermediate authority endpoints of a mount
    #[must_use]
    pub fn intermediate<'a>(&'a self, mount: &'a str) -> IntermediateApi<'a> {
        IntermediateApi::new(self, mount)
    }

    /// Issuer URL and CRL settings of a mount
    #[must_use]
    pub fn settings<'a>(&'a self, mount: &'a str) -> SettingsApi<'a> {
        SettingsApi::new(self, mount)
    }

    /// Role endpoints of a mount
    #[must_use]
    pub fn roles<'a>(&'a self, mount: &'a str) -> RoleApi<'a> {
        RoleApi::new(self, mount)
    }

    /// Role-scoped issuance under `endpoint` (e.g. `<address>/v1/pki_int/issue`)
    #[must_use]
    pub fn issue<'a>(&'a self, endpoint: &'a str) -> IssueApi<'a> {
        IssueApi::new(self, endpoint)
    }

    /// Absolute URL for an engine path such as `/v1/pki/ca/pem`
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.inner.address, path)
    }

    /// Perform a GET request returning the raw body
    pub(crate) async fn get_text(&self, path: &str) -> Result<String> {
        let url = self.url(path);
        debug!(url = %url, "GET request");

        let response = self
            .inner
            .http
            .get(&url)
            .bearer_auth(&self.inner.token)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            response.text().await.map_err(transport_error)
        } else {
            self.handle_error(status.as_u16(), &url, response).await
        }
    }

    /// Perform a POST to an engine path
    pub(crate) async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<EngineResponse<T>> {
        self.post_url(&self.url(path), body).await
    }

    /// Perform a POST to an absolute URL
    pub(crate) async fn post_url<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<EngineResponse<T>> {
        debug!(url = %url, "POST request");

        let response = self
            .inner
            .http
            .post(url)
            .bearer_auth(&self.inner.token)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        self.handle_response(url, response).await
    }

    /// Perform a POST whose response carries no payload, returning any warnings
    pub(crate) async fn post_unit<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Vec<String>> {
        let url = self.url(path);
        debug!(url = %url, "POST request");

        let response = self
            .inner
            .http
            .post(&url)
            .bearer_auth(&self.inner.token)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        self.handle_empty_response(&url, response).await
    }

    /// Perform a DELETE request
    pub(crate) async fn delete(&self, path: &str) -> Result<()> {
        let url = self.url(path);
        debug!(url = %url, "DELETE request");

        let response = self
            .inner
            .http
            .delete(&url)
            .bearer_auth(&self.inner.token)
            .send()
            .await
            .map_err(transport_error)?;

        self.handle_empty_response(&url, response).await.map(|_| ())
    }

    /// Handle a response that carries a `data` payload
    async fn handle_response<T: DeserializeOwned>(
        &self,
        url: &str,
        response: reqwest::Response,
    ) -> Result<EngineResponse<T>> {
        let status = response.status();

        if status.is_success() {
            let body = response.text().await.map_err(transport_error)?;
            let parsed: EngineResponse<T> = serde_json::from_str(&body)?;
            for w in parsed.warnings() {
                warn!(url = %url, warning = %w, "engine warning");
            }
            Ok(parsed)
        } else {
            self.handle_error(status.as_u16(), url, response).await
        }
    }

    /// Handle a response that may have an empty body (204 or bare 200)
    async fn handle_empty_response(
        &self,
        url: &str,
        response: reqwest::Response,
    ) -> Result<Vec<String>> {
        let status = response.status();

        if !status.is_success() {
            return self.handle_error(status.as_u16(), url, response).await;
        }

        let body = response.text().await.map_err(transport_error)?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }

        let warnings = serde_json::from_str::<EngineResponse<serde_json::Value>>(&body)
            .map(|r| r.warnings.unwrap_or_default())
            .unwrap_or_default();
        for w in &warnings {
            warn!(url = %url, warning = %w, "engine warning");
        }
        Ok(warnings)
    }

    /// Convert an error response to a `PkiError`
    async fn handle_error<T>(
        &self,
        status: u16,
        url: &str,
        response: reqwest::Response,
    ) -> Result<T> {
        let body = response.text().await.unwrap_or_default();

        // Engine errors arrive as {"errors": [...]}, fall back to the raw body
        let mut messages = serde_json::from_str::<EngineErrors>(&body)
            .map(|e| e.errors)
            .unwrap_or_default();
        if messages.is_empty() && !body.trim().is_empty() {
            messages.push(body.trim().to_string());
        }

        match status {
            401 | 403 => Err(PkiError::Unauthorized),
            404 => Err(PkiError::NotFound {
                resource: messages.first().cloned().unwrap_or_else(|| url.to_string()),
            }),
            _ => Err(PkiError::Api {
                code: status,
                messages,
            }),
        }
    }
}

fn transport_error(e: reqwest::Error) -> PkiError {
    if e.is_timeout() {
        PkiError::Timeout
    } else if e.is_connect() {
        PkiError::Connection(e.to_string())
    } else {
        PkiError::Http(e.to_string())
    }
}

/// Builder for configuring a [`PkiClient`]
pub struct PkiClientBuilder {
    address: String,
    token: String,
    timeout: Duration,
    user_agent: String,
}

impl PkiClientBuilder {
    /// Create a new builder for the engine at `address`
    #[must_use]
    pub fn new(address: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            token: token.into(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("iotca/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Set the request timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the User-Agent header
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Build the client
    pub fn build(self) -> Result<PkiClient> {
        let parsed =
            Url::parse(&self.address).map_err(|e| PkiError::InvalidUrl(format!("{}: {e}", self.address)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(PkiError::InvalidUrl(format!(
                "{}: scheme must be http or https",
                self.address
            )));
        }

        let http = HttpClient::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .gzip(true)
            .build()
            .map_err(|e| PkiError::Http(e.to_string()))?;

        Ok(PkiClient {
            inner: Arc::new(ClientInner {
                http,
                token: self.token,
                address: self.address.trim_end_matches('/').to_string(),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn rejects_non_http_address() {
        assert!(matches!(
            PkiClient::new("ftp://127.0.0.1:8200", "t"),
            Err(PkiError::InvalidUrl(_))
        ));
        assert!(matches!(
            PkiClient::new("not a url", "t"),
            Err(PkiError::InvalidUrl(_))
        ));
    }

    #[test]
    fn trailing_slash_is_normalized() {
        let client = PkiClient::new("http://127.0.0.1:8200/", "t").unwrap();
        assert_eq!(client.url("/v1/pki/ca/pem"), "http://127.0.0.1:8200/v1/pki/ca/pem");
    }

    #[tokio::test]
    async fn sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/pki/ca/pem"))
            .and(header("authorization", "Bearer s.secret"))
            .respond_with(ResponseTemplate::new(200).set_body_string("PEM"))
            .expect(1)
            .mount(&server)
            .await;

        let client = PkiClient::new(server.uri(), "s.secret").unwrap();
        assert_eq!(client.get_text("/v1/pki/ca/pem").await.unwrap(), "PEM");
    }

    #[tokio::test]
    async fn maps_engine_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/pki/roles/devices"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({ "errors": ["invalid ttl"] })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/pki/ca/pem"))
            .respond_with(ResponseTemplate::new(403).set_body_json(
                serde_json::json!({ "errors": ["permission denied"] }),
            ))
            .mount(&server)
            .await;

        let client = PkiClient::new(server.uri(), "t").unwrap();

        let err = client
            .post_unit("/v1/pki/roles/devices", &serde_json::json!({}))
            .await
            .unwrap_err();
        match err {
            PkiError::Api { code, messages } => {
                assert_eq!(code, 400);
                assert_eq!(messages, ["invalid ttl"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = client.get_text("/v1/pki/ca/pem").await.unwrap_err();
        assert!(err.is_auth_error());
    }

    #[tokio::test]
    async fn unreachable_engine_is_a_connection_error() {
        // Bind then drop a listener so the port is closed.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = PkiClient::new(format!("http://127.0.0.1:{port}"), "t").unwrap();
        let err = client.get_text("/v1/pki/ca/pem").await.unwrap_err();
        assert!(matches!(err, PkiError::Connection(_)), "got {err:?}");
    }
}
