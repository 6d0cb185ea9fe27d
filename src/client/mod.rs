//! # Xero API Client
//!
//! [`XeroClient`] sends requests to one Xero API root with the authentication
//! its [`ClientConfig`] selects. Construction validates the configuration and
//! never touches the network.
//!
//! ```no_run
//! use xero_oxi::{ClientConfig, OAuth2Config, XeroClient};
//!
//! # async fn run() -> xero_oxi::XeroResult<()> {
//! let config = ClientConfig::oauth2(
//!     "https://api.xero.com/api.xro/2.0/",
//!     OAuth2Config::new("access-token").tenant("tenant-id"),
//! );
//! let client = XeroClient::new(config).await?;
//! let invoices: serde_json::Value = client.get_json("Invoices", &[]).await?;
//! # Ok(())
//! # }
//! ```
//!
//! Clients for the bearer scheme are usually created with
//! [`XeroClient::create_from_token`], which also exchanges grants and
//! discovers the connected tenants.

use std::collections::BTreeMap;

use http_client::{
    http_types::{Body, Method, Url},
    Request, Response,
};
use serde::{de::DeserializeOwned, Serialize};
use xero_oauth::XeroToken;

use crate::{config::ClientConfig, XeroError, XeroResult};

mod connections;
mod handler;
mod legacy;
#[cfg(test)]
pub(crate) mod mock;
mod oauth1;
mod token;

pub use connections::{TenantConnection, CONNECTIONS_URL};
pub use handler::{AuthMiddleware, BearerAuth, HandlerStack, Middleware};
pub use legacy::{parse_request_parameters, LegacyOptions, OAUTH_BASE_URL};
pub use oauth1::{OAuth1Signer, SignatureMethod};
pub use token::{TokenClientOptions, DEFAULT_API, DEFAULT_API_URL};

/// An authenticated client for one Xero API root.
#[derive(Debug, Clone)]
pub struct XeroClient {
    base_uri: Url,
    handler: HandlerStack,
    auth: AuthMiddleware,
    headers: BTreeMap<String, String>,
    tenant_connections: Vec<TenantConnection>,
    refreshed_token: Option<XeroToken>,
}

impl XeroClient {
    /// Validates `config` and builds a client from it.
    ///
    /// # Errors
    ///
    /// Returns [`XeroError::InvalidConfiguration`] for the first configuration
    /// rule that is violated, or when there is no transport to send with.
    pub async fn new(config: ClientConfig) -> XeroResult<Self> {
        let (base_uri, auth) = config.validate().await?;
        let handler = match config.handler {
            Some(handler) => handler,
            None => default_handler()?,
        };

        log::info!(
            "Created {:?} client for {base_uri}",
            config.credentials.scheme()
        );
        Ok(Self {
            base_uri,
            handler,
            auth,
            headers: config.headers,
            tenant_connections: Vec::new(),
            refreshed_token: None,
        })
    }

    #[must_use]
    pub fn base_uri(&self) -> &Url {
        &self.base_uri
    }

    #[must_use]
    pub fn handler(&self) -> &HandlerStack {
        &self.handler
    }

    #[must_use]
    pub fn auth(&self) -> &AuthMiddleware {
        &self.auth
    }

    #[must_use]
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Tenants discovered when the client was created from a token.
    #[must_use]
    pub fn tenant_connections(&self) -> &[TenantConnection] {
        &self.tenant_connections
    }

    #[must_use]
    pub fn tenant_ids(&self) -> Vec<&str> {
        self.tenant_connections
            .iter()
            .map(|connection| connection.tenant_id.as_str())
            .collect()
    }

    /// The token obtained when the client was created from a grant.
    #[must_use]
    pub fn refreshed_token(&self) -> Option<&XeroToken> {
        self.refreshed_token.as_ref()
    }

    /// Resolves `path` against the base URL.
    ///
    /// Absolute URLs are returned unchanged. Relative paths, with or without a
    /// leading `/`, are appended to the base path.
    ///
    /// # Errors
    ///
    /// Fails when the joined URL cannot be parsed.
    pub fn resolve(&self, path: &str) -> XeroResult<Url> {
        if let Some(url) = Url::parse(path).ok().filter(Url::has_host) {
            return Ok(url);
        }
        let relative = path.trim_start_matches('/');
        if relative.is_empty() {
            return Ok(self.base_uri.clone());
        }

        let mut base = self.base_uri.clone();
        if !base.path().ends_with('/') {
            let directory = format!("{}/", base.path());
            base.set_path(&directory);
        }
        Ok(base.join(relative)?)
    }

    fn build_request(&self, method: Method, path: &str, query: &[(&str, &str)]) -> XeroResult<Request> {
        let mut url = self.resolve(path)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        let mut request = Request::new(method, url);
        for (name, value) in &self.headers {
            request.insert_header(name.as_str(), value.as_str());
        }

        log::debug!("Built request: {} {}", request.method(), request.url().path());
        Ok(request)
    }

    /// Sends `request` through the handler stack.
    ///
    /// # Errors
    ///
    /// Returns [`XeroError::UnsuccessfulResponse`] for any non-2xx status.
    pub async fn send(&self, request: Request) -> XeroResult<Response> {
        let mut response = self.handler.send(&self.auth, request).await?;
        let status = response.status();
        if !status.is_success() {
            let body = match response.body_string().await {
                Ok(body) => body,
                Err(err) => {
                    log::debug!("Could not read the body of a {status} response: {err}");
                    String::new()
                }
            };
            log::debug!("Request failed with status {status}");
            return Err(XeroError::UnsuccessfulResponse {
                status: u16::from(status),
                body,
            });
        }
        Ok(response)
    }

    /// Issues a request with an optional body.
    ///
    /// # Errors
    ///
    /// See [`XeroClient::send`].
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Body>,
    ) -> XeroResult<Response> {
        let mut request = self.build_request(method, path, query)?;
        if let Some(body) = body {
            request.set_body(body);
        }
        self.send(request).await
    }

    /// # Errors
    ///
    /// See [`XeroClient::send`].
    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> XeroResult<Response> {
        self.request(Method::Get, path, query, None).await
    }

    /// # Errors
    ///
    /// See [`XeroClient::send`].
    pub async fn delete(&self, path: &str) -> XeroResult<Response> {
        self.request(Method::Delete, path, &[], None).await
    }

    /// Sends `body` as JSON.
    ///
    /// # Errors
    ///
    /// Fails when `body` cannot be serialized, or see [`XeroClient::send`].
    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> XeroResult<Response> {
        self.json_request(Method::Post, path, body).await
    }

    /// Sends `body` as JSON.
    ///
    /// # Errors
    ///
    /// Fails when `body` cannot be serialized, or see [`XeroClient::send`].
    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> XeroResult<Response> {
        self.json_request(Method::Put, path, body).await
    }

    /// Sends `form` as an `application/x-www-form-urlencoded` body.
    ///
    /// # Errors
    ///
    /// See [`XeroClient::send`].
    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> XeroResult<Response> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(form)
            .finish();
        let mut request = self.build_request(Method::Post, path, &[])?;
        request.insert_header("Content-Type", "application/x-www-form-urlencoded");
        request.set_body(body);
        self.send(request).await
    }

    /// Fetches `path` and decodes the JSON response.
    ///
    /// # Errors
    ///
    /// Fails when the body is not valid JSON for `T`, or see [`XeroClient::send`].
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> XeroResult<T> {
        let mut request = self.build_request(Method::Get, path, query)?;
        request.insert_header("Accept", "application/json");
        let mut response = self.send(request).await?;
        let body = response.body_string().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn json_request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> XeroResult<Response> {
        let json = serde_json::to_string(body)?;
        let mut request = self.build_request(method, path, &[])?;
        request.insert_header("Content-Type", "application/json");
        request.insert_header("Accept", "application/json");
        request.set_body(json);
        self.send(request).await
    }
}

#[cfg(feature = "h1-client")]
#[allow(clippy::unnecessary_wraps)]
pub(crate) fn default_handler() -> XeroResult<HandlerStack> {
    Ok(HandlerStack::default_transport())
}

#[cfg(not(feature = "h1-client"))]
pub(crate) fn default_handler() -> XeroResult<HandlerStack> {
    Err(XeroError::InvalidConfiguration(
        "No HTTP transport handler configured".into(),
    ))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        client::mock::MockTransport,
        config::{OAuth1Config, OAuth2Config},
    };

    async fn bearer_client(base: &str, transport: &Arc<MockTransport>) -> XeroClient {
        let config = ClientConfig::oauth2(base, OAuth2Config::new("token").tenant("tenant-1"))
            .with_handler(HandlerStack::from_shared(transport.clone()))
            .with_header("User-Agent", "xero-oxi-tests");
        XeroClient::new(config).await.unwrap()
    }

    #[tokio::test]
    async fn invalid_config_never_reaches_transport() {
        let transport = Arc::new(MockTransport::default());
        let mut config = ClientConfig::oauth2("", OAuth2Config::new("token"))
            .with_handler(HandlerStack::from_shared(transport.clone()));
        config.base_uri = None;

        let err = XeroClient::new(config).await.unwrap_err();
        assert!(matches!(err, XeroError::InvalidConfiguration(ref m) if m == "API URL is not valid"));
        assert!(transport.requests().is_empty());
    }

    #[cfg(not(feature = "h1-client"))]
    #[tokio::test]
    async fn missing_transport_is_a_configuration_error() {
        let config = ClientConfig::oauth2("https://api.xero.com/api.xro/2.0/", OAuth2Config::new("token"));
        let err = XeroClient::new(config).await.unwrap_err();
        assert_eq!(err.to_string(), "No HTTP transport handler configured");

        // Credential rules are reported first.
        let config = ClientConfig::oauth1("https://api.xero.com/api.xro/2.0/", OAuth1Config::default());
        let err = XeroClient::new(config).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing required parameter consumer_key");
    }

    #[cfg(feature = "h1-client")]
    #[tokio::test]
    async fn default_transport_when_no_handler_is_given() {
        let config = ClientConfig::oauth2("https://api.xero.com/api.xro/2.0/", OAuth2Config::new("token"));
        let client = XeroClient::new(config).await.unwrap();
        assert_eq!(client.base_uri().as_str(), "https://api.xero.com/api.xro/2.0/");
    }

    #[tokio::test]
    async fn resolves_paths_under_base() {
        let transport = Arc::new(MockTransport::default());
        let client = bearer_client("https://api.xero.com/api.xro/2.0/", &transport).await;
        assert_eq!(
            client.resolve("Invoices").unwrap().as_str(),
            "https://api.xero.com/api.xro/2.0/Invoices"
        );
        assert_eq!(
            client.resolve("/Contacts/123").unwrap().as_str(),
            "https://api.xero.com/api.xro/2.0/Contacts/123"
        );
        assert_eq!(
            client.resolve(CONNECTIONS_URL).unwrap().as_str(),
            CONNECTIONS_URL
        );

        let client = bearer_client("https://api.xero.com/oauth", &transport).await;
        assert_eq!(
            client.resolve("/RequestToken").unwrap().as_str(),
            "https://api.xero.com/oauth/RequestToken"
        );
        assert_eq!(client.resolve("").unwrap().as_str(), "https://api.xero.com/oauth");
    }

    #[tokio::test]
    async fn get_sends_query_headers_and_auth() {
        let transport = Arc::new(MockTransport::with_responses(&[(200, r#"{"Invoices":[]}"#)]));
        let client = bearer_client("https://api.xero.com/api.xro/2.0/", &transport).await;

        let value: serde_json::Value = client
            .get_json("Invoices", &[("where", r#"Status=="PAID""#), ("order", "Date DESC")])
            .await
            .unwrap();
        assert_eq!(value["Invoices"], serde_json::json!([]));

        let sent = &transport.requests()[0];
        assert_eq!(sent.method, "GET");
        assert_eq!(
            sent.url,
            "https://api.xero.com/api.xro/2.0/Invoices?where=Status%3D%3D%22PAID%22&order=Date+DESC"
        );
        assert_eq!(sent.header("authorization"), Some("Bearer token"));
        assert_eq!(sent.header("xero-tenant-id"), Some("tenant-1"));
        assert_eq!(sent.header("user-agent"), Some("xero-oxi-tests"));
        assert_eq!(sent.header("accept"), Some("application/json"));
    }

    #[tokio::test]
    async fn post_and_put_send_json() {
        let transport = Arc::new(MockTransport::with_responses(&[(200, "{}"), (200, "{}")]));
        let client = bearer_client("https://api.xero.com/api.xro/2.0/", &transport).await;

        let contact = serde_json::json!({"Name": "ABC Limited"});
        client.post("Contacts", &contact).await.unwrap();
        client.put("Contacts", &contact).await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[1].method, "PUT");
        for sent in &requests {
            assert_eq!(sent.header("content-type"), Some("application/json"));
            assert_eq!(sent.body, r#"{"Name":"ABC Limited"}"#);
        }
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let transport = Arc::new(MockTransport::with_responses(&[(404, "missing")]));
        let client = bearer_client("https://api.xero.com/api.xro/2.0/", &transport).await;

        match client.delete("Items/1").await {
            Err(XeroError::UnsuccessfulResponse { status, body }) => {
                assert_eq!(status, 404);
                assert_eq!(body, "missing");
            }
            other => panic!("expected an unsuccessful response, got {other:?}"),
        }
        assert_eq!(transport.requests()[0].method, "DELETE");
    }

    #[tokio::test]
    async fn unreadable_error_body_keeps_the_status() {
        let transport = Arc::new(MockTransport::default());
        transport.push_bytes(500, &[0xff, 0xfe, 0xfd]);
        let client = bearer_client("https://api.xero.com/api.xro/2.0/", &transport).await;

        match client.get("Invoices", &[]).await {
            Err(XeroError::UnsuccessfulResponse { status, body }) => {
                assert_eq!(status, 500);
                assert!(body.is_empty());
            }
            other => panic!("expected an unsuccessful response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn transport_errors_propagate() {
        let transport = Arc::new(MockTransport::default());
        let client = bearer_client("https://api.xero.com/api.xro/2.0/", &transport).await;
        assert!(matches!(
            client.get("Invoices", &[]).await,
            Err(XeroError::Transport(_))
        ));
    }
}
