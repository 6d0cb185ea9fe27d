use std::{collections::BTreeMap, fmt, sync::Arc};

use http_client::HttpClient;
use xero_oauth::{valid_scopes, Grant, XeroProvider, XeroToken};

use super::{default_handler, HandlerStack, XeroClient};
use crate::{
    config::{ClientConfig, Credentials, OAuth2Config},
    XeroResult,
};

/// API root used when no `base_uri` is given.
pub const DEFAULT_API_URL: &str = "https://api.xero.com/api.xro/2.0/";

/// API whose scopes are requested when exchanging a grant.
pub const DEFAULT_API: &str = "accounting";

/// Optional settings for [`XeroClient::create_from_token`].
#[derive(Clone, Default)]
pub struct TokenClientOptions {
    /// Defaults to [`DEFAULT_API_URL`].
    pub base_uri: Option<String>,
    pub tenant: Option<String>,
    pub handler: Option<HandlerStack>,
    /// Transport for the token endpoint. Defaults to the handler's transport.
    pub provider_transport: Option<Arc<dyn HttpClient>>,
    pub headers: BTreeMap<String, String>,
    pub redirect_uri: String,
}

impl fmt::Debug for TokenClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenClientOptions")
            .field("base_uri", &self.base_uri)
            .field("tenant", &self.tenant)
            .field("handler", &self.handler)
            .field("headers", &self.headers)
            .field("redirect_uri", &self.redirect_uri)
            .finish_non_exhaustive()
    }
}

impl XeroClient {
    /// Creates a bearer-token client and discovers its tenants.
    ///
    /// Without a `grant`, `token` is used as the access token. With
    /// [`Grant::RefreshToken`] or [`Grant::AuthorizationCode`], `token` is first
    /// exchanged at the identity service, requesting the scopes of `api`
    /// (usually [`DEFAULT_API`]), and the new token is kept in
    /// [`XeroClient::refreshed_token`].
    ///
    /// The tenant connections are always fetched before the client is
    /// returned.
    ///
    /// # Errors
    ///
    /// Any failure in the exchange, the configuration or the discovery request
    /// aborts construction.
    pub async fn create_from_token(
        client_id: &str,
        client_secret: &str,
        token: &str,
        grant: Option<Grant>,
        api: &str,
        options: TokenClientOptions,
    ) -> XeroResult<Self> {
        let handler = match options.handler {
            Some(handler) => handler,
            None => default_handler()?,
        };

        let refreshed = match grant {
            Some(grant) => {
                let transport = options
                    .provider_transport
                    .unwrap_or_else(|| handler.transport());
                let provider = XeroProvider::new(client_id, client_secret, &options.redirect_uri, transport)
                    .with_scopes(valid_scopes(api, &[]));
                Some(provider.access_token(grant, token).await?)
            }
            None => None,
        };
        let auth_token = refreshed.as_ref().map_or(token, XeroToken::secret);

        let config = ClientConfig {
            base_uri: Some(options.base_uri.unwrap_or_else(|| DEFAULT_API_URL.to_string())),
            credentials: Credentials::OAuth2(OAuth2Config {
                auth_token: Some(auth_token.to_string()),
                tenant: options.tenant,
            }),
            handler: Some(handler),
            headers: options.headers,
        };
        let mut client = Self::new(config).await?;

        client.tenant_connections = client.connections().await?;
        client.refreshed_token = refreshed;
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use xero_oauth::{AuthError, TOKEN_URL};

    use super::*;
    use crate::{
        client::{mock::MockTransport, CONNECTIONS_URL},
        XeroError,
    };

    const TWO_TENANTS: &str = r#"[
        {"id": "1f7b2d8c-0e43-4a3e-9a57-3a1d8e6c2b10", "tenantId": "tenant-a", "tenantType": "ORGANISATION"},
        {"id": "8c2f6b1e-5d4a-4f7e-b1c3-9e0d7a6f5b21", "tenantId": "tenant-b", "tenantType": "ORGANISATION"}
    ]"#;

    fn options(transport: &Arc<MockTransport>) -> TokenClientOptions {
        TokenClientOptions {
            handler: Some(HandlerStack::from_shared(transport.clone())),
            ..TokenClientOptions::default()
        }
    }

    #[tokio::test]
    async fn direct_token_only_discovers_tenants() {
        let _ = env_logger::builder().is_test(true).try_init();
        let transport = Arc::new(MockTransport::with_responses(&[(200, TWO_TENANTS)]));

        let client = XeroClient::create_from_token("id", "secret", "direct-token", None, DEFAULT_API, options(&transport))
            .await
            .unwrap();

        assert_eq!(client.tenant_connections().len(), 2);
        assert_eq!(client.tenant_ids(), ["tenant-a", "tenant-b"]);
        assert!(client.refreshed_token().is_none());
        assert_eq!(client.base_uri().as_str(), DEFAULT_API_URL);

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].url, CONNECTIONS_URL);
        assert_eq!(requests[0].header("authorization"), Some("Bearer direct-token"));
    }

    #[tokio::test]
    async fn refresh_grant_exchanges_then_discovers() {
        let transport = Arc::new(MockTransport::with_responses(&[
            (
                200,
                r#"{"access_token":"fresh-access","refresh_token":"fresh-refresh","expires_in":1800,"token_type":"Bearer"}"#,
            ),
            (200, r#"[{"id":"c1","tenantId":"tenant-a","tenantType":"ORGANISATION"}]"#),
        ]));

        let client = XeroClient::create_from_token(
            "id",
            "secret",
            "stale-refresh",
            Some(Grant::RefreshToken),
            DEFAULT_API,
            TokenClientOptions {
                base_uri: Some("https://api.xero.com/payroll.xro/1.0/".into()),
                tenant: Some("tenant-a".into()),
                ..options(&transport)
            },
        )
        .await
        .unwrap();

        let refreshed = client.refreshed_token().unwrap();
        assert_eq!(refreshed.secret(), "fresh-access");
        assert_eq!(refreshed.refresh_token().unwrap().secret(), "fresh-refresh");
        assert_eq!(client.base_uri().as_str(), "https://api.xero.com/payroll.xro/1.0/");

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].url, TOKEN_URL);
        assert_eq!(requests[0].body, "grant_type=refresh_token&refresh_token=stale-refresh");
        assert_eq!(requests[1].url, CONNECTIONS_URL);
        assert_eq!(requests[1].header("authorization"), Some("Bearer fresh-access"));
        assert_eq!(requests[1].header("xero-tenant-id"), Some("tenant-a"));
    }

    #[tokio::test]
    async fn authorization_code_grant_sends_code() {
        let transport = Arc::new(MockTransport::with_responses(&[
            (200, r#"{"access_token":"code-access"}"#),
            (200, "[]"),
        ]));

        let client = XeroClient::create_from_token(
            "id",
            "secret",
            "auth-code",
            Some(Grant::AuthorizationCode),
            DEFAULT_API,
            TokenClientOptions {
                redirect_uri: "https://example.com/cb".into(),
                ..options(&transport)
            },
        )
        .await
        .unwrap();

        assert!(client.tenant_connections().is_empty());
        assert_eq!(
            transport.requests()[0].body,
            "grant_type=authorization_code&code=auth-code&redirect_uri=https%3A%2F%2Fexample.com%2Fcb"
        );
    }

    #[tokio::test]
    async fn rejected_exchange_aborts() {
        let transport = Arc::new(MockTransport::with_responses(&[
            (403, r#"{"error":"invalid_client"}"#),
            (200, TWO_TENANTS),
        ]));

        let err = XeroClient::create_from_token(
            "id",
            "secret",
            "stale",
            Some(Grant::RefreshToken),
            DEFAULT_API,
            options(&transport),
        )
        .await
        .unwrap_err();

        match err {
            XeroError::Auth(AuthError::RemoteRejected { status, message, .. }) => {
                assert_eq!(status, 403);
                assert_eq!(message, "Invalid client credentials");
            }
            other => panic!("expected a rejected exchange, got {other:?}"),
        }
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn rate_limited_exchange_aborts() {
        let transport = Arc::new(MockTransport::with_responses(&[(429, "Too Many Requests")]));
        let err = XeroClient::create_from_token(
            "id",
            "secret",
            "stale",
            Some(Grant::RefreshToken),
            DEFAULT_API,
            options(&transport),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, XeroError::Auth(AuthError::RateLimited { .. })));
    }

    #[tokio::test]
    async fn failed_discovery_aborts() {
        let transport = Arc::new(MockTransport::with_responses(&[(401, "Unauthorized")]));
        let err = XeroClient::create_from_token("id", "secret", "bad", None, DEFAULT_API, options(&transport))
            .await
            .unwrap_err();
        assert!(matches!(err, XeroError::UnsuccessfulResponse { status: 401, .. }));
    }

    #[tokio::test]
    async fn separate_provider_transport() {
        let identity = Arc::new(MockTransport::with_responses(&[(200, r#"{"access_token":"from-identity"}"#)]));
        let api = Arc::new(MockTransport::with_responses(&[(200, "[]")]));

        XeroClient::create_from_token(
            "id",
            "secret",
            "refresh",
            Some(Grant::RefreshToken),
            "payroll_uk",
            TokenClientOptions {
                provider_transport: Some(identity.clone()),
                ..options(&api)
            },
        )
        .await
        .unwrap();

        assert_eq!(identity.requests().len(), 1);
        assert_eq!(api.requests().len(), 1);
        assert_eq!(api.requests()[0].header("authorization"), Some("Bearer from-identity"));
    }
}
