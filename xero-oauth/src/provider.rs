use std::{fmt, str::FromStr, sync::Arc};

use http_client::{
    http_types::{Method, Url},
    HttpClient, Request,
};
use oauth2::{
    basic::{
        BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
        BasicTokenType,
    },
    http::{header::CONTENT_TYPE, HeaderMap, HeaderValue, StatusCode},
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, HttpRequest, HttpResponse,
    RedirectUrl, RefreshToken, RequestTokenError, Scope, StandardRevocableToken, TokenUrl,
};
use serde_json::Value;

use crate::{scopes::BASE_SCOPE, AuthError, XeroToken, XeroTokenResponse};

type OAuthClient = oauth2::Client<
    BasicErrorResponse,
    XeroTokenResponse,
    BasicTokenType,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
>;

pub const AUTHORIZATION_URL: &str = "https://login.xero.com/identity/connect/authorize";
pub const TOKEN_URL: &str = "https://identity.xero.com/connect/token";

/// Separator between scopes in the `scope` parameter.
pub const SCOPE_SEPARATOR: &str = " ";

const ERROR_MAP: [(&str, &str); 4] = [
    ("invalid_client", "Invalid client credentials"),
    ("unsupported_grant_type", "Missing required grant_type parameter"),
    ("invalid_grant", "Invalid, expired, or already used code"),
    ("unauthorized_client", "Invalid callback URI"),
];

const UNKNOWN_ERROR: &str = "An unknown error occurred with this request";
const NO_RESOURCE_OWNER: &str = "Xero does not provide resource owner details";

/// OAuth2 grants the token endpoint accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    RefreshToken,
    AuthorizationCode,
}

impl Grant {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Grant::RefreshToken => "refresh_token",
            Grant::AuthorizationCode => "authorization_code",
        }
    }

    /// Form parameter carrying the grant's credential.
    #[must_use]
    pub fn parameter(self) -> &'static str {
        match self {
            Grant::RefreshToken => "refresh_token",
            Grant::AuthorizationCode => "code",
        }
    }
}

impl fmt::Display for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Grant {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "refresh_token" => Ok(Grant::RefreshToken),
            "authorization_code" => Ok(Grant::AuthorizationCode),
            other => Err(AuthError::InvalidArgument(format!("Invalid grant {other}"))),
        }
    }
}

/// The Xero identity service.
///
/// Holds the application credentials and the transport used to reach the
/// token endpoint. Every token response passes through
/// [`XeroProvider::check_response`] before it is decoded.
#[derive(Debug, Clone)]
pub struct XeroProvider {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    scopes: Vec<String>,
    http: Arc<dyn HttpClient>,
}

impl XeroProvider {
    /// Creates a provider requesting the default scopes. An empty
    /// `redirect_uri` is left out of every request.
    pub fn new<I, S, R>(client_id: I, client_secret: S, redirect_uri: R, http: Arc<dyn HttpClient>) -> Self
    where
        I: ToString,
        S: ToString,
        R: ToString,
    {
        Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            redirect_uri: redirect_uri.to_string(),
            scopes: Self::default_scopes(),
            http,
        }
    }

    #[must_use]
    pub fn with_scopes(self, scopes: Vec<String>) -> Self {
        Self { scopes, ..self }
    }

    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    #[must_use]
    pub fn default_scopes() -> Vec<String> {
        vec![BASE_SCOPE.to_string()]
    }

    #[must_use]
    pub fn base_authorization_url(&self) -> &'static str {
        AUTHORIZATION_URL
    }

    #[must_use]
    pub fn base_access_token_url(&self) -> &'static str {
        TOKEN_URL
    }

    fn oauth_client(&self) -> Result<OAuthClient, AuthError> {
        let client = OAuthClient::new(
            ClientId::new(self.client_id.clone()),
            Some(ClientSecret::new(self.client_secret.clone())),
            AuthUrl::new(AUTHORIZATION_URL.to_string())?,
            Some(TokenUrl::new(TOKEN_URL.to_string())?),
        );
        if self.redirect_uri.is_empty() {
            return Ok(client);
        }
        Ok(client.set_redirect_uri(RedirectUrl::new(self.redirect_uri.clone())?))
    }

    /// Builds the consent URL the user is sent to, returning it together with
    /// the CSRF state to compare against the callback.
    pub fn authorization_url(&self) -> Result<(Url, CsrfToken), AuthError> {
        Ok(self
            .oauth_client()?
            .authorize_url(CsrfToken::new_random)
            .add_scopes(self.scopes.iter().cloned().map(Scope::new))
            .url())
    }

    /// Xero has no user-info endpoint.
    pub fn resource_owner_details_url(&self, _token: &XeroToken) -> Result<Url, AuthError> {
        Err(AuthError::UnsupportedOperation(NO_RESOURCE_OWNER.into()))
    }

    /// Xero has no user-info endpoint.
    pub fn resource_owner(&self, _token: &XeroToken) -> Result<Value, AuthError> {
        Err(AuthError::UnsupportedOperation(NO_RESOURCE_OWNER.into()))
    }

    /// Exchanges `credential` (a refresh token or an authorization code) for a
    /// new access token. The redirect URI, when set, is sent with codes only.
    pub async fn access_token(&self, grant: Grant, credential: &str) -> Result<XeroToken, AuthError> {
        let client = self.oauth_client()?;
        let http = |request: HttpRequest| send_token_request(Arc::clone(&self.http), request);

        log::debug!("Requesting access token with {grant} grant");

        let response = match grant {
            Grant::RefreshToken => {
                client
                    .exchange_refresh_token(&RefreshToken::new(credential.to_string()))
                    .request_async(http)
                    .await
            }
            Grant::AuthorizationCode => {
                client
                    .exchange_code(AuthorizationCode::new(credential.to_string()))
                    .request_async(http)
                    .await
            }
        }
        .map_err(token_error)?;

        log::info!("Exchanged {grant} grant for a new access token");
        Ok(response.into())
    }

    /// Maps an error status from the identity service onto an [`AuthError`].
    pub fn check_response(status: u16, body: &str) -> Result<(), AuthError> {
        if status == 429 {
            log::error!("Token request was rate limited");
            return Err(AuthError::RateLimited { body: body.to_string() });
        }
        if status >= 400 {
            let data = serde_json::from_str::<Value>(body).ok();
            let message = Self::response_message(data.as_ref());
            log::error!("Token request rejected ({status}): {message}");
            return Err(AuthError::RemoteRejected {
                status,
                message,
                body: body.to_string(),
            });
        }
        Ok(())
    }

    /// Resolves the `error` field of a token-endpoint error body.
    #[must_use]
    pub fn response_message(data: Option<&Value>) -> String {
        let Some(code) = data.and_then(|data| data.get("error")).filter(|code| !code.is_null()) else {
            return UNKNOWN_ERROR.to_string();
        };
        let code = code.as_str().map_or_else(|| code.to_string(), str::to_string);

        ERROR_MAP
            .iter()
            .find(|(known, _)| *known == code)
            .map_or_else(|| format!("Unknown error code {code}"), |(_, message)| (*message).to_string())
    }
}

/// Sends a token request built by `oauth2` over `http`. Error statuses
/// never reach `oauth2`; they are mapped by [`XeroProvider::check_response`].
async fn send_token_request(http: Arc<dyn HttpClient>, request: HttpRequest) -> Result<HttpResponse, AuthError> {
    let mut outgoing = Request::new(request.method.as_str().parse::<Method>()?, request.url);
    for (name, value) in &request.headers {
        if let Ok(value) = value.to_str() {
            outgoing.insert_header(name.as_str(), value);
        }
    }
    outgoing.set_body(request.body);

    let mut response = http.send(outgoing).await?;
    let status = u16::from(response.status());
    let body = response.body_bytes().await?;
    XeroProvider::check_response(status, &String::from_utf8_lossy(&body))?;

    let headers = response
        .content_type()
        .and_then(|mime| HeaderValue::from_str(&mime.to_string()).ok())
        .map(|value| [(CONTENT_TYPE, value)].into_iter().collect())
        .unwrap_or_else(HeaderMap::new);
    Ok(HttpResponse {
        status_code: StatusCode::from_u16(status)
            .map_err(|err| AuthError::UnexpectedResponse(err.to_string()))?,
        headers,
        body,
    })
}

fn token_error(err: RequestTokenError<AuthError, BasicErrorResponse>) -> AuthError {
    match err {
        RequestTokenError::Request(err) => err,
        RequestTokenError::Parse(err, _) => AuthError::Json(err.into_inner()),
        RequestTokenError::ServerResponse(response) => AuthError::UnexpectedResponse(response.to_string()),
        RequestTokenError::Other(message) => AuthError::UnexpectedResponse(message),
    }
}
