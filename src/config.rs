//! Client configuration and its validation.
//!
//! A [`ClientConfig`] is checked in a fixed order and the first violated
//! rule is reported, so the same configuration always fails the same way.
//! Validation only touches the filesystem (to probe a private key file) and
//! never the network.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    str::FromStr,
};

use http_client::http_types::Url;

use crate::{
    client::{AuthMiddleware, BearerAuth, HandlerStack, OAuth1Signer},
    XeroError, XeroResult,
};

/// API roots a client may be created for.
pub const VALID_URLS: [&str; 6] = [
    "https://identity.xero.com/connect/token",
    "https://api.xero.com/connections",
    "https://api.xero.com/api.xro/2.0/",
    "https://api.xero.com/payroll.xro/1.0/",
    "https://api.xero.com/assets.xro/1.0/",
    "https://api.xero.com/files.xro/1.0/",
];

/// Any URL under this prefix is accepted for the legacy token endpoints.
pub const OAUTH_URL_PREFIX: &str = "https://api.xero.com/oauth";

pub const TENANT_HEADER: &str = "xero-tenant-id";

const ENV_PREFIX: &str = "XERO_";

/// Checks `base_uri` against [`VALID_URLS`] and [`OAUTH_URL_PREFIX`].
#[must_use]
pub fn is_valid_url(base_uri: &str) -> bool {
    VALID_URLS.contains(&base_uri) || base_uri.starts_with(OAUTH_URL_PREFIX)
}

/// Whether `path` names a readable regular file. The contents are not parsed.
pub async fn is_valid_private_key(path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return false;
    }
    match async_fs::metadata(path).await {
        Ok(metadata) if metadata.is_file() => async_fs::File::open(path).await.is_ok(),
        _ => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    OAuth1,
    OAuth2,
}

impl FromStr for Scheme {
    type Err = XeroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "oauth1" => Ok(Scheme::OAuth1),
            "oauth2" => Ok(Scheme::OAuth2),
            _ => Err(XeroError::config("Invalid scheme provided")),
        }
    }
}

/// The kind of legacy application registered with Xero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Application {
    #[default]
    Public,
    Partner,
    /// Signs with its own RSA key and uses the consumer credentials as token.
    Private,
}

impl Application {
    /// Unrecognised names are treated as [`Application::Public`].
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "private" => Application::Private,
            "partner" => Application::Partner,
            _ => Application::Public,
        }
    }
}

/// Credentials for OAuth 1.0a signed requests.
#[derive(Debug, Clone, Default)]
pub struct OAuth1Config {
    pub consumer_key: Option<String>,
    pub consumer_secret: Option<String>,
    pub application: Application,
    pub private_key: Option<PathBuf>,
    pub token: Option<String>,
    pub token_secret: Option<String>,
    pub callback: Option<String>,
    pub verifier: Option<String>,
}

impl OAuth1Config {
    pub fn new(consumer_key: impl Into<String>, consumer_secret: impl Into<String>) -> Self {
        Self {
            consumer_key: Some(consumer_key.into()),
            consumer_secret: Some(consumer_secret.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn application(self, application: Application) -> Self {
        Self { application, ..self }
    }

    #[must_use]
    pub fn private_key(self, path: impl Into<PathBuf>) -> Self {
        Self {
            private_key: Some(path.into()),
            ..self
        }
    }

    #[must_use]
    pub fn token(self, token: impl Into<String>, token_secret: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            token_secret: Some(token_secret.into()),
            ..self
        }
    }

    #[must_use]
    pub fn callback(self, callback: impl Into<String>) -> Self {
        Self {
            callback: Some(callback.into()),
            ..self
        }
    }

    #[must_use]
    pub fn verifier(self, verifier: impl Into<String>) -> Self {
        Self {
            verifier: Some(verifier.into()),
            ..self
        }
    }

    async fn signer(&self) -> XeroResult<OAuth1Signer> {
        let consumer_key = required(self.consumer_key.as_deref(), "consumer_key")?;
        let consumer_secret = required(self.consumer_secret.as_deref(), "consumer_secret")?;
        let signer = OAuth1Signer::new(consumer_key, consumer_secret)
            .with_callback(self.callback.clone())
            .with_verifier(self.verifier.clone());

        if self.application != Application::Private {
            return Ok(signer.with_token(self.token.clone(), self.token_secret.clone()));
        }

        let private_key = self
            .private_key
            .as_ref()
            .ok_or_else(|| missing("private_key"))?;
        if !is_valid_private_key(private_key).await {
            return Err(missing("private_key"));
        }
        Ok(signer
            .with_token(Some(consumer_key.to_string()), Some(consumer_secret.to_string()))
            .with_private_key(private_key))
    }
}

/// Credentials for bearer-token requests.
#[derive(Debug, Clone, Default)]
pub struct OAuth2Config {
    pub auth_token: Option<String>,
    pub tenant: Option<String>,
}

impl OAuth2Config {
    pub fn new(auth_token: impl Into<String>) -> Self {
        Self {
            auth_token: Some(auth_token.into()),
            tenant: None,
        }
    }

    #[must_use]
    pub fn tenant(self, tenant: impl Into<String>) -> Self {
        Self {
            tenant: Some(tenant.into()),
            ..self
        }
    }

    fn bearer(&self) -> XeroResult<BearerAuth> {
        // Presence is all that is checked; an empty token is sent as-is.
        let token = self
            .auth_token
            .as_deref()
            .ok_or_else(|| missing("auth_token"))?;
        Ok(BearerAuth::new(token, self.tenant.clone()))
    }
}

#[derive(Debug, Clone)]
pub enum Credentials {
    OAuth1(OAuth1Config),
    OAuth2(OAuth2Config),
}

impl Credentials {
    #[must_use]
    pub fn scheme(&self) -> Scheme {
        match self {
            Credentials::OAuth1(_) => Scheme::OAuth1,
            Credentials::OAuth2(_) => Scheme::OAuth2,
        }
    }
}

/// Everything needed to construct a [`crate::XeroClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_uri: Option<String>,
    pub credentials: Credentials,
    /// Transport and caller middleware. Falls back to the default transport
    /// when the `h1-client` feature is enabled.
    pub handler: Option<HandlerStack>,
    /// Headers sent with every request.
    pub headers: BTreeMap<String, String>,
}

impl ClientConfig {
    pub fn oauth1(base_uri: impl Into<String>, config: OAuth1Config) -> Self {
        Self::with_credentials(base_uri, Credentials::OAuth1(config))
    }

    pub fn oauth2(base_uri: impl Into<String>, config: OAuth2Config) -> Self {
        Self::with_credentials(base_uri, Credentials::OAuth2(config))
    }

    fn with_credentials(base_uri: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            base_uri: Some(base_uri.into()),
            credentials,
            handler: None,
            headers: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_handler(self, handler: HandlerStack) -> Self {
        Self {
            handler: Some(handler),
            ..self
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Builds a configuration from loosely typed options.
    ///
    /// Recognised keys are `base_uri`, `scheme` (`oauth1` unless given),
    /// `consumer_key`, `consumer_secret`, `application`, `private_key`,
    /// `token`, `token_secret`, `callback`, `verifier`, `auth_token` and
    /// `tenant`. Keys starting with `header.` become default headers.
    ///
    /// # Errors
    ///
    /// Fails when `base_uri` is missing or not allowed, then when `scheme`
    /// is unknown. The remaining rules are checked by [`ClientConfig::validate`].
    pub fn from_map<I, K, V>(options: I) -> XeroResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut options: BTreeMap<String, String> = options
            .into_iter()
            .map(|(key, value)| (key.as_ref().to_string(), value.into()))
            .collect();

        let base_uri = options.remove("base_uri");
        if !base_uri.as_deref().is_some_and(is_valid_url) {
            return Err(XeroError::config("API URL is not valid"));
        }
        let scheme = options
            .remove("scheme")
            .map_or(Ok(Scheme::OAuth1), |scheme| scheme.parse())?;

        let headers = options
            .iter()
            .filter_map(|(key, value)| {
                key.strip_prefix("header.")
                    .map(|name| (name.to_string(), value.clone()))
            })
            .collect();
        let mut take = |key: &str| options.remove(key);

        let credentials = match scheme {
            Scheme::OAuth1 => Credentials::OAuth1(OAuth1Config {
                consumer_key: take("consumer_key"),
                consumer_secret: take("consumer_secret"),
                application: take("application")
                    .as_deref()
                    .map(Application::from_name)
                    .unwrap_or_default(),
                private_key: take("private_key").map(PathBuf::from),
                token: take("token"),
                token_secret: take("token_secret"),
                callback: take("callback"),
                verifier: take("verifier"),
            }),
            Scheme::OAuth2 => Credentials::OAuth2(OAuth2Config {
                auth_token: take("auth_token"),
                tenant: take("tenant"),
            }),
        };

        Ok(Self {
            base_uri,
            credentials,
            handler: None,
            headers,
        })
    }

    /// Reads the options of [`ClientConfig::from_map`] from `XERO_`-prefixed
    /// environment variables, e.g. `XERO_BASE_URI` or `XERO_AUTH_TOKEN`.
    /// `XERO_TENANT_ID` is accepted for `tenant`.
    ///
    /// # Errors
    ///
    /// Fails when `XERO_BASE_URI` is unset, or as [`ClientConfig::from_map`].
    pub fn from_env() -> XeroResult<Self> {
        std::env::var(format!("{ENV_PREFIX}BASE_URI"))?;
        let options = std::env::vars().filter_map(|(key, value)| {
            let key = key.strip_prefix(ENV_PREFIX)?.to_ascii_lowercase();
            let key = if key == "tenant_id" { "tenant".to_string() } else { key };
            Some((key, value))
        });
        Self::from_map(options)
    }

    /// Validates the configuration and selects the authentication it implies.
    ///
    /// # Errors
    ///
    /// Returns [`XeroError::InvalidConfiguration`] naming the first rule
    /// that is violated.
    pub async fn validate(&self) -> XeroResult<(Url, AuthMiddleware)> {
        let base_uri = self
            .base_uri
            .as_deref()
            .filter(|uri| !uri.is_empty() && is_valid_url(uri))
            .ok_or_else(|| XeroError::config("API URL is not valid"))?;
        let base_uri = Url::parse(base_uri)?;

        let auth = match &self.credentials {
            Credentials::OAuth1(config) => AuthMiddleware::OAuth1(config.signer().await?),
            Credentials::OAuth2(config) => AuthMiddleware::Bearer(config.bearer()?),
        };
        Ok((base_uri, auth))
    }
}

fn required<'a>(value: Option<&'a str>, name: &str) -> XeroResult<&'a str> {
    value
        .filter(|value| !value.is_empty())
        .ok_or_else(|| missing(name))
}

fn missing(name: &str) -> XeroError {
    XeroError::config(format!("Missing required parameter {name}"))
}
