//! The OAuth 1.0a token handshake used by legacy public applications.

use std::collections::BTreeMap;

use super::{HandlerStack, XeroClient};
use crate::{
    config::{Application, ClientConfig, Credentials, OAuth1Config},
    XeroResult,
};

pub const OAUTH_BASE_URL: &str = "https://api.xero.com/oauth/";

/// Optional settings for the legacy token requests.
#[derive(Debug, Clone, Default)]
pub struct LegacyOptions {
    pub handler: Option<HandlerStack>,
    /// Sent as `oauth_callback` with the request token call.
    pub callback: Option<String>,
    pub headers: BTreeMap<String, String>,
}

impl XeroClient {
    /// Obtains an unauthorized request token.
    ///
    /// The returned map usually holds `oauth_token` and `oauth_token_secret`.
    ///
    /// # Errors
    ///
    /// Fails on invalid consumer credentials, transport errors and non-2xx
    /// responses.
    pub async fn request_token(
        consumer_key: &str,
        consumer_secret: &str,
        options: LegacyOptions,
    ) -> XeroResult<BTreeMap<String, String>> {
        let config = OAuth1Config {
            callback: options.callback.clone(),
            ..public_config(consumer_key, consumer_secret)
        };
        Self::token_exchange(config, options, "RequestToken").await
    }

    /// Exchanges an authorized request token and its verifier for an access
    /// token.
    ///
    /// # Errors
    ///
    /// Fails on invalid consumer credentials, transport errors and non-2xx
    /// responses.
    pub async fn access_token(
        consumer_key: &str,
        consumer_secret: &str,
        token: &str,
        token_secret: &str,
        verifier: &str,
        options: LegacyOptions,
    ) -> XeroResult<BTreeMap<String, String>> {
        let config = public_config(consumer_key, consumer_secret)
            .token(token, token_secret)
            .verifier(verifier);
        Self::token_exchange(config, options, "AccessToken").await
    }

    async fn token_exchange(
        credentials: OAuth1Config,
        options: LegacyOptions,
        path: &str,
    ) -> XeroResult<BTreeMap<String, String>> {
        let config = ClientConfig {
            base_uri: Some(OAUTH_BASE_URL.to_string()),
            credentials: Credentials::OAuth1(credentials),
            handler: options.handler,
            headers: options.headers,
        };
        let client = Self::new(config).await?;

        let mut response = client.post_form(path, &[]).await?;
        let tokens = parse_request_parameters(&response.body_string().await?);
        log::info!("Received {} parameter(s) from {path}", tokens.len());
        Ok(tokens)
    }
}

fn public_config(consumer_key: &str, consumer_secret: &str) -> OAuth1Config {
    OAuth1Config::new(consumer_key, consumer_secret).application(Application::Public)
}

/// Parses an `application/x-www-form-urlencoded` token response.
///
/// Pairs are split on the first `=`, so values may contain `=`. A pair
/// without `=` maps to an empty value. Keys and values are percent-decoded.
#[must_use]
pub fn parse_request_parameters(body: &str) -> BTreeMap<String, String> {
    url::form_urlencoded::parse(body.as_bytes())
        .into_owned()
        .collect()
}
