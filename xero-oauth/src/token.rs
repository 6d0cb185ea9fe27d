use std::time::Duration;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use oauth2::{basic::BasicTokenType, helpers, AccessToken, RefreshToken, Scope, TokenResponse};
use serde::{Deserialize, Serialize};

use crate::{AuthError, SCOPE_SEPARATOR};

// Values above this are absolute timestamps rather than lifetimes (2012-10-01)
const OAUTH2_INCEPTION: i64 = 1_349_067_600;

/// Token material returned by the Xero token endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XeroToken {
    access_token: AccessToken,
    refresh_token: Option<RefreshToken>,
    expires: Option<DateTime<Utc>>,
    token_type: String,
    id_token: Option<String>,
    scope: Option<String>,
}

/// Body of a successful token-endpoint response.
///
/// Xero may send an absolute `expires` stamp next to, or instead of,
/// `expires_in`, and an `id_token` for `openid` grants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XeroTokenResponse {
    access_token: AccessToken,
    #[serde(default = "bearer")]
    #[serde(deserialize_with = "helpers::deserialize_untagged_enum_case_insensitive")]
    token_type: BasicTokenType,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<RefreshToken>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_in: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id_token: Option<String>,
    #[serde(rename = "scope")]
    #[serde(deserialize_with = "helpers::deserialize_space_delimited_vec")]
    #[serde(serialize_with = "helpers::serialize_space_delimited_vec")]
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    scopes: Option<Vec<Scope>>,
}

fn bearer() -> BasicTokenType {
    BasicTokenType::Bearer
}

impl XeroTokenResponse {
    #[must_use]
    pub fn id_token(&self) -> Option<&str> {
        self.id_token.as_deref()
    }
}

impl TokenResponse<BasicTokenType> for XeroTokenResponse {
    fn access_token(&self) -> &AccessToken {
        &self.access_token
    }

    fn token_type(&self) -> &BasicTokenType {
        &self.token_type
    }

    fn expires_in(&self) -> Option<Duration> {
        self.expires_in
            .and_then(|seconds| u64::try_from(seconds).ok())
            .map(Duration::from_secs)
    }

    fn refresh_token(&self) -> Option<&RefreshToken> {
        self.refresh_token.as_ref()
    }

    fn scopes(&self) -> Option<&Vec<Scope>> {
        self.scopes.as_ref()
    }
}

impl From<XeroTokenResponse> for XeroToken {
    fn from(response: XeroTokenResponse) -> Self {
        Self::from_response(response, Utc::now())
    }
}

impl XeroToken {
    /// Decodes a raw token-endpoint body, e.g. one stored by the caller.
    ///
    /// # Errors
    ///
    /// [`AuthError::Json`] when the body has no `access_token`.
    pub fn from_json(body: &str) -> Result<Self, AuthError> {
        let response: XeroTokenResponse = serde_json::from_str(body)?;
        Ok(response.into())
    }

    fn from_response(response: XeroTokenResponse, now: DateTime<Utc>) -> Self {
        let token_type = match response.token_type {
            BasicTokenType::Bearer => "Bearer".to_string(),
            BasicTokenType::Mac => "MAC".to_string(),
            BasicTokenType::Extension(other) => other,
        };
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires: resolve_expiry(response.expires_in, response.expires, now),
            token_type,
            id_token: response.id_token,
            scope: response.scopes.map(|scopes| {
                scopes
                    .iter()
                    .map(|scope| scope.as_str())
                    .collect::<Vec<_>>()
                    .join(SCOPE_SEPARATOR)
            }),
        }
    }

    #[must_use]
    pub fn access_token(&self) -> &AccessToken {
        &self.access_token
    }

    /// The raw bearer token.
    #[must_use]
    pub fn secret(&self) -> &str {
        self.access_token.secret()
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<&RefreshToken> {
        self.refresh_token.as_ref()
    }

    #[must_use]
    pub fn expires(&self) -> Option<DateTime<Utc>> {
        self.expires
    }

    /// `Bearer` unless the endpoint named another type.
    #[must_use]
    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    #[must_use]
    pub fn id_token(&self) -> Option<&str> {
        self.id_token.as_deref()
    }

    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// A token without an expiry never expires.
    #[must_use]
    pub fn has_expired(&self) -> bool {
        self.expires.is_some_and(|expires| expires <= Utc::now())
    }
}

fn resolve_expiry(
    expires_in: Option<i64>,
    expires: Option<i64>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let relative = |seconds: i64| now.checked_add_signed(TimeDelta::try_seconds(seconds)?);
    match (expires_in, expires) {
        (Some(seconds), _) => relative(seconds),
        (None, Some(stamp)) if stamp > OAUTH2_INCEPTION => Utc.timestamp_opt(stamp, 0).single(),
        (None, Some(seconds)) => relative(seconds),
        (None, None) => None,
    }
}
