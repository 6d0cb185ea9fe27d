//! OAuth2 glue for the Xero API.
//!
//! Provides the provider-specific pieces a generic OAuth2 flow needs to talk to
//! Xero: the fixed authorization and token endpoints, the token-endpoint error
//! vocabulary, and the catalog of permission scopes per API.
#![warn(clippy::pedantic)]

mod error;
mod provider;
pub mod scopes;
mod token;

pub use error::AuthError;
pub use oauth2::{AccessToken, CsrfToken, RefreshToken};
pub use provider::{Grant, XeroProvider, AUTHORIZATION_URL, SCOPE_SEPARATOR, TOKEN_URL};
pub use scopes::{is_valid_scope, valid_scopes};
pub use token::{XeroToken, XeroTokenResponse};

#[cfg(test)]
pub(crate) mod mock;
