/*
 * A rust library for interacting with the Xero API.
 *
 * For more information, you can check out their documentation at:
 * https://developer.xero.com/documentation/
 *
 */
//! Authenticated clients for the Xero accounting APIs.
//!
//! - [`XeroClient`] issues requests under either the legacy OAuth 1.0a
//!   signing scheme or OAuth 2.0 bearer tokens, chosen by [`ClientConfig`].
//! - [`XeroClient::create_from_token`] exchanges refresh tokens or
//!   authorization codes and discovers the connected tenants.
//! - [`query`] builds the `where` and `order` filter parameters.
//! - [`oauth`] re-exports the identity provider and the scope catalog.
#![warn(clippy::pedantic)]

pub mod client;
pub mod config;
pub mod error;
pub mod query;

pub use client::{
    parse_request_parameters, HandlerStack, LegacyOptions, Middleware, TenantConnection,
    TokenClientOptions, XeroClient,
};
pub use config::{Application, ClientConfig, Credentials, OAuth1Config, OAuth2Config, Scheme};
pub use error::{XeroError, XeroResult};

pub mod oauth {
    pub use xero_oauth::*;
}
