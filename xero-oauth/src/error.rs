use http_client::http_types;
use thiserror::Error;

/// Errors raised while negotiating tokens with the Xero identity service.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The provider has no endpoint for the requested operation.
    #[error("{0}")]
    UnsupportedOperation(String),
    /// The identity service answered with HTTP 429.
    #[error("Rate limit exceeded")]
    RateLimited { body: String },
    /// The identity service answered with any other status >= 400.
    #[error("{message}")]
    RemoteRejected {
        status: u16,
        message: String,
        body: String,
    },
    #[error("{0}")]
    InvalidArgument(String),
    /// A 2xx answer that is not a usable token response.
    #[error("Unexpected token response: {0}")]
    UnexpectedResponse(String),
    #[error("Transport error: {0}")]
    Transport(http_types::Error),
    #[error(transparent)]
    Url(#[from] url::ParseError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

// http_types::Error does not implement std::error::Error, so no #[from]
impl From<http_types::Error> for AuthError {
    fn from(value: http_types::Error) -> Self {
        Self::Transport(value)
    }
}
