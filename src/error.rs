use http_client::http_types;
use thiserror::Error;
use xero_oauth::AuthError;

pub type XeroResult<T> = Result<T, XeroError>;

#[derive(Debug, Error)]
pub enum XeroError {
    /// The client configuration was rejected before any request was sent.
    #[error("{0}")]
    InvalidConfiguration(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("Transport error: {0}")]
    Transport(http_types::Error),
    #[error("Unsuccessful response ({status}): {body}")]
    UnsuccessfulResponse { status: u16, body: String },
    #[error("Could not sign request: {0}")]
    Signing(String),
    #[error(transparent)]
    Url(#[from] url::ParseError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

impl From<http_types::Error> for XeroError {
    fn from(value: http_types::Error) -> Self {
        Self::Transport(value)
    }
}

impl XeroError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }
}
