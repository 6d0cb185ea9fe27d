//! OAuth 1.0a request signing for the legacy Xero applications.
//!
//! Public and partner applications sign with `HMAC-SHA1` keyed by the
//! consumer and token secrets. Private applications sign with `RSA-SHA1`
//! using the key file registered with Xero; the file is only read when the
//! first request is signed.

use std::{fmt, path::PathBuf, sync::Arc};

use async_lock::OnceCell;
use base64::Engine;
use hmac::{Hmac, Mac};
use http_client::{http_types::Url, Request};
use rand::{distributions::Alphanumeric, Rng};
use rsa::{
    pkcs1::DecodeRsaPrivateKey,
    pkcs1v15::SigningKey,
    pkcs8::DecodePrivateKey,
    signature::{SignatureEncoding, Signer},
    RsaPrivateKey,
};
use sha1::Sha1;
use urlencoding::encode;

use super::handler::Middleware;
use crate::{XeroError, XeroResult};

const OAUTH_VERSION: &str = "1.0";
const NONCE_LENGTH: usize = 32;
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureMethod {
    HmacSha1,
    RsaSha1,
}

impl SignatureMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SignatureMethod::HmacSha1 => "HMAC-SHA1",
            SignatureMethod::RsaSha1 => "RSA-SHA1",
        }
    }
}

/// Signs requests with an `Authorization: OAuth ...` header.
#[derive(Clone)]
pub struct OAuth1Signer {
    consumer_key: String,
    consumer_secret: String,
    token: Option<String>,
    token_secret: Option<String>,
    callback: Option<String>,
    verifier: Option<String>,
    private_key: Option<PathBuf>,
    rsa_key: Arc<OnceCell<SigningKey<Sha1>>>,
}

impl OAuth1Signer {
    pub fn new(consumer_key: impl Into<String>, consumer_secret: impl Into<String>) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            token: None,
            token_secret: None,
            callback: None,
            verifier: None,
            private_key: None,
            rsa_key: Arc::default(),
        }
    }

    #[must_use]
    pub fn with_token(self, token: Option<String>, token_secret: Option<String>) -> Self {
        Self {
            token: token.filter(|token| !token.is_empty()),
            token_secret,
            ..self
        }
    }

    #[must_use]
    pub fn with_callback(self, callback: Option<String>) -> Self {
        Self { callback, ..self }
    }

    #[must_use]
    pub fn with_verifier(self, verifier: Option<String>) -> Self {
        Self { verifier, ..self }
    }

    /// Switches to `RSA-SHA1` with the PEM key at `path`.
    #[must_use]
    pub fn with_private_key(self, path: impl Into<PathBuf>) -> Self {
        Self {
            private_key: Some(path.into()),
            rsa_key: Arc::default(),
            ..self
        }
    }

    #[must_use]
    pub fn signature_method(&self) -> SignatureMethod {
        if self.private_key.is_some() {
            SignatureMethod::RsaSha1
        } else {
            SignatureMethod::HmacSha1
        }
    }

    #[must_use]
    pub fn consumer_key(&self) -> &str {
        &self.consumer_key
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Builds the `Authorization` header value for a request.
    ///
    /// `params` are the query and form-body parameters that take part in the
    /// signature.
    pub async fn authorization_header(
        &self,
        method: &str,
        url: &Url,
        params: Vec<(String, String)>,
    ) -> XeroResult<String> {
        let nonce: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(NONCE_LENGTH)
            .map(char::from)
            .collect();
        let timestamp = chrono::Utc::now().timestamp().to_string();
        self.authorization_header_at(method, url, params, &nonce, &timestamp)
            .await
    }

    async fn authorization_header_at(
        &self,
        method: &str,
        url: &Url,
        mut params: Vec<(String, String)>,
        nonce: &str,
        timestamp: &str,
    ) -> XeroResult<String> {
        let mut oauth = self.protocol_params(nonce, timestamp);
        params.extend(oauth.iter().cloned());

        let base = base_string(method, url, &params);
        let signature = self.sign(&base).await?;
        oauth.push(("oauth_signature".to_string(), signature));
        oauth.sort();

        let fields = oauth
            .iter()
            .map(|(key, value)| format!("{}=\"{}\"", encode(key), encode(value)))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(format!("OAuth {fields}"))
    }

    fn protocol_params(&self, nonce: &str, timestamp: &str) -> Vec<(String, String)> {
        let mut params = vec![
            ("oauth_consumer_key", Some(self.consumer_key.as_str())),
            ("oauth_nonce", Some(nonce)),
            ("oauth_signature_method", Some(self.signature_method().as_str())),
            ("oauth_timestamp", Some(timestamp)),
            ("oauth_version", Some(OAUTH_VERSION)),
            ("oauth_token", self.token.as_deref()),
            ("oauth_callback", self.callback.as_deref()),
            ("oauth_verifier", self.verifier.as_deref()),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|value| (key.to_string(), value.to_string())))
        .collect::<Vec<_>>();
        params.sort();
        params
    }

    async fn sign(&self, base: &str) -> XeroResult<String> {
        let raw = match self.signature_method() {
            SignatureMethod::HmacSha1 => {
                let key = format!(
                    "{}&{}",
                    encode(&self.consumer_secret),
                    encode(self.token_secret.as_deref().unwrap_or_default())
                );
                let mut mac = Hmac::<Sha1>::new_from_slice(key.as_bytes())
                    .map_err(|e| XeroError::Signing(e.to_string()))?;
                mac.update(base.as_bytes());
                mac.finalize().into_bytes().to_vec()
            }
            SignatureMethod::RsaSha1 => self
                .rsa_key()
                .await?
                .try_sign(base.as_bytes())
                .map_err(|e| XeroError::Signing(e.to_string()))?
                .to_bytes()
                .into_vec(),
        };
        Ok(base64::engine::general_purpose::STANDARD.encode(raw))
    }

    async fn rsa_key(&self) -> XeroResult<&SigningKey<Sha1>> {
        let Some(path) = &self.private_key else {
            return Err(XeroError::Signing("No private key configured".into()));
        };
        self.rsa_key
            .get_or_try_init(|| async {
                let pem = async_fs::read_to_string(path).await?;
                let key = RsaPrivateKey::from_pkcs1_pem(&pem)
                    .or_else(|_| RsaPrivateKey::from_pkcs8_pem(&pem))
                    .map_err(|e| XeroError::Signing(format!("Invalid private key: {e}")))?;
                log::debug!("Loaded RSA private key from {}", path.display());
                Ok::<_, XeroError>(SigningKey::<Sha1>::new(key))
            })
            .await
    }
}

impl fmt::Debug for OAuth1Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth1Signer")
            .field("consumer_key", &self.consumer_key)
            .field("token", &self.token)
            .field("callback", &self.callback)
            .field("signature_method", &self.signature_method())
            .field("private_key", &self.private_key)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl Middleware for OAuth1Signer {
    async fn handle(&self, request: &mut Request) -> XeroResult<()> {
        let mut params: Vec<(String, String)> = request.url().query_pairs().into_owned().collect();

        let is_form = request
            .content_type()
            .is_some_and(|mime| mime.essence() == FORM_CONTENT_TYPE);
        if is_form {
            let body = request.take_body().into_string().await?;
            params.extend(url::form_urlencoded::parse(body.as_bytes()).into_owned());
            request.set_body(body);
        }

        let method = request.method().to_string();
        let header = self
            .authorization_header(&method, request.url(), params)
            .await?;
        request.insert_header("Authorization", header);
        Ok(())
    }
}

/// The signature base string: method, normalized URL and sorted parameters.
fn base_string(method: &str, url: &Url, params: &[(String, String)]) -> String {
    let mut encoded = params
        .iter()
        .map(|(key, value)| (encode(key).into_owned(), encode(value).into_owned()))
        .collect::<Vec<_>>();
    encoded.sort();
    let normalized = encoded
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        encode(&normalized_url(url)),
        encode(&normalized)
    )
}

fn normalized_url(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    let port = url.port().map(|port| format!(":{port}")).unwrap_or_default();
    format!("{}://{host}{port}{}", url.scheme(), url.path())
}
