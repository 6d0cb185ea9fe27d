use std::{fmt, sync::Arc};

use http_client::{HttpClient, Request, Response};

use super::oauth1::OAuth1Signer;
use crate::{config::TENANT_HEADER, XeroResult};

/// A step run on every outgoing request before it reaches the transport.
#[async_trait::async_trait]
pub trait Middleware: fmt::Debug + Send + Sync + 'static {
    async fn handle(&self, request: &mut Request) -> XeroResult<()>;
}

/// The transport plus the caller's middleware, in the order they were pushed.
///
/// Authentication is not part of the stack: the client applies its
/// [`AuthMiddleware`] after every middleware here, right before the
/// transport sends, so signatures cover the final request.
#[derive(Debug, Clone)]
pub struct HandlerStack {
    transport: Arc<dyn HttpClient>,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl HandlerStack {
    pub fn new(transport: impl HttpClient) -> Self {
        Self::from_shared(Arc::new(transport))
    }

    #[must_use]
    pub fn from_shared(transport: Arc<dyn HttpClient>) -> Self {
        Self {
            transport,
            middleware: Vec::new(),
        }
    }

    /// A stack over an HTTP/1.1 client with TLS.
    #[cfg(feature = "h1-client")]
    #[must_use]
    pub fn default_transport() -> Self {
        Self::new(http_client::h1::H1Client::new())
    }

    pub fn push(&mut self, middleware: impl Middleware) {
        self.middleware.push(Arc::new(middleware));
    }

    #[must_use]
    pub fn with(mut self, middleware: impl Middleware) -> Self {
        self.push(middleware);
        self
    }

    #[must_use]
    pub fn transport(&self) -> Arc<dyn HttpClient> {
        Arc::clone(&self.transport)
    }

    pub(crate) async fn send(&self, auth: &AuthMiddleware, mut request: Request) -> XeroResult<Response> {
        for middleware in &self.middleware {
            middleware.handle(&mut request).await?;
        }
        auth.handle(&mut request).await?;
        Ok(self.transport.send(request).await?)
    }
}

/// Injects the bearer token and, when known, the tenant header.
#[derive(Clone)]
pub struct BearerAuth {
    token: String,
    tenant: Option<String>,
}

impl BearerAuth {
    pub fn new(token: impl Into<String>, tenant: Option<String>) -> Self {
        Self {
            token: token.into(),
            tenant,
        }
    }

    #[must_use]
    pub fn tenant(&self) -> Option<&str> {
        self.tenant.as_deref()
    }
}

impl fmt::Debug for BearerAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerAuth")
            .field("token", &"[redacted]")
            .field("tenant", &self.tenant)
            .finish()
    }
}

#[async_trait::async_trait]
impl Middleware for BearerAuth {
    async fn handle(&self, request: &mut Request) -> XeroResult<()> {
        request.insert_header("Authorization", format!("Bearer {}", self.token));
        if let Some(tenant) = &self.tenant {
            request.insert_header(TENANT_HEADER, tenant.as_str());
        }
        Ok(())
    }
}

/// The authentication selected for a client by its credentials.
#[derive(Debug, Clone)]
pub enum AuthMiddleware {
    OAuth1(OAuth1Signer),
    Bearer(BearerAuth),
}

#[async_trait::async_trait]
impl Middleware for AuthMiddleware {
    async fn handle(&self, request: &mut Request) -> XeroResult<()> {
        match self {
            AuthMiddleware::OAuth1(signer) => signer.handle(request).await,
            AuthMiddleware::Bearer(bearer) => bearer.handle(request).await,
        }
    }
}
