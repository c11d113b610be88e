//! The session service boundary.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::Response;

use crate::error::Error;
use crate::response::Body;

/// The component that turns request credentials into a session.
///
/// It receives a synthetic `GET {origin}{base_path}/session` carrying only the
/// browser's `cookie` header and answers with a JSON session (or `null`),
/// possibly with `set-cookie` headers refreshing the session cookie.
///
/// Implementations report transport problems as [`Error::Transport`]. Status
/// handling is left to the caller.
#[async_trait]
pub trait SessionService: Send + Sync {
    /// Performs the session lookup.
    async fn fetch(&self, request: http::Request<Body>) -> Result<Response<Body>, Error>;
}

#[async_trait]
impl<S> SessionService for Arc<S>
where
    S: SessionService + ?Sized,
{
    async fn fetch(&self, request: http::Request<Body>) -> Result<Response<Body>, Error> {
        (**self).fetch(request).await
    }
}

/// A [`SessionService`] reached over HTTP with `reqwest`.
///
/// Clients built here do not follow redirects. No timeout is imposed beyond
/// what the client is configured with.
#[derive(Debug, Clone)]
pub struct HttpSessionService {
    client: reqwest::Client,
}

impl HttpSessionService {
    /// Uses an existing client.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Builds a client that does not follow redirects.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the TLS backend cannot be initialised.
    pub fn build() -> Result<Self, Error> {
        let client = client_builder().build().map_err(transport)?;
        Ok(Self::new(client))
    }

    /// Like [`build`](Self::build), giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the TLS backend cannot be initialised.
    pub fn with_timeout(timeout: Duration) -> Result<Self, Error> {
        let client = client_builder()
            .timeout(timeout)
            .build()
            .map_err(transport)?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl SessionService for HttpSessionService {
    async fn fetch(&self, request: http::Request<Body>) -> Result<Response<Body>, Error> {
        let request = reqwest::Request::try_from(request).map_err(transport)?;
        let response = self.client.execute(request).await.map_err(transport)?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(transport)?;

        let mut out = Response::new(body);
        *out.status_mut() = status;
        *out.headers_mut() = headers;
        Ok(out)
    }
}

fn client_builder() -> reqwest::ClientBuilder {
    reqwest::Client::builder().redirect(reqwest::redirect::Policy::none())
}

fn transport(err: reqwest::Error) -> Error {
    Error::Transport(Box::new(err))
}
