//! The inbound request as seen by the pipeline.

use std::fmt;
use std::ops::Deref;

use http::{Extensions, HeaderMap, Method, Request};
use url::Url;

use crate::config::AuthConfig;
use crate::error::Error;
use crate::origin::{detect_origin, request_url};
use crate::response::Body;
use crate::session::Session;

/// Inbound request owned by a single pipeline invocation.
///
/// Unlike [`http::Request`], the URL is absolute: its origin is the detected
/// public origin (see [`detect_origin`]), so the full URL can be echoed back
/// as a `callbackUrl`.
pub struct RequestContext {
    method: Method,
    url: Url,
    headers: HeaderMap,
    extensions: Extensions,
    body: Body,
}

impl RequestContext {
    /// Creates a context for an already absolute URL with no headers or body.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            extensions: Extensions::new(),
            body: Body::new(),
        }
    }

    /// Adapts a host request, resolving its public URL.
    ///
    /// # Errors
    ///
    /// Fails when the public origin cannot be determined.
    pub fn from_http(request: Request<Body>, config: &AuthConfig) -> Result<Self, Error> {
        let (parts, body) = request.into_parts();
        let origin = detect_origin(&parts.headers, config, parts.uri.scheme_str())?;
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");

        Ok(Self {
            method: parts.method,
            url: request_url(&origin, path_and_query),
            headers: parts.headers,
            extensions: parts.extensions,
            body,
        })
    }

    /// Converts back into a host request with an origin-form URI.
    pub fn into_http(self) -> Result<Request<Body>, Error> {
        let path_and_query = match self.url.query() {
            Some(query) => format!("{}?{}", self.url.path(), query),
            None => self.url.path().to_string(),
        };
        let mut request = Request::builder()
            .method(self.method)
            .uri(path_and_query)
            .body(self.body)?;
        *request.headers_mut() = self.headers;
        *request.extensions_mut() = self.extensions;
        Ok(request)
    }

    /// Request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Absolute request URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// URL path.
    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable request headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Host-supplied extras travelling with the request.
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Mutable extensions.
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Request body.
    pub fn body(&self) -> &Body {
        &self.body
    }
}

// Header values are left out: the cookie header carries session tokens.
impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("body_len", &self.body.len())
            .finish()
    }
}

/// A request handed to user handlers, carrying the resolved session.
#[derive(Debug)]
pub struct AuthRequest {
    /// The inbound request
    pub request: RequestContext,
    /// Session resolved for this request; `None` when signed out
    pub auth: Option<Session>,
}

impl AuthRequest {
    /// Attaches a session to a request.
    pub fn new(request: RequestContext, auth: Option<Session>) -> Self {
        Self { request, auth }
    }

    /// Resolved session, if any.
    pub fn auth(&self) -> Option<&Session> {
        self.auth.as_ref()
    }

    /// Splits back into the request and the session.
    pub fn into_parts(self) -> (RequestContext, Option<Session>) {
        (self.request, self.auth)
    }
}

impl Deref for AuthRequest {
    type Target = RequestContext;

    fn deref(&self) -> &Self::Target {
        &self.request
    }
}
