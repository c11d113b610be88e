//! The per-request driver.
//!
//! ```text
//! Request
//!   ↓ RequestContext::from_http   (public URL)
//!   ↓ fetch_session               (session service, cookie forwarded)
//!   ↓ evaluate                    (policy callback, loop guard)
//!   ↓ compose                     (override | handler | pass-through | sign-in redirect)
//!   ↓ propagate                   (session service set-cookie → final response)
//! Response
//! ```
//!
//! Hosts reach the pipeline in one of four shapes, modelled by
//! [`CallContext`] and answered by [`CallResult`]. Each shape also has a typed
//! method on [`Auth`].

use std::fmt;
use std::sync::Arc;

use http::{HeaderMap, Request, Response};

use crate::config::AuthConfig;
use crate::cookie::propagate;
use crate::error::Error;
use crate::handler::AuthHandler;
use crate::policy::evaluate;
use crate::request::RequestContext;
use crate::response::{compose, Body};
use crate::session::{fetch_session, resolve_session, ResolvedSession, Session, SessionService};

/// How the host invoked the pipeline.
pub enum CallContext<'a> {
    /// Outside of request handling: just resolve the session for these headers
    NoArgs {
        /// Headers of the request being served (for the cookie and host)
        headers: HeaderMap,
    },
    /// Middleware: decide a request
    RequestOnly(Request<Body>),
    /// Wrap a handler so it runs behind the pipeline
    HandlerWrapper(Arc<dyn AuthHandler>),
    /// Legacy request/response pair: resolve the session and copy its cookies
    /// onto `response`
    LegacyReqRes {
        /// Headers of the incoming request
        headers: HeaderMap,
        /// The response the host will send
        response: &'a mut Response<Body>,
    },
}

impl fmt::Debug for CallContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shape = match self {
            CallContext::NoArgs { .. } => "NoArgs",
            CallContext::RequestOnly(_) => "RequestOnly",
            CallContext::HandlerWrapper(_) => "HandlerWrapper",
            CallContext::LegacyReqRes { .. } => "LegacyReqRes",
        };
        f.write_str(shape)
    }
}

/// What the pipeline produced for a [`CallContext`].
#[derive(Debug)]
pub enum CallResult {
    /// The resolved session (`NoArgs`, `LegacyReqRes`)
    Session(Option<Session>),
    /// The final response (`RequestOnly`)
    Response(Response<Body>),
    /// A handler wrapped by the pipeline (`HandlerWrapper`)
    Wrapped(AuthMiddleware),
}

impl CallResult {
    /// The session, if this result carries one.
    pub fn into_session(self) -> Option<Option<Session>> {
        match self {
            CallResult::Session(session) => Some(session),
            _ => None,
        }
    }

    /// The response, if this result carries one.
    pub fn into_response(self) -> Option<Response<Body>> {
        match self {
            CallResult::Response(response) => Some(response),
            _ => None,
        }
    }

    /// The wrapped handler, if this result carries one.
    pub fn into_wrapped(self) -> Option<AuthMiddleware> {
        match self {
            CallResult::Wrapped(middleware) => Some(middleware),
            _ => None,
        }
    }
}

/// Entry point of the authorization pipeline.
///
/// Cheap to clone; clones share the configuration and session service.
///
/// # Examples
///
/// ```no_run
/// use auth_gate::{Auth, AuthConfig, Body, HttpSessionService};
/// use http::Request;
///
/// # async fn run() -> Result<(), auth_gate::Error> {
/// let auth = Auth::new(AuthConfig::from_env()?, HttpSessionService::build()?);
///
/// let request = Request::builder()
///     .uri("/dashboard")
///     .header("cookie", "authjs.session-token=abc")
///     .body(Body::new())?;
///
/// let response = auth.middleware(request).await?;
/// # let _ = response;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Auth {
    config: Arc<AuthConfig>,
    service: Arc<dyn SessionService>,
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Auth {
    /// Creates a pipeline from a configuration and a session service.
    pub fn new(config: AuthConfig, service: impl SessionService + 'static) -> Self {
        Self::from_parts(Arc::new(config), Arc::new(service))
    }

    /// Creates a pipeline from already shared parts.
    pub fn from_parts(config: Arc<AuthConfig>, service: Arc<dyn SessionService>) -> Self {
        Self { config, service }
    }

    /// The configuration in use.
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Dispatches a host call to the matching typed entry point.
    pub async fn call(&self, context: CallContext<'_>) -> Result<CallResult, Error> {
        match context {
            CallContext::NoArgs { headers } => self.session(&headers).await.map(CallResult::Session),
            CallContext::RequestOnly(request) => {
                self.middleware(request).await.map(CallResult::Response)
            }
            CallContext::HandlerWrapper(handler) => Ok(CallResult::Wrapped(AuthMiddleware {
                auth: self.clone(),
                handler,
            })),
            CallContext::LegacyReqRes { headers, response } => {
                self.legacy(&headers, response).await.map(CallResult::Session)
            }
        }
    }

    /// Resolves the session for a request carrying `headers`.
    pub async fn session(&self, headers: &HeaderMap) -> Result<Option<Session>, Error> {
        let resolved = resolve_session(headers, &self.config, self.service.as_ref()).await?;
        Ok(resolved.session)
    }

    /// Runs the full pipeline for a request with no handler behind it.
    pub async fn middleware(&self, request: Request<Body>) -> Result<Response<Body>, Error> {
        self.run(request, None).await
    }

    /// Wraps `handler` so it only runs for allowed requests.
    pub fn wrap(&self, handler: impl AuthHandler + 'static) -> AuthMiddleware {
        AuthMiddleware {
            auth: self.clone(),
            handler: Arc::new(handler),
        }
    }

    /// Resolves the session and copies the session service's cookies onto a
    /// response the host already owns.
    pub async fn legacy(
        &self,
        headers: &HeaderMap,
        response: &mut Response<Body>,
    ) -> Result<Option<Session>, Error> {
        let resolved = resolve_session(headers, &self.config, self.service.as_ref()).await?;
        propagate(&resolved.response, response.headers_mut());
        Ok(resolved.session)
    }

    #[tracing::instrument(
        name = "auth",
        skip_all,
        fields(method = %request.method(), path = %request.uri().path())
    )]
    async fn run(
        &self,
        request: Request<Body>,
        handler: Option<&dyn AuthHandler>,
    ) -> Result<Response<Body>, Error> {
        let request = RequestContext::from_http(request, &self.config)?;

        let ResolvedSession {
            session,
            response: session_response,
        } = fetch_session(
            request.url(),
            request.headers(),
            &self.config,
            self.service.as_ref(),
        )
        .await?;

        let decision = evaluate(&request, session.as_ref(), &self.config).await?;
        let mut response = compose(decision, handler, request, session, &self.config).await?;

        let cookies = propagate(&session_response, response.headers_mut());
        tracing::debug!(status = %response.status(), cookies, "request finished");

        Ok(response)
    }
}

/// A handler running behind the pipeline.
#[derive(Clone)]
pub struct AuthMiddleware {
    auth: Auth,
    handler: Arc<dyn AuthHandler>,
}

impl fmt::Debug for AuthMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthMiddleware")
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

impl AuthMiddleware {
    /// Runs the pipeline for `request`, invoking the handler if allowed.
    pub async fn call(&self, request: Request<Body>) -> Result<Response<Body>, Error> {
        self.auth.run(request, Some(self.handler.as_ref())).await
    }
}
