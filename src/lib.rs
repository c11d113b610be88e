//! Request-time authorization for HTTP middleware.
//!
//! For every incoming request this crate answers one question: may it
//! continue, and if not, what should be sent instead?
//!
//! - **Session resolution**: the session service is asked for the caller's
//!   session, forwarding only the browser's cookie
//! - **Policy evaluation**: an optional `authorized` callback allows, denies,
//!   or answers with its own response
//! - **Loop guard**: an override redirecting to the auth action being served
//!   is treated as an allow
//! - **Response composition**: pass-through, handler output, override, or a
//!   `307` to the sign-in page carrying `callbackUrl`
//! - **Cookie propagation**: cookies set by the session service always reach
//!   the final response
//!
//! # Core Types
//!
//! - [`Auth`]: the pipeline, with one entry point per host call shape
//! - [`AuthConfig`]: base path, public URL, pages and callbacks
//! - [`AuthDecision`]: outcome of policy evaluation
//! - [`Session`]: the resolved session, an opaque JSON object
//! - [`SessionService`]: where sessions come from ([`HttpSessionService`] over HTTP)
//! - [`Secret<T>`]: wrapper that redacts sensitive values in logs
//!
//! # Examples
//!
//! ```
//! use auth_gate::{AuthConfig, AuthDecision, BoxError, RequestContext, Session};
//!
//! let config = AuthConfig::new()
//!     .with_trust_host(true)
//!     .with_sign_in_page("/login")
//!     .with_authorized(
//!         |req: &RequestContext, session: Option<&Session>| -> Result<AuthDecision, BoxError> {
//!             if req.path().starts_with("/admin") {
//!                 let admin = session
//!                     .and_then(|s| s.user())
//!                     .is_some_and(|u| u["role"] == "admin");
//!                 return Ok(admin.into());
//!             }
//!             Ok(AuthDecision::Allow)
//!         },
//!     );
//!
//! assert_eq!(config.sign_in_page(), "/login");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod action;
mod config;
mod cookie;
mod error;
mod guard;
mod handler;
mod origin;
mod pipeline;
mod policy;
mod request;
mod response;
mod secret;
mod session;

pub use action::{AuthAction, UnknownAction};
pub use config::{AuthConfig, Callbacks, Pages, DEFAULT_BASE_PATH};
pub use cookie::{propagate, CombinedSetCookie, SetCookieSource, SetCookies};
pub use error::{BoxError, Error};
pub use guard::{is_same_auth_action, resolve_override};
pub use handler::AuthHandler;
pub use origin::{action_url, detect_origin, request_url};
pub use pipeline::{Auth, AuthMiddleware, CallContext, CallResult};
pub use policy::{evaluate, AuthDecision, AuthorizedCallback};
pub use request::{AuthRequest, RequestContext};
pub use response::{
    compose, is_pass_through, pass_through, redirect, sign_in_url, Body, CALLBACK_URL_PARAM,
    PASS_THROUGH_HEADER,
};
pub use secret::Secret;
pub use session::{
    fetch_session, parse_session, resolve_session, HttpSessionService, ResolvedSession, Session,
    SessionCallback, SessionService,
};
