//! Session resolution.
//!
//! The pipeline never decodes session tokens itself. It asks the session
//! service, forwarding only the browser's `cookie` header, and keeps the raw
//! response around so cookies the service set can reach the browser.

mod service;

pub use service::{HttpSessionService, SessionService};

use async_trait::async_trait;
use http::header::COOKIE;
use http::{HeaderMap, HeaderValue, Method, Request, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::action::AuthAction;
use crate::config::AuthConfig;
use crate::error::{BoxError, Error};
use crate::origin::{action_url, detect_origin};
use crate::response::Body;
use crate::secret::Secret;

/// A resolved session: user/account fields plus token metadata.
///
/// This is an opaque JSON object as returned by the session service (and
/// optionally reshaped by a [`SessionCallback`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Session(Map<String, Value>);

impl Session {
    /// Wraps a JSON object. Returns `None` for any other JSON value.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Wraps a JSON map.
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// The `user` field, if present and not null.
    pub fn user(&self) -> Option<&Value> {
        self.0.get("user").filter(|u| !u.is_null())
    }

    /// The `expires` field as text.
    pub fn expires(&self) -> Option<&str> {
        self.0.get("expires").and_then(Value::as_str)
    }

    /// Any top-level field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The underlying map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the session, returning the map.
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Consumes the session, returning a JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// Reshapes the session returned by the session service.
///
/// The callback receives the raw session. Whatever it returns is layered over
/// the default shape (`{ user, ...session }`, where `user` falls back to the
/// raw `token`), so fields it leaves out are kept rather than dropped.
/// Returning `None` keeps the default shape.
#[async_trait]
pub trait SessionCallback: Send + Sync {
    /// Produces the fields to layer over the default session shape.
    async fn session(&self, session: &Session) -> Result<Option<Session>, BoxError>;
}

#[async_trait]
impl<F> SessionCallback for F
where
    F: Fn(&Session) -> Result<Option<Session>, BoxError> + Send + Sync,
{
    async fn session(&self, session: &Session) -> Result<Option<Session>, BoxError> {
        self(session)
    }
}

/// A session lookup: the parsed session and the raw service response.
#[derive(Debug)]
pub struct ResolvedSession {
    /// The session, `None` when the caller is signed out
    pub session: Option<Session>,
    /// The session service's response, kept for its `set-cookie` headers
    pub response: Response<Body>,
}

/// Resolves the session for a request carrying `headers`.
///
/// The session service is addressed on the origin detected from `headers`
/// and `config`.
///
/// # Errors
///
/// Fails if the origin cannot be determined, the service is unreachable or
/// answers non-2xx, the body is not a session, or the session callback fails.
/// A failure is never turned into a signed-out session.
pub async fn resolve_session(
    headers: &HeaderMap,
    config: &AuthConfig,
    service: &dyn SessionService,
) -> Result<ResolvedSession, Error> {
    let origin = detect_origin(headers, config, None)?;
    fetch_session(&origin, headers, config, service).await
}

/// Resolves the session against the session service mounted on `origin`.
pub async fn fetch_session(
    origin: &Url,
    headers: &HeaderMap,
    config: &AuthConfig,
    service: &dyn SessionService,
) -> Result<ResolvedSession, Error> {
    let url = action_url(origin, config.base_path(), AuthAction::Session)?;
    let cookie = Secret::new(forwarded_cookie(headers)?);

    tracing::debug!(url = %url, cookie_len = cookie.len(), "fetching session");

    let request = Request::builder()
        .method(Method::GET)
        .uri(url.as_str())
        .header(COOKIE, cookie.into_inner())
        .body(Body::new())?;

    let response = match service.fetch(request).await {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(url = %url, error = %err, "session service call failed");
            return Err(err);
        }
    };

    if !response.status().is_success() {
        tracing::warn!(url = %url, status = %response.status(), "session service rejected lookup");
        return Err(Error::SessionStatus {
            status: response.status(),
        });
    }

    let session = match parse_session(response.body())? {
        Some(raw) => Some(shape_session(raw, config).await?),
        None => None,
    };

    tracing::debug!(authenticated = session.is_some(), "session resolved");

    Ok(ResolvedSession { session, response })
}

/// Folds every `cookie` field of `headers` into one value.
///
/// HTTP/2 clients may send each cookie as its own `cookie` field; they are
/// joined with `"; "` in order. No field gives an empty value.
fn forwarded_cookie(headers: &HeaderMap) -> Result<HeaderValue, Error> {
    let mut values = headers.get_all(COOKIE).iter();
    let Some(first) = values.next() else {
        return Ok(HeaderValue::from_static(""));
    };

    let mut joined = first.as_bytes().to_vec();
    for value in values {
        joined.extend_from_slice(b"; ");
        joined.extend_from_slice(value.as_bytes());
    }
    HeaderValue::from_bytes(&joined).map_err(|err| Error::Http(err.into()))
}

/// Parses a session endpoint body.
///
/// An empty body, `null` and `{}` all mean "no session".
pub fn parse_session(body: &[u8]) -> Result<Option<Session>, Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    match serde_json::from_slice::<Value>(body)? {
        Value::Null => Ok(None),
        Value::Object(map) if map.is_empty() => Ok(None),
        Value::Object(map) => Ok(Some(Session(map))),
        other => Err(Error::SessionPayload(<serde_json::Error as serde::de::Error>::custom(
            format!("expected a session object, got {}", json_kind(&other)),
        ))),
    }
}

async fn shape_session(raw: Session, config: &AuthConfig) -> Result<Session, Error> {
    let mut shaped = default_shape(&raw);
    if let Some(callback) = &config.callbacks().session {
        if let Some(custom) = callback.session(&raw).await.map_err(Error::Callback)? {
            shaped.extend(custom.into_map());
        }
    }
    Ok(Session(shaped))
}

fn default_shape(raw: &Session) -> Map<String, Value> {
    let mut shaped = raw.as_map().clone();
    if raw.user().is_none() {
        if let Some(token) = raw.get("token").filter(|t| !t.is_null()) {
            shaped.insert("user".to_string(), token.clone());
        }
    }
    shaped
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
