//! Authorization decisions.
//!
//! A request is decided once, right after its session is resolved. Without a
//! policy callback the rule is simply "signed in means allowed". With one, the
//! callback's answer is authoritative; the only post-processing is the
//! redirect loop guard applied to override responses.

use async_trait::async_trait;
use http::Response;

use crate::config::AuthConfig;
use crate::error::{BoxError, Error};
use crate::guard::resolve_override;
use crate::request::RequestContext;
use crate::response::Body;
use crate::session::Session;

/// Outcome of authorizing one request.
#[derive(Debug)]
pub enum AuthDecision {
    /// The request may proceed
    Allow,
    /// The request is not authorized; the caller gets the sign-in redirect
    Deny,
    /// The policy answered with its own response
    Override(Response<Body>),
}

impl AuthDecision {
    /// Returns true for [`AuthDecision::Allow`].
    pub fn is_allow(&self) -> bool {
        matches!(self, AuthDecision::Allow)
    }

    /// Returns true for [`AuthDecision::Deny`].
    pub fn is_deny(&self) -> bool {
        matches!(self, AuthDecision::Deny)
    }

    /// Short label for log fields.
    pub fn label(&self) -> &'static str {
        match self {
            AuthDecision::Allow => "allow",
            AuthDecision::Deny => "deny",
            AuthDecision::Override(_) => "override",
        }
    }
}

impl From<bool> for AuthDecision {
    fn from(allowed: bool) -> Self {
        if allowed {
            AuthDecision::Allow
        } else {
            AuthDecision::Deny
        }
    }
}

impl From<Option<bool>> for AuthDecision {
    /// `None` (the policy had nothing to say) denies.
    fn from(allowed: Option<bool>) -> Self {
        allowed.unwrap_or(false).into()
    }
}

impl From<Response<Body>> for AuthDecision {
    fn from(response: Response<Body>) -> Self {
        AuthDecision::Override(response)
    }
}

/// Policy deciding whether a request may proceed.
///
/// Implemented for plain closures, so simple policies need no boilerplate:
///
/// ```
/// use auth_gate::{AuthConfig, AuthDecision, BoxError, RequestContext, Session};
///
/// let config = AuthConfig::new().with_authorized(
///     |req: &RequestContext, session: Option<&Session>| -> Result<AuthDecision, BoxError> {
///         Ok((req.path().starts_with("/public") || session.is_some()).into())
///     },
/// );
/// assert!(config.callbacks().authorized.is_some());
/// ```
#[async_trait]
pub trait AuthorizedCallback: Send + Sync {
    /// Decides the request. Errors propagate to the host untouched.
    async fn authorized(
        &self,
        request: &RequestContext,
        session: Option<&Session>,
    ) -> Result<AuthDecision, BoxError>;
}

#[async_trait]
impl<F> AuthorizedCallback for F
where
    F: Fn(&RequestContext, Option<&Session>) -> Result<AuthDecision, BoxError> + Send + Sync,
{
    async fn authorized(
        &self,
        request: &RequestContext,
        session: Option<&Session>,
    ) -> Result<AuthDecision, BoxError> {
        self(request, session)
    }
}

/// Decides a request against the configured policy.
///
/// # Errors
///
/// Returns [`Error::Callback`] if the policy callback fails.
pub async fn evaluate(
    request: &RequestContext,
    session: Option<&Session>,
    config: &AuthConfig,
) -> Result<AuthDecision, Error> {
    let decision = match &config.callbacks().authorized {
        Some(callback) => callback
            .authorized(request, session)
            .await
            .map_err(Error::Callback)?,
        None => session.is_some().into(),
    };

    let decision = match decision {
        AuthDecision::Override(response) => resolve_override(request.url(), response, config),
        other => other,
    };

    tracing::debug!(
        path = %request.path(),
        authenticated = session.is_some(),
        decision = decision.label(),
        "authorization decided"
    );

    Ok(decision)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::LOCATION;
    use http::{Method, StatusCode};
    use url::Url;

    fn request(path: &str) -> RequestContext {
        let url = Url::parse("https://app.example.com").unwrap().join(path).unwrap();
        RequestContext::new(Method::GET, url)
    }

    fn session() -> Session {
        Session::from_value(serde_json::json!({ "user": { "id": "u1" } })).unwrap()
    }

    #[tokio::test]
    async fn no_policy_allows_signed_in() {
        let decision = evaluate(&request("/"), Some(&session()), &AuthConfig::new())
            .await
            .unwrap();
        assert!(decision.is_allow());
    }

    #[tokio::test]
    async fn no_policy_denies_signed_out() {
        let decision = evaluate(&request("/"), None, &AuthConfig::new())
            .await
            .unwrap();
        assert!(decision.is_deny());
    }

    #[tokio::test]
    async fn policy_is_authoritative() {
        let config = AuthConfig::new().with_authorized(
            |_: &RequestContext, _: Option<&Session>| -> Result<AuthDecision, BoxError> {
                Ok(true.into())
            },
        );
        let decision = evaluate(&request("/"), None, &config).await.unwrap();
        assert!(decision.is_allow());
    }

    #[tokio::test]
    async fn policy_sees_the_session() {
        let config = AuthConfig::new().with_authorized(
            |_: &RequestContext, s: Option<&Session>| -> Result<AuthDecision, BoxError> {
                Ok(s.and_then(|s| s.user()).is_some().into())
            },
        );
        assert!(evaluate(&request("/"), Some(&session()), &config)
            .await
            .unwrap()
            .is_allow());
        assert!(evaluate(&request("/"), None, &config).await.unwrap().is_deny());
    }

    #[tokio::test]
    async fn policy_errors_propagate() {
        let config = AuthConfig::new().with_authorized(
            |_: &RequestContext, _: Option<&Session>| -> Result<AuthDecision, BoxError> {
                Err("database down".into())
            },
        );
        let err = evaluate(&request("/"), None, &config).await.unwrap_err();
        assert!(matches!(err, Error::Callback(_)));
    }

    #[tokio::test]
    async fn override_without_location_is_kept() {
        let config = AuthConfig::new().with_authorized(
            |_: &RequestContext, _: Option<&Session>| -> Result<AuthDecision, BoxError> {
                let response = Response::builder()
                    .status(StatusCode::UNAUTHORIZED)
                    .body(Body::from_static(b"{\"error\":\"nope\"}"))?;
                Ok(response.into())
            },
        );
        match evaluate(&request("/api/data"), None, &config).await.unwrap() {
            AuthDecision::Override(r) => assert_eq!(r.status(), StatusCode::UNAUTHORIZED),
            other => panic!("expected override, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn self_redirect_to_sign_in_becomes_allow() {
        let config = AuthConfig::new().with_authorized(
            |_: &RequestContext, _: Option<&Session>| -> Result<AuthDecision, BoxError> {
                let response = Response::builder()
                    .status(StatusCode::TEMPORARY_REDIRECT)
                    .header(LOCATION, "https://app.example.com/api/auth/signin")
                    .body(Body::new())?;
                Ok(response.into())
            },
        );
        let decision = evaluate(&request("/api/auth/signin"), None, &config)
            .await
            .unwrap();
        assert!(decision.is_allow());
    }

    #[test]
    fn conversions() {
        assert!(AuthDecision::from(true).is_allow());
        assert!(AuthDecision::from(false).is_deny());
        assert!(AuthDecision::from(None::<bool>).is_deny());
        assert_eq!(
            AuthDecision::from(Response::new(Body::new())).label(),
            "override"
        );
    }
}
