//! Redirect loop guard.
//!
//! A policy that redirects signed-out users to the sign-in page also runs on
//! the request *for* the sign-in page. Honoring that redirect would bounce the
//! browser forever, so a redirect that points back at the auth route being
//! requested is turned into [`AuthDecision::Allow`].
//!
//! Only the single-hop case is recognised. Two pages redirecting to each other
//! are not detected.

use http::header::LOCATION;
use http::Response;
use url::Url;

use crate::action::AuthAction;
use crate::config::AuthConfig;
use crate::policy::AuthDecision;
use crate::response::Body;

/// Applies the loop guard to an override response returned by a policy.
///
/// Returns `Allow` when the override redirects to the current auth route,
/// otherwise `Override(response)` unchanged. A `Location` that cannot be
/// parsed is honored as given.
pub fn resolve_override(
    current: &Url,
    response: Response<Body>,
    config: &AuthConfig,
) -> AuthDecision {
    let Some(location) = response.headers().get(LOCATION) else {
        return AuthDecision::Override(response);
    };

    let target = match location.to_str().map(|l| current.join(l)) {
        Ok(Ok(target)) => target,
        Ok(Err(err)) => {
            tracing::warn!(error = %err, "override location is not a valid url; honoring it");
            return AuthDecision::Override(response);
        }
        Err(_) => {
            tracing::warn!("override location is not valid text; honoring it");
            return AuthDecision::Override(response);
        }
    };

    if is_same_auth_action(current.path(), target.path(), config) {
        tracing::debug!(
            path = %current.path(),
            "policy redirected to the current auth route; letting the request through"
        );
        AuthDecision::Allow
    } else {
        AuthDecision::Override(response)
    }
}

/// True when `redirect_path` equals `request_path` and names an auth route:
/// either its last segment is a known action or it is a configured page.
pub fn is_same_auth_action(request_path: &str, redirect_path: &str, config: &AuthConfig) -> bool {
    if redirect_path != request_path {
        return false;
    }
    let last_segment = redirect_path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();

    AuthAction::is_action(last_segment) || config.pages().contains(redirect_path)
}
