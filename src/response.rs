//! Building the final response of a request.
//!
//! The composer turns an [`AuthDecision`] into exactly one response:
//!
//! ```text
//! Override(r)        -> r (handler never runs)
//! Allow + handler    -> handler output, or pass-through if it returned nothing
//! Allow              -> pass-through
//! Deny               -> 307 to the sign-in page with ?callbackUrl=<request url>
//!                       (pass-through if the request already is the sign-in page)
//! ```
//!
//! Session cookies are added afterwards by the driver, see [`propagate`](crate::propagate).

use http::header::LOCATION;
use http::{HeaderName, HeaderValue, Response, StatusCode};
use url::Url;

use crate::config::AuthConfig;
use crate::error::Error;
use crate::handler::AuthHandler;
use crate::policy::AuthDecision;
use crate::request::{AuthRequest, RequestContext};
use crate::session::Session;

/// Body type of every request and response handled by the pipeline.
pub type Body = bytes::Bytes;

/// Header marking a pass-through response.
pub const PASS_THROUGH_HEADER: HeaderName = HeaderName::from_static("x-middleware-next");

/// Query parameter carrying the URL to return to after signing in.
pub const CALLBACK_URL_PARAM: &str = "callbackUrl";

/// A response telling the host to continue with the request unchanged.
pub fn pass_through() -> Response<Body> {
    let mut response = Response::new(Body::new());
    response
        .headers_mut()
        .insert(PASS_THROUGH_HEADER, HeaderValue::from_static("1"));
    response
}

/// Returns true if `response` is a pass-through marker.
pub fn is_pass_through<B>(response: &Response<B>) -> bool {
    response
        .headers()
        .get(PASS_THROUGH_HEADER)
        .is_some_and(|v| v == "1")
}

/// A `307 Temporary Redirect` to `location`.
pub fn redirect(location: &Url) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::TEMPORARY_REDIRECT)
        .header(LOCATION, location.as_str())
        .body(Body::new())?)
}

/// URL of the sign-in page for `request`, or `None` if the request already
/// targets the sign-in page.
///
/// The request's query is kept and `callbackUrl` is set to the full request
/// URL, replacing any earlier value.
pub fn sign_in_url(request: &RequestContext, config: &AuthConfig) -> Option<Url> {
    let sign_in = config.sign_in_page();
    if request.path() == sign_in {
        return None;
    }

    let current = request.url();
    let kept: Vec<(String, String)> = current
        .query_pairs()
        .filter(|(key, _)| key != CALLBACK_URL_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut target = current.clone();
    target.set_path(&sign_in);
    target.set_fragment(None);
    target
        .query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(CALLBACK_URL_PARAM, current.as_str());

    Some(target)
}

/// Produces the final response for a decided request.
///
/// # Errors
///
/// Returns [`Error::Callback`] if the handler fails, or [`Error::Http`] if
/// the redirect cannot be built.
pub async fn compose(
    decision: AuthDecision,
    handler: Option<&dyn AuthHandler>,
    request: RequestContext,
    session: Option<Session>,
    config: &AuthConfig,
) -> Result<Response<Body>, Error> {
    match (decision, handler) {
        (AuthDecision::Override(response), _) => Ok(response),
        (AuthDecision::Allow, Some(handler)) => {
            let response = handler
                .handle(AuthRequest::new(request, session))
                .await
                .map_err(Error::Callback)?;
            Ok(response.unwrap_or_else(pass_through))
        }
        (AuthDecision::Allow, None) => Ok(pass_through()),
        (AuthDecision::Deny, _) => match sign_in_url(&request, config) {
            Some(target) => {
                tracing::debug!(path = %request.path(), "redirecting to sign-in");
                redirect(&target)
            }
            None => Ok(pass_through()),
        },
    }
}
