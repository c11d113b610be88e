//! Public origin detection.
//!
//! The pipeline needs an absolute origin twice per request: to address the
//! session service and to build the `callbackUrl` of sign-in redirects. A
//! configured canonical URL always wins. Forwarded host headers are only used
//! when the configuration opts in with `trust_host`.

use http::header::HOST;
use http::HeaderMap;
use url::{Position, Url};

use crate::action::AuthAction;
use crate::config::AuthConfig;
use crate::error::Error;

const X_FORWARDED_HOST: &str = "x-forwarded-host";
const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Determines the public origin (`scheme://host[:port]`) for a request.
///
/// `fallback_scheme` is used when trusting host headers and no
/// `x-forwarded-proto` is present; `https` is assumed when it is `None`.
///
/// # Errors
///
/// - [`Error::UntrustedHost`] when no URL is configured and host headers are
///   not trusted, or when trusted headers carry no host at all
/// - [`Error::InvalidUrl`] when the headers do not form a valid origin
pub fn detect_origin(
    headers: &HeaderMap,
    config: &AuthConfig,
    fallback_scheme: Option<&str>,
) -> Result<Url, Error> {
    if let Some(url) = config.url() {
        return origin_of(url).map_err(Error::from);
    }

    let host =
        first_value(headers, X_FORWARDED_HOST).or_else(|| first_value(headers, HOST.as_str()));

    if !config.trust_host() {
        return Err(Error::UntrustedHost {
            host: host.unwrap_or_default().to_string(),
        });
    }

    let host = host.ok_or_else(|| Error::UntrustedHost {
        host: String::new(),
    })?;
    let scheme = first_value(headers, X_FORWARDED_PROTO)
        .or(fallback_scheme)
        .unwrap_or("https")
        .trim_end_matches(':');

    Ok(Url::parse(&format!("{}://{}", scheme, host))?)
}

/// Builds `{origin}{base_path}/{action}`.
pub fn action_url(origin: &Url, base_path: &str, action: AuthAction) -> Result<Url, Error> {
    Ok(origin.join(&format!("{}/{}", base_path, action))?)
}

/// Rebuilds a request URL on the detected origin, keeping path and query.
///
/// The path is set rather than joined, so a path like `//other.host/x` can
/// never move the URL to another host.
pub fn request_url(origin: &Url, path_and_query: &str) -> Url {
    let (path, query) = match path_and_query.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (path_and_query, None),
    };
    let mut url = origin.clone();
    url.set_path(if path.is_empty() { "/" } else { path });
    url.set_query(query);
    url
}

fn origin_of(url: &Url) -> Result<Url, url::ParseError> {
    Url::parse(&url[..Position::BeforePath])
}

/// First comma-separated entry of a header, as proxies append to these.
fn first_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
