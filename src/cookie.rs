//! Propagation of `set-cookie` headers onto the final response.
//!
//! The session service may rotate or refresh the session cookie while
//! answering the session lookup. Those cookies belong to the browser, not to
//! the pipeline, so they are copied onto whatever response ends up being sent.

use http::header::SET_COOKIE;
use http::{HeaderMap, HeaderValue, Response};

/// `set-cookie` values exposed by a response-like source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetCookies {
    /// Each cookie as its own header value, in order
    Each(Vec<HeaderValue>),
    /// A single already-folded value
    Combined(HeaderValue),
}

impl SetCookies {
    /// Number of header values carried.
    pub fn len(&self) -> usize {
        match self {
            SetCookies::Each(values) => values.len(),
            SetCookies::Combined(_) => 1,
        }
    }

    /// True if no value is carried.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Something `set-cookie` values can be read from.
///
/// Sources that can enumerate each header value should return
/// [`SetCookies::Each`]; [`SetCookies::Combined`] is for sources that only
/// know a folded value.
pub trait SetCookieSource {
    /// Reads the `set-cookie` values, `None` when there are none.
    fn set_cookies(&self) -> Option<SetCookies>;
}

impl SetCookieSource for HeaderMap {
    fn set_cookies(&self) -> Option<SetCookies> {
        let values: Vec<HeaderValue> = self.get_all(SET_COOKIE).iter().cloned().collect();
        if values.is_empty() {
            None
        } else {
            Some(SetCookies::Each(values))
        }
    }
}

impl<B> SetCookieSource for Response<B> {
    fn set_cookies(&self) -> Option<SetCookies> {
        self.headers().set_cookies()
    }
}

/// A source holding one folded `set-cookie` value.
#[derive(Debug, Clone)]
pub struct CombinedSetCookie(pub HeaderValue);

impl SetCookieSource for CombinedSetCookie {
    fn set_cookies(&self) -> Option<SetCookies> {
        Some(SetCookies::Combined(self.0.clone()))
    }
}

/// Copies `set-cookie` values from `from` onto `to`.
///
/// Individual values are appended, never deduplicated, so cookies the final
/// response already carries survive. A folded value replaces any existing
/// `set-cookie`. Returns the number of values written.
pub fn propagate<S>(from: &S, to: &mut HeaderMap) -> usize
where
    S: SetCookieSource + ?Sized,
{
    match from.set_cookies() {
        None => 0,
        Some(SetCookies::Each(values)) => {
            let count = values.len();
            for value in values {
                to.append(SET_COOKIE, value);
            }
            count
        }
        Some(SetCookies::Combined(value)) => {
            to.insert(SET_COOKIE, value);
            1
        }
    }
}
