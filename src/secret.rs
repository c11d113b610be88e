use std::fmt;

use http::HeaderValue;

/// A credential-bearing value that must never reach a log line.
///
/// The pipeline forwards the browser's `cookie` header to the session service
/// and copies `set-cookie` values back out. Both carry session tokens, so the
/// only way they appear in `tracing` fields is wrapped in `Secret`.
///
/// `Debug` and `Display` always print `[REDACTED]`. The inner value is only
/// reachable through [`expose_secret`](Self::expose_secret).
///
/// # Examples
///
/// ```
/// use auth_gate::Secret;
///
/// let cookie = Secret::new("authjs.session-token=abc123".to_string());
/// assert_eq!(format!("{:?}", cookie), "[REDACTED]");
/// assert_eq!(cookie.expose_secret(), "authjs.session-token=abc123");
/// ```
// Do NOT derive Clone, Copy or Default: duplicating a token should be a visible act.
pub struct Secret<T> {
    inner: T,
}

impl<T> Secret<T> {
    /// Wraps a sensitive value.
    pub fn new(value: T) -> Self {
        Self { inner: value }
    }

    /// Explicitly exposes the wrapped value.
    pub fn expose_secret(&self) -> &T {
        &self.inner
    }

    /// Consumes the wrapper, returning the value.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl Secret<HeaderValue> {
    /// Length in bytes of the wrapped header value, safe to log.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True when the wrapped header value is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<T> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl<T> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}
