use http::StatusCode;

/// Boxed error returned by user-supplied callbacks and handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while running the authorization pipeline.
///
/// None of these are turned into an authorization decision. A failed session
/// lookup is never treated as "signed out", and a failing callback is never
/// treated as "denied"; the host decides how to answer the request.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The session service could not be reached.
    #[error("session service unreachable: {0}")]
    Transport(#[source] BoxError),

    /// The session service answered with a non-success status.
    #[error("session service returned {status}")]
    SessionStatus {
        /// Status returned by the session endpoint
        status: StatusCode,
    },

    /// The session service answered 2xx but the body is not a session.
    #[error("malformed session payload: {0}")]
    SessionPayload(#[from] serde_json::Error),

    /// No canonical URL is configured and forwarded host headers are not trusted.
    #[error("untrusted host `{host}`: configure AUTH_URL or enable trust_host")]
    UntrustedHost {
        /// Host the request claimed to be for, if any
        host: String,
    },

    /// A URL could not be parsed or built.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A policy callback, session callback or user handler failed.
    #[error("callback failed: {0}")]
    Callback(#[source] BoxError),

    /// A request or response could not be assembled.
    #[error(transparent)]
    Http(#[from] http::Error),
}

impl Error {
    /// Returns true if the error came from talking to the session service.
    pub fn is_session_service(&self) -> bool {
        matches!(
            self,
            Error::Transport(_) | Error::SessionStatus { .. } | Error::SessionPayload(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_status_display_includes_code() {
        let err = Error::SessionStatus {
            status: StatusCode::BAD_GATEWAY,
        };
        assert_eq!(err.to_string(), "session service returned 502 Bad Gateway");
        assert!(err.is_session_service());
    }

    #[test]
    fn callback_error_keeps_source() {
        let err = Error::Callback("policy exploded".into());
        assert!(err.to_string().contains("policy exploded"));
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.is_session_service());
    }

    #[test]
    fn untrusted_host_names_the_host() {
        let err = Error::UntrustedHost {
            host: "evil.example".to_string(),
        };
        assert!(err.to_string().contains("evil.example"));
    }
}
