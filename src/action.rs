//! Well-known authorization actions.
//!
//! Every route the session service serves lives at `{base_path}/{action}`.
//! The set is closed and fixed for the life of the process; the redirect loop
//! guard uses it to recognise redirects that point back at an auth route.

use std::fmt;
use std::str::FromStr;

/// A path segment handled by the session service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthAction {
    /// `providers`
    Providers,
    /// `session`
    Session,
    /// `csrf`
    Csrf,
    /// `signin`
    SignIn,
    /// `signout`
    SignOut,
    /// `callback`
    Callback,
    /// `verify-request`
    VerifyRequest,
    /// `error`
    Error,
}

impl AuthAction {
    /// Every action, in route-table order.
    pub const ALL: [AuthAction; 8] = [
        AuthAction::Providers,
        AuthAction::Session,
        AuthAction::Csrf,
        AuthAction::SignIn,
        AuthAction::SignOut,
        AuthAction::Callback,
        AuthAction::VerifyRequest,
        AuthAction::Error,
    ];

    /// The path segment for this action.
    pub const fn as_str(self) -> &'static str {
        match self {
            AuthAction::Providers => "providers",
            AuthAction::Session => "session",
            AuthAction::Csrf => "csrf",
            AuthAction::SignIn => "signin",
            AuthAction::SignOut => "signout",
            AuthAction::Callback => "callback",
            AuthAction::VerifyRequest => "verify-request",
            AuthAction::Error => "error",
        }
    }

    /// Looks up the action named by a single path segment.
    pub fn from_segment(segment: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == segment)
    }

    /// Returns true if `segment` names a known action.
    pub fn is_action(segment: &str) -> bool {
        Self::from_segment(segment).is_some()
    }
}

impl fmt::Display for AuthAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a known action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown auth action `{0}`")]
pub struct UnknownAction(pub String);

impl FromStr for AuthAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_segment(s).ok_or_else(|| UnknownAction(s.to_string()))
    }
}
