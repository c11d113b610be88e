//! User handlers wrapped by the pipeline.

use std::future::Future;

use async_trait::async_trait;
use http::Response;

use crate::error::BoxError;
use crate::request::AuthRequest;
use crate::response::Body;

/// Application logic that runs once a request is allowed.
///
/// Returning `Ok(None)` means "nothing to add": the pipeline answers with a
/// pass-through response. Errors are surfaced to the host as
/// [`Error::Callback`](crate::Error::Callback).
///
/// Any async closure taking an [`AuthRequest`] is a handler:
///
/// ```
/// use auth_gate::{AuthRequest, BoxError, Body};
/// use http::Response;
///
/// let handler = |req: AuthRequest| async move {
///     let name = req
///         .auth()
///         .and_then(|s| s.user())
///         .and_then(|u| u.get("name"))
///         .and_then(|n| n.as_str())
///         .unwrap_or("stranger")
///         .to_string();
///     Ok::<_, BoxError>(Some(Response::new(Body::from(format!("hello {}", name)))))
/// };
/// # let _ = handler;
/// ```
#[async_trait]
pub trait AuthHandler: Send + Sync {
    /// Handles an allowed request.
    async fn handle(&self, request: AuthRequest) -> Result<Option<Response<Body>>, BoxError>;
}

#[async_trait]
impl<F, Fut> AuthHandler for F
where
    F: Fn(AuthRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<Response<Body>>, BoxError>> + Send,
{
    async fn handle(&self, request: AuthRequest) -> Result<Option<Response<Body>>, BoxError> {
        self(request).await
    }
}
