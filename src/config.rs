//! Process-wide pipeline configuration.
//!
//! An [`AuthConfig`] is built once at startup, either from the environment or
//! through the `with_*` builder methods, and then shared read-only by every
//! request (the driver keeps it behind an `Arc`).

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::action::AuthAction;
use crate::error::Error;
use crate::policy::AuthorizedCallback;
use crate::session::SessionCallback;

/// Base path used when none is configured.
pub const DEFAULT_BASE_PATH: &str = "/api/auth";

/// Custom page paths that replace the built-in auth routes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pages {
    /// Sign-in page; defaults to `{base_path}/signin`
    pub sign_in: Option<String>,
    /// Sign-out page
    pub sign_out: Option<String>,
    /// Error page
    pub error: Option<String>,
    /// Page shown after an email sign-in link was sent
    pub verify_request: Option<String>,
    /// Page shown to first-time users
    pub new_user: Option<String>,
}

impl Pages {
    /// Iterates over every configured page path.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        [
            &self.sign_in,
            &self.sign_out,
            &self.error,
            &self.verify_request,
            &self.new_user,
        ]
        .into_iter()
        .filter_map(|p| p.as_deref())
    }

    /// Returns true if `path` is one of the configured pages.
    ///
    /// A page written without its leading `/` still matches.
    pub fn contains(&self, path: &str) -> bool {
        let path = path.strip_prefix('/').unwrap_or(path);
        self.paths().any(|p| p.strip_prefix('/').unwrap_or(p) == path)
    }

    /// Gives every configured page a leading `/`.
    pub fn normalized(self) -> Self {
        Self {
            sign_in: self.sign_in.map(normalize_page_path),
            sign_out: self.sign_out.map(normalize_page_path),
            error: self.error.map(normalize_page_path),
            verify_request: self.verify_request.map(normalize_page_path),
            new_user: self.new_user.map(normalize_page_path),
        }
    }
}

/// User-supplied hooks consulted by the pipeline.
#[derive(Clone, Default)]
pub struct Callbacks {
    /// Decides whether a request may proceed
    pub authorized: Option<Arc<dyn AuthorizedCallback>>,
    /// Reshapes the session returned by the session service
    pub session: Option<Arc<dyn SessionCallback>>,
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("authorized", &self.authorized.is_some())
            .field("session", &self.session.is_some())
            .finish()
    }
}

/// Read-only configuration for the authorization pipeline.
///
/// # Examples
///
/// ```
/// use auth_gate::AuthConfig;
///
/// let config = AuthConfig::new()
///     .with_base_path("/auth")
///     .with_sign_in_page("/login")
///     .with_trust_host(true);
///
/// assert_eq!(config.base_path(), "/auth");
/// assert_eq!(config.sign_in_page(), "/login");
/// ```
#[derive(Debug, Clone)]
pub struct AuthConfig {
    base_path: String,
    url: Option<Url>,
    trust_host: bool,
    pages: Pages,
    callbacks: Callbacks,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthConfig {
    /// Creates a configuration with the default base path, no canonical URL,
    /// untrusted host headers, no custom pages and no callbacks.
    pub fn new() -> Self {
        Self {
            base_path: DEFAULT_BASE_PATH.to_string(),
            url: None,
            trust_host: false,
            pages: Pages::default(),
            callbacks: Callbacks::default(),
        }
    }

    /// Reads configuration from the process environment.
    ///
    /// Recognised variables:
    /// - `AUTH_URL` (or legacy `NEXTAUTH_URL`): canonical public URL
    /// - `AUTH_TRUST_HOST`: `1`/`true` to trust forwarded host headers
    /// - `AUTH_BASE_PATH`: mount point of the auth routes
    ///
    /// When `AUTH_BASE_PATH` is unset and `AUTH_URL` has a non-root path, that
    /// path becomes the base path.
    ///
    /// # Errors
    ///
    /// Returns an error if `AUTH_URL` does not parse or `AUTH_TRUST_HOST` is
    /// not a boolean.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let mut config = Self::new();

        let raw_url = lookup("AUTH_URL").or_else(|| lookup("NEXTAUTH_URL"));
        if let Some(raw) = raw_url.filter(|u| !u.trim().is_empty()) {
            let url = Url::parse(raw.trim())?;
            if url.path() != "/" {
                config.base_path = normalize_base_path(url.path());
            }
            config.url = Some(url);
        }

        if let Some(raw) = lookup("AUTH_TRUST_HOST") {
            config.trust_host = parse_flag("AUTH_TRUST_HOST", &raw)?;
        }

        if let Some(base) = lookup("AUTH_BASE_PATH") {
            config.base_path = normalize_base_path(&base);
        }

        tracing::debug!(
            base_path = %config.base_path,
            url = ?config.url.as_ref().map(Url::as_str),
            trust_host = config.trust_host,
            "loaded auth configuration from environment"
        );

        Ok(config)
    }

    /// Sets the mount point of the auth routes.
    pub fn with_base_path(mut self, base_path: impl AsRef<str>) -> Self {
        self.base_path = normalize_base_path(base_path.as_ref());
        self
    }

    /// Sets the canonical public URL, overriding any host the request claims.
    pub fn with_url(mut self, url: Url) -> Self {
        self.url = Some(url);
        self
    }

    /// Trusts `x-forwarded-host`/`host` when no canonical URL is set.
    pub fn with_trust_host(mut self, trust_host: bool) -> Self {
        self.trust_host = trust_host;
        self
    }

    /// Replaces all custom pages. Paths are given a leading `/`.
    pub fn with_pages(mut self, pages: Pages) -> Self {
        self.pages = pages.normalized();
        self
    }

    /// Sets a custom sign-in page. The path is given a leading `/`.
    pub fn with_sign_in_page(mut self, path: impl Into<String>) -> Self {
        self.pages.sign_in = Some(normalize_page_path(path.into()));
        self
    }

    /// Installs the policy callback.
    pub fn with_authorized(mut self, callback: impl AuthorizedCallback + 'static) -> Self {
        self.callbacks.authorized = Some(Arc::new(callback));
        self
    }

    /// Installs the session-shaping callback.
    pub fn with_session_callback(mut self, callback: impl SessionCallback + 'static) -> Self {
        self.callbacks.session = Some(Arc::new(callback));
        self
    }

    /// Mount point of the auth routes, without a trailing slash.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Canonical public URL, if configured.
    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Whether forwarded host headers are trusted.
    pub fn trust_host(&self) -> bool {
        self.trust_host
    }

    /// Custom pages.
    pub fn pages(&self) -> &Pages {
        &self.pages
    }

    /// Configured callbacks.
    pub fn callbacks(&self) -> &Callbacks {
        &self.callbacks
    }

    /// Sign-in path unauthenticated requests are sent to.
    pub fn sign_in_page(&self) -> Cow<'_, str> {
        match &self.pages.sign_in {
            Some(page) => Cow::Borrowed(page.as_str()),
            None => Cow::Owned(self.action_path(AuthAction::SignIn)),
        }
    }

    /// Path of a built-in action route under the base path.
    pub fn action_path(&self, action: AuthAction) -> String {
        format!("{}/{}", self.base_path, action)
    }
}

fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() || trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

fn normalize_page_path(raw: String) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

fn parse_flag(name: &str, raw: &str) -> Result<bool, Error> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" | "" => Ok(false),
        other => Err(Error::Config(format!(
            "{} must be a boolean, got `{}`",
            name, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = AuthConfig::new();
        assert_eq!(config.base_path(), "/api/auth");
        assert!(config.url().is_none());
        assert!(!config.trust_host());
        assert_eq!(config.sign_in_page(), "/api/auth/signin");
        assert!(config.callbacks().authorized.is_none());
    }

    #[test]
    fn base_path_is_normalized() {
        assert_eq!(AuthConfig::new().with_base_path("auth/").base_path(), "/auth");
        assert_eq!(AuthConfig::new().with_base_path("/").base_path(), "");
        assert_eq!(
            AuthConfig::new().with_base_path("/custom").sign_in_page(),
            "/custom/signin"
        );
    }

    #[test]
    fn custom_sign_in_page_wins() {
        let config = AuthConfig::new().with_sign_in_page("/login");
        assert_eq!(config.sign_in_page(), "/login");
        assert!(config.pages().contains("/login"));
        assert!(!config.pages().contains("/api/auth/signin"));
    }

    #[test]
    fn page_paths_get_a_leading_slash() {
        let config = AuthConfig::new().with_sign_in_page("login");
        assert_eq!(config.sign_in_page(), "/login");
        assert!(config.pages().contains("/login"));

        let config = AuthConfig::new().with_pages(Pages {
            error: Some(" oops".to_string()),
            new_user: Some("/welcome".to_string()),
            ..Pages::default()
        });
        let paths: Vec<&str> = config.pages().paths().collect();
        assert_eq!(paths, vec!["/oops", "/welcome"]);
    }

    #[test]
    fn contains_ignores_a_missing_leading_slash() {
        let pages = Pages {
            sign_in: Some("login".to_string()),
            ..Pages::default()
        };
        assert!(pages.contains("/login"));
        assert!(!pages.contains("/logout"));
    }

    #[test]
    fn pages_lists_only_configured_paths() {
        let pages = Pages {
            sign_in: Some("/login".to_string()),
            error: Some("/oops".to_string()),
            ..Pages::default()
        };
        let paths: Vec<&str> = pages.paths().collect();
        assert_eq!(paths, vec!["/login", "/oops"]);
    }

    #[test]
    fn env_url_sets_base_path() {
        let config =
            AuthConfig::from_lookup(lookup(&[("AUTH_URL", "https://app.example.com/my/auth/")]))
                .expect("valid env");
        assert_eq!(config.base_path(), "/my/auth");
        assert_eq!(config.url().unwrap().host_str(), Some("app.example.com"));
    }

    #[test]
    fn env_root_url_keeps_default_base_path() {
        let config = AuthConfig::from_lookup(lookup(&[("NEXTAUTH_URL", "https://app.example.com")]))
            .expect("valid env");
        assert_eq!(config.base_path(), DEFAULT_BASE_PATH);
        assert!(config.url().is_some());
    }

    #[test]
    fn env_base_path_overrides_url_path() {
        let config = AuthConfig::from_lookup(lookup(&[
            ("AUTH_URL", "https://app.example.com/my/auth"),
            ("AUTH_BASE_PATH", "/other"),
        ]))
        .expect("valid env");
        assert_eq!(config.base_path(), "/other");
    }

    #[test]
    fn env_trust_host_flag() {
        let on = AuthConfig::from_lookup(lookup(&[("AUTH_TRUST_HOST", "TRUE")])).unwrap();
        assert!(on.trust_host());
        let off = AuthConfig::from_lookup(lookup(&[("AUTH_TRUST_HOST", "0")])).unwrap();
        assert!(!off.trust_host());
    }

    #[test]
    fn env_rejects_bad_values() {
        assert!(matches!(
            AuthConfig::from_lookup(lookup(&[("AUTH_TRUST_HOST", "maybe")])),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            AuthConfig::from_lookup(lookup(&[("AUTH_URL", "not a url")])),
            Err(Error::InvalidUrl(_))
        ));
    }

    #[test]
    fn callbacks_debug_shows_presence_only() {
        let config = AuthConfig::new();
        let debug = format!("{:?}", config.callbacks());
        assert!(debug.contains("authorized: false"));
    }
}
