//! CORS (Cross-Origin Resource Sharing) policy engine.
//!
//! When a [`CorsConfig`] is installed on the server, OPTIONS requests are
//! intercepted before routing and answered as preflights, and every other
//! response gets the origin/credentials headers merged in. Without a
//! config the engine is inert: no headers are added and OPTIONS falls
//! through to normal routing.

use http::Method;
use tracing::warn;

use crate::error::HttpError;
use crate::server::{Request, Response};

/// CORS policy: configured once at startup, read-only afterwards, shared
/// by every connection.
#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Origins allowed to make cross-origin requests; `"*"` for any.
    pub allow_origins: Vec<String>,
    /// Methods advertised in preflight answers.
    pub allow_methods: Vec<Method>,
    /// Headers advertised in preflight answers.
    pub allow_headers: Vec<String>,
    /// Whether `Access-Control-Allow-Credentials: true` is sent. With
    /// credentials the literal request Origin is always echoed, never `*`.
    pub allow_credentials: bool,
    /// Preflight cache lifetime in seconds (`Access-Control-Max-Age`).
    pub max_age: Option<u32>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: vec!["*".to_string()],
            allow_methods: vec![Method::GET, Method::POST, Method::OPTIONS],
            allow_headers: vec!["Content-Type".to_string()],
            allow_credentials: false,
            max_age: None,
        }
    }
}

impl CorsConfig {
    /// Start from the permissive defaults (`*` origin, GET/POST/OPTIONS,
    /// `Content-Type`, no credentials, no preflight caching).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the allowed origins list.
    #[must_use]
    pub fn allow_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow_origins = origins.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the allowed methods list.
    #[must_use]
    pub fn allow_methods<I>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = Method>,
    {
        self.allow_methods = methods.into_iter().collect();
        self
    }

    /// Replace the allowed headers list.
    #[must_use]
    pub fn allow_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    /// Enable or disable `Access-Control-Allow-Credentials`.
    #[must_use]
    pub fn allow_credentials(mut self, allow: bool) -> Self {
        self.allow_credentials = allow;
        self
    }

    /// Set the preflight cache lifetime in seconds.
    #[must_use]
    pub fn max_age(mut self, seconds: u32) -> Self {
        self.max_age = Some(seconds);
        self
    }

    fn wildcard(&self) -> bool {
        self.allow_origins.iter().any(|o| o == "*")
    }

    /// The `Access-Control-Allow-Origin` value to send for a request from
    /// `origin`, or `None` when the origin is not allowed.
    ///
    /// Wildcard configs reflect `*`, except with credentials enabled,
    /// where the CORS spec forbids the wildcard and the literal request
    /// origin is echoed instead.
    #[must_use]
    pub fn allowed_origin(&self, origin: &str) -> Option<String> {
        if self.wildcard() {
            if self.allow_credentials {
                Some(origin.to_string())
            } else {
                Some("*".to_string())
            }
        } else if self.allow_origins.iter().any(|o| o == origin) {
            Some(origin.to_string())
        } else {
            None
        }
    }

    /// Merge origin/credentials headers into an ordinary (non-preflight)
    /// response. Method and header lists are preflight-only.
    pub fn apply(&self, request: &Request, response: &mut Response) {
        let Some(origin) = request.header("origin") else {
            return;
        };
        let Some(allow_origin) = self.allowed_origin(origin) else {
            warn!(origin = %origin, "request origin not allowed by CORS policy");
            return;
        };
        response.set_header("Access-Control-Allow-Origin", allow_origin);
        if self.allow_credentials {
            response.set_header("Access-Control-Allow-Credentials", "true");
        }
    }

    /// Build the terminal 204 answer for a preflight request.
    ///
    /// # Errors
    ///
    /// `HttpError` 400 when `Access-Control-Request-Method` is absent or
    /// names a method outside the allowed set.
    pub fn preflight_response(&self, request: &Request) -> Result<Response, HttpError> {
        let requested = request
            .header("access-control-request-method")
            .and_then(|m| m.parse::<Method>().ok());
        let allowed = matches!(&requested, Some(m) if self.allow_methods.contains(m));
        if !allowed {
            warn!(requested = ?requested, "rejected CORS preflight");
            return Err(HttpError::bad_request("Invalid preflight request"));
        }

        let mut response = Response::empty(204)
            .header(
                "Access-Control-Allow-Methods",
                self.allow_methods
                    .iter()
                    .map(Method::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            )
            .header("Access-Control-Allow-Headers", self.allow_headers.join(", "));
        if let Some(age) = self.max_age {
            response.set_header("Access-Control-Max-Age", age.to_string());
        }
        self.apply(request, &mut response);
        Ok(response)
    }
}

/// Whether a request is a CORS preflight: OPTIONS carrying an
/// `Access-Control-Request-Method` header.
#[must_use]
pub fn is_preflight(request: &Request) -> bool {
    request.method == Method::OPTIONS
        && request.header("access-control-request-method").is_some()
}
