//! Exact-path request routing.
//!
//! The routing table is built once at startup and never mutated while the
//! server runs. Two classes of routes exist: ordinary request/response
//! handlers, and streaming (SSE) handlers whose connection stays open and
//! whose callback is re-entered once per event-loop tick.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use tracing::{debug, info};

use crate::error::{HttpError, RouterError};
use crate::server::{Request, Response};
use crate::sse::SseSender;

/// An ordinary request handler: borrows the parsed request, returns either
/// a response or a typed error the builder maps onto the wire.
pub type Handler = dyn Fn(&Request) -> Result<Response, HttpError> + Send + Sync;

/// A streaming (SSE) handler. Invoked once per event-loop tick for as long
/// as the connection is open; pushes frames through the [`SseSender`] and
/// must return promptly; the loop provides the cadence, not the handler.
pub type StreamHandler = dyn Fn(&Request, &SseSender) + Send + Sync;

enum RouteTarget {
    Ordinary(Arc<Handler>),
    Streaming(Arc<StreamHandler>),
}

struct RouteEntry {
    /// (method, target) pairs in registration order; the order is what the
    /// `Allow` header reports on a 405.
    targets: Vec<(Method, RouteTarget)>,
}

impl RouteEntry {
    fn allowed_methods(&self) -> Vec<Method> {
        self.targets.iter().map(|(m, _)| m.clone()).collect()
    }

    fn find(&self, method: &Method) -> Option<&RouteTarget> {
        self.targets
            .iter()
            .find(|(m, _)| m == method)
            .map(|(_, t)| t)
    }
}

/// Result of matching a request against the routing table.
pub enum RouteOutcome {
    /// An ordinary handler matched.
    Handler(Arc<Handler>),
    /// A streaming (SSE) handler matched.
    Streaming(Arc<StreamHandler>),
    /// No route is registered for this path (404).
    NotFound,
    /// The path exists but not for this method (405). Carries the allowed
    /// methods, in registration order, for the `Allow` header.
    MethodNotAllowed(Vec<Method>),
}

/// Immutable exact-match routing table.
///
/// Build it with [`Router::register`] / [`Router::register_streaming`] at
/// startup, then hand it to the server. Duplicate (method, path)
/// registrations are configuration errors reported immediately.
#[derive(Default)]
pub struct Router {
    routes: HashMap<String, RouteEntry>,
}

impl Router {
    /// Create an empty routing table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an ordinary handler for every method in `methods` at the
    /// exact path `path`.
    ///
    /// # Errors
    ///
    /// * [`RouterError::EmptyMethods`] if `methods` is empty.
    /// * [`RouterError::DuplicateRoute`] if any (method, path) pair is
    ///   already taken.
    pub fn register<H>(
        &mut self,
        methods: &[Method],
        path: &str,
        handler: H,
    ) -> Result<(), RouterError>
    where
        H: Fn(&Request) -> Result<Response, HttpError> + Send + Sync + 'static,
    {
        if methods.is_empty() {
            return Err(RouterError::EmptyMethods {
                path: path.to_string(),
            });
        }
        let handler: Arc<Handler> = Arc::new(handler);
        for method in methods {
            self.insert(
                method.clone(),
                path,
                RouteTarget::Ordinary(Arc::clone(&handler)),
            )?;
        }
        info!(path = %path, methods = ?methods, "route registered");
        Ok(())
    }

    /// Register a streaming (SSE) handler at the exact path `path`.
    ///
    /// Streaming routes answer GET only; the connection is marked
    /// long-lived and the handler is re-invoked once per loop tick.
    ///
    /// # Errors
    ///
    /// [`RouterError::DuplicateRoute`] if `GET path` is already taken.
    pub fn register_streaming<H>(&mut self, path: &str, handler: H) -> Result<(), RouterError>
    where
        H: Fn(&Request, &SseSender) + Send + Sync + 'static,
    {
        let handler: Arc<StreamHandler> = Arc::new(handler);
        self.insert(Method::GET, path, RouteTarget::Streaming(handler))?;
        info!(path = %path, "streaming route registered");
        Ok(())
    }

    fn insert(
        &mut self,
        method: Method,
        path: &str,
        target: RouteTarget,
    ) -> Result<(), RouterError> {
        let entry = self
            .routes
            .entry(path.to_string())
            .or_insert_with(|| RouteEntry {
                targets: Vec::new(),
            });
        if entry.targets.iter().any(|(m, _)| *m == method) {
            return Err(RouterError::DuplicateRoute {
                method,
                path: path.to_string(),
            });
        }
        entry.targets.push((method, target));
        Ok(())
    }

    /// Match a request against the table. Exact string comparison only:
    /// no wildcards, no path parameters.
    #[must_use]
    pub fn match_route(&self, method: &Method, path: &str) -> RouteOutcome {
        let Some(entry) = self.routes.get(path) else {
            debug!(method = %method, path = %path, "no route matched");
            return RouteOutcome::NotFound;
        };
        match entry.find(method) {
            Some(RouteTarget::Ordinary(h)) => RouteOutcome::Handler(Arc::clone(h)),
            Some(RouteTarget::Streaming(h)) => RouteOutcome::Streaming(Arc::clone(h)),
            None => {
                let allow = entry.allowed_methods();
                debug!(method = %method, path = %path, allow = ?allow, "method not allowed");
                RouteOutcome::MethodNotAllowed(allow)
            }
        }
    }

    /// Whether the path is registered at all (any method, any kind).
    #[must_use]
    pub fn has_path(&self, path: &str) -> bool {
        self.routes.contains_key(path)
    }

    /// Number of registered (method, path) pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.values().map(|e| e.targets.len()).sum()
    }

    /// True when no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_handler(_req: &Request) -> Result<Response, HttpError> {
        Ok(Response::text("ok"))
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut router = Router::new();
        router.register(&[Method::GET], "/a", ok_handler).unwrap();
        let err = router.register(&[Method::GET], "/a", ok_handler).unwrap_err();
        assert_eq!(
            err,
            RouterError::DuplicateRoute {
                method: Method::GET,
                path: "/a".to_string()
            }
        );
    }

    #[test]
    fn test_empty_method_set_rejected() {
        let mut router = Router::new();
        let err = router.register(&[], "/a", ok_handler).unwrap_err();
        assert!(matches!(err, RouterError::EmptyMethods { .. }));
    }

    #[test]
    fn test_allow_order_is_registration_order() {
        let mut router = Router::new();
        router
            .register(&[Method::POST, Method::GET], "/a", ok_handler)
            .unwrap();
        match router.match_route(&Method::DELETE, "/a") {
            RouteOutcome::MethodNotAllowed(allow) => {
                assert_eq!(allow, vec![Method::POST, Method::GET]);
            }
            _ => panic!("expected MethodNotAllowed"),
        }
    }
}
