//! # microhttp
//!
//! **microhttp** is a small, single-threaded HTTP/1.1 server for
//! embedded-class environments, built on readiness polling rather than
//! threads or an async runtime.
//!
//! ## Overview
//!
//! One event loop owns every connection. Each iteration polls the
//! listener and all client sockets for readiness, parses whatever bytes
//! have arrived, dispatches complete requests to registered handlers and
//! flushes pending responses in bounded, non-blocking writes. Because
//! there is exactly one thread, handlers need no synchronization and no
//! connection can corrupt another's state; a slow or broken socket only
//! ever stalls itself.
//!
//! ## Architecture
//!
//! - **[`router`]** - Exact-path route registration and lookup, with
//!   per-method tables and 405 `Allow` reporting
//! - **[`server`]** - The incremental request parser, response builder
//!   and the poll-driven event loop ([`HttpServer`])
//! - **[`cors`]** - Cross-origin policy: preflight interception and
//!   response header injection
//! - **[`sse`]** - Server-Sent Events: a channel-backed queue drained by
//!   the event loop, fed by per-tick streaming handlers
//! - **[`static_files`]** - Static file serving with path traversal
//!   protection
//! - **[`json`]** - Thin JSON encode/decode helpers over `serde_json`
//! - **[`error`]** - Error types for handlers, parsing and route
//!   registration
//!
//! ## Quick Start
//!
//! ```no_run
//! use http::Method;
//! use microhttp::server::{HttpServer, Response, ServerConfig};
//! use microhttp::Router;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut router = Router::new();
//!     router.register(&[Method::GET], "/", |req| {
//!         let name = req.query_param("name").unwrap_or("world");
//!         Ok(Response::text(format!("Hello, {name}!")))
//!     })?;
//!
//!     let server = HttpServer::new(ServerConfig::new("127.0.0.1:8080"), router);
//!     server.run()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Server-Sent Events
//!
//! Streaming routes register a tick handler instead of a
//! request/response handler. The event loop calls it once per tick for
//! every open stream; events it sends are queued and written as the
//! socket allows, with a high-water mark suspending the handler while
//! the client lags behind:
//!
//! ```no_run
//! # use microhttp::Router;
//! # fn main() -> Result<(), microhttp::RouterError> {
//! let mut router = Router::new();
//! router.register_streaming("/events", |_req, tx| {
//!     tx.send("tick", "ping");
//! })?;
//! # Ok(())
//! # }
//! ```

pub mod cors;
pub mod error;
pub mod json;
pub mod router;
pub mod server;
pub mod sse;
pub mod static_files;

pub use cors::CorsConfig;
pub use error::{HttpError, ParseError, RouterError};
pub use router::{RouteOutcome, Router};
pub use server::{HttpServer, Request, Response, ServerConfig, ServerHandle};
pub use sse::SseSender;
pub use static_files::StaticFiles;
