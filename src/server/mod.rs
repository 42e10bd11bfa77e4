//! HTTP server internals: configuration, the wire-level request parser,
//! the response builder and the readiness-driven event loop.
//!
//! Most users only need [`ServerConfig`], [`HttpServer`] and the
//! [`Request`]/[`Response`] pair; the rest is surfaced for tests and for
//! callers that want to drive the parser directly.

mod config;
mod conn;
mod event_loop;
mod request;
mod response;

pub use config::{
    ServerConfig, DEFAULT_ADDR, DEFAULT_MAX_REQUEST_SIZE, DEFAULT_SSE_HIGH_WATER,
    DEFAULT_TICK_INTERVAL,
};
pub use event_loop::{HttpServer, ServerHandle};
pub use request::{parse_query_string, ParseStatus, Request, RequestParser, SUPPORTED_METHODS};
pub use response::{reason_phrase, Body, Response, SERVER_BANNER};
