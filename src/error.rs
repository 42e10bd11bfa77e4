use std::fmt;

use http::Method;

/// Error returned by a handler (or raised internally) that maps directly to
/// an HTTP error response.
///
/// This is a value, not an exception: handlers return
/// `Result<Response, HttpError>` and the server converts the `Err` arm into
/// a JSON body `{"error": <message>}` with the given status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    /// HTTP status code sent to the client
    pub status: u16,
    /// Human-readable message placed in the error body
    pub message: String,
}

impl HttpError {
    /// Create an error with an arbitrary status code and message.
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// 400 Bad Request
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, message)
    }

    /// 404 Not Found
    pub fn not_found() -> Self {
        Self::new(404, "Not Found")
    }

    /// 500 Internal Server Error with the generic message.
    ///
    /// Internal failure detail is logged, never sent over the wire.
    pub fn internal() -> Self {
        Self::new(500, "Internal Server Error")
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}: {}", self.status, self.message)
    }
}

impl std::error::Error for HttpError {}

/// Request parsing failure.
///
/// Both variants terminate the connection after the error response is
/// flushed: a malformed head leaves no recoverable framing boundary, and an
/// oversized request must not keep accumulating bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The request line or a header line did not match HTTP/1.1 framing,
    /// or the method is not one the server supports.
    Malformed(String),
    /// The accumulated request (or its declared Content-Length) exceeds
    /// the configured `max_request_size`.
    TooLarge,
}

impl ParseError {
    /// Status code for the error response this failure maps to.
    pub fn status(&self) -> u16 {
        match self {
            ParseError::Malformed(_) => 400,
            ParseError::TooLarge => 413,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Malformed(reason) => write!(f, "malformed request: {reason}"),
            ParseError::TooLarge => write!(f, "request exceeds maximum size"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Route registration failure, reported at startup rather than at request
/// time. The routing table is immutable once the server starts serving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    /// A handler is already registered for this (method, path) pair.
    DuplicateRoute {
        /// HTTP method of the conflicting registration
        method: Method,
        /// Exact path pattern of the conflicting registration
        path: String,
    },
    /// A registration was attempted with an empty method set.
    EmptyMethods {
        /// Path pattern of the rejected registration
        path: String,
    },
}

impl fmt::Display for RouterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouterError::DuplicateRoute { method, path } => {
                write!(f, "duplicate route registration: {method} {path}")
            }
            RouterError::EmptyMethods { path } => {
                write!(f, "route registration for {path} has an empty method set")
            }
        }
    }
}

impl std::error::Error for RouterError {}
