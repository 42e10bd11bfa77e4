use serde_json::Value;
use tracing::error;

use crate::error::HttpError;

/// Server banner added to every response.
pub const SERVER_BANNER: &str = "microhttp";

/// Logical response body.
///
/// `Json` is serialized by the builder and defaults the content type to
/// `application/json`; everything else is passed through as bytes with a
/// `text/html` default.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// No body at all (e.g. a 204 preflight answer)
    Empty,
    /// UTF-8 text, written as-is
    Text(String),
    /// Raw bytes (static file contents)
    Bytes(Vec<u8>),
    /// Structured data, JSON-encoded at serialization time
    Json(Value),
}

/// A logical HTTP response: status, headers and body.
///
/// Built by a handler (or by the server for errors), consumed once by
/// [`Response::to_bytes`] at the end of the request cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// HTTP status code (200 by default)
    pub status: u16,
    /// Response headers in insertion order
    pub headers: Vec<(String, String)>,
    /// Response body
    pub body: Body,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: Body::Empty,
        }
    }
}

impl Response {
    /// 200 response with a text body (`Content-Type: text/html` default).
    #[must_use]
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            body: Body::Text(body.into()),
            ..Self::default()
        }
    }

    /// 200 response with a JSON body.
    #[must_use]
    pub fn json(body: Value) -> Self {
        Self {
            body: Body::Json(body),
            ..Self::default()
        }
    }

    /// 200 response with raw bytes and an explicit content type.
    #[must_use]
    pub fn bytes(body: Vec<u8>, content_type: &str) -> Self {
        Self {
            headers: vec![("Content-Type".to_string(), content_type.to_string())],
            body: Body::Bytes(body),
            ..Self::default()
        }
    }

    /// Empty-bodied response with the given status.
    #[must_use]
    pub fn empty(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// Set the status code.
    #[must_use]
    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Add or replace a header (names compared case-insensitively).
    #[must_use]
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Add or replace a header in place.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
    }

    /// Look up a header value (case-insensitive).
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn has_header(&self, name: &str) -> bool {
        self.get_header(name).is_some()
    }

    /// Serialize the response to wire bytes.
    ///
    /// Encodes JSON bodies, fills in the default `Content-Type`, always
    /// computes `Content-Length` from the final encoded body, and uses the
    /// standard reason phrase for the status line ("Unknown" for codes
    /// outside the table).
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let (body, default_content_type): (Vec<u8>, &str) = match &self.body {
            Body::Empty => (Vec::new(), "text/html"),
            Body::Text(s) => (s.clone().into_bytes(), "text/html"),
            Body::Bytes(b) => (b.clone(), "text/html"),
            Body::Json(value) => match crate::json::encode(value) {
                Ok(bytes) => (bytes, "application/json"),
                Err(err) => {
                    // Unencodable values (non-string map keys etc). Degrade
                    // to a generic 500 body rather than a broken frame.
                    error!(error = %err, "failed to encode JSON response body");
                    (b"{\"error\":\"Internal Server Error\"}".to_vec(), "application/json")
                }
            },
        };

        let mut out = Vec::with_capacity(body.len() + 256);
        out.extend_from_slice(
            format!("HTTP/1.1 {} {}\r\n", self.status, reason_phrase(self.status)).as_bytes(),
        );
        for (name, value) in &self.headers {
            out.extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
        }
        if !self.has_header("content-type") {
            out.extend_from_slice(format!("Content-Type: {default_content_type}\r\n").as_bytes());
        }
        out.extend_from_slice(format!("Content-Length: {}\r\n", body.len()).as_bytes());
        out.extend_from_slice(format!("Server: {SERVER_BANNER}\r\n").as_bytes());
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&body);
        out
    }
}

impl From<HttpError> for Response {
    /// Convert a handler error into its JSON error response.
    fn from(err: HttpError) -> Self {
        Response::json(serde_json::json!({ "error": err.message })).status(err.status)
    }
}

/// Standard reason phrase for a status code, "Unknown" outside the table.
#[must_use]
pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_phrase() {
        assert_eq!(reason_phrase(200), "OK");
        assert_eq!(reason_phrase(405), "Method Not Allowed");
        assert_eq!(reason_phrase(413), "Payload Too Large");
        assert_eq!(reason_phrase(299), "Unknown");
    }

    #[test]
    fn test_header_replacement() {
        let res = Response::text("x")
            .header("Content-Type", "text/plain")
            .header("content-type", "text/css");
        assert_eq!(res.get_header("Content-Type"), Some("text/css"));
        assert_eq!(res.headers.len(), 1);
    }

    #[test]
    fn test_http_error_into_response() {
        let res: Response = HttpError::new(418, "teapot").into();
        assert_eq!(res.status, 418);
        assert_eq!(res.body, Body::Json(serde_json::json!({"error": "teapot"})));
    }
}
