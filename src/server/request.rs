use std::collections::HashMap;

use http::Method;
use serde_json::Value;
use tracing::debug;

use crate::error::ParseError;

/// Methods the parser accepts. Anything else in the request line is a
/// malformed request, not a 405; the method never reaches the router.
pub const SUPPORTED_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::OPTIONS,
];

/// A fully parsed HTTP request.
///
/// Immutable once produced by the parser; the dispatch path borrows it for
/// the lifetime of one request cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// HTTP method (GET, POST, PUT, DELETE or OPTIONS)
    pub method: Method,
    /// Request path with the query string stripped
    pub path: String,
    /// Decoded query parameters; duplicate keys keep the last value
    pub query_params: HashMap<String, String>,
    /// HTTP headers with lowercased names
    pub headers: HashMap<String, String>,
    /// Raw body bytes (exactly Content-Length long, possibly empty)
    pub body: Vec<u8>,
}

impl Request {
    /// Get a header value by name (names are stored lowercased).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Get a query parameter by name.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }

    /// Decode the body as JSON, if there is one and it parses.
    #[must_use]
    pub fn json_body(&self) -> Option<Value> {
        if self.body.is_empty() {
            return None;
        }
        crate::json::decode(&self.body).ok()
    }
}

/// Outcome of one parse attempt over a connection's accumulated bytes.
#[derive(Debug, PartialEq)]
pub enum ParseStatus {
    /// More bytes are needed before a full request is present.
    Incomplete,
    /// A complete request was parsed. `consumed` is the number of buffer
    /// bytes it occupied; the caller drains them and keeps the remainder
    /// for the next pipelined request.
    Complete {
        /// The parsed request
        request: Request,
        /// Bytes of the buffer belonging to this request
        consumed: usize,
    },
}

/// Incremental HTTP/1.1 request parser.
///
/// Stateless per call: the multiplexer re-invokes [`RequestParser::parse`]
/// with the connection's whole accumulated buffer each time more bytes
/// arrive, until it returns [`ParseStatus::Complete`].
#[derive(Debug, Clone, Copy)]
pub struct RequestParser {
    max_request_size: usize,
}

impl RequestParser {
    /// Create a parser enforcing the given maximum request size (request
    /// line + headers + body together).
    #[must_use]
    pub fn new(max_request_size: usize) -> Self {
        Self { max_request_size }
    }

    /// Attempt to parse one complete request from the front of `buf`.
    ///
    /// # Errors
    ///
    /// * [`ParseError::TooLarge`] if the buffer (or the declared
    ///   Content-Length) exceeds the maximum request size. Raised before
    ///   any handler can run.
    /// * [`ParseError::Malformed`] for a broken request line, unsupported
    ///   method, non-HTTP version marker or an invalid header line.
    pub fn parse(&self, buf: &[u8]) -> Result<ParseStatus, ParseError> {
        if buf.len() > self.max_request_size {
            return Err(ParseError::TooLarge);
        }

        let Some(head_end) = find_head_end(buf) else {
            // A head that fills the whole budget can never terminate.
            if buf.len() >= self.max_request_size {
                return Err(ParseError::TooLarge);
            }
            return Ok(ParseStatus::Incomplete);
        };

        let head = std::str::from_utf8(&buf[..head_end])
            .map_err(|_| ParseError::Malformed("head is not valid UTF-8".into()))?;
        let mut lines = head.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l));

        let request_line = lines.next().unwrap_or("");
        let (method, path, query_params) = parse_request_line(request_line)?;

        let mut headers = HashMap::new();
        for line in lines {
            if line.is_empty() {
                continue;
            }
            let Some((name, value)) = line.split_once(':') else {
                return Err(ParseError::Malformed(format!(
                    "header line without ':': {line:?}"
                )));
            };
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }

        let content_length = match headers.get("content-length") {
            Some(v) => v
                .parse::<usize>()
                .map_err(|_| ParseError::Malformed(format!("invalid Content-Length: {v:?}")))?,
            None => 0,
        };

        // Only body-bearing methods read the declared length; a GET with a
        // Content-Length header still yields an empty body.
        let body_len = if method_allows_body(&method) {
            content_length
        } else {
            0
        };

        if body_len > self.max_request_size || head_end + body_len > self.max_request_size {
            return Err(ParseError::TooLarge);
        }
        if buf.len() < head_end + body_len {
            return Ok(ParseStatus::Incomplete);
        }

        let body = buf[head_end..head_end + body_len].to_vec();
        let consumed = head_end + body_len;

        debug!(
            method = %method,
            path = %path,
            query_count = query_params.len(),
            header_count = headers.len(),
            body_len = body.len(),
            "HTTP request parsed"
        );

        Ok(ParseStatus::Complete {
            request: Request {
                method,
                path,
                query_params,
                headers,
                body,
            },
            consumed,
        })
    }
}

/// Find the end of the header block: the byte offset just past the blank
/// line. Headers may be CRLF- or bare-LF-terminated.
fn find_head_end(buf: &[u8]) -> Option<usize> {
    let crlf = buf.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4);
    let lf = buf.windows(2).position(|w| w == b"\n\n").map(|i| i + 2);
    match (crlf, lf) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn parse_request_line(
    line: &str,
) -> Result<(Method, String, HashMap<String, String>), ParseError> {
    let mut parts = line.split_whitespace();
    let (Some(method), Some(target), Some(version), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(ParseError::Malformed(format!(
            "request line must be 'METHOD PATH VERSION', got {line:?}"
        )));
    };

    if !version.starts_with("HTTP/") {
        return Err(ParseError::Malformed(format!(
            "unrecognized protocol version: {version:?}"
        )));
    }

    let method = method
        .parse::<Method>()
        .ok()
        .filter(|m| SUPPORTED_METHODS.contains(m))
        .ok_or_else(|| ParseError::Malformed(format!("unsupported method: {line:?}")))?;

    let (path, query) = match target.split_once('?') {
        Some((p, q)) => (p, q),
        None => (target, ""),
    };

    Ok((method, path.to_string(), parse_query_string(query)))
}

/// Parse an `&`-delimited query string with percent-decoding applied to
/// keys and values. A pair without `=` becomes a key with an empty value;
/// duplicate keys keep the last value.
#[must_use]
pub fn parse_query_string(query: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn method_allows_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::DELETE)
}
