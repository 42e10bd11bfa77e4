//! Tests for response serialization
//!
//! Exercises the wire format produced by `Response::to_bytes`: status
//! line and reason phrase, default Content-Type per body kind, computed
//! Content-Length, the Server banner and error conversion.

use microhttp::server::{reason_phrase, Body, Response, SERVER_BANNER};
use microhttp::HttpError;
use serde_json::json;

fn wire(res: &Response) -> String {
    String::from_utf8(res.to_bytes()).unwrap()
}

#[test]
fn test_status_line_and_reason_phrase() {
    let out = wire(&Response::empty(204));
    assert!(out.starts_with("HTTP/1.1 204 No Content\r\n"), "{out}");
}

#[test]
fn test_unknown_status_reason() {
    assert_eq!(reason_phrase(299), "Unknown");
    let out = wire(&Response::empty(299));
    assert!(out.starts_with("HTTP/1.1 299 Unknown\r\n"));
}

#[test]
fn test_text_body_defaults() {
    let out = wire(&Response::text("<h1>hi</h1>"));
    assert!(out.contains("Content-Type: text/html\r\n"));
    assert!(out.contains("Content-Length: 11\r\n"));
    assert!(out.ends_with("\r\n\r\n<h1>hi</h1>"));
}

#[test]
fn test_json_body_defaults() {
    let res = Response::json(json!({"ok": true}));
    let out = wire(&res);
    assert!(out.contains("Content-Type: application/json\r\n"));
    assert!(out.ends_with("{\"ok\":true}"));
}

#[test]
fn test_explicit_content_type_wins() {
    let res = Response::text("body").header("Content-Type", "text/plain");
    let out = wire(&res);
    assert!(out.contains("Content-Type: text/plain\r\n"));
    assert!(!out.contains("text/html"));
}

#[test]
fn test_empty_body_still_has_content_length() {
    let out = wire(&Response::empty(204));
    assert!(out.contains("Content-Length: 0\r\n"));
}

#[test]
fn test_server_banner_present() {
    let out = wire(&Response::text("x"));
    assert!(out.contains(&format!("Server: {SERVER_BANNER}\r\n")));
}

#[test]
fn test_bytes_body_keeps_given_content_type() {
    let res = Response::bytes(b"p { color: red }".to_vec(), "text/css");
    let out = wire(&res);
    assert!(out.contains("Content-Type: text/css\r\n"));
    assert!(out.ends_with("p { color: red }"));
}

#[test]
fn test_error_conversion_produces_json_body() {
    let res: Response = HttpError::new(404, "Not Found").into();
    assert_eq!(res.status, 404);
    assert_eq!(res.body, Body::Json(json!({"error": "Not Found"})));
    let out = wire(&res);
    assert!(out.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert!(out.ends_with("{\"error\":\"Not Found\"}"));
}

#[test]
fn test_header_ordering_preserved() {
    let res = Response::text("x").header("X-First", "1").header("X-Second", "2");
    let out = wire(&res);
    let first = out.find("X-First").unwrap();
    let second = out.find("X-Second").unwrap();
    assert!(first < second);
}
