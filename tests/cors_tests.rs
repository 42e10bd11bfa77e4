//! Tests for the CORS policy engine
//!
//! # Test Coverage
//!
//! - Origin matching: wildcard, exact lists, credentials interaction
//! - Header injection into ordinary responses
//! - Preflight answers: 204 with method/header/max-age advertisement
//! - Preflight rejection for missing or disallowed requested methods

use std::collections::HashMap;

use http::Method;
use microhttp::cors::is_preflight;
use microhttp::{CorsConfig, Request, Response};

fn request_with_headers(method: Method, headers: &[(&str, &str)]) -> Request {
    Request {
        method,
        path: "/api".to_string(),
        query_params: HashMap::new(),
        headers: headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        body: Vec::new(),
    }
}

#[test]
fn test_wildcard_reflects_star() {
    let cors = CorsConfig::new();
    assert_eq!(cors.allowed_origin("http://a.example"), Some("*".to_string()));
}

#[test]
fn test_wildcard_with_credentials_echoes_origin() {
    // `*` with credentials is forbidden by the CORS protocol; the literal
    // origin is echoed instead.
    let cors = CorsConfig::new().allow_credentials(true);
    assert_eq!(
        cors.allowed_origin("http://a.example"),
        Some("http://a.example".to_string())
    );
}

#[test]
fn test_exact_origin_list() {
    let cors = CorsConfig::new().allow_origins(["http://a.example"]);
    assert_eq!(
        cors.allowed_origin("http://a.example"),
        Some("http://a.example".to_string())
    );
    assert_eq!(cors.allowed_origin("http://b.example"), None);
}

#[test]
fn test_apply_adds_origin_headers() {
    let cors = CorsConfig::new()
        .allow_origins(["http://a.example"])
        .allow_credentials(true);
    let req = request_with_headers(Method::GET, &[("origin", "http://a.example")]);
    let mut res = Response::text("ok");
    cors.apply(&req, &mut res);

    assert_eq!(
        res.get_header("Access-Control-Allow-Origin"),
        Some("http://a.example")
    );
    assert_eq!(res.get_header("Access-Control-Allow-Credentials"), Some("true"));
}

#[test]
fn test_apply_skips_disallowed_origin() {
    let cors = CorsConfig::new().allow_origins(["http://a.example"]);
    let req = request_with_headers(Method::GET, &[("origin", "http://evil.example")]);
    let mut res = Response::text("ok");
    cors.apply(&req, &mut res);
    assert_eq!(res.get_header("Access-Control-Allow-Origin"), None);
}

#[test]
fn test_apply_without_origin_is_noop() {
    let cors = CorsConfig::new();
    let req = request_with_headers(Method::GET, &[]);
    let mut res = Response::text("ok");
    cors.apply(&req, &mut res);
    assert!(res.get_header("Access-Control-Allow-Origin").is_none());
}

#[test]
fn test_preflight_response() {
    let cors = CorsConfig::new()
        .allow_origins(["http://a.example"])
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(["Content-Type", "Authorization"])
        .max_age(3600);
    let req = request_with_headers(
        Method::OPTIONS,
        &[
            ("origin", "http://a.example"),
            ("access-control-request-method", "POST"),
        ],
    );

    let res = cors.preflight_response(&req).unwrap();
    assert_eq!(res.status, 204);
    assert_eq!(
        res.get_header("Access-Control-Allow-Methods"),
        Some("GET, POST, OPTIONS")
    );
    assert_eq!(
        res.get_header("Access-Control-Allow-Headers"),
        Some("Content-Type, Authorization")
    );
    assert_eq!(res.get_header("Access-Control-Max-Age"), Some("3600"));
    assert_eq!(
        res.get_header("Access-Control-Allow-Origin"),
        Some("http://a.example")
    );
}

#[test]
fn test_preflight_rejects_disallowed_method() {
    let cors = CorsConfig::new().allow_methods([Method::GET]);
    let req = request_with_headers(
        Method::OPTIONS,
        &[("access-control-request-method", "DELETE")],
    );
    let err = cors.preflight_response(&req).unwrap_err();
    assert_eq!(err.status, 400);
    assert_eq!(err.message, "Invalid preflight request");
}

#[test]
fn test_preflight_rejects_missing_request_method() {
    let cors = CorsConfig::new();
    let req = request_with_headers(Method::OPTIONS, &[("origin", "http://a.example")]);
    assert_eq!(cors.preflight_response(&req).unwrap_err().status, 400);
}

#[test]
fn test_is_preflight() {
    let preflight = request_with_headers(
        Method::OPTIONS,
        &[("access-control-request-method", "GET")],
    );
    assert!(is_preflight(&preflight));

    let plain_options = request_with_headers(Method::OPTIONS, &[]);
    assert!(!is_preflight(&plain_options));

    let get = request_with_headers(Method::GET, &[("access-control-request-method", "GET")]);
    assert!(!is_preflight(&get));
}
