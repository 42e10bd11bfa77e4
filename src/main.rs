//! Demo server binary.
//!
//! Wires up a handful of routes (HTML greeting, JSON echo, a static
//! stylesheet and an SSE ticker), a CORS policy and structured logging,
//! then serves on the calling thread until killed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use clap::Parser;
use http::Method;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use microhttp::server::{HttpServer, Response, ServerConfig, DEFAULT_ADDR};
use microhttp::{CorsConfig, HttpError, Router, StaticFiles};

#[derive(Parser)]
#[command(
    name = "microhttp",
    version,
    about = "Single-threaded, poll-driven HTTP/1.1 demo server"
)]
struct Cli {
    /// Address to bind, e.g. 127.0.0.1:8080
    #[arg(long, default_value = DEFAULT_ADDR)]
    addr: String,

    /// Maximum request size in bytes (larger requests get a 413)
    #[arg(long, default_value_t = 16384)]
    max_request_size: usize,

    /// Directory the /static routes serve from
    #[arg(long, default_value = "static")]
    static_dir: String,

    /// Log filter, e.g. "info" or "microhttp=debug"
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Serialize)]
struct DataReply {
    message: &'static str,
    data: serde_json::Value,
    query_params: HashMap<String, String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut router = Router::new();

    router.register(&[Method::GET], "/", |req| {
        let name = req.query_param("name").unwrap_or("Guest");
        Ok(Response::text(format!("<h1>Welcome to microhttp, {name}!</h1>")))
    })?;

    router.register(&[Method::GET, Method::POST], "/api/data", |req| {
        if req.header("content-type") != Some("application/json") {
            return Err(HttpError::bad_request("Invalid Content-Type"));
        }
        let data = req
            .json_body()
            .ok_or_else(|| HttpError::bad_request("Invalid JSON body"))?;
        let reply = DataReply {
            message: "Data received",
            data,
            query_params: req.query_params.clone(),
        };
        let value = serde_json::to_value(reply).map_err(|_| HttpError::internal())?;
        Ok(Response::json(value))
    })?;

    let files = StaticFiles::new(&cli.static_dir);
    router.register(&[Method::GET], "/static/style.css", move |_req| {
        Ok(files.response("style.css"))
    })?;

    let ticks = AtomicU64::new(0);
    router.register_streaming("/events", move |_req, tx| {
        let n = ticks.fetch_add(1, Ordering::Relaxed);
        tx.send("tick", format!("tick {n}"));
    })?;

    let cors = CorsConfig::new()
        .allow_origins(["http://localhost:3000", "https://example.com"])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(["Content-Type", "Authorization"])
        .allow_credentials(true)
        .max_age(3600);

    let config = ServerConfig::new(cli.addr).with_max_request_size(cli.max_request_size);
    info!("starting demo server");
    HttpServer::new(config, router).with_cors(cors).run()?;
    Ok(())
}
