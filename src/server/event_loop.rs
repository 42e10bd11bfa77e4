//! The connection multiplexer: a single-threaded, readiness-driven event
//! loop servicing every socket cooperatively.
//!
//! Each iteration polls for readable sockets (new connections or new
//! bytes), feeds complete requests through CORS interception, routing and
//! the matched handler, then runs a tick phase that re-enters streaming
//! handlers, drains SSE queues and flushes pending writes. No iteration
//! ever blocks on a single connection's I/O; partial writes resume on the
//! next tick, and a failed socket tears down only its own connection.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use http::Method;
use mio::net::TcpListener;
use mio::{Events, Interest, Poll, Registry, Token};
use tracing::{debug, error, info, warn};

use crate::cors::CorsConfig;
use crate::error::{HttpError, ParseError};
use crate::router::{RouteOutcome, Router, StreamHandler};
use crate::server::conn::{ConnState, Connection, SseStream};
use crate::server::{ParseStatus, Request, RequestParser, Response, ServerConfig};
use crate::sse;

const LISTENER: Token = Token(0);

/// The HTTP server: configuration, routing table and optional CORS
/// policy, consumed by [`HttpServer::run`] or [`HttpServer::start`].
pub struct HttpServer {
    config: ServerConfig,
    router: Router,
    cors: Option<CorsConfig>,
}

impl HttpServer {
    /// Create a server from a configuration and a routing table built at
    /// startup. Without [`HttpServer::with_cors`] the CORS engine is
    /// inert and OPTIONS requests route normally.
    #[must_use]
    pub fn new(config: ServerConfig, router: Router) -> Self {
        Self {
            config,
            router,
            cors: None,
        }
    }

    /// Install a CORS policy. Read-only once serving begins.
    #[must_use]
    pub fn with_cors(mut self, cors: CorsConfig) -> Self {
        self.cors = Some(cors);
        self
    }

    /// Bind and serve on the calling thread until the process exits.
    ///
    /// # Errors
    ///
    /// Propagates bind/poll failures; per-connection errors never
    /// surface here.
    pub fn run(self) -> io::Result<()> {
        let listener = self.bind()?;
        self.event_loop(listener, Arc::new(AtomicBool::new(false)))
    }

    /// Bind, then serve on a background thread. The returned handle
    /// exposes the bound address (useful with port 0) and a graceful
    /// stop checked once per tick.
    ///
    /// # Errors
    ///
    /// Propagates bind failures and thread-spawn failures.
    pub fn start(self) -> io::Result<ServerHandle> {
        let listener = self.bind()?;
        let addr = listener.local_addr()?;
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let handle = thread::Builder::new()
            .name("microhttp".to_string())
            .spawn(move || self.event_loop(listener, flag))?;
        Ok(ServerHandle {
            addr,
            shutdown,
            handle,
        })
    }

    fn bind(&self) -> io::Result<TcpListener> {
        let addr: SocketAddr = self
            .config
            .addr
            .parse()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        TcpListener::bind(addr)
    }

    fn event_loop(self, mut listener: TcpListener, shutdown: Arc<AtomicBool>) -> io::Result<()> {
        let mut poll = Poll::new()?;
        let mut events = Events::with_capacity(128);
        poll.registry()
            .register(&mut listener, LISTENER, Interest::READABLE)?;

        let parser = RequestParser::new(self.config.max_request_size);
        let mut conns: HashMap<Token, Connection> = HashMap::new();
        let mut next_token: usize = 1;

        info!(addr = %listener.local_addr()?, "server listening");

        while !shutdown.load(Ordering::Relaxed) {
            if let Err(e) = poll.poll(&mut events, Some(self.config.tick_interval)) {
                if e.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(e);
            }

            for event in events.iter() {
                match event.token() {
                    LISTENER => {
                        accept_all(&mut listener, poll.registry(), &mut conns, &mut next_token);
                    }
                    token => {
                        if let Some(conn) = conns.get_mut(&token) {
                            if event.is_readable() {
                                read_ready(conn, &parser, &self.router, &self.cors);
                            }
                        }
                    }
                }
            }

            // Tick phase: streaming callbacks, queue draining, flushing
            // and teardown of drained Closing connections. Runs for every
            // connection each iteration so nobody with pending writable
            // data is starved.
            let registry = poll.registry();
            conns.retain(|_, conn| tick_connection(conn, &self.config, registry));
        }

        info!("server shutting down");
        Ok(())
    }
}

/// Handle to a server running on a background thread.
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    handle: thread::JoinHandle<io::Result<()>>,
}

impl ServerHandle {
    /// The actual bound address (resolves port 0).
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait for the server to accept connections.
    ///
    /// Polls the bound address with short connect attempts; useful in
    /// tests to avoid races with the loop starting up.
    ///
    /// # Errors
    ///
    /// `TimedOut` if the server is not reachable within ~250 ms.
    pub fn wait_ready(&self) -> io::Result<()> {
        for _ in 0..50 {
            if std::net::TcpStream::connect(self.addr).is_ok() {
                return Ok(());
            }
            thread::sleep(Duration::from_millis(5));
        }
        Err(io::Error::new(io::ErrorKind::TimedOut, "server not ready"))
    }

    /// Request shutdown and wait for the loop to exit.
    ///
    /// # Errors
    ///
    /// Propagates the loop's exit error, or reports a panicked server
    /// thread.
    pub fn stop(self) -> io::Result<()> {
        self.shutdown.store(true, Ordering::Relaxed);
        match self.handle.join() {
            Ok(result) => result,
            Err(_) => Err(io::Error::other("server thread panicked")),
        }
    }
}

fn accept_all(
    listener: &mut TcpListener,
    registry: &Registry,
    conns: &mut HashMap<Token, Connection>,
    next_token: &mut usize,
) {
    loop {
        match listener.accept() {
            Ok((mut stream, peer)) => {
                let token = Token(*next_token);
                *next_token += 1;
                let _ = stream.set_nodelay(true);
                if let Err(e) =
                    registry.register(&mut stream, token, Interest::READABLE | Interest::WRITABLE)
                {
                    warn!(peer = %peer, error = %e, "failed to register connection");
                    continue;
                }
                info!(peer = %peer, "connection accepted");
                conns.insert(token, Connection::new(stream, peer));
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(error = %e, "accept failed");
                break;
            }
        }
    }
}

/// Drain the socket and feed the parser. EOF and socket errors move the
/// connection towards teardown without touching any other connection.
fn read_ready(
    conn: &mut Connection,
    parser: &RequestParser,
    router: &Router,
    cors: &Option<CorsConfig>,
) {
    match conn.fill_read_buf() {
        Ok(true) => {}
        Ok(false) => {
            // Peer closed its end. Requests it sent before the half-close
            // are still answered; the flushed connection is then dropped.
            debug!(peer = %conn.peer, "peer disconnected");
            if conn.state == ConnState::Reading && !conn.read_buf.is_empty() {
                process_buffered(conn, parser, router, cors);
            }
            conn.sse = None;
            conn.state = ConnState::Closing;
            return;
        }
        Err(e) => {
            warn!(peer = %conn.peer, error = %e, "connection read failed");
            conn.sse = None;
            conn.write_buf.clear();
            conn.write_pos = 0;
            conn.state = ConnState::Closing;
            return;
        }
    }

    if conn.state != ConnState::Reading {
        // Stream clients have nothing to say and a closing connection has
        // no next request; discard whatever arrives so the read buffer
        // stays bounded.
        conn.read_buf.clear();
        return;
    }

    process_buffered(conn, parser, router, cors);
}

/// Parse and dispatch every complete request currently buffered, then
/// apply the close-after-response default. Pipelined requests that were
/// already received are all answered before the connection closes.
fn process_buffered(
    conn: &mut Connection,
    parser: &RequestParser,
    router: &Router,
    cors: &Option<CorsConfig>,
) {
    let mut handled = false;
    while conn.state == ConnState::Reading {
        match parser.parse(&conn.read_buf) {
            Ok(ParseStatus::Incomplete) => break,
            Ok(ParseStatus::Complete { request, consumed }) => {
                conn.read_buf.drain(..consumed);
                handle_request(conn, request, router, cors);
                handled = true;
            }
            Err(err) => {
                warn!(peer = %conn.peer, error = %err, "request rejected");
                let message = match err {
                    ParseError::TooLarge => "Payload Too Large",
                    ParseError::Malformed(_) => "Bad Request",
                };
                let response: Response = HttpError::new(err.status(), message).into();
                conn.queue_bytes(&response.to_bytes());
                conn.read_buf.clear();
                conn.state = ConnState::Closing;
                return;
            }
        }
    }
    if handled && conn.state == ConnState::Reading {
        conn.state = ConnState::Closing;
    }
}

fn handle_request(
    conn: &mut Connection,
    request: Request,
    router: &Router,
    cors: &Option<CorsConfig>,
) {
    info!(
        peer = %conn.peer,
        method = %request.method,
        path = %request.path,
        "request received"
    );

    // CORS interception runs before routing: with a policy installed, an
    // OPTIONS request to any registered path is answered by the engine.
    if let Some(policy) = cors {
        if request.method == Method::OPTIONS && router.has_path(&request.path) {
            let response = match policy.preflight_response(&request) {
                Ok(response) => response,
                Err(err) => err.into(),
            };
            queue_response(conn, &request, cors, response);
            return;
        }
    }

    match router.match_route(&request.method, &request.path) {
        RouteOutcome::Streaming(handler) => begin_stream(conn, request, handler, cors),
        RouteOutcome::Handler(handler) => {
            let outcome = catch_unwind(AssertUnwindSafe(|| handler(&request)));
            let response = match outcome {
                Ok(Ok(response)) => response,
                Ok(Err(err)) => {
                    warn!(peer = %conn.peer, path = %request.path, error = %err, "handler error");
                    err.into()
                }
                Err(_) => {
                    // Detail stays in the log; the client only ever sees
                    // the generic 500 body.
                    error!(peer = %conn.peer, path = %request.path, "handler panicked");
                    HttpError::internal().into()
                }
            };
            queue_response(conn, &request, cors, response);
        }
        RouteOutcome::NotFound => {
            queue_response(conn, &request, cors, HttpError::not_found().into());
        }
        RouteOutcome::MethodNotAllowed(allow) => {
            let allow_value = allow
                .iter()
                .map(Method::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            let response =
                Response::from(HttpError::new(405, "Method Not Allowed")).header("Allow", allow_value);
            queue_response(conn, &request, cors, response);
        }
    }
}

fn queue_response(
    conn: &mut Connection,
    request: &Request,
    cors: &Option<CorsConfig>,
    mut response: Response,
) {
    if let Some(policy) = cors {
        policy.apply(request, &mut response);
    }
    info!(
        peer = %conn.peer,
        method = %request.method,
        path = %request.path,
        status = response.status,
        "response queued"
    );
    conn.queue_bytes(&response.to_bytes());
}

/// Transition a connection onto a long-lived event stream: write the
/// stream headers (no Content-Length, the stream is unbounded) and
/// attach the channel the tick handler will feed.
fn begin_stream(
    conn: &mut Connection,
    request: Request,
    handler: Arc<StreamHandler>,
    cors: &Option<CorsConfig>,
) {
    let mut head = String::from(
        "HTTP/1.1 200 OK\r\n\
         Content-Type: text/event-stream\r\n\
         Cache-Control: no-cache\r\n\
         Connection: keep-alive\r\n",
    );
    if let (Some(policy), Some(origin)) = (cors, request.header("origin")) {
        if let Some(allow_origin) = policy.allowed_origin(origin) {
            head.push_str(&format!("Access-Control-Allow-Origin: {allow_origin}\r\n"));
            if policy.allow_credentials {
                head.push_str("Access-Control-Allow-Credentials: true\r\n");
            }
        }
    }
    head.push_str("\r\n");
    conn.queue_bytes(head.as_bytes());

    let (sender, queue) = sse::channel();
    info!(peer = %conn.peer, path = %request.path, "event stream opened");
    conn.sse = Some(SseStream {
        request,
        handler,
        sender,
        queue,
    });
    conn.state = ConnState::Streaming;
}

/// One scheduler tick for one connection. Returns false when the
/// connection should be removed.
fn tick_connection(conn: &mut Connection, config: &ServerConfig, registry: &Registry) -> bool {
    if conn.state == ConnState::Streaming {
        // Backpressure: while the socket lags behind, neither invoke the
        // tick handler nor drain the queue. Enqueued events stay put;
        // none are dropped while the connection is open.
        if conn.pending_write() <= config.sse_high_water {
            let mut frames = Vec::new();
            let mut panicked = false;
            if let Some(stream) = &conn.sse {
                panicked =
                    catch_unwind(AssertUnwindSafe(|| (stream.handler)(&stream.request, &stream.sender)))
                        .is_err();
                if !panicked {
                    stream.queue.drain_into(&mut frames);
                }
            }
            if panicked {
                error!(peer = %conn.peer, "streaming handler panicked");
                conn.sse = None;
                conn.state = ConnState::Closing;
            } else if !frames.is_empty() {
                conn.queue_bytes(&frames);
            }
        }
    }

    if let Err(e) = conn.flush() {
        warn!(peer = %conn.peer, error = %e, "connection write failed");
        let _ = registry.deregister(&mut conn.stream);
        return false;
    }

    if conn.state == ConnState::Closing && conn.pending_write() == 0 {
        debug!(peer = %conn.peer, "connection closed");
        let _ = registry.deregister(&mut conn.stream);
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::TcpListener as StdTcpListener;

    fn connected_pair() -> (Connection, std::net::TcpStream) {
        let listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
        let peer = std::net::TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (accepted, addr) = listener.accept().unwrap();
        accepted.set_nonblocking(true).unwrap();
        let stream = mio::net::TcpStream::from_std(accepted);
        (Connection::new(stream, addr), peer)
    }

    #[test]
    fn test_closing_connection_discards_incoming_bytes() {
        // A peer that keeps sending while refusing to read its pending
        // response must not grow the read buffer past the request limit.
        let (mut conn, mut peer) = connected_pair();
        let parser = RequestParser::new(1024);
        let router = Router::new();
        conn.state = ConnState::Closing;
        conn.queue_bytes(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");

        let chunk = vec![b'A'; 8 * 1024];
        for _ in 0..8 {
            peer.write_all(&chunk).unwrap();
            std::thread::sleep(Duration::from_millis(5));
            read_ready(&mut conn, &parser, &router, &None);
            assert!(conn.read_buf.is_empty());
        }
        assert_eq!(conn.state, ConnState::Closing);
    }

    #[test]
    fn test_streaming_connection_discards_incoming_bytes() {
        let (mut conn, mut peer) = connected_pair();
        let parser = RequestParser::new(1024);
        let router = Router::new();
        conn.state = ConnState::Streaming;

        peer.write_all(b"GET /ignored HTTP/1.1\r\n\r\n").unwrap();
        std::thread::sleep(Duration::from_millis(5));
        read_ready(&mut conn, &parser, &router, &None);
        assert!(conn.read_buf.is_empty());
        assert_eq!(conn.state, ConnState::Streaming);
    }
}
