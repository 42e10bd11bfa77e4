use std::time::Duration;

/// Default bind address.
pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";

/// Default maximum request size in bytes (request line + headers + body).
pub const DEFAULT_MAX_REQUEST_SIZE: usize = 8192;

/// Default event-loop tick interval.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Default per-connection unsent-byte threshold above which SSE handler
/// ticks are suspended.
pub const DEFAULT_SSE_HIGH_WATER: usize = 64 * 1024;

/// Server configuration.
///
/// Built once by the caller and handed to [`crate::server::HttpServer`];
/// there is no global server state.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `"0.0.0.0:8080"`; port 0 picks an
    /// ephemeral port, useful in tests).
    pub addr: String,
    /// Maximum accepted request size; larger requests get a 413 and the
    /// connection is closed.
    pub max_request_size: usize,
    /// Poll timeout of the event loop. Also the cadence at which
    /// streaming handlers are re-invoked.
    pub tick_interval: Duration,
    /// Backpressure threshold for streaming connections: while a
    /// connection has more unsent bytes than this, its tick handler is
    /// not invoked and its event queue is left undrained.
    pub sse_high_water: usize,
}

impl ServerConfig {
    /// Create a configuration with the given bind address and defaults
    /// for everything else.
    #[must_use]
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            max_request_size: DEFAULT_MAX_REQUEST_SIZE,
            tick_interval: DEFAULT_TICK_INTERVAL,
            sse_high_water: DEFAULT_SSE_HIGH_WATER,
        }
    }

    /// Set the maximum request size in bytes.
    #[must_use]
    pub fn with_max_request_size(mut self, bytes: usize) -> Self {
        self.max_request_size = bytes;
        self
    }

    /// Set the event-loop tick interval.
    #[must_use]
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Set the SSE backpressure threshold in bytes.
    #[must_use]
    pub fn with_sse_high_water(mut self, bytes: usize) -> Self {
        self.sse_high_water = bytes;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ADDR)
    }
}
