//! Request context for the middleware pipeline.

use std::any::Any;
use std::cell::Cell;
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Instant;

use chrono::{DateTime, Local};

/// Request context shared across middleware and the downstream handler.
///
/// Context carries request-scoped data through the pipeline:
/// - Client origin (peer IP, resolved client key, optional identity)
/// - Timing information (monotonic start, wall-clock arrival)
/// - Response headers to add
/// - Custom key-value storage for middleware communication
pub struct Context {
    /// Direct peer IP address.
    pub client_ip: IpAddr,

    /// Client identifier used as the rate-limit partition key:
    /// first X-Forwarded-For value, else the peer address.
    pub client_key: String,

    /// Identity resolved by an upstream auth proxy, if any.
    pub user: Option<String>,

    /// Short request ID for logging.
    pub request_id: String,

    /// Monotonic request start time.
    pub started_at: Instant,

    /// Wall-clock arrival time, local timezone.
    pub received_at: DateTime<Local>,

    /// Response headers to add (pre-sized for typical usage).
    response_headers: HashMap<String, String>,

    /// Custom key-value storage for middleware.
    values: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl Context {
    /// Create a new context keyed by the direct peer address.
    #[inline]
    pub fn new(client_ip: IpAddr) -> Self {
        Self {
            client_ip,
            client_key: client_ip.to_string(),
            user: None,
            request_id: generate_request_id(),
            started_at: Instant::now(),
            received_at: Local::now(),
            response_headers: HashMap::with_capacity(4),
            values: HashMap::new(),
        }
    }

    /// Create a context builder for more control.
    #[inline]
    pub fn builder(client_ip: IpAddr) -> ContextBuilder {
        ContextBuilder::new(client_ip)
    }

    /// Set a custom value.
    #[inline]
    pub fn set<T: Send + Sync + 'static>(&mut self, key: &str, value: T) {
        self.values.insert(key.to_string(), Box::new(value));
    }

    /// Get a custom value.
    #[inline]
    pub fn get<T: 'static>(&self, key: &str) -> Option<&T> {
        self.values.get(key).and_then(|v| v.downcast_ref())
    }

    /// Remove a custom value.
    #[inline]
    pub fn remove<T: 'static>(&mut self, key: &str) -> Option<T> {
        self.values
            .remove(key)
            .and_then(|v| v.downcast().ok())
            .map(|b| *b)
    }

    /// Add a response header.
    #[inline]
    pub fn set_response_header(&mut self, name: impl Into<String>, value: impl ToString) {
        self.response_headers.insert(name.into(), value.to_string());
    }

    /// Get all response headers to add.
    #[inline]
    pub fn response_headers(&self) -> &HashMap<String, String> {
        &self.response_headers
    }

    /// Get elapsed time since request started.
    #[inline]
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    /// Get elapsed time in milliseconds.
    #[inline]
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed().as_secs_f64() * 1000.0
    }
}

/// Builder for creating Context with more control.
pub struct ContextBuilder {
    client_ip: IpAddr,
    client_key: Option<String>,
    user: Option<String>,
    received_at: Option<DateTime<Local>>,
}

impl ContextBuilder {
    /// Create a new context builder.
    #[inline]
    pub fn new(client_ip: IpAddr) -> Self {
        Self {
            client_ip,
            client_key: None,
            user: None,
            received_at: None,
        }
    }

    /// Set the client key (defaults to the peer address).
    #[inline]
    pub fn client_key(mut self, key: impl Into<String>) -> Self {
        self.client_key = Some(key.into());
        self
    }

    /// Set the resolved user identity.
    #[inline]
    pub fn user(mut self, user: Option<String>) -> Self {
        self.user = user;
        self
    }

    /// Set the wall-clock arrival time (defaults to now).
    #[inline]
    pub fn received_at(mut self, at: DateTime<Local>) -> Self {
        self.received_at = Some(at);
        self
    }

    /// Build the context.
    #[inline]
    pub fn build(self) -> Context {
        Context {
            client_ip: self.client_ip,
            client_key: self
                .client_key
                .unwrap_or_else(|| self.client_ip.to_string()),
            user: self.user,
            request_id: generate_request_id(),
            started_at: Instant::now(),
            received_at: self.received_at.unwrap_or_else(Local::now),
            response_headers: HashMap::with_capacity(4),
            values: HashMap::new(),
        }
    }
}

// ============================================================================
// Fast random ID generation with thread-local state
// ============================================================================

thread_local! {
    static RNG_STATE: Cell<u64> = Cell::new(init_rng_seed());
}

/// Initialize RNG seed from system entropy.
fn init_rng_seed() -> u64 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};
    use std::time::{SystemTime, UNIX_EPOCH};

    let state = RandomState::new();
    let mut hasher = state.build_hasher();
    hasher.write_u64(
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64,
    );
    hasher.finish()
}

/// Fast random u64 using thread-local xorshift64.
#[inline]
fn rand_u64() -> u64 {
    RNG_STATE.with(|state| {
        let mut x = state.get();
        // xorshift64 algorithm
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        state.set(x);
        x
    })
}

/// Generate a random request ID (16 hex chars).
#[inline]
pub fn generate_request_id() -> String {
    use std::fmt::Write;

    let mut id = String::with_capacity(16);
    let _ = write!(id, "{:016x}", rand_u64());
    id
}
