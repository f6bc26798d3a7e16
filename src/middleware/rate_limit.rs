//! Rate limiting middleware.
//!
//! Per-client rate limiting for message sends using a sliding window
//! event log. Each admitted POST is recorded with its arrival timestamp;
//! a request is denied once the configured number of events already sits
//! inside the window ending at its own arrival time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::config::GatesConfig;
use crate::core::{Context, Request, Response};

use super::{Middleware, MiddlewareResult, DENIED_BY};

/// Outcome of an admission check.
#[derive(Debug)]
pub struct RateLimitResult {
    /// Whether the request is allowed.
    pub allowed: bool,
    /// Events in the log for this key after the check (including the
    /// just-admitted one when allowed).
    pub count: usize,
    /// Seconds until the oldest in-window event expires.
    pub retry_after_secs: u64,
}

/// Storage for per-client event timestamps.
///
/// The single `admit` operation covers prune, check, and append so that
/// two concurrent requests can never both observe `count = max - 1` and
/// both be admitted. Implementations over a shared backend make the
/// limiter usable across server instances.
pub trait EventStore: Send + Sync {
    /// Atomically prune events older than `window`, compare the remaining
    /// count against `max_events`, and record `now` when admitted.
    fn admit(
        &self,
        key: &str,
        now: Instant,
        window: Duration,
        max_events: usize,
    ) -> RateLimitResult;
}

/// In-process event store: a mutex-guarded map from client key to an
/// insertion-ordered list of event timestamps. State is process-local
/// and resets on restart.
#[derive(Default)]
pub struct MemoryEventStore {
    events: Mutex<HashMap<String, Vec<Instant>>>,
}

impl MemoryEventStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventStore for MemoryEventStore {
    fn admit(
        &self,
        key: &str,
        now: Instant,
        window: Duration,
        max_events: usize,
    ) -> RateLimitResult {
        let mut events = self.events.lock().unwrap();
        let log = events.entry(key.to_string()).or_default();

        // Strictly-newer-than-cutoff events stay; an event exactly at the
        // cutoff ages out.
        log.retain(|&t| now.duration_since(t) < window);

        let retry_after = log
            .first()
            .map(|&oldest| window.saturating_sub(now.duration_since(oldest)))
            .unwrap_or(window);

        if log.len() >= max_events {
            RateLimitResult {
                allowed: false,
                count: log.len(),
                retry_after_secs: retry_after.as_secs().max(1),
            }
        } else {
            log.push(now);
            RateLimitResult {
                allowed: true,
                count: log.len(),
                retry_after_secs: retry_after.as_secs().max(1),
            }
        }
    }
}

/// Sliding-window rate limiter over an injected event store.
pub struct SlidingWindowLimiter {
    store: Arc<dyn EventStore>,
    max_events: usize,
    window: Duration,
}

impl SlidingWindowLimiter {
    /// Create a limiter backed by an in-process store.
    pub fn new(max_events: usize, window_secs: u64) -> Self {
        Self::with_store(Arc::new(MemoryEventStore::new()), max_events, window_secs)
    }

    /// Create a limiter over a caller-provided store.
    pub fn with_store(store: Arc<dyn EventStore>, max_events: usize, window_secs: u64) -> Self {
        Self {
            store,
            max_events,
            window: Duration::from_secs(window_secs),
        }
    }

    /// Get the maximum event count.
    pub fn max_events(&self) -> usize {
        self.max_events
    }

    /// Get the window duration in seconds.
    pub fn window_secs(&self) -> u64 {
        self.window.as_secs()
    }

    /// Check whether an event from `key` arriving at `now` is admitted.
    pub fn check(&self, key: &str, now: Instant) -> RateLimitResult {
        self.store.admit(key, now, self.window, self.max_events)
    }
}

/// Rate limiting middleware.
///
/// Applies only to POST requests on the configured message-send paths.
/// Returns 429 Too Many Requests when the client's event count inside
/// the sliding window reaches the limit. Allowed requests pass through
/// unchanged, with no added headers.
pub struct RateLimitMiddleware {
    limiter: SlidingWindowLimiter,
    paths: Vec<String>,
}

impl RateLimitMiddleware {
    /// Create a new rate limit middleware.
    pub fn new(max_events: usize, window_secs: u64, paths: Vec<String>) -> Self {
        Self {
            limiter: SlidingWindowLimiter::new(max_events, window_secs),
            paths,
        }
    }

    /// Create from gate configuration.
    /// Returns None if rate limiting is not configured.
    pub fn from_config(config: &GatesConfig) -> Option<Self> {
        config
            .rate_limit
            .map(|max| Self::new(max, config.rate_window, config.rate_limit_paths.clone()))
    }

    /// Whether this request is subject to rate limiting.
    fn applies(&self, req: &Request) -> bool {
        *req.method() == http::Method::POST
            && self.paths.iter().any(|p| req.path().starts_with(p.as_str()))
    }
}

impl Middleware for RateLimitMiddleware {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    fn priority(&self) -> i32 {
        -80 // After the time gate: denied-hours requests never consume quota
    }

    fn on_request(&self, req: Request, ctx: &mut Context) -> MiddlewareResult {
        if !self.applies(&req) {
            return MiddlewareResult::Next(req);
        }

        let result = self.limiter.check(&ctx.client_key, ctx.started_at);

        if result.allowed {
            MiddlewareResult::Next(req)
        } else {
            tracing::debug!(
                client = %ctx.client_key,
                limit = self.limiter.max_events(),
                window = self.limiter.window_secs(),
                retry_after = result.retry_after_secs,
                "rate limit exceeded"
            );

            ctx.set(DENIED_BY, self.name());

            let body = format!(
                "Rate limit exceeded: at most {} messages per {} seconds from one client. Try again in {}s.",
                self.limiter.max_events(),
                self.limiter.window_secs(),
                result.retry_after_secs,
            );

            MiddlewareResult::Stop(Response::too_many_requests(
                body,
                result.retry_after_secs,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn at(base: Instant, secs: u64) -> Instant {
        base + Duration::from_secs(secs)
    }

    fn create_context(key: &str) -> Context {
        Context::builder(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)))
            .client_key(key)
            .build()
    }

    fn post_request(path: &str) -> Request {
        Request::new(
            http::Method::POST,
            path.parse().unwrap(),
            http::HeaderMap::new(),
            bytes::Bytes::new(),
        )
    }

    fn get_request(path: &str) -> Request {
        Request::new(
            http::Method::GET,
            path.parse().unwrap(),
            http::HeaderMap::new(),
            bytes::Bytes::new(),
        )
    }

    #[test]
    fn test_allows_up_to_limit_then_denies() {
        let limiter = SlidingWindowLimiter::new(5, 60);
        let base = Instant::now();

        for i in 0..5 {
            let result = limiter.check("client", at(base, i));
            assert!(result.allowed, "event {} should be admitted", i);
            assert_eq!(result.count, i as usize + 1);
        }

        let result = limiter.check("client", at(base, 5));
        assert!(!result.allowed);
        assert_eq!(result.count, 5, "denied request must not be recorded");
    }

    #[test]
    fn test_window_slides_past_oldest_events() {
        let limiter = SlidingWindowLimiter::new(5, 60);
        let base = Instant::now();

        for i in 0..5 {
            assert!(limiter.check("client", at(base, i)).allowed);
        }
        assert!(!limiter.check("client", at(base, 5)).allowed);

        // 61s after the first event: the events at 0 and 1 have aged out
        // (1 sits exactly at the cutoff), so there is room again.
        let result = limiter.check("client", at(base, 61));
        assert!(result.allowed);
        assert_eq!(result.count, 4); // events at 2, 3, 4 plus the new one
    }

    #[test]
    fn test_fully_idle_window_clears_log() {
        let limiter = SlidingWindowLimiter::new(5, 60);
        let base = Instant::now();

        for i in 0..5 {
            assert!(limiter.check("client", at(base, i)).allowed);
        }

        let result = limiter.check("client", at(base, 70));
        assert!(result.allowed);
        assert_eq!(result.count, 1);
    }

    #[test]
    fn test_event_exactly_at_cutoff_is_evicted() {
        let limiter = SlidingWindowLimiter::new(1, 60);
        let base = Instant::now();

        assert!(limiter.check("client", base).allowed);
        assert!(!limiter.check("client", at(base, 59)).allowed);
        // 60s later the first event is exactly at the cutoff and evicted.
        assert!(limiter.check("client", at(base, 60)).allowed);
    }

    #[test]
    fn test_distinct_keys_have_independent_counters() {
        let limiter = SlidingWindowLimiter::new(2, 60);
        let base = Instant::now();

        assert!(limiter.check("key-a", base).allowed);
        assert!(limiter.check("key-a", base).allowed);
        assert!(!limiter.check("key-a", base).allowed);

        assert!(limiter.check("key-b", base).allowed);
        assert!(limiter.check("key-b", base).allowed);
        assert!(!limiter.check("key-b", base).allowed);
    }

    #[test]
    fn test_retry_after_tracks_oldest_event() {
        let limiter = SlidingWindowLimiter::new(2, 60);
        let base = Instant::now();

        assert!(limiter.check("client", base).allowed);
        assert!(limiter.check("client", at(base, 10)).allowed);

        let result = limiter.check("client", at(base, 30));
        assert!(!result.allowed);
        // Oldest event is 30s old, so the window frees up in 30s.
        assert_eq!(result.retry_after_secs, 30);
    }

    #[test]
    fn test_no_over_admission_under_concurrency() {
        let limiter = Arc::new(SlidingWindowLimiter::new(5, 60));
        let now = Instant::now();
        let admitted = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                let admitted = Arc::clone(&admitted);
                std::thread::spawn(move || {
                    if limiter.check("shared", now).allowed {
                        admitted.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(admitted.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_get_requests_not_limited() {
        let mw = RateLimitMiddleware::new(1, 60, vec!["/api/messages/".to_string()]);
        let mut ctx = create_context("client");

        for _ in 0..10 {
            let result = mw.on_request(get_request("/api/messages/"), &mut ctx);
            assert!(result.is_next());
        }
    }

    #[test]
    fn test_unguarded_paths_not_limited() {
        let mw = RateLimitMiddleware::new(1, 60, vec!["/api/messages/".to_string()]);
        let mut ctx = create_context("client");

        for _ in 0..10 {
            let result = mw.on_request(post_request("/api/conversations/"), &mut ctx);
            assert!(result.is_next());
        }
    }

    #[test]
    fn test_denies_post_over_limit() {
        let mw = RateLimitMiddleware::new(3, 60, vec!["/api/messages/".to_string()]);

        for i in 0..3 {
            let mut ctx = create_context("client");
            let result = mw.on_request(post_request("/api/messages/"), &mut ctx);
            assert!(result.is_next(), "request {} should be allowed", i);
        }

        let mut ctx = create_context("client");
        let result = mw.on_request(post_request("/api/messages/"), &mut ctx);
        assert!(result.is_stop());
        assert_eq!(ctx.get::<&'static str>(DENIED_BY), Some(&"rate_limit"));

        let res = result.into_response().unwrap();
        assert_eq!(res.status(), http::StatusCode::TOO_MANY_REQUESTS);
        assert!(res.header("retry-after").is_some());
        let body = String::from_utf8_lossy(res.body()).to_string();
        assert!(body.contains("3 messages per 60 seconds"), "body: {}", body);
    }

    #[test]
    fn test_different_clients_separate_limits() {
        let mw = RateLimitMiddleware::new(2, 60, vec!["/api/messages/".to_string()]);

        for _ in 0..2 {
            let mut ctx = create_context("203.0.113.9");
            assert!(mw.on_request(post_request("/api/messages/"), &mut ctx).is_next());
        }
        let mut ctx = create_context("203.0.113.9");
        assert!(mw.on_request(post_request("/api/messages/"), &mut ctx).is_stop());

        // A different client key still has its own quota.
        for _ in 0..2 {
            let mut ctx = create_context("203.0.113.10");
            assert!(mw.on_request(post_request("/api/messages/"), &mut ctx).is_next());
        }
    }

    #[test]
    fn test_from_config() {
        let config = GatesConfig {
            rate_limit: Some(100),
            rate_window: 120,
            rate_limit_paths: vec!["/api/messages/".to_string()],
            ..GatesConfig::disabled()
        };

        let mw = RateLimitMiddleware::from_config(&config);
        assert!(mw.is_some());

        let config_disabled = GatesConfig::disabled();
        let mw = RateLimitMiddleware::from_config(&config_disabled);
        assert!(mw.is_none());
    }
}
