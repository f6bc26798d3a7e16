//! Built-in downstream handler.
//!
//! Stands in for the messaging API behind the gates: serves health and
//! metrics endpoints and acknowledges API calls with stub JSON bodies.
//! Production deployments implement [`Handler`](super::Handler) over the
//! real backend instead.

use std::sync::Arc;

use http::StatusCode;

use crate::core::{Context, Request, Response};
use crate::observability::Metrics;

use super::Handler;

/// Stub messaging API handler.
pub struct StubHandler {
    metrics: Arc<Metrics>,
}

impl StubHandler {
    /// Create a new stub handler.
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self { metrics }
    }
}

impl Handler for StubHandler {
    fn handle(&self, req: Request, _ctx: &mut Context) -> Response {
        match (req.method().as_str(), req.path()) {
            ("GET", "/health") => Response::builder()
                .json()
                .body(r#"{"status":"ok"}"#)
                .build(),
            ("GET", "/metrics") => Response::builder()
                .header("content-type", "text/plain; version=0.0.4")
                .body(self.metrics.export())
                .build(),
            (method, path) if path.starts_with("/api/") => {
                let status = if method == "POST" {
                    StatusCode::CREATED
                } else {
                    StatusCode::OK
                };
                Response::builder()
                    .status(status)
                    .json()
                    .body(r#"{"detail":"accepted"}"#)
                    .build()
            }
            _ => Response::not_found(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn handler() -> StubHandler {
        StubHandler::new(Arc::new(Metrics::new().unwrap()))
    }

    fn ctx() -> Context {
        Context::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)))
    }

    fn request(method: &str, path: &str) -> Request {
        Request::new(
            method.parse().unwrap(),
            path.parse().unwrap(),
            http::HeaderMap::new(),
            bytes::Bytes::new(),
        )
    }

    #[test]
    fn test_health() {
        let res = handler().handle(request("GET", "/health"), &mut ctx());
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.content_type(), Some("application/json"));
        assert_eq!(res.body().as_ref(), br#"{"status":"ok"}"#);
    }

    #[test]
    fn test_metrics_exposition() {
        let h = handler();
        h.metrics.record_request("GET", 200, 0.001);

        let res = h.handle(request("GET", "/metrics"), &mut ctx());
        assert_eq!(res.status(), StatusCode::OK);
        let body = String::from_utf8_lossy(res.body()).to_string();
        assert!(body.contains("chatgate_http_requests_total"), "body: {}", body);
    }

    #[test]
    fn test_api_stub_statuses() {
        let h = handler();

        let res = h.handle(request("POST", "/api/messages/"), &mut ctx());
        assert_eq!(res.status(), StatusCode::CREATED);

        let res = h.handle(request("GET", "/api/conversations/"), &mut ctx());
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[test]
    fn test_unknown_path_is_404() {
        let res = handler().handle(request("GET", "/nope"), &mut ctx());
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
