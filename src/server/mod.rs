//! HTTP server wiring the gate chain in front of a downstream handler.
//!
//! The server owns a [`MiddlewareChain`] built once at startup and a
//! pluggable [`Handler`] for everything the gates let through. Each
//! accepted connection is served on its own task; gate checks are
//! synchronous and complete before the handler runs.
//!
//! ```text
//! Request → request_log → time_window → rate_limit → Handler
//!                                                       ↓
//! Response ←──────────────────────────────────────────←─┘
//! ```

mod handler;

pub use handler::StubHandler;

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::core::{Context, Request, Response, Result};
use crate::middleware::{MiddlewareChain, DENIED_BY};
use crate::observability::Metrics;

/// Downstream request handler: the stage the gates protect.
///
/// Gates never inspect or transform what the handler returns; the
/// response flows back through `on_response` hooks only.
pub trait Handler: Send + Sync + 'static {
    /// Handle a request that passed every gate.
    fn handle(&self, req: Request, ctx: &mut Context) -> Response;
}

/// HTTP server with a gate chain and pluggable downstream handler.
pub struct Server<H: Handler> {
    config: ServerConfig,
    chain: Arc<MiddlewareChain>,
    handler: Arc<H>,
    metrics: Arc<Metrics>,
}

impl<H: Handler> Server<H> {
    /// Create a new server.
    pub fn new(
        config: ServerConfig,
        chain: MiddlewareChain,
        handler: H,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            config,
            chain: Arc::new(chain),
            handler: Arc::new(handler),
            metrics,
        }
    }

    /// Bind the configured listen address and serve until the task is
    /// cancelled or accepting fails.
    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(self.config.listen_addr).await?;
        info!("listening on {}", listener.local_addr()?);
        self.serve(listener).await
    }

    /// Serve connections from an already-bound listener.
    ///
    /// Useful for tests that bind an ephemeral port first.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        info!(gates = ?self.chain.names(), "gate chain ready");

        loop {
            let (stream, peer) = listener.accept().await?;
            let chain = Arc::clone(&self.chain);
            let handler = Arc::clone(&self.handler);
            let metrics = Arc::clone(&self.metrics);

            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req: http::Request<Incoming>| {
                    let chain = Arc::clone(&chain);
                    let handler = Arc::clone(&handler);
                    let metrics = Arc::clone(&metrics);
                    async move {
                        Ok::<_, Infallible>(
                            dispatch(req, peer, &chain, handler.as_ref(), &metrics).await,
                        )
                    }
                });

                if let Err(e) = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
                    .serve_connection(io, service)
                    .await
                {
                    debug!(peer = %peer, error = %e, "connection closed with error");
                }
            });
        }
    }
}

/// Run one request through the gate chain and downstream handler.
async fn dispatch<H: Handler>(
    req: http::Request<Incoming>,
    peer: SocketAddr,
    chain: &MiddlewareChain,
    handler: &H,
    metrics: &Metrics,
) -> http::Response<Full<Bytes>> {
    let method = req.method().to_string();

    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(error = %e, "failed to read request body");
            metrics.record_request(&method, 500, 0.0);
            return Response::internal_error("failed to read request body").into();
        }
    };

    let mut req = Request::new(parts.method, parts.uri, parts.headers, body);
    req.set_version(parts.version);

    // Client identity: first forwarded-for hop when present, else the
    // direct peer. The forwarded chain is taken at face value; strip
    // inbound values at the trusted edge.
    let client_key = req
        .forwarded_for()
        .map(str::to_owned)
        .unwrap_or_else(|| peer.ip().to_string());
    let user = req.forwarded_user().map(str::to_owned);

    let mut ctx = Context::builder(peer.ip())
        .client_key(client_key)
        .user(user)
        .build();

    let res = chain.process(req, &mut ctx, |req, ctx| handler.handle(req, ctx));

    if let Some(gate) = ctx.get::<&'static str>(DENIED_BY) {
        metrics.record_denial(gate);
    }
    metrics.record_request(&method, res.status().as_u16(), ctx.elapsed().as_secs_f64());

    let mut http_res: http::Response<Full<Bytes>> = res.into();
    for (name, value) in ctx.response_headers() {
        if let (Ok(name), Ok(value)) = (
            http::header::HeaderName::try_from(name.as_str()),
            http::HeaderValue::try_from(value.as_str()),
        ) {
            http_res.headers_mut().insert(name, value);
        }
    }
    http_res
}
