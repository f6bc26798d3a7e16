//! HTTP request abstraction for the middleware pipeline.

use bytes::Bytes;
use http::header::{self, HeaderName};
use http::{HeaderMap, Method, Uri};

/// Header name constants for fast lookup.
mod header_names {
    use super::*;

    pub static CONTENT_TYPE: HeaderName = header::CONTENT_TYPE;
    pub static CONTENT_LENGTH: HeaderName = header::CONTENT_LENGTH;
    pub static USER_AGENT: HeaderName = header::USER_AGENT;
}

/// Lazily initialized custom header names.
static X_FORWARDED_FOR: std::sync::LazyLock<HeaderName> =
    std::sync::LazyLock::new(|| HeaderName::from_static("x-forwarded-for"));
static X_FORWARDED_USER: std::sync::LazyLock<HeaderName> =
    std::sync::LazyLock::new(|| HeaderName::from_static("x-forwarded-user"));

/// HTTP request flowing through the gate chain.
///
/// Note: Clone is intentionally not derived to prevent expensive copies.
/// Use references or move semantics instead.
#[derive(Debug)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    version: http::Version,
}

impl Request {
    /// Create a new request.
    #[inline]
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            uri,
            headers,
            body,
            version: http::Version::HTTP_11,
        }
    }

    /// Get the HTTP method.
    #[inline]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Get the request path.
    #[inline]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Get the query string.
    #[inline]
    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Get the full URI.
    #[inline]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Get the headers.
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a mutable reference to headers.
    #[inline]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Get the request body.
    #[inline]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Get the HTTP version.
    #[inline]
    pub fn version(&self) -> http::Version {
        self.version
    }

    /// Set the HTTP version.
    #[inline]
    pub fn set_version(&mut self, version: http::Version) {
        self.version = version;
    }

    /// Get a header value by name (fast path with HeaderName constant).
    #[inline]
    fn header_by_name(&self, name: &HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Get a header value by string name (slower, case-insensitive).
    #[inline]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Get Content-Type header.
    #[inline]
    pub fn content_type(&self) -> Option<&str> {
        self.header_by_name(&header_names::CONTENT_TYPE)
    }

    /// Get Content-Length header.
    #[inline]
    pub fn content_length(&self) -> Option<u64> {
        self.header_by_name(&header_names::CONTENT_LENGTH)
            .and_then(|v| v.parse().ok())
    }

    /// Get User-Agent header.
    #[inline]
    pub fn user_agent(&self) -> Option<&str> {
        self.header_by_name(&header_names::USER_AGENT)
    }

    /// First client address in the X-Forwarded-For chain.
    ///
    /// Returns None when the header is absent, unreadable, or holds an
    /// empty first entry, so callers fall back to the peer address.
    #[inline]
    pub fn forwarded_for(&self) -> Option<&str> {
        self.header_by_name(&X_FORWARDED_FOR)
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Identity resolved by an upstream auth proxy, if any.
    #[inline]
    pub fn forwarded_user(&self) -> Option<&str> {
        self.header_by_name(&X_FORWARDED_USER)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

impl<B> From<http::Request<B>> for Request
where
    B: Into<Bytes>,
{
    fn from(req: http::Request<B>) -> Self {
        let (parts, body) = req.into_parts();
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body: body.into(),
            version: parts.version,
        }
    }
}

impl From<Request> for http::Request<Bytes> {
    fn from(req: Request) -> Self {
        let mut builder = http::Request::builder()
            .method(req.method)
            .uri(req.uri)
            .version(req.version);

        if let Some(headers) = builder.headers_mut() {
            *headers = req.headers;
        }

        builder.body(req.body).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_from_http() {
        let http_req = http::Request::builder()
            .method("GET")
            .uri("/api/messages/?page=2")
            .header("user-agent", "test/1.0")
            .body(Bytes::new())
            .unwrap();

        let req = Request::from(http_req);

        assert_eq!(req.method(), Method::GET);
        assert_eq!(req.path(), "/api/messages/");
        assert_eq!(req.query(), Some("page=2"));
        assert_eq!(req.user_agent(), Some("test/1.0"));
    }

    #[test]
    fn test_request_headers() {
        let http_req = http::Request::builder()
            .method("POST")
            .uri("/api/messages/")
            .header("content-type", "application/json")
            .header("content-length", "42")
            .body(Bytes::new())
            .unwrap();

        let req = Request::from(http_req);

        assert_eq!(req.content_type(), Some("application/json"));
        assert_eq!(req.content_length(), Some(42));
    }

    #[test]
    fn test_forwarded_for_first_value() {
        let http_req = http::Request::builder()
            .method("GET")
            .uri("/")
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1, 10.0.0.2")
            .body(Bytes::new())
            .unwrap();

        let req = Request::from(http_req);
        assert_eq!(req.forwarded_for(), Some("203.0.113.9"));
    }

    #[test]
    fn test_forwarded_for_missing_or_empty() {
        let req = Request::from(
            http::Request::builder()
                .method("GET")
                .uri("/")
                .body(Bytes::new())
                .unwrap(),
        );
        assert_eq!(req.forwarded_for(), None);

        let req = Request::from(
            http::Request::builder()
                .method("GET")
                .uri("/")
                .header("x-forwarded-for", " , 10.0.0.1")
                .body(Bytes::new())
                .unwrap(),
        );
        assert_eq!(req.forwarded_for(), None);
    }

    #[test]
    fn test_forwarded_user() {
        let req = Request::from(
            http::Request::builder()
                .method("GET")
                .uri("/")
                .header("x-forwarded-user", "alice@example.com")
                .body(Bytes::new())
                .unwrap(),
        );
        assert_eq!(req.forwarded_user(), Some("alice@example.com"));

        let req = Request::from(
            http::Request::builder()
                .method("GET")
                .uri("/")
                .body(Bytes::new())
                .unwrap(),
        );
        assert_eq!(req.forwarded_user(), None);
    }

    #[test]
    fn test_header_by_string() {
        let http_req = http::Request::builder()
            .method("GET")
            .uri("/")
            .header("x-custom-header", "custom-value")
            .body(Bytes::new())
            .unwrap();

        let req = Request::from(http_req);
        assert_eq!(req.header("x-custom-header"), Some("custom-value"));
        assert_eq!(req.header("X-Custom-Header"), Some("custom-value")); // case-insensitive
    }
}
