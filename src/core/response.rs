//! HTTP response abstraction for the middleware pipeline.

use bytes::Bytes;
use http::header::{self, HeaderName};
use http::{HeaderMap, HeaderValue, StatusCode};
use http_body_util::Full;

/// Common header name constants for fast lookup.
mod header_names {
    use super::*;
    pub static CONTENT_TYPE: HeaderName = header::CONTENT_TYPE;
    pub static RETRY_AFTER: HeaderName = header::RETRY_AFTER;
}

/// Pre-allocated static header values for common content types.
mod content_types {
    use super::*;
    pub static TEXT_PLAIN: HeaderValue = HeaderValue::from_static("text/plain; charset=utf-8");
    pub static APPLICATION_JSON: HeaderValue = HeaderValue::from_static("application/json");
}

/// Pre-allocated static body for 404 responses.
static NOT_FOUND_BODY: Bytes = Bytes::from_static(b"Not Found");

/// HTTP response.
///
/// Note: Clone is intentionally not derived to prevent expensive copies.
/// Use references or move semantics instead.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    /// Create a new response builder.
    #[inline]
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder::new()
    }

    /// Create a 200 OK response with body.
    #[inline]
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Create a 404 Not Found response (uses static body).
    #[inline]
    pub fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            headers: HeaderMap::new(),
            body: NOT_FOUND_BODY.clone(), // Bytes::clone is cheap (Arc)
        }
    }

    /// Create a 500 Internal Server Error response.
    #[inline]
    pub fn internal_error(msg: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            headers: HeaderMap::new(),
            body: Bytes::copy_from_slice(msg.as_bytes()),
        }
    }

    /// Create a 403 Forbidden response with a plain-text explanation.
    #[inline]
    pub fn forbidden(msg: impl Into<Bytes>) -> Self {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert(
            header_names::CONTENT_TYPE.clone(),
            content_types::TEXT_PLAIN.clone(),
        );
        Self {
            status: StatusCode::FORBIDDEN,
            headers,
            body: msg.into(),
        }
    }

    /// Create a 429 Too Many Requests response with a plain-text
    /// explanation and a Retry-After hint in seconds.
    #[inline]
    pub fn too_many_requests(msg: impl Into<Bytes>, retry_after: u64) -> Self {
        let mut headers = HeaderMap::with_capacity(2);
        headers.insert(
            header_names::CONTENT_TYPE.clone(),
            content_types::TEXT_PLAIN.clone(),
        );
        if let Ok(value) = HeaderValue::try_from(retry_after.to_string()) {
            headers.insert(header_names::RETRY_AFTER.clone(), value);
        }
        Self {
            status: StatusCode::TOO_MANY_REQUESTS,
            headers,
            body: msg.into(),
        }
    }

    /// Create an empty response with given status.
    #[inline]
    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    // Getters

    /// Get the status code.
    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
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

    /// Get the response body.
    #[inline]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Get a header value by string name (case-insensitive).
    #[inline]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    // Modifiers

    /// Set the status code.
    #[inline]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Add a header by string name and value.
    #[inline]
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name.as_ref()),
            HeaderValue::try_from(value.as_ref()),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Set the body.
    #[inline]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    // Status checks

    /// Check if this is a successful response (2xx).
    #[inline]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Check if this is a client error (4xx).
    #[inline]
    pub fn is_client_error(&self) -> bool {
        self.status.is_client_error()
    }

    /// Get Content-Type header (fast path).
    #[inline]
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(&header_names::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Get body length.
    #[inline]
    pub fn body_len(&self) -> usize {
        self.body.len()
    }
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }
}

impl From<Response> for http::Response<Full<Bytes>> {
    fn from(res: Response) -> Self {
        let mut builder = http::Response::builder().status(res.status);

        if let Some(headers) = builder.headers_mut() {
            *headers = res.headers;
        }

        builder.body(Full::new(res.body)).unwrap()
    }
}

impl<B> From<http::Response<B>> for Response
where
    B: Into<Bytes>,
{
    fn from(res: http::Response<B>) -> Self {
        let (parts, body) = res.into_parts();
        Self {
            status: parts.status,
            headers: parts.headers,
            body: body.into(),
        }
    }
}

/// Builder for creating HTTP responses.
pub struct ResponseBuilder {
    status: StatusCode,
    headers: Option<HeaderMap>, // Lazy allocation
    body: Bytes,
}

impl Default for ResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseBuilder {
    /// Create a new response builder.
    #[inline]
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: None, // Don't allocate until needed
            body: Bytes::new(),
        }
    }

    /// Set the status code.
    #[inline]
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Add header with typed HeaderName and HeaderValue (zero-alloc for static values).
    #[inline]
    pub fn header_value(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers
            .get_or_insert_with(HeaderMap::new)
            .insert(name, value);
        self
    }

    /// Add header by strings.
    #[inline]
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name.as_ref()),
            HeaderValue::try_from(value.as_ref()),
        ) {
            self.headers
                .get_or_insert_with(HeaderMap::new)
                .insert(name, value);
        }
        self
    }

    /// Set the body.
    #[inline]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Set Content-Type to application/json (uses static HeaderValue).
    #[inline]
    pub fn json(self) -> Self {
        self.header_value(
            header_names::CONTENT_TYPE.clone(),
            content_types::APPLICATION_JSON.clone(),
        )
    }

    /// Set Content-Type to text/plain (uses static HeaderValue).
    #[inline]
    pub fn text(self) -> Self {
        self.header_value(
            header_names::CONTENT_TYPE.clone(),
            content_types::TEXT_PLAIN.clone(),
        )
    }

    /// Build the response.
    #[inline]
    pub fn build(self) -> Response {
        Response {
            status: self.status,
            headers: self.headers.unwrap_or_default(),
            body: self.body,
        }
    }
}
