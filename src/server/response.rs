use std::io;

use http::header::{HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, StatusCode};
use serde_json::Value;

use crate::error::ApiError;

/// JSON content type written with every envelope.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Sink for one response.
///
/// Headers must be set before [`write_head`](Self::write_head); the first status
/// written wins. Writing body bytes without a head implies `200 OK`.
pub trait ResponseWriter {
    fn headers_mut(&mut self) -> &mut HeaderMap;

    fn write_head(&mut self, status: StatusCode);

    /// # Errors
    ///
    /// Propagates transport write failures.
    fn write_body(&mut self, chunk: &[u8]) -> io::Result<()>;
}

/// Adapts a [`ResponseWriter`]'s body to [`io::Write`] for streaming copies.
pub(crate) struct BodyWriter<'a>(pub(crate) &'a mut dyn ResponseWriter);

impl io::Write for BodyWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write_body(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// An in-memory response, used by [`Router::handle`](crate::Router::handle) and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferedResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    head_written: bool,
}

impl Default for BufferedResponse {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
            head_written: false,
        }
    }
}

impl BufferedResponse {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A JSON response with `status` and `body`.
    #[must_use]
    pub fn json(status: StatusCode, body: &Value) -> Self {
        let mut res = Self::new();
        res.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        res.status = status;
        res.head_written = true;
        res.body = body.to_string().into_bytes();
        res
    }

    /// An `{"error": ...}` envelope.
    #[must_use]
    pub fn error(status: StatusCode, error: &ApiError) -> Self {
        let body = serde_json::to_value(error).unwrap_or(Value::Null);
        Self::json(status, &serde_json::json!({ "error": body }))
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A header value as text, if present and visible ASCII.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The body parsed as JSON, if it is JSON.
    #[must_use]
    pub fn body_json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }

    #[must_use]
    pub fn into_http(self) -> http::Response<Vec<u8>> {
        let mut res = http::Response::new(self.body);
        *res.status_mut() = self.status;
        *res.headers_mut() = self.headers;
        res
    }
}

impl ResponseWriter for BufferedResponse {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_head(&mut self, status: StatusCode) {
        if !self.head_written {
            self.status = status;
            self.head_written = true;
        }
    }

    fn write_body(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.head_written = true;
        self.body.extend_from_slice(chunk);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_first_status_wins() {
        let mut res = BufferedResponse::new();
        res.write_head(StatusCode::CREATED);
        res.write_head(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    #[test]
    fn test_body_writer_streams_into_buffer() {
        let mut res = BufferedResponse::new();
        BodyWriter(&mut res).write_all(b"abc").unwrap();
        assert_eq!(res.body(), b"abc");
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[test]
    fn test_error_envelope() {
        let res = BufferedResponse::error(StatusCode::BAD_REQUEST, &ApiError::with_code("x"));
        assert_eq!(res.body(), br#"{"error":{"code":"x"}}"#);
        assert_eq!(res.header("content-type"), Some(JSON_CONTENT_TYPE));
        let http = res.into_http();
        assert_eq!(http.status(), StatusCode::BAD_REQUEST);
    }
}
