//! The outbound response triple: status, headers, and body chunks.
//!
//! The core treats responses opaquely — it builds them, middleware may
//! decorate them, and the hosting server encodes them onto the wire. The
//! body is a sequence of byte chunks so hosts can stream without the core
//! ever concatenating.

use bytes::Bytes;

use super::{Headers, StatusCode};

/// An HTTP response ready to hand back to the hosting server.
///
/// # Examples
///
/// ```
/// use sendero::http::{Response, StatusCode};
///
/// let response = Response::new(StatusCode::Ok)
///     .header("Content-Type", "application/json")
///     .text(r#"{"status":"ok"}"#);
///
/// assert_eq!(response.status(), StatusCode::Ok);
/// assert_eq!(response.content_length(), 15);
/// ```
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: Headers,
    chunks: Vec<Bytes>,
}

impl Response {
    /// Creates a response with the given status and an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            chunks: Vec::new(),
        }
    }

    /// Builds a JSON response: serializes `value`, sets `Content-Type`.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error if `value` cannot be
    /// serialized.
    pub fn json<T: serde::Serialize>(
        status: StatusCode,
        value: &T,
    ) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        Ok(Self::new(status)
            .header("Content-Type", "application/json")
            .chunk(body))
    }

    /// Appends a response header, builder-style.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Sets a header in place, replacing existing values for the name.
    /// Intended for middleware decorating a response from downstream.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.set(name, value);
    }

    /// Replaces the body with a single UTF-8 chunk.
    #[must_use]
    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.chunks = vec![Bytes::from(body.into().into_bytes())];
        self
    }

    /// Appends one body chunk.
    #[must_use]
    pub fn chunk(mut self, chunk: impl Into<Bytes>) -> Self {
        self.chunks.push(chunk.into());
        self
    }

    /// Returns the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the response headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the body chunks in order.
    pub fn chunks(&self) -> &[Bytes] {
        &self.chunks
    }

    /// Total body length in bytes across all chunks.
    pub fn content_length(&self) -> usize {
        self.chunks.iter().map(Bytes::len).sum()
    }

    /// Concatenates the chunks into one buffer. Hosts that stream should
    /// iterate [`chunks`](Self::chunks) instead.
    pub fn into_body(self) -> Bytes {
        match self.chunks.len() {
            0 => Bytes::new(),
            1 => self.chunks.into_iter().next().unwrap_or_default(),
            _ => {
                let mut buf = Vec::with_capacity(self.chunks.iter().map(Bytes::len).sum());
                for chunk in &self.chunks {
                    buf.extend_from_slice(chunk);
                }
                Bytes::from(buf)
            }
        }
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new(StatusCode::Ok)
    }
}
