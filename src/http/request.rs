//! The inbound request structure handed to the core by the hosting server.
//!
//! The core never touches a socket: the host parses the wire format with
//! whatever HTTP abstraction it uses and constructs a [`Request`] from the
//! result. Dispatch reads only the method and path; headers, query, and body
//! ride through to filters and handlers unmodified.

use std::collections::HashMap;

use bytes::Bytes;

use super::{Headers, Method};

/// An already-parsed HTTP request.
///
/// Built with [`Request::new`] (or a per-verb shorthand) from a request
/// target; a `?query` suffix is split off and made available through
/// [`query_string`](Self::query_string) and
/// [`query_param`](Self::query_param).
///
/// # Examples
///
/// ```
/// use sendero::http::Request;
///
/// let request = Request::get("/search?q=rust&page=2")
///     .header("Host", "example.com")
///     .body("ignored for GET");
///
/// assert_eq!(request.method().as_str(), "GET");
/// assert_eq!(request.path(), "/search");
/// assert_eq!(request.query_param("q"), Some("rust"));
/// assert_eq!(request.headers().get("host"), Some("example.com"));
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    query: Option<String>,
    query_params: HashMap<String, String>,
    headers: Headers,
    body: Bytes,
}

impl Request {
    /// Creates a request from a method and a request target.
    ///
    /// The target's `?query` suffix, if any, is split off; an empty target
    /// becomes `"/"`.
    pub fn new(method: Method, target: impl AsRef<str>) -> Self {
        let target = target.as_ref();
        let target = if target.is_empty() { "/" } else { target };

        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p.to_owned(), Some(q.to_owned())),
            None => (target.to_owned(), None),
        };

        let query_params = query.as_deref().map(parse_query).unwrap_or_default();

        Self {
            method,
            path,
            query,
            query_params,
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    /// Shorthand for `Request::new(Method::Get, target)`.
    pub fn get(target: impl AsRef<str>) -> Self {
        Self::new(Method::Get, target)
    }

    /// Shorthand for `Request::new(Method::Post, target)`.
    pub fn post(target: impl AsRef<str>) -> Self {
        Self::new(Method::Post, target)
    }

    /// Shorthand for `Request::new(Method::Put, target)`.
    pub fn put(target: impl AsRef<str>) -> Self {
        Self::new(Method::Put, target)
    }

    /// Shorthand for `Request::new(Method::Delete, target)`.
    pub fn delete(target: impl AsRef<str>) -> Self {
        Self::new(Method::Delete, target)
    }

    /// Adds a header entry, builder-style.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Sets the body bytes, builder-style.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns the HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request path (without the query string).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the raw query string (without the leading `?`), if any.
    pub fn query_string(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Returns a parsed query parameter value by key.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query_params.get(key).map(String::as_str)
    }

    /// Returns the request headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the request body bytes.
    pub fn body_bytes(&self) -> &Bytes {
        &self.body
    }

    // Rewrites the path in place. Used by prefix mounts to hand a mounted
    // app the path relative to its mount point.
    pub(crate) fn rebase(mut self, path: String) -> Self {
        self.path = path;
        self
    }
}

/// Parses a `key=value&key2=value2` query string, decoding `+` as a space.
///
/// Full percent-decoding is the host's concern; the core only needs enough
/// structure for `query_param` lookups.
fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next()?.replace('+', " ");
            let value = parts.next().unwrap_or("").replace('+', " ");
            Some((key, value))
        })
        .collect()
}
