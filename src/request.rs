//! Incoming HTTP request type.

use std::collections::HashMap;
use std::net::SocketAddr;

use http::{HeaderMap, Method};

use crate::context::RequestContext;

/// An incoming HTTP request.
///
/// The body is never read: nothing this service routes to consumes one.
pub struct Request {
    method: Method,
    path: String,
    headers: HeaderMap,
    peer_addr: SocketAddr,
    params: HashMap<String, String>,
    context: RequestContext,
}

impl Request {
    pub(crate) fn new(method: Method, path: String, headers: HeaderMap, peer_addr: SocketAddr) -> Self {
        Self {
            method,
            path,
            headers,
            peer_addr,
            params: HashMap::new(),
            context: RequestContext::new(),
        }
    }

    pub(crate) fn from_http<B>(req: http::Request<B>, peer_addr: SocketAddr) -> Self {
        let (parts, _body) = req.into_parts();
        Self::new(parts.method, parts.uri.path().to_owned(), parts.headers, peer_addr)
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &HeaderMap { &self.headers }

    /// Transport-level address of the connected peer (often a proxy).
    pub fn peer_addr(&self) -> SocketAddr { self.peer_addr }

    pub fn context(&self) -> &RequestContext { &self.context }
    pub fn context_mut(&mut self) -> &mut RequestContext { &mut self.context }

    /// Header lookup; returns `None` for absent or non-UTF-8 values.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub(crate) fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }
}

#[cfg(test)]
impl Request {
    /// Request from `192.0.2.1:4000` with no headers.
    pub(crate) fn test(method: Method, path: &str) -> Self {
        Self::new(method, path.to_owned(), HeaderMap::new(), ([192, 0, 2, 1], 4000).into())
    }

    pub(crate) fn with_header(mut self, name: &'static str, value: &str) -> Self {
        self.headers.insert(name, value.parse().expect("valid header value"));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_http_keeps_path_without_query() {
        let req = http::Request::builder()
            .method(Method::GET)
            .uri("http://example.com/healthz?verbose=1")
            .header("x-real-ip", "203.0.113.9")
            .body(())
            .unwrap();
        let req = Request::from_http(req, ([127, 0, 0, 1], 9000).into());

        assert_eq!(req.method(), Method::GET);
        assert_eq!(req.path(), "/healthz");
        assert_eq!(req.header("X-Real-IP"), Some("203.0.113.9"));
        assert_eq!(req.peer_addr().port(), 9000);
        assert!(req.context().request_id().is_none());
    }
}
