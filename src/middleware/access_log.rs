//! Access logging.
//!
//! One `info` event per request on the `vigil::access` target, emitted once
//! the downstream stages have produced the response:
//!
//! ```text
//! INFO vigil::access: request completed request_id=0192… method=GET path=/healthz status=200 bytes=15 elapsed=84µs client=203.0.113.5
//! ```

use std::net::IpAddr;
use std::time::{Duration, Instant};

use http::{Method, StatusCode};
use tracing::info;

use crate::handler::BoxFuture;
use crate::middleware::{Middleware, Next};
use crate::request::Request;
use crate::response::Response;

/// Everything recorded about one completed request.
#[derive(Clone, Debug, PartialEq)]
pub struct AccessEntry {
    pub request_id: Option<String>,
    pub method: Method,
    pub path: String,
    pub status: StatusCode,
    pub bytes: usize,
    pub elapsed: Duration,
    pub client: Option<IpAddr>,
}

impl AccessEntry {
    fn emit(&self) {
        info!(
            target: "vigil::access",
            request_id = self.request_id.as_deref().unwrap_or("-"),
            method = %self.method,
            path = %self.path,
            status = self.status.as_u16(),
            bytes = self.bytes,
            elapsed = ?self.elapsed,
            client = %self.client.map(|ip| ip.to_string()).unwrap_or_else(|| "-".to_owned()),
            "request completed"
        );
    }
}

/// Request-side attributes, captured before the request moves downstream.
struct Pending {
    request_id: Option<String>,
    method: Method,
    path: String,
    client: Option<IpAddr>,
}

impl Pending {
    fn capture(req: &Request) -> Self {
        Self {
            request_id: req.context().request_id().map(ToString::to_string),
            method: req.method().clone(),
            path: req.path().to_owned(),
            client: req.context().client_addr(),
        }
    }

    fn complete(self, res: &Response, elapsed: Duration) -> AccessEntry {
        AccessEntry {
            request_id: self.request_id,
            method: self.method,
            path: self.path,
            status: res.status_code(),
            bytes: res.body_len(),
            elapsed,
            client: self.client,
        }
    }
}

/// Logs an [`AccessEntry`] for every request passing through.
///
/// Stamps the request's start time in the context. Never alters the response.
#[derive(Clone, Debug, Default)]
pub struct AccessLog;

impl AccessLog {
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for AccessLog {
    fn name(&self) -> &'static str {
        "access_log"
    }

    fn handle<'a>(&'a self, mut req: Request, next: Next) -> BoxFuture<'a> {
        req.context_mut().set_started_at(Instant::now());
        let started_at = req.context().started_at().unwrap_or_else(Instant::now);
        let pending = Pending::capture(&req);

        Box::pin(async move {
            let res = next.run(req).await;
            pending.complete(&res, started_at.elapsed()).emit();
            res
        })
    }
}
