//! Real client address resolution.
//!
//! Behind a reverse proxy the TCP peer is the proxy, not the client. The
//! proxy reports the original client in a header; the first of these that
//! is present decides:
//!
//! | Precedence | Header | Value |
//! |---|---|---|
//! | 1 | `True-Client-IP` | single address |
//! | 2 | `X-Real-IP` | single address |
//! | 3 | `X-Forwarded-For` | comma-separated chain, left-most is the client |
//!
//! A value that does not parse as an IP address is ignored and the peer
//! address is used instead. Only deploy this stage behind a proxy that
//! overwrites these headers.

use std::net::IpAddr;

use tracing::debug;

use crate::handler::BoxFuture;
use crate::middleware::{Middleware, Next};
use crate::request::Request;

const TRUE_CLIENT_IP: &str = "true-client-ip";
const X_REAL_IP: &str = "x-real-ip";
const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Resolves the originating client address from proxy headers.
///
/// Never fails: the worst case is the transport-level peer address.
pub fn resolve_client_addr(req: &Request) -> IpAddr {
    let peer = req.peer_addr().ip();

    let Some((name, raw)) = [TRUE_CLIENT_IP, X_REAL_IP, X_FORWARDED_FOR]
        .into_iter()
        .find_map(|name| present(req, name).map(|raw| (name, raw)))
    else {
        return peer;
    };

    let candidate = match name {
        X_FORWARDED_FOR => raw.split(',').next().unwrap_or_default().trim(),
        _ => raw,
    };

    match candidate.parse() {
        Ok(ip) => ip,
        Err(_) => {
            debug!(header = name, value = raw, %peer, "malformed client address header, using peer");
            peer
        }
    }
}

/// A header counts as present only if it holds a non-blank value.
/// Non-UTF-8 values are treated as malformed rather than absent.
fn present<'r>(req: &'r Request, name: &str) -> Option<&'r str> {
    let value = req.headers().get(name)?;
    match value.to_str() {
        Ok(s) if s.trim().is_empty() => None,
        Ok(s) => Some(s.trim()),
        Err(_) => Some(""),
    }
}

/// Stores the resolved client address in the request context.
#[derive(Clone, Debug, Default)]
pub struct RealIp;

impl RealIp {
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for RealIp {
    fn name(&self) -> &'static str {
        "real_ip"
    }

    fn handle<'a>(&'a self, mut req: Request, next: Next) -> BoxFuture<'a> {
        let addr = resolve_client_addr(&req);
        req.context_mut().set_client_addr(addr);
        next.run(req)
    }
}
